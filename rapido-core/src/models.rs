use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// How fast an order has to be delivered. Urgent orders carry a surcharge.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, Display, EnumString,
)]
pub enum DeliveryType {
    #[serde(rename = "normal")]
    #[strum(serialize = "normal")]
    Normal,
    #[serde(rename = "urgente")]
    #[strum(serialize = "urgente")]
    Urgent,
}

/// Delivery lifecycle status as stored in `entregas.status_entrega`
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, Display, EnumString,
)]
pub enum DeliveryStatus {
    #[serde(rename = "calculado")]
    #[strum(serialize = "calculado")]
    Calculated,
    #[serde(rename = "em transito")]
    #[strum(serialize = "em transito")]
    InTransit,
    #[serde(rename = "entregue")]
    #[strum(serialize = "entregue")]
    Delivered,
    #[serde(rename = "cancelado")]
    #[strum(serialize = "cancelado")]
    Cancelled,
}

impl DeliveryType {
    pub fn as_str(&self) -> &str {
        self.as_ref()
    }
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &str {
        self.as_ref()
    }
}

// ============================================================================
// Clients
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    #[serde(rename = "id_cliente")]
    pub id: i32,
    #[serde(rename = "nome_completo")]
    pub full_name: String,
    /// CPF, unique and exactly 11 characters
    #[serde(rename = "cpf")]
    pub tax_id: String,
    #[serde(rename = "telefone")]
    pub phone: String,
    pub email: String,
    #[serde(rename = "endereco_completo")]
    pub address: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewClient {
    pub full_name: String,
    pub tax_id: String,
    pub phone: String,
    pub email: String,
    pub address: String,
}

impl NewClient {
    pub fn into_client(self, id: i32) -> Client {
        Client {
            id,
            full_name: self.full_name,
            tax_id: self.tax_id,
            phone: self.phone,
            email: self.email,
            address: self.address,
        }
    }
}

/// Partial client update. `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientPatch {
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
}

impl ClientPatch {
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none()
            && self.phone.is_none()
            && self.email.is_none()
            && self.address.is_none()
    }

    pub fn apply(&self, client: &mut Client) {
        if let Some(name) = &self.full_name {
            client.full_name = name.clone();
        }
        if let Some(phone) = &self.phone {
            client.phone = phone.clone();
        }
        if let Some(email) = &self.email {
            client.email = email.clone();
        }
        if let Some(address) = &self.address {
            client.address = address.clone();
        }
    }
}

// ============================================================================
// Orders
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    #[serde(rename = "id_pedido")]
    pub id: i32,
    #[serde(rename = "id_cliente_fk")]
    pub client_id: i32,
    #[serde(rename = "data")]
    pub date: NaiveDate,
    #[serde(rename = "tipo_entrega")]
    pub delivery_type: DeliveryType,
    /// Kilometres
    #[serde(rename = "distancia")]
    pub distance: Decimal,
    /// Kilograms
    #[serde(rename = "peso_carga")]
    pub weight: Decimal,
    #[serde(rename = "valor_km")]
    pub rate_per_km: Decimal,
    #[serde(rename = "valor_kg")]
    pub rate_per_kg: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub client_id: i32,
    pub date: NaiveDate,
    pub delivery_type: DeliveryType,
    pub distance: Decimal,
    pub weight: Decimal,
    pub rate_per_km: Decimal,
    pub rate_per_kg: Decimal,
}

impl NewOrder {
    pub fn into_order(self, id: i32) -> Order {
        Order {
            id,
            client_id: self.client_id,
            date: self.date,
            delivery_type: self.delivery_type,
            distance: self.distance,
            weight: self.weight,
            rate_per_km: self.rate_per_km,
            rate_per_kg: self.rate_per_kg,
        }
    }
}

/// Partial order update. The status, when present, is written to the
/// order's delivery inside the same transaction as the order row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderPatch {
    pub distance: Option<Decimal>,
    pub weight: Option<Decimal>,
    pub delivery_type: Option<DeliveryType>,
    pub status: Option<DeliveryStatus>,
}

impl OrderPatch {
    pub fn is_empty(&self) -> bool {
        self.distance.is_none()
            && self.weight.is_none()
            && self.delivery_type.is_none()
            && self.status.is_none()
    }

    pub fn apply(&self, order: &mut Order) {
        if let Some(distance) = self.distance {
            order.distance = distance;
        }
        if let Some(weight) = self.weight {
            order.weight = weight;
        }
        if let Some(delivery_type) = self.delivery_type {
            order.delivery_type = delivery_type;
        }
    }
}

/// Rows touched by an order update transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OrderUpdate {
    pub order_rows: u64,
    pub delivery_rows: u64,
}

// ============================================================================
// Deliveries
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delivery {
    #[serde(rename = "id_entrega")]
    pub id: i32,
    #[serde(rename = "id_pedido_fk")]
    pub order_id: i32,
    #[serde(rename = "valor_distancia")]
    pub distance_charge: Decimal,
    #[serde(rename = "valor_peso")]
    pub weight_charge: Decimal,
    #[serde(rename = "acrescimo")]
    pub surcharge: Decimal,
    #[serde(rename = "desconto")]
    pub discount: Decimal,
    #[serde(rename = "taxa_extra")]
    pub extra_fee: Decimal,
    #[serde(rename = "valor_entrega")]
    pub final_charge: Decimal,
    #[serde(rename = "status_entrega")]
    pub status: DeliveryStatus,
}

/// Monetary breakdown of a priced order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryQuote {
    #[serde(rename = "valor_distancia")]
    pub distance_charge: Decimal,
    #[serde(rename = "valor_peso")]
    pub weight_charge: Decimal,
    #[serde(rename = "valor_base")]
    pub base: Decimal,
    #[serde(rename = "acrescimo")]
    pub surcharge: Decimal,
    #[serde(rename = "taxa_extra")]
    pub extra_fee: Decimal,
    pub subtotal: Decimal,
    #[serde(rename = "desconto")]
    pub discount: Decimal,
    #[serde(rename = "valor_entrega")]
    pub final_charge: Decimal,
}

impl DeliveryQuote {
    pub fn into_delivery(self, id: i32, order_id: i32, status: DeliveryStatus) -> Delivery {
        Delivery {
            id,
            order_id,
            distance_charge: self.distance_charge,
            weight_charge: self.weight_charge,
            surcharge: self.surcharge,
            discount: self.discount,
            extra_fee: self.extra_fee,
            final_charge: self.final_charge,
            status,
        }
    }
}

/// Outcome of pricing an order and persisting its delivery
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryRecord {
    pub delivery_id: i32,
    /// `true` on first pricing, `false` when an existing delivery was repriced
    pub created: bool,
    pub rows_affected: u64,
    /// Computed from the order row as read under the write lock
    pub quote: DeliveryQuote,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::str::FromStr;

    fn order() -> Order {
        Order {
            id: 1,
            client_id: 7,
            date: NaiveDate::from_ymd_opt(2025, 4, 17).unwrap(),
            delivery_type: DeliveryType::Normal,
            distance: dec!(20.00),
            weight: dec!(12.00),
            rate_per_km: dec!(8.00),
            rate_per_kg: dec!(12.00),
        }
    }

    #[test]
    fn test_status_wire_names() {
        assert_eq!(DeliveryStatus::InTransit.as_ref(), "em transito");
        assert_eq!(
            DeliveryStatus::from_str("cancelado").unwrap(),
            DeliveryStatus::Cancelled
        );
        assert!(DeliveryStatus::from_str("lost").is_err());

        let json = serde_json::to_string(&DeliveryStatus::InTransit).unwrap();
        assert_eq!(json, "\"em transito\"");
        assert_eq!(DeliveryType::Urgent.to_string(), "urgente");
    }

    #[test]
    fn test_order_patch_keeps_missing_fields() {
        let mut order = order();
        let patch = OrderPatch {
            weight: Some(dec!(60)),
            delivery_type: Some(DeliveryType::Urgent),
            ..Default::default()
        };
        patch.apply(&mut order);

        assert_eq!(order.distance, dec!(20.00));
        assert_eq!(order.weight, dec!(60));
        assert_eq!(order.delivery_type, DeliveryType::Urgent);
        assert!(OrderPatch::default().is_empty());
    }

    #[test]
    fn test_client_patch() {
        let mut client = NewClient {
            full_name: "Ana Souza".to_string(),
            tax_id: "12345678901".to_string(),
            phone: "11987654321".to_string(),
            email: "ana@example.com".to_string(),
            address: "Rua A, 10".to_string(),
        }
        .into_client(3);

        let patch = ClientPatch {
            email: Some("ana.souza@example.com".to_string()),
            ..Default::default()
        };
        assert!(!patch.is_empty());
        patch.apply(&mut client);

        assert_eq!(client.email, "ana.souza@example.com");
        assert_eq!(client.full_name, "Ana Souza");
        assert_eq!(client.tax_id, "12345678901");
    }

    #[test]
    fn test_order_serializes_with_column_names() {
        let value = serde_json::to_value(order()).unwrap();
        assert_eq!(value["id_pedido"], 1);
        assert_eq!(value["id_cliente_fk"], 7);
        assert_eq!(value["tipo_entrega"], "normal");
        assert_eq!(value["distancia"], "20.00");
        assert_eq!(value["data"], "2025-04-17");
    }
}
