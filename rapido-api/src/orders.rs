use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use rapido_core::{DeliveryStatus, DeliveryType, NewOrder, Order, OrderPatch, OrderUpdate};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::envelope::{envelope, Envelope};
use crate::error::AppError;
use crate::extract::{check_amount, deserialize_id, parse_id, ApiJson};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/pedidos", get(list_orders).post(create_order))
        .route("/pedidos/{id}", get(get_order).put(update_order))
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateOrderRequest {
    #[serde(deserialize_with = "deserialize_id")]
    pub id_cliente: i32,
    pub data: NaiveDate,
    #[serde(rename = "tipoEntrega")]
    pub delivery_type: DeliveryType,
    #[serde(rename = "distancia")]
    pub distance: Decimal,
    #[serde(rename = "peso")]
    pub weight: Decimal,
    #[serde(rename = "valorKm")]
    pub rate_per_km: Decimal,
    #[serde(rename = "valorKg")]
    pub rate_per_kg: Decimal,
}

impl CreateOrderRequest {
    fn check(&self) -> Result<(), AppError> {
        check_amount("distancia", self.distance)?;
        check_amount("peso", self.weight)?;
        check_amount("valorKm", self.rate_per_km)?;
        check_amount("valorKg", self.rate_per_kg)
    }

    fn into_new_order(self) -> NewOrder {
        NewOrder {
            client_id: self.id_cliente,
            date: self.data,
            delivery_type: self.delivery_type,
            distance: self.distance,
            weight: self.weight,
            rate_per_km: self.rate_per_km,
            rate_per_kg: self.rate_per_kg,
        }
    }
}

/// Order fields to change plus an optional status for the order's delivery
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateOrderRequest {
    #[serde(default, rename = "distancia")]
    pub distance: Option<Decimal>,
    #[serde(default, rename = "pesoCarga")]
    pub weight: Option<Decimal>,
    #[serde(default, rename = "tipoEntrega")]
    pub delivery_type: Option<DeliveryType>,
    #[serde(default)]
    pub status: Option<DeliveryStatus>,
}

impl UpdateOrderRequest {
    fn into_patch(self) -> Result<OrderPatch, AppError> {
        if let Some(distance) = self.distance {
            check_amount("distancia", distance)?;
        }
        if let Some(weight) = self.weight {
            check_amount("pesoCarga", weight)?;
        }

        Ok(OrderPatch {
            distance: self.distance,
            weight: self.weight,
            delivery_type: self.delivery_type,
            status: self.status,
        })
    }
}

pub async fn create_order(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CreateOrderRequest>,
) -> Result<(StatusCode, Json<Envelope<Value>>), AppError> {
    req.check()?;

    let client_id = req.id_cliente;
    if state.clients.get_client(client_id).await?.is_none() {
        return Err(AppError::NotFoundError(format!(
            "Client {} not found",
            client_id
        )));
    }

    let id = state.orders.create_order(&req.into_new_order()).await?;
    info!("Order {} created for client {}", id, client_id);

    Ok((
        StatusCode::CREATED,
        envelope("Order created", json!({ "id_pedido": id })),
    ))
}

pub async fn list_orders(
    State(state): State<AppState>,
) -> Result<Json<Envelope<Vec<Order>>>, AppError> {
    let orders = state.orders.list_orders().await?;
    Ok(envelope("Orders listed", orders))
}

pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Envelope<Order>>, AppError> {
    let id = parse_id(&id, "idPedido")?;
    let order = state
        .orders
        .get_order(id)
        .await?
        .ok_or_else(|| AppError::NotFoundError(format!("Order {} not found", id)))?;

    Ok(envelope("Order found", order))
}

/// Order row and delivery status change together or not at all
pub async fn update_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateOrderRequest>,
) -> Result<Json<Envelope<OrderUpdate>>, AppError> {
    let id = parse_id(&id, "idPedido")?;
    let patch = req.into_patch()?;
    if patch.is_empty() {
        return Err(AppError::ValidationError(
            "At least one field must be provided".to_string(),
        ));
    }

    let update = state.orders.update_order(id, &patch).await?;
    info!(
        "Order {} updated ({} delivery rows)",
        id, update.delivery_rows
    );

    Ok(envelope("Order updated", update))
}
