use async_trait::async_trait;
use rapido_core::repository::{DeliveryRepository, Quoter};
use rapido_core::{CoreError, CoreResult, Delivery, DeliveryRecord, DeliveryStatus, Order};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use std::str::FromStr;
use tracing::warn;

use crate::database::{map_db_error, tx_error, Statement};
use crate::order_repo::{OrderRow, SELECT_ORDER};

pub struct StoreDeliveryRepository {
    pool: PgPool,
}

impl StoreDeliveryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct DeliveryRow {
    id_entrega: i32,
    id_pedido_fk: i32,
    valor_distancia: Decimal,
    valor_peso: Decimal,
    acrescimo: Decimal,
    desconto: Decimal,
    taxa_extra: Decimal,
    valor_entrega: Decimal,
    status_entrega: String,
}

impl TryFrom<DeliveryRow> for Delivery {
    type Error = CoreError;

    fn try_from(row: DeliveryRow) -> Result<Self, Self::Error> {
        let status = DeliveryStatus::from_str(&row.status_entrega).map_err(|_| {
            CoreError::InternalError(format!(
                "delivery {} has unknown status '{}'",
                row.id_entrega, row.status_entrega
            ))
        })?;

        Ok(Delivery {
            id: row.id_entrega,
            order_id: row.id_pedido_fk,
            distance_charge: row.valor_distancia,
            weight_charge: row.valor_peso,
            surcharge: row.acrescimo,
            discount: row.desconto,
            extra_fee: row.taxa_extra,
            final_charge: row.valor_entrega,
            status,
        })
    }
}

const SELECT_DELIVERY: &str = "SELECT id_entrega, id_pedido_fk, valor_distancia, valor_peso, acrescimo, desconto, taxa_extra, valor_entrega, status_entrega FROM entregas";

async fn write_delivery(
    conn: &mut PgConnection,
    order_id: i32,
    status: DeliveryStatus,
    quote: &Quoter<'_>,
) -> CoreResult<DeliveryRecord> {
    // Quote from the row as locked
    let row = sqlx::query_as::<_, OrderRow>(&format!("{} WHERE id_pedido = $1 FOR UPDATE", SELECT_ORDER))
        .bind(order_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(tx_error)?;
    let order = Order::try_from(
        row.ok_or_else(|| CoreError::NotFoundError(format!("order {} does not exist", order_id)))?,
    )?;
    let quote = quote(&order);

    let existing = sqlx::query_scalar::<_, i32>("SELECT id_entrega FROM entregas WHERE id_pedido_fk = $1 FOR UPDATE")
        .bind(order_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(tx_error)?;

    match existing {
        Some(delivery_id) => {
            let result = sqlx::query(
                r#"
                UPDATE entregas
                SET valor_distancia = $1, valor_peso = $2, acrescimo = $3, desconto = $4,
                    taxa_extra = $5, valor_entrega = $6, status_entrega = $7
                WHERE id_entrega = $8
                "#,
            )
            .bind(quote.distance_charge)
            .bind(quote.weight_charge)
            .bind(quote.surcharge)
            .bind(quote.discount)
            .bind(quote.extra_fee)
            .bind(quote.final_charge)
            .bind(status.as_str())
            .bind(delivery_id)
            .execute(&mut *conn)
            .await
            .map_err(tx_error)?;

            Ok(DeliveryRecord {
                delivery_id,
                created: false,
                rows_affected: result.rows_affected(),
                quote,
            })
        }
        None => {
            let delivery_id = sqlx::query_scalar::<_, i32>(
                r#"
                INSERT INTO entregas (id_pedido_fk, valor_distancia, valor_peso, acrescimo, desconto, taxa_extra, valor_entrega, status_entrega)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                RETURNING id_entrega
                "#,
            )
            .bind(order_id)
            .bind(quote.distance_charge)
            .bind(quote.weight_charge)
            .bind(quote.surcharge)
            .bind(quote.discount)
            .bind(quote.extra_fee)
            .bind(quote.final_charge)
            .bind(status.as_str())
            .fetch_one(&mut *conn)
            .await
            .map_err(tx_error)?;

            Ok(DeliveryRecord {
                delivery_id,
                created: true,
                rows_affected: 1,
                quote,
            })
        }
    }
}

#[async_trait]
impl DeliveryRepository for StoreDeliveryRepository {
    async fn list_deliveries(&self) -> CoreResult<Vec<Delivery>> {
        let rows = sqlx::query_as::<_, DeliveryRow>(&format!("{} ORDER BY id_entrega", SELECT_DELIVERY))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_db_error(e, Statement::Select, "delivery"))?;

        rows.into_iter().map(Delivery::try_from).collect()
    }

    async fn get_delivery_for_order(&self, order_id: i32) -> CoreResult<Option<Delivery>> {
        let row = sqlx::query_as::<_, DeliveryRow>(&format!("{} WHERE id_pedido_fk = $1", SELECT_DELIVERY))
            .bind(order_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_db_error(e, Statement::Select, "delivery"))?;

        row.map(Delivery::try_from).transpose()
    }

    async fn record_delivery(
        &self,
        order_id: i32,
        status: DeliveryStatus,
        quote: &Quoter<'_>,
    ) -> CoreResult<DeliveryRecord> {
        let mut tx = self.pool.begin().await.map_err(tx_error)?;

        match write_delivery(&mut tx, order_id, status, quote).await {
            Ok(record) => {
                tx.commit().await.map_err(tx_error)?;
                Ok(record)
            }
            Err(e) => {
                if let Err(rollback) = tx.rollback().await {
                    warn!("Rollback of delivery for order {} failed: {}", order_id, rollback);
                }
                Err(e)
            }
        }
    }
}
