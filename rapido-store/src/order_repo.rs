use async_trait::async_trait;
use chrono::NaiveDate;
use rapido_core::repository::OrderRepository;
use rapido_core::{CoreError, CoreResult, DeliveryType, NewOrder, Order, OrderPatch, OrderUpdate};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use std::str::FromStr;
use tracing::warn;

use crate::database::{map_db_error, tx_error, Statement};

pub struct StoreOrderRepository {
    pool: PgPool,
}

impl StoreOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct OrderRow {
    id_pedido: i32,
    id_cliente_fk: i32,
    data: NaiveDate,
    tipo_entrega: String,
    distancia: Decimal,
    peso_carga: Decimal,
    valor_km: Decimal,
    valor_kg: Decimal,
}

impl TryFrom<OrderRow> for Order {
    type Error = CoreError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let delivery_type = DeliveryType::from_str(&row.tipo_entrega).map_err(|_| {
            CoreError::InternalError(format!(
                "order {} has unknown delivery type '{}'",
                row.id_pedido, row.tipo_entrega
            ))
        })?;

        Ok(Order {
            id: row.id_pedido,
            client_id: row.id_cliente_fk,
            date: row.data,
            delivery_type,
            distance: row.distancia,
            weight: row.peso_carga,
            rate_per_km: row.valor_km,
            rate_per_kg: row.valor_kg,
        })
    }
}

pub(crate) const SELECT_ORDER: &str =
    "SELECT id_pedido, id_cliente_fk, data, tipo_entrega, distancia, peso_carga, valor_km, valor_kg FROM pedidos";

/// Order row first, then the delivery status, on one connection
async fn write_order_patch(conn: &mut PgConnection, id: i32, patch: &OrderPatch) -> CoreResult<OrderUpdate> {
    let row = sqlx::query_as::<_, OrderRow>(&format!("{} WHERE id_pedido = $1 FOR UPDATE", SELECT_ORDER))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(tx_error)?;

    let mut order = Order::try_from(
        row.ok_or_else(|| CoreError::NotFoundError(format!("order {} does not exist", id)))?,
    )?;
    patch.apply(&mut order);

    let order_rows = sqlx::query(
        "UPDATE pedidos SET distancia = $1, peso_carga = $2, tipo_entrega = $3 WHERE id_pedido = $4",
    )
    .bind(order.distance)
    .bind(order.weight)
    .bind(order.delivery_type.as_str())
    .bind(id)
    .execute(&mut *conn)
    .await
    .map_err(tx_error)?
    .rows_affected();

    let delivery_rows = match patch.status {
        Some(status) => sqlx::query("UPDATE entregas SET status_entrega = $1 WHERE id_pedido_fk = $2")
            .bind(status.as_str())
            .bind(id)
            .execute(&mut *conn)
            .await
            .map_err(tx_error)?
            .rows_affected(),
        None => 0,
    };

    Ok(OrderUpdate {
        order_rows,
        delivery_rows,
    })
}

#[async_trait]
impl OrderRepository for StoreOrderRepository {
    async fn create_order(&self, order: &NewOrder) -> CoreResult<i32> {
        sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO pedidos (id_cliente_fk, data, tipo_entrega, distancia, peso_carga, valor_km, valor_kg)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id_pedido
            "#,
        )
        .bind(order.client_id)
        .bind(order.date)
        .bind(order.delivery_type.as_str())
        .bind(order.distance)
        .bind(order.weight)
        .bind(order.rate_per_km)
        .bind(order.rate_per_kg)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_db_error(e, Statement::Insert, &format!("order for client {}", order.client_id)))
    }

    async fn get_order(&self, id: i32) -> CoreResult<Option<Order>> {
        let row = sqlx::query_as::<_, OrderRow>(&format!("{} WHERE id_pedido = $1", SELECT_ORDER))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_db_error(e, Statement::Select, "order"))?;

        row.map(Order::try_from).transpose()
    }

    async fn list_orders(&self) -> CoreResult<Vec<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!("{} ORDER BY id_pedido", SELECT_ORDER))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_db_error(e, Statement::Select, "order"))?;

        rows.into_iter().map(Order::try_from).collect()
    }

    async fn update_order(&self, id: i32, patch: &OrderPatch) -> CoreResult<OrderUpdate> {
        let mut tx = self.pool.begin().await.map_err(tx_error)?;

        match write_order_patch(&mut tx, id, patch).await {
            Ok(update) => {
                tx.commit().await.map_err(tx_error)?;
                Ok(update)
            }
            Err(e) => {
                if let Err(rollback) = tx.rollback().await {
                    warn!("Rollback of order {} update failed: {}", id, rollback);
                }
                Err(e)
            }
        }
    }
}
