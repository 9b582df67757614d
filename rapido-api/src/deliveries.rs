use axum::{extract::State, routing::get, Json, Router};
use rapido_core::{Delivery, DeliveryStatus};
use rapido_pricing::PricedDelivery;
use serde::Deserialize;

use crate::envelope::{envelope, Envelope};
use crate::error::AppError;
use crate::extract::{deserialize_id, ApiJson};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/entregas", get(list_deliveries).post(price_delivery))
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PriceDeliveryRequest {
    #[serde(deserialize_with = "deserialize_id")]
    pub id_pedido: i32,
    pub status: DeliveryStatus,
}

/// Prices the order and creates or overwrites its delivery
pub async fn price_delivery(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<PriceDeliveryRequest>,
) -> Result<Json<Envelope<PricedDelivery>>, AppError> {
    let priced = state.pricer.price(req.id_pedido, req.status).await?;
    Ok(envelope("Delivery priced", priced))
}

pub async fn list_deliveries(
    State(state): State<AppState>,
) -> Result<Json<Envelope<Vec<Delivery>>>, AppError> {
    let deliveries = state.deliveries.list_deliveries().await?;
    Ok(envelope("Deliveries listed", deliveries))
}
