use std::sync::Arc;

use rapido_core::repository::DeliveryRepository;
use rapido_core::{CoreResult, DeliveryQuote, DeliveryStatus, Order};
use serde::Serialize;
use tracing::{debug, info};

use crate::engine::PricingEngine;

/// Result of pricing an order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricedDelivery {
    pub order_id: i32,
    pub delivery_id: i32,
    pub created: bool,
    pub status: DeliveryStatus,
    pub breakdown: DeliveryQuote,
    pub rows_affected: u64,
}

/// Prices orders and persists their deliveries
pub struct DeliveryPricer {
    engine: PricingEngine,
    deliveries: Arc<dyn DeliveryRepository>,
}

impl DeliveryPricer {
    pub fn new(engine: PricingEngine, deliveries: Arc<dyn DeliveryRepository>) -> Self {
        Self { engine, deliveries }
    }

    /// Price `order_id` and store the breakdown with `status`.
    ///
    /// The order is quoted under the repository's row lock, so a concurrent
    /// order update cannot leave a breakdown built from stale fields.
    /// Repricing overwrites the order's existing delivery.
    pub async fn price(&self, order_id: i32, status: DeliveryStatus) -> CoreResult<PricedDelivery> {
        let engine = &self.engine;
        let record = self
            .deliveries
            .record_delivery(order_id, status, &|order: &Order| engine.quote(order))
            .await?;

        let quote = &record.quote;
        debug!(
            order_id,
            base = %quote.base,
            surcharge = %quote.surcharge,
            extra_fee = %quote.extra_fee,
            discount = %quote.discount,
            final_charge = %quote.final_charge,
            "Delivery quoted"
        );
        info!(
            "Delivery {} for order {} {} with status {}",
            record.delivery_id,
            order_id,
            if record.created { "created" } else { "repriced" },
            status
        );

        Ok(PricedDelivery {
            order_id,
            delivery_id: record.delivery_id,
            created: record.created,
            status,
            breakdown: record.quote,
            rows_affected: record.rows_affected,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use rapido_core::repository::Quoter;
    use rapido_core::{CoreError, Delivery, DeliveryRecord, DeliveryType, NewOrder};
    use rust_decimal_macros::dec;
    use std::sync::Mutex;

    /// Holds at most one order and its delivery
    #[derive(Default)]
    struct FakeDeliveries {
        order: Mutex<Option<Order>>,
        rows: Mutex<Vec<Delivery>>,
    }

    impl FakeDeliveries {
        fn with_order(order: Order) -> Self {
            Self {
                order: Mutex::new(Some(order)),
                rows: Mutex::default(),
            }
        }
    }

    #[async_trait]
    impl DeliveryRepository for FakeDeliveries {
        async fn list_deliveries(&self) -> CoreResult<Vec<Delivery>> {
            Ok(self.rows.lock().unwrap().clone())
        }

        async fn get_delivery_for_order(&self, order_id: i32) -> CoreResult<Option<Delivery>> {
            Ok(self.rows.lock().unwrap().iter().find(|d| d.order_id == order_id).cloned())
        }

        async fn record_delivery(
            &self,
            order_id: i32,
            status: DeliveryStatus,
            quote: &Quoter<'_>,
        ) -> CoreResult<DeliveryRecord> {
            let order = self.order.lock().unwrap();
            let order = order
                .as_ref()
                .filter(|o| o.id == order_id)
                .ok_or_else(|| CoreError::NotFoundError(format!("order {} does not exist", order_id)))?;
            let quote = quote(order);

            let mut rows = self.rows.lock().unwrap();
            if let Some(existing) = rows.iter_mut().find(|d| d.order_id == order_id) {
                *existing = quote.clone().into_delivery(existing.id, order_id, status);
                return Ok(DeliveryRecord { delivery_id: existing.id, created: false, rows_affected: 1, quote });
            }
            let id = rows.len() as i32 + 1;
            rows.push(quote.clone().into_delivery(id, order_id, status));
            Ok(DeliveryRecord { delivery_id: id, created: true, rows_affected: 1, quote })
        }
    }

    fn pricer(deliveries: Arc<FakeDeliveries>) -> DeliveryPricer {
        DeliveryPricer::new(PricingEngine::default(), deliveries)
    }

    fn heavy_order() -> Order {
        NewOrder {
            client_id: 1,
            date: NaiveDate::from_ymd_opt(2025, 4, 18).unwrap(),
            delivery_type: DeliveryType::Normal,
            distance: dec!(50),
            weight: dec!(60),
            rate_per_km: dec!(5),
            rate_per_kg: dec!(4),
        }
        .into_order(9)
    }

    #[tokio::test]
    async fn test_price_creates_then_reprices() {
        let deliveries = Arc::new(FakeDeliveries::with_order(heavy_order()));
        let pricer = pricer(deliveries.clone());

        let first = pricer.price(9, DeliveryStatus::Calculated).await.unwrap();
        assert!(first.created);
        assert_eq!(first.breakdown.final_charge, dec!(454.5));

        let second = pricer.price(9, DeliveryStatus::InTransit).await.unwrap();
        assert!(!second.created);
        assert_eq!(second.delivery_id, first.delivery_id);
        assert_eq!(second.breakdown, first.breakdown);

        let stored = deliveries.list_deliveries().await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].status, DeliveryStatus::InTransit);
        assert_eq!(stored[0].discount, dec!(50.5));
    }

    #[tokio::test]
    async fn test_price_uses_order_as_stored_at_write_time() {
        let deliveries = Arc::new(FakeDeliveries::with_order(heavy_order()));
        let pricer = pricer(deliveries.clone());
        pricer.price(9, DeliveryStatus::Calculated).await.unwrap();

        // Order edited between two pricings
        if let Some(order) = deliveries.order.lock().unwrap().as_mut() {
            order.weight = dec!(10);
        }

        let repriced = pricer.price(9, DeliveryStatus::Calculated).await.unwrap();
        // 50 * 5 + 10 * 4, no heavy fee, no discount
        assert_eq!(repriced.breakdown.final_charge, dec!(290));
        assert_eq!(deliveries.list_deliveries().await.unwrap()[0].final_charge, dec!(290));
    }

    #[tokio::test]
    async fn test_price_unknown_order() {
        let deliveries = Arc::new(FakeDeliveries::default());
        let pricer = pricer(deliveries.clone());

        let err = pricer.price(42, DeliveryStatus::Calculated).await.unwrap_err();
        assert!(matches!(err, CoreError::NotFoundError(_)));
        assert!(deliveries.list_deliveries().await.unwrap().is_empty());
    }
}
