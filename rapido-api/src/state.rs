use std::sync::Arc;

use rapido_core::repository::{ClientRepository, DeliveryRepository, OrderRepository};
use rapido_pricing::{DeliveryPricer, PricingEngine, PricingRules};
use rapido_store::{
    DbClient, MemoryStore, StoreClientRepository, StoreDeliveryRepository, StoreOrderRepository,
};

#[derive(Clone)]
pub struct AppState {
    pub clients: Arc<dyn ClientRepository>,
    pub orders: Arc<dyn OrderRepository>,
    pub deliveries: Arc<dyn DeliveryRepository>,
    pub pricer: Arc<DeliveryPricer>,
}

impl AppState {
    pub fn new(
        clients: Arc<dyn ClientRepository>,
        orders: Arc<dyn OrderRepository>,
        deliveries: Arc<dyn DeliveryRepository>,
        rules: PricingRules,
    ) -> Self {
        let pricer = DeliveryPricer::new(PricingEngine::new(rules), deliveries.clone());
        Self {
            clients,
            orders,
            deliveries,
            pricer: Arc::new(pricer),
        }
    }

    pub fn postgres(db: &DbClient, rules: PricingRules) -> Self {
        Self::new(
            Arc::new(StoreClientRepository::new(db.pool.clone())),
            Arc::new(StoreOrderRepository::new(db.pool.clone())),
            Arc::new(StoreDeliveryRepository::new(db.pool.clone())),
            rules,
        )
    }

    pub fn in_memory(store: Arc<MemoryStore>, rules: PricingRules) -> Self {
        Self::new(store.clone(), store.clone(), store, rules)
    }
}
