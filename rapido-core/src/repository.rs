use async_trait::async_trait;

use crate::models::{
    Client, ClientPatch, Delivery, DeliveryQuote, DeliveryRecord, DeliveryStatus, NewClient,
    NewOrder, Order, OrderPatch, OrderUpdate,
};
use crate::CoreResult;

/// Prices an order. Called by the delivery repository while the order row is locked.
pub type Quoter<'a> = dyn Fn(&Order) -> DeliveryQuote + Send + Sync + 'a;

/// Repository trait for client records
#[async_trait]
pub trait ClientRepository: Send + Sync {
    async fn create_client(&self, client: &NewClient) -> CoreResult<i32>;

    async fn find_client_by_tax_id(&self, tax_id: &str) -> CoreResult<Option<Client>>;

    async fn list_clients(&self) -> CoreResult<Vec<Client>>;

    async fn get_client(&self, id: i32) -> CoreResult<Option<Client>>;

    /// Merges `patch` into the stored client. Fails with `NotFoundError` for an unknown id.
    async fn update_client(&self, id: i32, patch: &ClientPatch) -> CoreResult<u64>;

    /// Fails with `NotFoundError` for an unknown id and `ConflictError` while
    /// orders still reference the client.
    async fn delete_client(&self, id: i32) -> CoreResult<u64>;
}

/// Repository trait for order records
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Fails with `NotFoundError` when the referenced client does not exist.
    async fn create_order(&self, order: &NewOrder) -> CoreResult<i32>;

    async fn get_order(&self, id: i32) -> CoreResult<Option<Order>>;

    async fn list_orders(&self) -> CoreResult<Vec<Order>>;

    /// Applies `patch` to the order row and, when a status is given, to the
    /// linked delivery row. Both writes commit together or not at all.
    async fn update_order(&self, id: i32, patch: &OrderPatch) -> CoreResult<OrderUpdate>;
}

/// Repository trait for delivery records
#[async_trait]
pub trait DeliveryRepository: Send + Sync {
    async fn list_deliveries(&self) -> CoreResult<Vec<Delivery>>;

    async fn get_delivery_for_order(&self, order_id: i32) -> CoreResult<Option<Delivery>>;

    /// Locks the order, prices it with `quote` and inserts its delivery on
    /// first pricing or overwrites it on repricing, inside one transaction.
    /// Fails with `NotFoundError` when the order does not exist.
    async fn record_delivery(
        &self,
        order_id: i32,
        status: DeliveryStatus,
        quote: &Quoter<'_>,
    ) -> CoreResult<DeliveryRecord>;
}
