use async_trait::async_trait;
use rapido_core::repository::{ClientRepository, DeliveryRepository, OrderRepository, Quoter};
use rapido_core::{
    Client, ClientPatch, CoreError, CoreResult, Delivery, DeliveryRecord, DeliveryStatus,
    NewClient, NewOrder, Order, OrderPatch, OrderUpdate,
};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

#[derive(Debug, Clone, Default)]
struct Tables {
    clients: BTreeMap<i32, Client>,
    orders: BTreeMap<i32, Order>,
    deliveries: BTreeMap<i32, Delivery>,
    client_seq: i32,
    order_seq: i32,
    delivery_seq: i32,
}

fn next_id(seq: &mut i32) -> i32 {
    *seq += 1;
    *seq
}

/// In-process store with the same contracts as the Postgres repositories.
///
/// Multi-row writes run against a copy of the tables which replaces the live
/// state only once every step has succeeded.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    fail_delivery_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every subsequent write to deliveries until switched off again.
    pub fn fail_delivery_writes(&self, fail: bool) {
        self.fail_delivery_writes.store(fail, Ordering::SeqCst);
    }

    async fn read<T>(&self, f: impl FnOnce(&Tables) -> T) -> T {
        let tables = self.tables.lock().await;
        f(&tables)
    }

    async fn transaction<T>(&self, f: impl FnOnce(&mut Tables) -> CoreResult<T>) -> CoreResult<T> {
        let mut live = self.tables.lock().await;
        let mut staged = live.clone();
        let out = f(&mut staged)?;
        *live = staged;
        Ok(out)
    }

    fn check_delivery_write(&self) -> CoreResult<()> {
        if self.fail_delivery_writes.load(Ordering::SeqCst) {
            return Err(CoreError::TransactionError("write to entregas rejected".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ClientRepository for MemoryStore {
    async fn create_client(&self, client: &NewClient) -> CoreResult<i32> {
        self.transaction(|t| {
            if t.clients.values().any(|c| c.tax_id == client.tax_id) {
                return Err(CoreError::ConflictError(format!(
                    "client with cpf {} already exists",
                    client.tax_id
                )));
            }
            let id = next_id(&mut t.client_seq);
            t.clients.insert(id, client.clone().into_client(id));
            Ok(id)
        })
        .await
    }

    async fn find_client_by_tax_id(&self, tax_id: &str) -> CoreResult<Option<Client>> {
        Ok(self
            .read(|t| t.clients.values().find(|c| c.tax_id == tax_id).cloned())
            .await)
    }

    async fn list_clients(&self) -> CoreResult<Vec<Client>> {
        Ok(self.read(|t| t.clients.values().cloned().collect()).await)
    }

    async fn get_client(&self, id: i32) -> CoreResult<Option<Client>> {
        Ok(self.read(|t| t.clients.get(&id).cloned()).await)
    }

    async fn update_client(&self, id: i32, patch: &ClientPatch) -> CoreResult<u64> {
        self.transaction(|t| {
            let client = t
                .clients
                .get_mut(&id)
                .ok_or_else(|| CoreError::NotFoundError(format!("client {} does not exist", id)))?;
            patch.apply(client);
            Ok(1)
        })
        .await
    }

    async fn delete_client(&self, id: i32) -> CoreResult<u64> {
        self.transaction(|t| {
            if !t.clients.contains_key(&id) {
                return Err(CoreError::NotFoundError(format!("client {} does not exist", id)));
            }
            if t.orders.values().any(|o| o.client_id == id) {
                return Err(CoreError::ConflictError(format!("client {} is still referenced", id)));
            }
            t.clients.remove(&id);
            Ok(1)
        })
        .await
    }
}

#[async_trait]
impl OrderRepository for MemoryStore {
    async fn create_order(&self, order: &NewOrder) -> CoreResult<i32> {
        self.transaction(|t| {
            if !t.clients.contains_key(&order.client_id) {
                return Err(CoreError::NotFoundError(format!(
                    "order for client {} references a missing record",
                    order.client_id
                )));
            }
            let id = next_id(&mut t.order_seq);
            t.orders.insert(id, order.clone().into_order(id));
            Ok(id)
        })
        .await
    }

    async fn get_order(&self, id: i32) -> CoreResult<Option<Order>> {
        Ok(self.read(|t| t.orders.get(&id).cloned()).await)
    }

    async fn list_orders(&self) -> CoreResult<Vec<Order>> {
        Ok(self.read(|t| t.orders.values().cloned().collect()).await)
    }

    async fn update_order(&self, id: i32, patch: &OrderPatch) -> CoreResult<OrderUpdate> {
        self.transaction(|t| {
            let order = t
                .orders
                .get_mut(&id)
                .ok_or_else(|| CoreError::NotFoundError(format!("order {} does not exist", id)))?;
            patch.apply(order);

            let mut delivery_rows = 0;
            if let Some(status) = patch.status {
                self.check_delivery_write()?;
                for delivery in t.deliveries.values_mut().filter(|d| d.order_id == id) {
                    delivery.status = status;
                    delivery_rows += 1;
                }
            }

            Ok(OrderUpdate {
                order_rows: 1,
                delivery_rows,
            })
        })
        .await
    }
}

#[async_trait]
impl DeliveryRepository for MemoryStore {
    async fn list_deliveries(&self) -> CoreResult<Vec<Delivery>> {
        Ok(self.read(|t| t.deliveries.values().cloned().collect()).await)
    }

    async fn get_delivery_for_order(&self, order_id: i32) -> CoreResult<Option<Delivery>> {
        Ok(self
            .read(|t| t.deliveries.values().find(|d| d.order_id == order_id).cloned())
            .await)
    }

    async fn record_delivery(
        &self,
        order_id: i32,
        status: DeliveryStatus,
        quote: &Quoter<'_>,
    ) -> CoreResult<DeliveryRecord> {
        self.transaction(|t| {
            let order = t
                .orders
                .get(&order_id)
                .ok_or_else(|| CoreError::NotFoundError(format!("order {} does not exist", order_id)))?;
            let quote = quote(order);
            self.check_delivery_write()?;

            let existing = t
                .deliveries
                .values()
                .find(|d| d.order_id == order_id)
                .map(|d| d.id);

            let (delivery_id, created) = match existing {
                Some(id) => (id, false),
                None => (next_id(&mut t.delivery_seq), true),
            };
            t.deliveries
                .insert(delivery_id, quote.clone().into_delivery(delivery_id, order_id, status));

            Ok(DeliveryRecord {
                delivery_id,
                created,
                rows_affected: 1,
                quote,
            })
        })
        .await
    }
}
