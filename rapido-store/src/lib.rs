pub mod app_config;
pub mod database;
pub mod client_repo;
pub mod order_repo;
pub mod delivery_repo;
pub mod memory;

pub use database::DbClient;
pub use client_repo::StoreClientRepository;
pub use order_repo::StoreOrderRepository;
pub use delivery_repo::StoreDeliveryRepository;
pub use memory::MemoryStore;
