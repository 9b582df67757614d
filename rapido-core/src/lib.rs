pub mod models;
pub mod repository;

pub use models::{
    Client, ClientPatch, Delivery, DeliveryQuote, DeliveryRecord, DeliveryStatus, DeliveryType,
    NewClient, NewOrder, Order, OrderPatch, OrderUpdate,
};

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    ValidationError(String),
    #[error("Not found: {0}")]
    NotFoundError(String),
    #[error("Conflict: {0}")]
    ConflictError(String),
    #[error("Transaction rolled back: {0}")]
    TransactionError(String),
    #[error("Internal service error: {0}")]
    InternalError(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
