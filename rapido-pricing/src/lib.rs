pub mod engine;
pub mod service;

pub use engine::{PricingEngine, PricingRules};
pub use service::{DeliveryPricer, PricedDelivery};
