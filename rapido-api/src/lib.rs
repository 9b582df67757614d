use axum::{
    http::{header::CONTENT_TYPE, Method},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod clients;
pub mod deliveries;
pub mod envelope;
pub mod error;
pub mod extract;
pub mod orders;
pub mod state;

pub use state::AppState;

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE]);

    Router::new()
        .merge(clients::routes())
        .merge(orders::routes())
        .merge(deliveries::routes())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
