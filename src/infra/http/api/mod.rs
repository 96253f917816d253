pub mod error;
pub mod handlers;
pub mod models;
pub mod state;

pub use state::{ApiState, NotFoundPolicy};

use axum::{
    Router,
    routing::{get, post},
};

pub fn build_api_router(state: ApiState) -> Router {
    Router::new()
        .route("/api/v1/product", post(handlers::create_product))
        .route(
            "/api/v1/product/{city}",
            get(handlers::get_product)
                .put(handlers::update_product)
                .delete(handlers::delete_product),
        )
        .route(
            "/api/v1/product/{city}/readonly",
            get(handlers::get_product_read_only),
        )
        .with_state(state)
}
