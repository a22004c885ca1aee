//! # Routes
//!
//! Axum router configuration for the storefront API.

use crate::handlers;
use crate::state::AppState;
use axum::{
    routing::{get, patch, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Create the main application router
///
/// Routes:
/// - Catalog:
///   - GET  /api/v1/products - List active products
///   - GET  /api/v1/products/{product_id} - Get active product by ID
///
/// - Cart (scoped by bearer token):
///   - GET    /api/v1/cart - Current cart
///   - DELETE /api/v1/cart - Empty the cart
///   - POST   /api/v1/cart/items - Add units of a product
///   - PATCH  /api/v1/cart/items/{product_id} - Set a line's quantity
///   - DELETE /api/v1/cart/items/{product_id} - Remove a line
///   - POST   /api/v1/cart/discount - Validate and apply a discount code
///
/// - Orders and payments:
///   - POST  /api/v1/orders - Submit an order
///   - PATCH /api/v1/orders/{order_id}/status - Report order status
///   - GET   /api/v1/payments/{payment_id} - Payment status
///   - POST  /api/v1/payments/{payment_id}/status - Dev gateway hook
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check at root
        .route("/health", get(handlers::health))
        .route("/", get(handlers::health))
        // API v1
        .nest("/api/v1", api_routes())
        // Middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        // State
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    let catalog_routes = Router::new()
        .route("/products", get(handlers::list_products))
        .route("/products/{product_id}", get(handlers::get_product));

    let cart_routes = Router::new()
        .route("/cart", get(handlers::get_cart).delete(handlers::clear_cart))
        .route("/cart/items", post(handlers::add_item))
        .route(
            "/cart/items/{product_id}",
            patch(handlers::update_item).delete(handlers::remove_item),
        )
        .route("/cart/discount", post(handlers::apply_discount));

    let order_routes = Router::new()
        .route("/orders", post(handlers::create_order))
        .route(
            "/orders/{order_id}/status",
            patch(handlers::update_order_status),
        )
        .route("/payments/{payment_id}", get(handlers::get_payment))
        .route(
            "/payments/{payment_id}/status",
            post(handlers::set_payment_status),
        );

    Router::new()
        .merge(catalog_routes)
        .merge(cart_routes)
        .merge(order_routes)
}
