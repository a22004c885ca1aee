//! # cart-server
//!
//! Development storefront backing the cart-sync engine.
//!
//! This crate provides:
//! - Axum-based HTTP server
//! - REST endpoints for the cart, orders and payments
//! - An in-memory backend that prices from the catalog and simulates a
//!   payment gateway
//!
//! ## Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/health` | Health check |
//! | GET | `/api/v1/products` | List products |
//! | GET | `/api/v1/cart` | Current cart |
//! | POST | `/api/v1/cart/items` | Add item |
//! | PATCH | `/api/v1/cart/items/{id}` | Set quantity |
//! | DELETE | `/api/v1/cart/items/{id}` | Remove item |
//! | DELETE | `/api/v1/cart` | Clear cart |
//! | POST | `/api/v1/cart/discount` | Apply discount code |
//! | POST | `/api/v1/orders` | Submit order |
//! | PATCH | `/api/v1/orders/{id}/status` | Report order status |
//! | GET | `/api/v1/payments/{id}` | Payment status |
//! | POST | `/api/v1/payments/{id}/status` | Dev gateway hook |

pub mod handlers;
pub mod routes;
pub mod state;
pub mod store;

pub use routes::create_router;
pub use state::{AppConfig, AppState};
