//! # cart-client
//!
//! HTTP client for the storefront API used by cart-sync.
//!
//! [`HttpCommerceClient`] implements all three collaborator traits from
//! `cart-core`, so one client can back the cart store, the checkout
//! orchestrator and the payment tracker:
//!
//! ```rust,ignore
//! use cart_client::HttpCommerceClient;
//! use cart_core::{Currency, SharedCartService, SharedOrderService, SharedPaymentService};
//! use cart_engine::CartStore;
//!
//! // Reads STOREFRONT_API_URL / STOREFRONT_API_TOKEN from the environment
//! let client = Arc::new(HttpCommerceClient::from_env()?);
//!
//! let store = Arc::new(CartStore::new(client.clone(), Currency::USD));
//! store.sync().await?;
//! ```
//!
//! Every mutating call carries the operation id as an `Idempotency-Key`
//! header; the bearer token selects the shopper's cart.

pub mod client;
pub mod config;

// Re-exports
pub use client::HttpCommerceClient;
pub use config::ClientConfig;
