//! # cart-engine
//!
//! Stateful side of cart-sync:
//! - `CartStore` keeps the local cart in step with the remote cart service
//! - `CheckoutOrchestrator` walks shipping → payment → review → order
//! - `PaymentTracker` polls a submitted payment until it settles
//!
//! ## Example
//!
//! ```rust,ignore
//! use cart_engine::{CartStore, CheckoutOrchestrator, TrackerConfig};
//!
//! let cart = Arc::new(CartStore::new(client.clone(), Currency::USD));
//! cart.add_item(&OperationId::new(), &product, 2).await?;
//!
//! let checkout = CheckoutOrchestrator::start(cart.clone(), client.clone())?;
//! checkout.submit_shipping(address, BillingAddress::SameAsShipping)?;
//! checkout.submit_payment(details)?;
//! let receipt = checkout.place_order(&OperationId::new()).await?;
//!
//! if let Some(mut tracker) = checkout.track_payment(client, TrackerConfig::default()) {
//!     let state = tracker.finished().await;
//! }
//! ```

pub mod checkout;
pub mod store;
pub mod tracker;

#[cfg(test)]
mod test_support;

pub use checkout::CheckoutOrchestrator;
pub use store::CartStore;
pub use tracker::{PaymentTracker, TrackerConfig, DEFAULT_POLL_INTERVAL};
