//! # cart-core
//!
//! Core types and traits for the cart-sync checkout engine.
//!
//! This crate provides:
//! - `Cart`, `CartItem` and `Discount` for the local cart
//! - `PriceBreakdown`, the pure pricing engine
//! - `CheckoutSession`, `Address` and `PaymentDetails` for the checkout flow
//! - `OrderRequest` / `OrderReceipt` for order submission
//! - `PaymentStatus` and `PaymentTrackingState` for payment tracking
//! - `CartService`, `OrderService` and `PaymentService` collaborator traits
//! - `CommerceError` for typed error handling
//!
//! ## Example
//!
//! ```rust
//! use cart_core::{Cart, Currency, Price, PriceBreakdown, Product};
//!
//! let mut cart = Cart::new(Currency::USD);
//! cart.add(&Product::new("x", "Widget", Price::new(60.0, Currency::USD)), 2);
//!
//! let totals = PriceBreakdown::for_cart(&cart);
//! assert_eq!(totals.shipping_fee.amount, 0);
//! assert_eq!(totals.total.display(), "$132.00");
//! ```

pub mod cart;
pub mod checkout;
pub mod error;
pub mod order;
pub mod payment;
pub mod pricing;
pub mod product;
pub mod service;

// Re-exports for convenience
pub use cart::{is_valid_quantity, Cart, CartItem, Discount, DiscountKind, MAX_QUANTITY, MIN_QUANTITY};
pub use checkout::{
    Address, BillingAddress, CardDetails, CheckoutSession, CheckoutStep, PaymentDetails,
    PaymentMethod, PaymentSummary,
};
pub use error::{CommerceError, CommerceResult, ErrorKind};
pub use order::{OrderReceipt, OrderRequest, OrderStatus};
pub use payment::{PaymentStatus, PaymentTrackingState, PaymentVerification};
pub use pricing::PriceBreakdown;
pub use product::{Currency, Price, Product, ProductCatalog};
pub use service::{
    CartService, DiscountValidation, OperationId, OrderService, PaymentService,
    SharedCartService, SharedOrderService, SharedPaymentService,
};
