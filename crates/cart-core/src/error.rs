//! # Commerce Error Types
//!
//! Typed error handling for the cart-sync engine.
//! All cart, checkout and payment operations return `Result<T, CommerceError>`.

use thiserror::Error;

/// Broad class of a failure, used to decide how it is surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caught locally before any mutation; never reaches the network.
    Validation,
    /// Network or server trouble; the same request may succeed later.
    Transient,
    /// The remote side refused the request with a user-facing reason.
    Rejection,
}

/// Core error type for all commerce operations
#[derive(Debug, Error)]
pub enum CommerceError {
    /// Configuration errors (missing keys, invalid config)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Quantity outside the allowed 1..=99 range
    #[error("Invalid quantity {quantity} for product {product_id}")]
    InvalidQuantity { product_id: String, quantity: u32 },

    /// Address failed form validation
    #[error("Invalid address: {field} {reason}")]
    InvalidAddress { field: &'static str, reason: String },

    /// Checkout attempted with nothing in the cart
    #[error("Cart is empty")]
    EmptyCart,

    /// Checkout step does not allow the requested action
    #[error("Cannot {action} while at the {step} step")]
    InvalidTransition { step: String, action: String },

    /// An order submission is already in flight
    #[error("An order is already being placed")]
    CheckoutBusy,

    /// Product not found in catalog
    #[error("Product not found: {product_id}")]
    ProductNotFound { product_id: String },

    /// Product is not a line in the cart
    #[error("Item not in cart: {product_id}")]
    ItemNotInCart { product_id: String },

    /// Discount code was reported invalid
    #[error("Invalid discount code {code}: {message}")]
    InvalidDiscount { code: String, message: String },

    /// Payment was declined
    #[error("Payment declined: {reason}")]
    PaymentDeclined { reason: String },

    /// Submitted totals no longer match the server's pricing
    #[error("Order totals changed: {message}")]
    TotalsMismatch { message: String },

    /// Business-rule rejection carrying the remote side's message
    #[error("Request rejected: {message}")]
    Rejected { message: String },

    /// Network/HTTP error communicating with a service
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Remote service answered with a server-side failure
    #[error("Service error [{service}] HTTP {status}: {message}")]
    ServiceError {
        service: String,
        status: u16,
        message: String,
    },

    /// A bounded wait ran out
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Internal error (should not happen)
    #[error("Internal error: {0}")]
    Internal(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl CommerceError {
    /// Which taxonomy bucket this error belongs to
    pub fn kind(&self) -> ErrorKind {
        match self {
            CommerceError::Configuration(_)
            | CommerceError::InvalidRequest(_)
            | CommerceError::InvalidQuantity { .. }
            | CommerceError::InvalidAddress { .. }
            | CommerceError::EmptyCart
            | CommerceError::InvalidTransition { .. }
            | CommerceError::CheckoutBusy => ErrorKind::Validation,
            CommerceError::ProductNotFound { .. }
            | CommerceError::ItemNotInCart { .. }
            | CommerceError::InvalidDiscount { .. }
            | CommerceError::PaymentDeclined { .. }
            | CommerceError::TotalsMismatch { .. }
            | CommerceError::Rejected { .. } => ErrorKind::Rejection,
            CommerceError::NetworkError(_)
            | CommerceError::ServiceError { .. }
            | CommerceError::Timeout(_)
            | CommerceError::Internal(_)
            | CommerceError::Serialization(_) => ErrorKind::Transient,
        }
    }

    /// Returns true if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CommerceError::NetworkError(_)
                | CommerceError::ServiceError { .. }
                | CommerceError::Timeout(_)
        )
    }

    /// Returns the HTTP status code appropriate for this error
    pub fn status_code(&self) -> u16 {
        match self {
            CommerceError::Configuration(_) => 500,
            CommerceError::InvalidRequest(_) => 400,
            CommerceError::InvalidQuantity { .. } => 400,
            CommerceError::InvalidAddress { .. } => 400,
            CommerceError::EmptyCart => 400,
            CommerceError::InvalidTransition { .. } => 409,
            CommerceError::CheckoutBusy => 409,
            CommerceError::ProductNotFound { .. } => 404,
            CommerceError::ItemNotInCart { .. } => 404,
            CommerceError::InvalidDiscount { .. } => 422,
            CommerceError::PaymentDeclined { .. } => 402,
            CommerceError::TotalsMismatch { .. } => 409,
            CommerceError::Rejected { .. } => 422,
            CommerceError::NetworkError(_) => 503,
            CommerceError::ServiceError { .. } => 502,
            CommerceError::Timeout(_) => 504,
            CommerceError::Internal(_) => 500,
            CommerceError::Serialization(_) => 500,
        }
    }

    /// Message suitable for a checkout error banner.
    ///
    /// Rejections carry the remote side's own wording; transient failures
    /// get a generic retry hint so transport details never reach the user.
    pub fn user_message(&self) -> String {
        match self {
            CommerceError::InvalidDiscount { message, .. }
            | CommerceError::TotalsMismatch { message }
            | CommerceError::Rejected { message } => message.clone(),
            CommerceError::PaymentDeclined { reason } => reason.clone(),
            CommerceError::NetworkError(_) | CommerceError::Timeout(_) => {
                "We couldn't reach the store. Check your connection and try again.".to_string()
            }
            CommerceError::ServiceError { .. }
            | CommerceError::Internal(_)
            | CommerceError::Serialization(_)
            | CommerceError::Configuration(_) => {
                "Something went wrong while placing your order. Please try again.".to_string()
            }
            other => other.to_string(),
        }
    }
}

/// Result type alias for commerce operations
pub type CommerceResult<T> = Result<T, CommerceError>;
