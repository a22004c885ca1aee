//! # Order Types
//!
//! The order submission payload built at the review step and what the
//! order service hands back.

use crate::cart::{Cart, CartItem};
use crate::checkout::{Address, PaymentSummary};
use crate::pricing::PriceBreakdown;
use crate::product::Currency;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Payload submitted to the order service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    /// Snapshot of the cart lines at submission time
    pub items: Vec<CartItem>,

    /// Discount code carried by the cart, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount_code: Option<String>,

    pub shipping_address: Address,

    pub billing_address: Address,

    /// Redacted payment descriptor
    pub payment: PaymentSummary,

    /// Totals as shown to the shopper
    pub totals: PriceBreakdown,

    pub currency: Currency,

    /// Idempotency key (prevents duplicate orders on retry)
    pub idempotency_key: String,

    pub created_at: DateTime<Utc>,
}

impl OrderRequest {
    /// Build a request from a cart snapshot
    pub fn from_cart(
        cart: &Cart,
        shipping_address: Address,
        billing_address: Address,
        payment: PaymentSummary,
        idempotency_key: impl Into<String>,
    ) -> Self {
        Self {
            items: cart.items.clone(),
            discount_code: cart.discount.as_ref().map(|d| d.code.clone()),
            shipping_address,
            billing_address,
            payment,
            totals: PriceBreakdown::for_cart(cart),
            currency: cart.currency,
            idempotency_key: idempotency_key.into(),
            created_at: Utc::now(),
        }
    }

    /// Get item count
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|i| i.quantity).sum()
    }
}

/// Result of a successful order submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderReceipt {
    /// Order ID assigned by the order service
    pub id: String,

    /// Shipment tracking reference, when already known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracking_id: Option<String>,

    /// Payment reference to hand to the payment tracker
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<String>,
}

/// Order status values reported back to the order service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Created, payment not yet settled
    Pending,
    /// Payment succeeded
    Paid,
    /// Payment ended in a non-success terminal state
    PaymentFailed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::PaymentFailed => "payment_failed",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
