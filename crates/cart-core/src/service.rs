//! # Remote Service Traits
//!
//! The narrow interfaces the engine consumes. Each remote collaborator is a
//! trait object so the HTTP client, the in-memory backend and test doubles
//! can be swapped without touching the engine.
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌────────────────┐
//! │ CartService  │   │ OrderService │   │ PaymentService │
//! │  get/add/... │   │ create_order │   │ verify_payment │
//! └──────┬───────┘   └──────┬───────┘   └───────┬────────┘
//!        │                  │                   │
//!    CartStore     CheckoutOrchestrator   PaymentTracker
//! ```

use crate::cart::{Cart, Discount, DiscountKind};
use crate::error::CommerceResult;
use crate::order::{OrderReceipt, OrderRequest, OrderStatus};
use crate::payment::PaymentVerification;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Idempotency and correlation key attached to a remote mutation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperationId(String);

impl OperationId {
    /// Generate a fresh random id
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for OperationId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for OperationId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for OperationId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for OperationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Discount service verdict on a code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountValidation {
    pub valid: bool,

    #[serde(default)]
    pub kind: DiscountKind,

    /// Minor units for fixed amounts, whole percent for percentages
    #[serde(default)]
    pub amount: i64,

    /// Reason shown to the shopper when the code is rejected
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl DiscountValidation {
    pub fn accepted(kind: DiscountKind, amount: i64) -> Self {
        Self {
            valid: true,
            kind,
            amount,
            message: None,
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            kind: DiscountKind::default(),
            amount: 0,
            message: Some(message.into()),
        }
    }

    /// The discount to store, if the code was accepted
    pub fn into_discount(self, code: impl Into<String>) -> Option<Discount> {
        self.valid.then(|| Discount {
            code: code.into(),
            kind: self.kind,
            value: self.amount,
        })
    }
}

/// Remote cart service. The server is authoritative for price and stock.
#[async_trait]
pub trait CartService: Send + Sync {
    /// Fetch the server's view of the cart
    async fn get_cart(&self) -> CommerceResult<Cart>;

    /// Add `quantity` units of a product; returns the updated cart
    async fn add_item(
        &self,
        op: &OperationId,
        product_id: &str,
        quantity: u32,
    ) -> CommerceResult<Cart>;

    /// Set a line's quantity; returns the updated cart
    async fn update_item(
        &self,
        op: &OperationId,
        product_id: &str,
        quantity: u32,
    ) -> CommerceResult<Cart>;

    /// Remove a line; returns the updated cart
    async fn remove_item(&self, op: &OperationId, product_id: &str) -> CommerceResult<Cart>;

    /// Empty the server cart
    async fn clear(&self, op: &OperationId) -> CommerceResult<()>;

    /// Validate a discount code against the server cart
    async fn apply_discount(
        &self,
        op: &OperationId,
        code: &str,
    ) -> CommerceResult<DiscountValidation>;
}

/// Remote order service. `create_order` authorizes payment before it
/// persists the order.
#[async_trait]
pub trait OrderService: Send + Sync {
    async fn create_order(&self, request: &OrderRequest) -> CommerceResult<OrderReceipt>;

    /// Record the payment outcome of an order
    async fn update_status(&self, order_id: &str, status: OrderStatus) -> CommerceResult<()>;
}

/// Remote payment verification
#[async_trait]
pub trait PaymentService: Send + Sync {
    async fn verify_payment(&self, payment_id: &str) -> CommerceResult<PaymentVerification>;
}

/// Shared handle to a cart service (dynamic dispatch)
pub type SharedCartService = Arc<dyn CartService>;

/// Shared handle to an order service (dynamic dispatch)
pub type SharedOrderService = Arc<dyn OrderService>;

/// Shared handle to a payment service (dynamic dispatch)
pub type SharedPaymentService = Arc<dyn PaymentService>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_ids_are_unique() {
        assert_ne!(OperationId::new(), OperationId::new());
        assert_eq!(OperationId::from("op-7").as_str(), "op-7");
    }

    #[test]
    fn test_discount_validation_into_discount() {
        let accepted = DiscountValidation::accepted(DiscountKind::Percentage, 15);
        let discount = accepted.into_discount("SPRING15").unwrap();
        assert_eq!(discount.code, "SPRING15");
        assert_eq!(discount.kind, DiscountKind::Percentage);
        assert_eq!(discount.value, 15);

        assert!(DiscountValidation::rejected("Expired")
            .into_discount("OLD")
            .is_none());
    }

    #[test]
    fn test_discount_validation_defaults() {
        let v: DiscountValidation =
            serde_json::from_str(r#"{"valid":false,"message":"Unknown code"}"#).unwrap();
        assert!(!v.valid);
        assert_eq!(v.amount, 0);
        assert_eq!(v.message.as_deref(), Some("Unknown code"));
    }
}
