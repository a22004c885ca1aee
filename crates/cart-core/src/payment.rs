//! # Payment Tracking Types
//!
//! Payment statuses as reported by the verification endpoint and the state
//! a payment tracker exposes to its consumers.

use crate::order::OrderStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of a payment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Awaiting settlement
    Pending,
    /// Settled successfully
    Succeeded,
    /// Declined; the shopper must choose another method
    RequiresPaymentMethod,
    /// Abandoned or voided
    Canceled,
    /// Not known, or a status this client doesn't recognise
    #[serde(other)]
    Unknown,
}

impl PaymentStatus {
    /// Terminal statuses never change again
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PaymentStatus::Succeeded
                | PaymentStatus::RequiresPaymentMethod
                | PaymentStatus::Canceled
        )
    }

    /// Order status to report once this status is terminal
    pub fn order_status(&self) -> Option<OrderStatus> {
        match self {
            PaymentStatus::Succeeded => Some(OrderStatus::Paid),
            PaymentStatus::RequiresPaymentMethod | PaymentStatus::Canceled => {
                Some(OrderStatus::PaymentFailed)
            }
            PaymentStatus::Pending | PaymentStatus::Unknown => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Succeeded => "succeeded",
            PaymentStatus::RequiresPaymentMethod => "requires_payment_method",
            PaymentStatus::Canceled => "canceled",
            PaymentStatus::Unknown => "unknown",
        }
    }
}

impl Default for PaymentStatus {
    fn default() -> Self {
        PaymentStatus::Pending
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Answer of the payment verification endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentVerification {
    pub status: PaymentStatus,

    /// Order the payment belongs to, when the gateway knows it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
}

/// What a payment tracker currently knows
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentTrackingState {
    pub payment_id: String,
    pub status: PaymentStatus,
    pub is_polling: bool,
    pub error: Option<String>,
    /// Order reported by the last verification, if any
    pub order_id: Option<String>,
    /// Completed verification attempts
    pub polls: u32,
    pub last_checked_at: Option<DateTime<Utc>>,
}

impl PaymentTrackingState {
    /// Fresh state for a payment about to be polled
    pub fn new(payment_id: impl Into<String>) -> Self {
        Self {
            payment_id: payment_id.into(),
            status: PaymentStatus::Pending,
            is_polling: true,
            error: None,
            order_id: None,
            polls: 0,
            last_checked_at: None,
        }
    }

    /// True once a terminal status has been observed
    pub fn is_settled(&self) -> bool {
        self.status.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_statuses() {
        assert!(PaymentStatus::Succeeded.is_terminal());
        assert!(PaymentStatus::RequiresPaymentMethod.is_terminal());
        assert!(PaymentStatus::Canceled.is_terminal());
        assert!(!PaymentStatus::Pending.is_terminal());
        assert!(!PaymentStatus::Unknown.is_terminal());
    }

    #[test]
    fn test_order_status_mapping() {
        assert_eq!(PaymentStatus::Succeeded.order_status(), Some(OrderStatus::Paid));
        assert_eq!(
            PaymentStatus::Canceled.order_status(),
            Some(OrderStatus::PaymentFailed)
        );
        assert_eq!(PaymentStatus::Pending.order_status(), None);
    }

    #[test]
    fn test_unrecognised_status_parses_as_unknown() {
        let v: PaymentVerification =
            serde_json::from_str(r#"{"status":"processing","order_id":"ord_1"}"#).unwrap();
        assert_eq!(v.status, PaymentStatus::Unknown);
        assert_eq!(v.order_id.as_deref(), Some("ord_1"));

        let v: PaymentVerification =
            serde_json::from_str(r#"{"status":"requires_payment_method"}"#).unwrap();
        assert_eq!(v.status, PaymentStatus::RequiresPaymentMethod);
    }
}
