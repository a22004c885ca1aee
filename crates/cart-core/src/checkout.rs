//! # Checkout Types
//!
//! Data accumulated across the shipping, payment and review steps, plus the
//! address form rules the orchestrator enforces before accepting an address.

use crate::error::{CommerceError, CommerceResult};
use serde::{Deserialize, Serialize};

/// A postal address with contact details
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Address {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    /// ISO 3166-1 alpha-2 country code
    pub country: String,
}

impl Address {
    /// Apply the address form rules.
    ///
    /// Reports the first failing field only, in form order.
    pub fn validate(&self) -> CommerceResult<()> {
        require("full_name", &self.full_name)?;
        require("email", &self.email)?;
        if !is_valid_email(&self.email) {
            return Err(invalid("email", "is not a valid email address"));
        }
        require("phone", &self.phone)?;
        if !is_valid_phone(&self.phone) {
            return Err(invalid("phone", "is not a valid phone number"));
        }
        require("street", &self.street)?;
        require("city", &self.city)?;
        require("state", &self.state)?;
        require("zip", &self.zip)?;
        if !is_valid_country(&self.country) {
            return Err(invalid("country", "must be a two-letter country code"));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: &str) -> CommerceError {
    CommerceError::InvalidAddress {
        field,
        reason: reason.to_string(),
    }
}

fn require(field: &'static str, value: &str) -> CommerceResult<()> {
    if value.trim().is_empty() {
        return Err(invalid(field, "is required"));
    }
    Ok(())
}

fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

fn is_valid_phone(phone: &str) -> bool {
    let body = phone.strip_prefix('+').unwrap_or(phone);
    let allowed = body
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '-' | '(' | ')' | '.'));
    let digits = body.chars().filter(char::is_ascii_digit).count();
    allowed && (7..=15).contains(&digits)
}

fn is_valid_country(country: &str) -> bool {
    country.len() == 2 && country.chars().all(|c| c.is_ascii_uppercase())
}

/// Where the billing address comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillingAddress {
    /// Copy the shipping address
    SameAsShipping,
    /// A separately entered address
    Separate(Address),
}

/// Raw card fields as entered. Never serialized; `Debug` masks the number.
#[derive(Clone, PartialEq, Eq)]
pub struct CardDetails {
    pub holder_name: String,
    pub number: String,
    pub expiry: String,
    pub cvc: String,
}

impl CardDetails {
    pub fn new(
        holder_name: impl Into<String>,
        number: impl Into<String>,
        expiry: impl Into<String>,
        cvc: impl Into<String>,
    ) -> Self {
        Self {
            holder_name: holder_name.into(),
            number: number.into(),
            expiry: expiry.into(),
            cvc: cvc.into(),
        }
    }

    /// Last four digits of the card number
    pub fn last_four(&self) -> String {
        let digits: Vec<char> = self.number.chars().filter(char::is_ascii_digit).collect();
        let start = digits.len().saturating_sub(4);
        digits[start..].iter().collect()
    }
}

impl std::fmt::Debug for CardDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CardDetails")
            .field("holder_name", &self.holder_name)
            .field("number", &format_args!("**** {}", self.last_four()))
            .field("expiry", &"**/**")
            .field("cvc", &"***")
            .finish()
    }
}

/// Payment method chosen at the payment step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentDetails {
    /// Card entered directly
    Card(CardDetails),
    /// Redirect-based method such as an external wallet
    Redirect { provider: String },
}

impl PaymentDetails {
    /// The redacted form that is allowed to leave the session
    pub fn summary(&self) -> PaymentSummary {
        match self {
            PaymentDetails::Card(card) => PaymentSummary {
                method: PaymentMethod::Card,
                last_four: Some(card.last_four()),
                provider: None,
            },
            PaymentDetails::Redirect { provider } => PaymentSummary {
                method: PaymentMethod::Redirect,
                last_four: None,
                provider: Some(provider.clone()),
            },
        }
    }
}

/// Kind of payment method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Card,
    Redirect,
}

/// Redacted payment descriptor: method plus last four, never raw card data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSummary {
    pub method: PaymentMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_four: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
}

/// Checkout step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutStep {
    Shipping,
    Payment,
    Review,
}

impl CheckoutStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutStep::Shipping => "shipping",
            CheckoutStep::Payment => "payment",
            CheckoutStep::Review => "review",
        }
    }

    /// The step a "back" affordance re-enters
    pub fn previous(&self) -> Option<CheckoutStep> {
        match self {
            CheckoutStep::Shipping => None,
            CheckoutStep::Payment => Some(CheckoutStep::Shipping),
            CheckoutStep::Review => Some(CheckoutStep::Payment),
        }
    }
}

impl Default for CheckoutStep {
    fn default() -> Self {
        CheckoutStep::Shipping
    }
}

impl std::fmt::Display for CheckoutStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transient state of one checkout attempt
#[derive(Debug, Clone, Default)]
pub struct CheckoutSession {
    pub current_step: CheckoutStep,
    pub shipping_address: Option<Address>,
    pub billing_address: Option<Address>,
    pub payment_details: Option<PaymentDetails>,
    pub is_processing: bool,
    /// User-facing message of the last failed order attempt
    pub error: Option<String>,
    pub order_id: Option<String>,
    pub order_complete: bool,
}
