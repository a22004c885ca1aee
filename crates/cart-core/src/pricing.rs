//! # Pricing Engine
//!
//! Derives a [`PriceBreakdown`] from a cart snapshot. Pure and stateless:
//! the breakdown is recomputed on every read and never stored.
//!
//! ```text
//! subtotal = Σ unit_price × quantity
//! shipping = 0 if subtotal > 100 else 10
//! tax      = subtotal × 10%   (half-up to the minor unit)
//! total    = subtotal + shipping + tax − discount   (never below zero)
//! ```

use crate::cart::{Cart, Discount, DiscountKind};
use crate::product::{Currency, Price};
use serde::{Deserialize, Serialize};

/// Subtotal above which shipping is free, in major units
pub const FREE_SHIPPING_THRESHOLD: f64 = 100.0;

/// Flat shipping fee charged at or below the threshold, in major units
pub const FLAT_SHIPPING_FEE: f64 = 10.0;

/// Tax rate applied to the subtotal, in percent
pub const TAX_RATE_PERCENT: i64 = 10;

/// Derived totals for a cart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBreakdown {
    pub subtotal: Price,
    pub shipping_fee: Price,
    pub tax: Price,
    pub discount_amount: Price,
    pub total: Price,
}

impl PriceBreakdown {
    /// Compute the breakdown for a cart
    pub fn for_cart(cart: &Cart) -> Self {
        let currency = cart.currency;
        let subtotal: i64 = cart.items.iter().map(|i| i.total().amount).sum();
        let shipping_fee = shipping_fee(subtotal, currency);
        let tax = tax(subtotal);
        let gross = subtotal + shipping_fee + tax;
        let discount_amount = cart
            .discount
            .as_ref()
            .map(|d| discount_amount(d, subtotal))
            .unwrap_or(0)
            .clamp(0, gross);

        Self {
            subtotal: Price::from_cents(subtotal, currency),
            shipping_fee: Price::from_cents(shipping_fee, currency),
            tax: Price::from_cents(tax, currency),
            discount_amount: Price::from_cents(discount_amount, currency),
            total: Price::from_cents(gross - discount_amount, currency),
        }
    }

    /// True when shipping was waived by the threshold
    pub fn has_free_shipping(&self) -> bool {
        self.shipping_fee.amount == 0
    }
}

/// Shipping fee in minor units for a subtotal in minor units
pub fn shipping_fee(subtotal: i64, currency: Currency) -> i64 {
    if subtotal > currency.to_smallest_unit(FREE_SHIPPING_THRESHOLD) {
        0
    } else {
        currency.to_smallest_unit(FLAT_SHIPPING_FEE)
    }
}

/// Tax in minor units, rounded half-up
pub fn tax(subtotal: i64) -> i64 {
    percent_of(subtotal, TAX_RATE_PERCENT)
}

/// Discount in minor units before capping
pub fn discount_amount(discount: &Discount, subtotal: i64) -> i64 {
    match discount.kind {
        DiscountKind::FixedAmount => discount.value.max(0),
        DiscountKind::Percentage => percent_of(subtotal, discount.value.clamp(0, 100)),
    }
}

fn percent_of(amount: i64, percent: i64) -> i64 {
    (amount * percent + 50).div_euclid(100)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::product::Product;

    fn cart_with(lines: &[(&str, f64, u32)]) -> Cart {
        let mut cart = Cart::new(Currency::USD);
        for (id, price, qty) in lines {
            cart.add(&Product::new(*id, *id, Price::new(*price, Currency::USD)), *qty);
        }
        cart
    }

    #[test]
    fn test_free_shipping_over_threshold() {
        let totals = PriceBreakdown::for_cart(&cart_with(&[("X", 60.0, 2)]));

        assert_eq!(totals.subtotal.amount, 12000);
        assert_eq!(totals.shipping_fee.amount, 0);
        assert_eq!(totals.tax.amount, 1200);
        assert_eq!(totals.discount_amount.amount, 0);
        assert_eq!(totals.total.amount, 13200);
        assert!(totals.has_free_shipping());
    }

    #[test]
    fn test_flat_shipping_under_threshold() {
        let totals = PriceBreakdown::for_cart(&cart_with(&[("Y", 20.0, 1)]));

        assert_eq!(totals.subtotal.amount, 2000);
        assert_eq!(totals.shipping_fee.amount, 1000);
        assert_eq!(totals.tax.amount, 200);
        assert_eq!(totals.total.amount, 3200);
        assert_eq!(totals.total.display(), "$32.00");
    }

    #[test]
    fn test_threshold_is_strictly_greater_than() {
        let exactly = PriceBreakdown::for_cart(&cart_with(&[("a", 100.0, 1)]));
        assert_eq!(exactly.shipping_fee.amount, 1000);

        let just_over = PriceBreakdown::for_cart(&cart_with(&[("a", 100.01, 1)]));
        assert_eq!(just_over.shipping_fee.amount, 0);
    }

    #[test]
    fn test_empty_cart_still_pays_shipping() {
        let totals = PriceBreakdown::for_cart(&Cart::new(Currency::USD));
        assert_eq!(totals.subtotal.amount, 0);
        assert_eq!(totals.total.amount, 1000);
    }

    #[test]
    fn test_tax_rounds_half_up() {
        // 10% of $0.05 is half a cent
        assert_eq!(tax(5), 1);
        assert_eq!(tax(4), 0);
        assert_eq!(tax(1999), 200);
    }

    #[test]
    fn test_fixed_and_percentage_discounts() {
        let mut cart = cart_with(&[("a", 50.0, 1)]);

        cart.discount = Some(Discount::fixed("FIVE", 500));
        let fixed = PriceBreakdown::for_cart(&cart);
        assert_eq!(fixed.discount_amount.amount, 500);
        assert_eq!(fixed.total.amount, 5000 + 1000 + 500 - 500);

        cart.discount = Some(Discount::percentage("TEN", 10));
        let pct = PriceBreakdown::for_cart(&cart);
        assert_eq!(pct.discount_amount.amount, 500);
    }

    #[test]
    fn test_discount_never_drives_total_negative() {
        let mut cart = cart_with(&[("a", 5.0, 1)]);
        cart.discount = Some(Discount::fixed("HUGE", 100_000));

        let totals = PriceBreakdown::for_cart(&cart);

        assert_eq!(totals.total.amount, 0);
        assert_eq!(
            totals.discount_amount.amount,
            totals.subtotal.amount + totals.shipping_fee.amount + totals.tax.amount
        );
    }

    #[test]
    fn test_total_identity_across_carts() {
        let carts = [
            cart_with(&[]),
            cart_with(&[("a", 0.99, 3)]),
            cart_with(&[("a", 33.33, 3), ("b", 0.01, 1)]),
            cart_with(&[("a", 19.99, 99), ("b", 250.0, 2)]),
        ];

        for cart in &carts {
            let t = PriceBreakdown::for_cart(cart);
            assert_eq!(t.shipping_fee.amount == 0, t.subtotal.amount > 10000);
            assert_eq!(t.tax.amount, (t.subtotal.amount * 10 + 50) / 100);
            assert_eq!(
                t.total.amount,
                t.subtotal.amount + t.shipping_fee.amount + t.tax.amount - t.discount_amount.amount
            );
        }
    }

    #[test]
    fn test_zero_decimal_currency() {
        let mut cart = Cart::new(Currency::JPY);
        cart.add(&Product::new("tea", "Tea", Price::from_cents(150, Currency::JPY)), 1);

        let totals = PriceBreakdown::for_cart(&cart);
        assert_eq!(totals.shipping_fee.amount, 0);
        assert_eq!(totals.tax.amount, 15);
    }
}
