//! # Cart Types
//!
//! The local cart: line items unique by product, an optional discount, and
//! the row-level operations the cart store composes into optimistic updates.

use crate::product::{Currency, Price, Product};
use serde::{Deserialize, Serialize};

/// Smallest quantity a cart line may hold
pub const MIN_QUANTITY: u32 = 1;

/// Largest quantity a cart line may hold
pub const MAX_QUANTITY: u32 = 99;

/// Returns true if `quantity` is a storable line quantity
pub fn is_valid_quantity(quantity: u32) -> bool {
    (MIN_QUANTITY..=MAX_QUANTITY).contains(&quantity)
}

/// A line in the cart
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    /// Product ID
    pub product_id: String,

    /// Product name (denormalized for display)
    pub name: String,

    /// Unit price
    pub unit_price: Price,

    /// Quantity, always within 1..=99
    pub quantity: u32,
}

impl CartItem {
    /// Create a line item from a product
    pub fn from_product(product: &Product, quantity: u32) -> Self {
        Self {
            product_id: product.id.clone(),
            name: product.name.clone(),
            unit_price: product.price,
            quantity: quantity.min(MAX_QUANTITY),
        }
    }

    /// Calculate the total price for this line
    pub fn total(&self) -> Price {
        Price {
            amount: self.unit_price.amount * self.quantity as i64,
            currency: self.unit_price.currency,
        }
    }
}

/// How a discount's value is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountKind {
    /// `value` is an amount in the smallest currency unit
    FixedAmount,
    /// `value` is a whole percentage of the subtotal
    Percentage,
}

impl Default for DiscountKind {
    fn default() -> Self {
        DiscountKind::FixedAmount
    }
}

/// A validated discount attached to the cart
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discount {
    /// Code as entered by the shopper
    pub code: String,

    /// Fixed amount or percentage
    pub kind: DiscountKind,

    /// Minor units for fixed amounts, whole percent for percentages
    pub value: i64,
}

impl Discount {
    pub fn fixed(code: impl Into<String>, amount: i64) -> Self {
        Self {
            code: code.into(),
            kind: DiscountKind::FixedAmount,
            value: amount,
        }
    }

    pub fn percentage(code: impl Into<String>, percent: i64) -> Self {
        Self {
            code: code.into(),
            kind: DiscountKind::Percentage,
            value: percent,
        }
    }
}

/// The shopper's cart
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Cart {
    /// Lines in insertion order
    #[serde(default)]
    pub items: Vec<CartItem>,

    /// Applied discount, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount: Option<Discount>,

    /// Currency every line is priced in
    #[serde(default)]
    pub currency: Currency,
}

impl Cart {
    /// Create an empty cart
    pub fn new(currency: Currency) -> Self {
        Self {
            items: Vec::new(),
            discount: None,
            currency,
        }
    }

    /// Find a line by product ID
    pub fn get(&self, product_id: &str) -> Option<&CartItem> {
        self.items.iter().find(|i| i.product_id == product_id)
    }

    fn get_mut(&mut self, product_id: &str) -> Option<&mut CartItem> {
        self.items.iter_mut().find(|i| i.product_id == product_id)
    }

    /// Quantity held for a product (0 when absent)
    pub fn quantity_of(&self, product_id: &str) -> u32 {
        self.get(product_id).map(|i| i.quantity).unwrap_or(0)
    }

    /// Add `quantity` of a product, merging into an existing line.
    ///
    /// The resulting quantity is capped at [`MAX_QUANTITY`]; the excess is
    /// dropped. Returns the line's new quantity. A `quantity` of 0 leaves the
    /// cart untouched.
    pub fn add(&mut self, product: &Product, quantity: u32) -> u32 {
        if quantity == 0 {
            return self.quantity_of(&product.id);
        }
        match self.get_mut(&product.id) {
            Some(item) => {
                item.quantity = item.quantity.saturating_add(quantity).min(MAX_QUANTITY);
                item.quantity
            }
            None => {
                let item = CartItem::from_product(product, quantity);
                let quantity = item.quantity;
                self.items.push(item);
                quantity
            }
        }
    }

    /// Set a line's quantity. Returns the previous quantity, or `None` if
    /// the product is absent or `quantity` is outside 1..=99.
    pub fn set_quantity(&mut self, product_id: &str, quantity: u32) -> Option<u32> {
        if !is_valid_quantity(quantity) {
            return None;
        }
        let item = self.get_mut(product_id)?;
        let previous = item.quantity;
        item.quantity = quantity;
        Some(previous)
    }

    /// Remove a line. Returns the removed item.
    pub fn remove(&mut self, product_id: &str) -> Option<CartItem> {
        let index = self.items.iter().position(|i| i.product_id == product_id)?;
        Some(self.items.remove(index))
    }

    /// Bring one product's line in line with the server's cart.
    ///
    /// The server row replaces the local row (or removes it if the server
    /// no longer has the product). Other local rows keep their quantities
    /// but take the server's unit price where the server knows the product.
    pub fn reconcile_item(&mut self, product_id: &str, server: &Cart) {
        match server.get(product_id) {
            Some(remote) => {
                let mut remote = remote.clone();
                remote.quantity = remote.quantity.clamp(MIN_QUANTITY, MAX_QUANTITY);
                match self.get_mut(product_id) {
                    Some(local) => *local = remote,
                    None => self.items.push(remote),
                }
            }
            None => {
                self.remove(product_id);
            }
        }

        for item in self.items.iter_mut() {
            if item.product_id == product_id {
                continue;
            }
            if let Some(remote) = server.get(&item.product_id) {
                item.unit_price = remote.unit_price;
            }
        }
    }

    /// Drop every line and the discount
    pub fn clear(&mut self) {
        self.items.clear();
        self.discount = None;
    }

    /// Check if the cart has no lines
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total number of units across all lines
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|i| i.quantity).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: &str, dollars: f64) -> Product {
        Product::new(id, id.to_uppercase(), Price::new(dollars, Currency::USD))
    }

    #[test]
    fn test_repeated_add_merges_into_one_row() {
        let mut cart = Cart::new(Currency::USD);
        let p = product("p", 5.0);

        cart.add(&p, 1);
        cart.add(&p, 1);

        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.quantity_of("p"), 2);
    }

    #[test]
    fn test_add_clamps_at_max_quantity() {
        let mut cart = Cart::new(Currency::USD);
        let p = product("p", 1.0);

        cart.add(&p, 95);
        assert_eq!(cart.add(&p, 10), MAX_QUANTITY);
        assert_eq!(cart.add(&product("q", 1.0), 150), MAX_QUANTITY);
    }

    #[test]
    fn test_set_quantity_bounds() {
        let mut cart = Cart::new(Currency::USD);
        cart.add(&product("a", 2.0), 2);

        assert_eq!(cart.set_quantity("a", 0), None);
        assert_eq!(cart.set_quantity("a", 100), None);
        assert_eq!(cart.set_quantity("missing", 3), None);
        assert_eq!(cart.quantity_of("a"), 2);

        assert_eq!(cart.set_quantity("a", 7), Some(2));
        assert_eq!(cart.quantity_of("a"), 7);
    }

    #[test]
    fn test_insertion_order_preserved() {
        let mut cart = Cart::new(Currency::USD);
        cart.add(&product("b", 1.0), 1);
        cart.add(&product("a", 1.0), 1);
        cart.add(&product("b", 1.0), 1);

        let ids: Vec<_> = cart.items.iter().map(|i| i.product_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn test_reconcile_takes_server_row_and_prices() {
        let mut local = Cart::new(Currency::USD);
        local.add(&product("a", 10.0), 2);
        local.add(&product("b", 4.0), 1);

        let mut server = Cart::new(Currency::USD);
        server.add(&product("a", 12.0), 3);
        server.add(&product("b", 5.0), 9);

        local.reconcile_item("a", &server);

        let a = local.get("a").unwrap();
        assert_eq!(a.quantity, 3);
        assert_eq!(a.unit_price.amount, 1200);

        // Other rows keep their local quantity but pick up the server price
        let b = local.get("b").unwrap();
        assert_eq!(b.quantity, 1);
        assert_eq!(b.unit_price.amount, 500);
    }

    #[test]
    fn test_reconcile_removes_row_the_server_dropped() {
        let mut local = Cart::new(Currency::USD);
        local.add(&product("gone", 3.0), 1);

        local.reconcile_item("gone", &Cart::new(Currency::USD));

        assert!(local.is_empty());
    }

    #[test]
    fn test_clear_drops_discount() {
        let mut cart = Cart::new(Currency::USD);
        cart.add(&product("a", 1.0), 4);
        cart.discount = Some(Discount::percentage("TEN", 10));

        assert_eq!(cart.item_count(), 4);
        cart.clear();

        assert!(cart.is_empty());
        assert!(cart.discount.is_none());
    }
}
