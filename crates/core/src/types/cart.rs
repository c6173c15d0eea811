//! Carts and cart lines.
//!
//! A [`Cart`] holds at most one [`CartLine`] per product. Every mutation in the
//! system, whether applied optimistically in memory or durably by a storage
//! engine, goes through the same [`Cart::add_product`] and
//! [`Cart::set_quantity`] rules so both sides agree on the outcome.

use serde::{Deserialize, Serialize};

use super::id::ProductId;
use super::price::Price;
use super::product::Product;

/// A product in a cart together with its quantity.
///
/// Serializes flat (product fields plus `quantity`), matching the stored cart
/// record format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    #[serde(flatten)]
    pub product: Product,
    pub quantity: u32,
}

impl CartLine {
    /// Line identity, which is the product identity.
    #[must_use]
    pub const fn product_id(&self) -> &ProductId {
        &self.product.id
    }

    /// Price of the line (unit price x quantity).
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.product.price.times(self.quantity)
    }
}

/// The set of lines belonging to one user.
///
/// Line order is insertion order but carries no meaning; equality compares
/// carts as sets keyed by product identity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    /// Create an empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Build a cart from raw lines, enforcing the cart invariants.
    ///
    /// Lines for the same product are merged by summing their quantities and
    /// zero-quantity lines are dropped.
    #[must_use]
    pub fn from_lines(lines: impl IntoIterator<Item = CartLine>) -> Self {
        let mut cart = Self::new();
        for line in lines {
            if line.quantity == 0 {
                continue;
            }
            match cart.line_mut(&line.product.id) {
                Some(existing) => {
                    existing.quantity = existing.quantity.saturating_add(line.quantity);
                }
                None => cart.lines.push(line),
            }
        }
        cart
    }

    /// Add one unit of `product`.
    ///
    /// Increments the existing line by exactly one, or appends a new line with
    /// quantity 1. Never creates a second line for the same product.
    pub fn add_product(&mut self, product: &Product) {
        match self.line_mut(&product.id) {
            Some(line) => line.quantity = line.quantity.saturating_add(1),
            None => self.lines.push(CartLine {
                product: product.clone(),
                quantity: 1,
            }),
        }
    }

    /// Set the absolute quantity of a line.
    ///
    /// A quantity of zero or less removes the line. Setting the quantity of a
    /// product that is not in the cart does nothing.
    pub fn set_quantity(&mut self, product_id: &ProductId, quantity: i64) {
        if quantity <= 0 {
            self.lines.retain(|line| line.product_id() != product_id);
            return;
        }
        let quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
        if let Some(line) = self.line_mut(product_id) {
            line.quantity = quantity;
        }
    }

    /// Look up the line for a product.
    #[must_use]
    pub fn line(&self, product_id: &ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|line| line.product_id() == product_id)
    }

    fn line_mut(&mut self, product_id: &ProductId) -> Option<&mut CartLine> {
        self.lines
            .iter_mut()
            .find(|line| line.product_id() == product_id)
    }

    /// Quantity of a product in the cart (0 when absent).
    #[must_use]
    pub fn quantity_of(&self, product_id: &ProductId) -> u32 {
        self.line(product_id).map_or(0, |line| line.quantity)
    }

    /// Iterate over the lines.
    pub fn iter(&self) -> impl Iterator<Item = &CartLine> {
        self.lines.iter()
    }

    /// Number of distinct lines.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.lines.iter().map(|line| u64::from(line.quantity)).sum()
    }

    /// Sum of all line totals.
    #[must_use]
    pub fn subtotal(&self) -> Price {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    /// Consume the cart and return its lines.
    #[must_use]
    pub fn into_lines(self) -> Vec<CartLine> {
        self.lines
    }
}

impl PartialEq for Cart {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .lines
                .iter()
                .all(|line| other.line(line.product_id()) == Some(line))
    }
}

impl Eq for Cart {}

impl<'a> IntoIterator for &'a Cart {
    type Item = &'a CartLine;
    type IntoIter = std::slice::Iter<'a, CartLine>;

    fn into_iter(self) -> Self::IntoIter {
        self.lines.iter()
    }
}

/// A pending change to a cart.
///
/// Mutations are applied tentatively to in-memory state and replayed on top
/// of confirmed snapshots until the storage engine has acknowledged them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartMutation {
    /// Add one unit of a product.
    Add(Product),
    /// Set the absolute quantity of a product (`<= 0` removes it).
    SetQuantity {
        product_id: ProductId,
        quantity: i64,
    },
}

impl CartMutation {
    /// Apply the mutation to a cart in place.
    pub fn apply(&self, cart: &mut Cart) {
        match self {
            Self::Add(product) => cart.add_product(product),
            Self::SetQuantity {
                product_id,
                quantity,
            } => cart.set_quantity(product_id, *quantity),
        }
    }

    /// The product this mutation touches.
    #[must_use]
    pub const fn product_id(&self) -> &ProductId {
        match self {
            Self::Add(product) => &product.id,
            Self::SetQuantity { product_id, .. } => product_id,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::product::tests::product;

    fn id(s: &str) -> ProductId {
        ProductId::parse(s).unwrap()
    }

    #[test]
    fn test_add_twice_merges_into_one_line() {
        let p = product("1", 100);
        let mut cart = Cart::new();
        cart.add_product(&p);
        cart.add_product(&p);

        assert_eq!(cart.len(), 1);
        assert_eq!(cart.quantity_of(&p.id), 2);
    }

    #[test]
    fn test_set_quantity_is_absolute() {
        let p = product("1", 100);
        let mut cart = Cart::new();
        cart.add_product(&p);
        cart.set_quantity(&p.id, 3);
        cart.set_quantity(&p.id, 7);

        assert_eq!(cart.quantity_of(&p.id), 7);
    }

    #[test]
    fn test_set_quantity_non_positive_removes_line() {
        let p = product("1", 100);
        let mut cart = Cart::new();
        cart.add_product(&p);
        cart.add_product(&p);

        cart.set_quantity(&p.id, 0);
        assert!(cart.is_empty());

        // Removing again changes nothing.
        cart.set_quantity(&p.id, -5);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_set_quantity_missing_line_is_noop() {
        let p = product("1", 100);
        let mut cart = Cart::new();
        cart.add_product(&p);

        cart.set_quantity(&id("2"), 4);
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.quantity_of(&id("2")), 0);
    }

    #[test]
    fn test_from_lines_merges_duplicates_and_drops_zero() {
        let a = product("1", 100);
        let b = product("2", 50);
        let cart = Cart::from_lines([
            CartLine {
                product: a.clone(),
                quantity: 2,
            },
            CartLine {
                product: b.clone(),
                quantity: 0,
            },
            CartLine {
                product: a.clone(),
                quantity: 3,
            },
        ]);

        assert_eq!(cart.len(), 1);
        assert_eq!(cart.quantity_of(&a.id), 5);
        assert_eq!(cart.quantity_of(&b.id), 0);
    }

    #[test]
    fn test_equality_ignores_order() {
        let a = product("1", 100);
        let b = product("2", 50);

        let mut first = Cart::new();
        first.add_product(&a);
        first.add_product(&b);

        let mut second = Cart::new();
        second.add_product(&b);
        second.add_product(&a);

        assert_eq!(first, second);

        second.add_product(&a);
        assert_ne!(first, second);
    }

    #[test]
    fn test_totals() {
        let a = product("1", 165);
        let b = product("2", 180);
        let mut cart = Cart::new();
        cart.add_product(&a);
        cart.add_product(&a);
        cart.add_product(&b);

        assert_eq!(cart.item_count(), 3);
        assert_eq!(cart.subtotal(), Price::new(510));
    }

    #[test]
    fn test_serializes_flat_records() {
        let mut cart = Cart::new();
        cart.add_product(&product("9", 92_900));

        let json = serde_json::to_value(&cart).unwrap();
        let record = &json[0];
        assert_eq!(record["id"], "9");
        assert_eq!(record["quantity"], 1);
        assert_eq!(record["reviewCount"], 10);

        let back: Cart = serde_json::from_value(json).unwrap();
        assert_eq!(back, cart);
    }

    #[test]
    fn test_mutation_apply() {
        let p = product("5", 165);
        let mut cart = Cart::new();

        CartMutation::Add(p.clone()).apply(&mut cart);
        CartMutation::SetQuantity {
            product_id: p.id.clone(),
            quantity: 4,
        }
        .apply(&mut cart);

        assert_eq!(cart.quantity_of(&p.id), 4);
    }
}
