//! Cart aggregate and line model.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::products::Product;

/// One product-and-quantity entry in the cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    /// Locally generated identity, stable until the line is removed.
    pub local_id: Uuid,
    /// Backend line id, present once the remote add has been acknowledged.
    #[serde(default)]
    pub remote_id: Option<i64>,
    /// Product snapshot taken when the line was created or last touched.
    pub product: Product,
    pub quantity: u32,
    /// Monotonic per-line mutation counter. A remote completion carrying a
    /// revision older than the current one is discarded.
    #[serde(default)]
    pub revision: u64,
}

impl CartLine {
    pub fn product_id(&self) -> i64 {
        self.product.id
    }

    pub fn line_total(&self) -> Decimal {
        self.product.price * Decimal::from(self.quantity)
    }
}

/// Ordered collection of cart lines.
///
/// Insertion order is preserved but carries no meaning; line identity is the
/// product id, and the cart holds at most one line per product. Lines always
/// have `quantity >= 1` — a quantity reaching zero removes the line.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub lines: Vec<CartLine>,
}

impl Cart {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Derived total, recomputed on every call. Carts are small; correctness
    /// over caching.
    pub fn total(&self) -> Decimal {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    pub fn item_count(&self) -> u32 {
        self.lines.iter().map(|line| line.quantity).sum()
    }

    pub fn line(&self, local_id: Uuid) -> Option<&CartLine> {
        self.lines.iter().find(|line| line.local_id == local_id)
    }

    pub fn line_for_product(&self, product_id: i64) -> Option<&CartLine> {
        self.lines.iter().find(|line| line.product_id() == product_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn product(id: i64, price: Decimal) -> Product {
        Product {
            id,
            name: format!("product-{id}"),
            description: None,
            price,
            image_url: String::new(),
            stock: 10,
            category_id: None,
            category: None,
        }
    }

    fn line(product_id: i64, price: Decimal, quantity: u32) -> CartLine {
        CartLine {
            local_id: Uuid::new_v4(),
            remote_id: None,
            product: product(product_id, price),
            quantity,
            revision: 1,
        }
    }

    #[test]
    fn empty_cart_totals_to_zero() {
        let cart = Cart::default();
        assert_eq!(cart.total(), Decimal::ZERO);
        assert_eq!(cart.item_count(), 0);
        assert!(cart.is_empty());
    }

    #[test]
    fn total_sums_price_times_quantity() {
        let cart = Cart {
            lines: vec![line(1, dec!(100), 2), line(2, dec!(19.99), 3)],
        };
        assert_eq!(cart.total(), dec!(259.97));
        assert_eq!(cart.item_count(), 5);
    }

    #[test]
    fn snapshot_round_trips_through_json() {
        let cart = Cart {
            lines: vec![line(1, dec!(12.50), 4)],
        };
        let json = serde_json::to_string(&cart).unwrap();
        let restored: Cart = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, cart);
    }

    #[test]
    fn snapshot_without_revision_defaults_to_zero() {
        // Snapshots written before the revision counter existed still load.
        let json = r#"{"lines":[{"localId":"6f0f1bde-54a2-4f86-9f2e-21c7e2c4a8af",
            "product":{"id":1,"name":"Mug","price":4.5},"quantity":2}]}"#;
        let cart: Cart = serde_json::from_str(json).unwrap();
        assert_eq!(cart.lines[0].revision, 0);
        assert_eq!(cart.lines[0].remote_id, None);
    }
}
