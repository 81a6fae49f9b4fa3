//! Shopping cart state.
//!
//! An ordered list of line items with at most one entry per product id,
//! written through to local storage after every mutation.

use std::sync::Arc;

use rust_decimal::Decimal;

use atelier_core::CartItem;

use crate::storage::LocalStorage;

/// Storage key for the persisted cart.
pub const CART_STORAGE_KEY: &str = "cart";

/// The client's shopping cart.
pub struct CartStore {
    items: Vec<CartItem>,
    storage: Arc<dyn LocalStorage>,
}

impl std::fmt::Debug for CartStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartStore")
            .field("items", &self.items)
            .finish_non_exhaustive()
    }
}

impl CartStore {
    /// Load the cart persisted in `storage`.
    ///
    /// A missing, unreadable or corrupt value is logged and treated as an
    /// empty cart.
    #[must_use]
    pub fn new(storage: Arc<dyn LocalStorage>) -> Self {
        let items = crate::load_collection(storage.as_ref(), CART_STORAGE_KEY);
        Self { items, storage }
    }

    /// Line items in insertion order.
    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Add `item`, or grow the existing line with the same id by
    /// `item.quantity`.
    ///
    /// When the line already exists only its quantity changes; the stored
    /// name, price and image are kept.
    pub fn add_item(&mut self, item: CartItem) {
        if let Some(existing) = self.items.iter_mut().find(|i| i.id == item.id) {
            existing.quantity = existing.quantity.saturating_add(item.quantity);
        } else {
            self.items.push(item);
        }
        self.persist();
    }

    /// Remove the line with `id`. Missing ids are ignored.
    pub fn remove_item(&mut self, id: &str) {
        self.items.retain(|i| i.id != id);
        self.persist();
    }

    /// Set the quantity of line `id`; zero or less removes it.
    pub fn update_quantity(&mut self, id: &str, quantity: i64) {
        if quantity <= 0 {
            self.remove_item(id);
            return;
        }

        if let Some(item) = self.items.iter_mut().find(|i| i.id == id) {
            item.quantity = quantity;
        }
        self.persist();
    }

    pub fn clear_cart(&mut self) {
        self.items.clear();
        self.persist();
    }

    /// Total number of units across all lines.
    ///
    /// Quantities are taken as stored, so the sum saturates rather than
    /// overflowing.
    #[must_use]
    pub fn item_count(&self) -> i64 {
        self.items
            .iter()
            .fold(0_i64, |acc, i| acc.saturating_add(i.quantity))
    }

    /// Sum of `price * quantity` over all lines, saturating at the
    /// `Decimal` bounds.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.items
            .iter()
            .fold(Decimal::ZERO, |acc, i| acc.saturating_add(i.line_total()))
    }

    fn persist(&self) {
        crate::save_collection(self.storage.as_ref(), CART_STORAGE_KEY, &self.items);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::storage::MemoryStorage;

    fn item(id: &str, price: i64, quantity: i64) -> CartItem {
        CartItem {
            id: id.to_owned(),
            name: format!("Item {id}"),
            price: Decimal::from(price),
            quantity,
            image: None,
        }
    }

    fn store() -> (CartStore, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::new());
        (CartStore::new(storage.clone()), storage)
    }

    #[test]
    fn test_adding_same_id_merges_quantity() {
        let (mut cart, _) = store();
        cart.add_item(item("p1", 10, 2));
        cart.add_item(item("p1", 10, 1));

        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].quantity, 3);
        assert_eq!(cart.item_count(), 3);
        assert_eq!(cart.total(), Decimal::from(30));
    }

    #[test]
    fn test_merge_keeps_original_fields() {
        let (mut cart, _) = store();
        cart.add_item(item("p1", 10, 1));

        let mut repriced = item("p1", 99, 1);
        repriced.name = "Renamed".to_owned();
        cart.add_item(repriced);

        assert_eq!(cart.items()[0].price, Decimal::from(10));
        assert_eq!(cart.items()[0].name, "Item p1");
    }

    #[test]
    fn test_update_quantity_non_positive_removes() {
        let (mut cart, _) = store();
        cart.add_item(item("p1", 10, 2));
        cart.add_item(item("p2", 5, 1));

        cart.update_quantity("p1", 0);
        assert!(cart.items().iter().all(|i| i.id != "p1"));

        cart.update_quantity("p2", -5);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_update_quantity_sets_exact_value() {
        let (mut cart, _) = store();
        cart.add_item(item("p1", 10, 2));
        cart.update_quantity("p1", 7);
        cart.update_quantity("missing", 4);

        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.item_count(), 7);
    }

    #[test]
    fn test_remove_missing_is_noop() {
        let (mut cart, _) = store();
        cart.add_item(item("p1", 10, 1));
        cart.remove_item("p2");
        assert_eq!(cart.items().len(), 1);
    }

    #[test]
    fn test_decimal_total() {
        let (mut cart, _) = store();
        cart.add_item(CartItem {
            price: Decimal::new(1999, 2),
            ..item("p1", 0, 3)
        });
        cart.add_item(CartItem {
            price: Decimal::new(550, 2),
            ..item("p2", 0, 1)
        });

        assert_eq!(cart.total(), Decimal::new(6547, 2));
    }

    #[test]
    fn test_mutations_persist_and_reload() {
        let (mut cart, storage) = store();
        cart.add_item(item("p1", 10, 2));
        cart.add_item(item("p2", 4, 1));
        cart.remove_item("p2");

        let reloaded = CartStore::new(storage.clone());
        assert_eq!(reloaded.items(), cart.items());

        cart.clear_cart();
        assert_eq!(storage.get(CART_STORAGE_KEY).unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn test_corrupt_storage_loads_empty() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set(CART_STORAGE_KEY, "{not json").unwrap();

        let cart = CartStore::new(storage);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_huge_quantities_saturate() {
        let (mut cart, _) = store();
        cart.add_item(item("p1", 1, i64::MAX));
        cart.add_item(item("p1", 1, 1));
        cart.add_item(item("p2", 1, 5));

        assert_eq!(cart.items()[0].quantity, i64::MAX);
        assert_eq!(cart.item_count(), i64::MAX);
        assert_eq!(cart.total(), Decimal::from(i64::MAX) + Decimal::from(5));
    }

    #[test]
    fn test_stored_cart_with_overflowing_total_loads() {
        let storage = Arc::new(MemoryStorage::new());
        storage
            .set(
                CART_STORAGE_KEY,
                r#"[{"id":"p1","name":"Bolt","price":100000000000,"quantity":9000000000000000000},
                    {"id":"p2","name":"Spool","price":100000000000,"quantity":9000000000000000000}]"#,
            )
            .unwrap();

        let cart = CartStore::new(storage);
        assert_eq!(cart.items().len(), 2);
        assert_eq!(cart.total(), Decimal::MAX);
        assert_eq!(cart.item_count(), i64::MAX);
    }

    /// Deterministic xorshift so the sequence test needs no extra crates.
    struct Xorshift(u64);

    impl Xorshift {
        fn next(&mut self) -> u64 {
            self.0 ^= self.0 << 13;
            self.0 ^= self.0 >> 7;
            self.0 ^= self.0 << 17;
            self.0
        }

        fn below(&mut self, n: u64) -> i64 {
            i64::try_from(self.next() % n).unwrap()
        }
    }

    #[test]
    fn test_random_sequences_keep_invariants() {
        for seed in 1..=50_u64 {
            let mut rng = Xorshift(seed.wrapping_mul(0x9E37_79B9_7F4A_7C15));
            let (mut cart, _) = store();

            for _ in 0..200 {
                let id = format!("p{}", rng.below(6));
                match rng.below(4) {
                    0 | 1 => cart.add_item(item(&id, rng.below(50), rng.below(5) + 1)),
                    2 => cart.remove_item(&id),
                    _ => cart.update_quantity(&id, rng.below(8) - 3),
                }

                let ids: HashSet<&str> = cart.items().iter().map(|i| i.id.as_str()).collect();
                assert_eq!(ids.len(), cart.items().len(), "duplicate id (seed {seed})");
                assert_eq!(
                    cart.item_count(),
                    cart.items().iter().map(|i| i.quantity).sum::<i64>()
                );
                assert!(cart.items().iter().all(|i| i.quantity >= 1));
            }
        }
    }
}
