//! Saved-for-later items.

use std::sync::Arc;

use atelier_core::WishlistItem;

use crate::storage::LocalStorage;

/// Storage key for the persisted wishlist.
pub const WISHLIST_STORAGE_KEY: &str = "wishlist";

/// The client's wishlist: insertion-ordered, unique by id.
pub struct WishlistStore {
    items: Vec<WishlistItem>,
    storage: Arc<dyn LocalStorage>,
}

impl std::fmt::Debug for WishlistStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WishlistStore")
            .field("items", &self.items)
            .finish_non_exhaustive()
    }
}

impl WishlistStore {
    /// Load the wishlist persisted in `storage`, or start empty.
    #[must_use]
    pub fn new(storage: Arc<dyn LocalStorage>) -> Self {
        let items = crate::load_collection(storage.as_ref(), WISHLIST_STORAGE_KEY);
        Self { items, storage }
    }

    #[must_use]
    pub fn items(&self) -> &[WishlistItem] {
        &self.items
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Save `item` unless an item with the same id is already saved.
    pub fn add_item(&mut self, item: WishlistItem) {
        if self.is_in_wishlist(&item.id) {
            return;
        }
        self.items.push(item);
        self.persist();
    }

    pub fn remove_item(&mut self, id: &str) {
        self.items.retain(|i| i.id != id);
        self.persist();
    }

    #[must_use]
    pub fn is_in_wishlist(&self, id: &str) -> bool {
        self.items.iter().any(|i| i.id == id)
    }

    pub fn clear_wishlist(&mut self) {
        self.items.clear();
        self.persist();
    }

    fn persist(&self) {
        crate::save_collection(self.storage.as_ref(), WISHLIST_STORAGE_KEY, &self.items);
    }
}
