//! The shared shopping cart.
//!
//! Every mutation is one synchronous unit: read, modify, persist, notify.
//! Storage failures are logged and ignored; the in-memory list stays
//! authoritative.

use std::collections::HashSet;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::api::Product;
use crate::reactive::{Cleanup, Emitter, Runtime, Signal};

use super::storage::{Storage, StorageError};

/// Version written into the stored JSON.
pub const CART_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartEntry {
    pub product_id: String,
    pub title: String,
    #[serde(default)]
    pub image: String,
    /// Unit price.
    pub lprice: u64,
    pub quantity: u32,
    #[serde(default)]
    pub selected: bool,
}

impl CartEntry {
    pub fn from_product(product: &Product, quantity: u32) -> Self {
        Self {
            product_id: product.product_id.clone(),
            title: product.title.clone(),
            image: product.image.clone(),
            lprice: product.lprice,
            quantity: quantity.max(1),
            selected: false,
        }
    }

    pub fn subtotal(&self) -> u64 {
        self.lprice.saturating_mul(u64::from(self.quantity))
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredCart {
    version: u32,
    items: Vec<CartEntry>,
}

/// What a mutation did, for listeners that react to actions rather than
/// state (toasts, analytics).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartEvent {
    Added { product_id: String, quantity: u32 },
    Removed { product_ids: Vec<String> },
    QuantityChanged { product_id: String, quantity: u32 },
    SelectionChanged,
    Cleared,
}

// =============================================================================
// CartStore
// =============================================================================

/// Cheap to clone; clones share the same cart.
#[derive(Clone)]
pub struct CartStore {
    items: Signal<Vec<CartEntry>>,
    events: Emitter<CartEvent>,
    storage: Rc<dyn Storage>,
    key: Rc<str>,
}

impl CartStore {
    /// Restore the cart persisted under `key`, or start empty.
    pub fn load(runtime: &Runtime, storage: Rc<dyn Storage>, key: &str) -> Self {
        let items = match storage.get(key) {
            Ok(Some(json)) => decode(&json),
            Ok(None) => Vec::new(),
            Err(err) => {
                error!(%err, key, "could not read stored cart");
                Vec::new()
            }
        };
        debug!(key, items = items.len(), "cart loaded");
        Self {
            items: runtime.signal(items),
            events: Emitter::new(),
            storage,
            key: Rc::from(key),
        }
    }

    // ------------------------------------------------------------------------
    // READS - TRACKED INSIDE A RENDER
    // ------------------------------------------------------------------------

    pub fn entries(&self) -> Vec<CartEntry> {
        self.items.get()
    }

    pub fn get(&self, product_id: &str) -> Option<CartEntry> {
        self.items
            .with(|items| items.iter().find(|e| e.product_id == product_id).cloned())
    }

    pub fn contains(&self, product_id: &str) -> bool {
        self.items.with(|items| items.iter().any(|e| e.product_id == product_id))
    }

    /// Number of distinct products.
    pub fn len(&self) -> usize {
        self.items.with(Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn total_quantity(&self) -> u32 {
        self.items
            .with(|items| items.iter().map(|e| e.quantity).fold(0, u32::saturating_add))
    }

    pub fn total_price(&self) -> u64 {
        self.items
            .with(|items| items.iter().map(CartEntry::subtotal).fold(0, u64::saturating_add))
    }

    pub fn selected_count(&self) -> usize {
        self.items.with(|items| items.iter().filter(|e| e.selected).count())
    }

    pub fn selected_price(&self) -> u64 {
        self.items
            .with(|items| {
                items
                    .iter()
                    .filter(|e| e.selected)
                    .map(CartEntry::subtotal)
                    .fold(0, u64::saturating_add)
            })
    }

    /// True only for a non-empty cart where every entry is selected.
    pub fn is_all_selected(&self) -> bool {
        self.items
            .with(|items| !items.is_empty() && items.iter().all(|e| e.selected))
    }

    // ------------------------------------------------------------------------
    // MUTATIONS
    // ------------------------------------------------------------------------

    /// Add `quantity` (at least 1) of `product`. Adding a product already in
    /// the cart raises its quantity.
    pub fn add(&self, product: &Product, quantity: u32) {
        let quantity = quantity.max(1);
        let changed = self.mutate(|items| {
            match items.iter_mut().find(|e| e.product_id == product.product_id) {
                Some(entry) => entry.quantity = entry.quantity.saturating_add(quantity),
                None => items.push(CartEntry::from_product(product, quantity)),
            }
            true
        });
        if changed {
            self.events.emit(&CartEvent::Added {
                product_id: product.product_id.clone(),
                quantity,
            });
        }
    }

    pub fn remove(&self, product_id: &str) -> bool {
        let changed = self.mutate(|items| {
            let before = items.len();
            items.retain(|e| e.product_id != product_id);
            items.len() != before
        });
        if changed {
            self.events.emit(&CartEvent::Removed {
                product_ids: vec![product_id.to_string()],
            });
        }
        changed
    }

    pub fn increase(&self, product_id: &str) -> bool {
        self.change_quantity(product_id, |q| q.saturating_add(1))
    }

    /// Never goes below 1; use [`remove`](Self::remove) to drop an entry.
    pub fn decrease(&self, product_id: &str) -> bool {
        self.change_quantity(product_id, |q| q.saturating_sub(1))
    }

    /// Values below 1 are clamped to 1.
    pub fn set_quantity(&self, product_id: &str, quantity: u32) -> bool {
        self.change_quantity(product_id, |_| quantity)
    }

    pub fn toggle(&self, product_id: &str) -> bool {
        let changed = self.mutate(|items| match items.iter_mut().find(|e| e.product_id == product_id) {
            Some(entry) => {
                entry.selected = !entry.selected;
                true
            }
            None => false,
        });
        if changed {
            self.events.emit(&CartEvent::SelectionChanged);
        }
        changed
    }

    pub fn set_all_selected(&self, selected: bool) -> bool {
        let changed = self.mutate(|items| {
            let mut changed = false;
            for entry in items.iter_mut().filter(|e| e.selected != selected) {
                entry.selected = selected;
                changed = true;
            }
            changed
        });
        if changed {
            self.events.emit(&CartEvent::SelectionChanged);
        }
        changed
    }

    /// Select everything, or deselect everything if all are selected.
    pub fn toggle_select_all(&self) -> bool {
        let select = !self.items.with(|items| !items.is_empty() && items.iter().all(|e| e.selected));
        self.set_all_selected(select)
    }

    /// Returns how many entries were removed.
    pub fn remove_selected(&self) -> usize {
        let mut removed = Vec::new();
        self.mutate(|items| {
            items.retain(|e| {
                if e.selected {
                    removed.push(e.product_id.clone());
                }
                !e.selected
            });
            !removed.is_empty()
        });
        let count = removed.len();
        if count > 0 {
            self.events.emit(&CartEvent::Removed { product_ids: removed });
        }
        count
    }

    pub fn clear(&self) {
        let changed = self.mutate(|items| {
            let had_items = !items.is_empty();
            items.clear();
            had_items
        });
        if changed {
            self.events.emit(&CartEvent::Cleared);
        }
    }

    // ------------------------------------------------------------------------
    // OBSERVATION AND PERSISTENCE
    // ------------------------------------------------------------------------

    /// Called with the new entries after every change.
    pub fn subscribe(&self, callback: impl Fn(&Vec<CartEntry>) + 'static) -> Cleanup {
        self.items.subscribe(callback)
    }

    pub fn events(&self) -> &Emitter<CartEvent> {
        &self.events
    }

    pub fn storage_key(&self) -> &str {
        &self.key
    }

    /// The canonical stored form of the current entries.
    pub fn to_json(&self) -> Result<String, StorageError> {
        self.items.with(|items| encode(&self.key, items))
    }

    fn change_quantity(&self, product_id: &str, f: impl FnOnce(u32) -> u32) -> bool {
        let mut quantity = 0;
        let changed = self.mutate(|items| {
            let Some(entry) = items.iter_mut().find(|e| e.product_id == product_id) else {
                return false;
            };
            let next = f(entry.quantity).max(1);
            quantity = next;
            if next == entry.quantity {
                return false;
            }
            entry.quantity = next;
            true
        });
        if changed {
            self.events.emit(&CartEvent::QuantityChanged {
                product_id: product_id.to_string(),
                quantity,
            });
        }
        changed
    }

    /// Read-modify-persist-notify. `f` returns whether it changed anything.
    fn mutate(&self, f: impl FnOnce(&mut Vec<CartEntry>) -> bool) -> bool {
        let mut next = self.items.get_untracked();
        if !f(&mut next) {
            return false;
        }
        self.persist(&next);
        self.items.set(next);
        true
    }

    fn persist(&self, items: &[CartEntry]) {
        let result = encode(&self.key, items).and_then(|json| self.storage.set(&self.key, &json));
        if let Err(err) = result {
            error!(%err, key = %self.key, "cart not persisted, keeping in-memory state");
        }
    }
}

impl std::fmt::Debug for CartStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartStore")
            .field("key", &self.key)
            .field("items", &self.items.get_untracked())
            .finish()
    }
}

fn encode(key: &str, items: &[CartEntry]) -> Result<String, StorageError> {
    let stored = StoredCart {
        version: CART_SCHEMA_VERSION,
        items: items.to_vec(),
    };
    serde_json::to_string(&stored).map_err(|source| StorageError::Serialize {
        key: key.to_string(),
        source,
    })
}

/// Parse a stored cart and repair what can be repaired: duplicate ids keep
/// their first entry, quantities are raised to 1. Anything unreadable gives
/// an empty cart.
pub fn decode(json: &str) -> Vec<CartEntry> {
    let items = match serde_json::from_str::<StoredCart>(json) {
        Ok(stored) if stored.version == CART_SCHEMA_VERSION => stored.items,
        Ok(stored) => {
            warn!(version = stored.version, "unsupported cart schema version, starting empty");
            return Vec::new();
        }
        // Carts written before the schema was versioned were a bare array.
        Err(_) => match serde_json::from_str::<Vec<CartEntry>>(json) {
            Ok(items) => {
                debug!(items = items.len(), "migrating unversioned cart");
                items
            }
            Err(err) => {
                warn!(%err, "stored cart is corrupt, starting empty");
                return Vec::new();
            }
        },
    };

    let mut seen = HashSet::with_capacity(items.len());
    items
        .into_iter()
        .filter(|e| !e.product_id.is_empty())
        .filter(|e| {
            let fresh = seen.insert(e.product_id.clone());
            if !fresh {
                warn!(product_id = %e.product_id, "duplicate cart entry dropped");
            }
            fresh
        })
        .map(|mut e| {
            e.quantity = e.quantity.max(1);
            e
        })
        .collect()
}

// =============================================================================
// TESTS
// =============================================================================
