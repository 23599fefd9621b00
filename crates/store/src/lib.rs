//! File-backed local storage for the cart snapshot and bearer token.
//!
//! Two fixed slots under a data directory: `chipper_cart` holds the
//! serialized cart, `chipper_token` the raw bearer token. Per the degradation
//! contract of the cart manager, reads map anything unusable to "absent" and
//! writes never propagate errors to the caller — failures only reach the
//! logs. The slots are caches of in-memory state, not a second owner of it.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use thiserror::Error;

use chipper_core::auth::TokenStore;
use chipper_core::cart::{Cart, CartStore};

const CART_SLOT: &str = "chipper_cart.json";
const TOKEN_SLOT: &str = "chipper_token";

#[derive(Debug, Error)]
enum SlotError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid snapshot: {0}")]
    Json(#[from] serde_json::Error),
}

/// Store rooted at a data directory, created lazily on the first write. A
/// read-only or missing directory degrades to an empty store.
#[derive(Debug, Clone)]
pub struct LocalStore {
    dir: PathBuf,
}

impl LocalStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn slot_path(&self, slot: &str) -> PathBuf {
        self.dir.join(slot)
    }

    fn read_slot(&self, path: &Path) -> Result<Option<String>, SlotError> {
        match fs::read_to_string(path) {
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn write_slot(&self, path: &Path, contents: &str) -> Result<(), SlotError> {
        fs::create_dir_all(&self.dir)?;
        fs::write(path, contents)?;
        Ok(())
    }

    fn remove_slot(&self, path: &Path) {
        if let Err(err) = fs::remove_file(path) {
            if err.kind() != io::ErrorKind::NotFound {
                warn!("could not clear slot {}: {err}", path.display());
            }
        }
    }
}

impl CartStore for LocalStore {
    fn save(&self, cart: &Cart) {
        let path = self.slot_path(CART_SLOT);
        let serialized = match serde_json::to_string(cart) {
            Ok(serialized) => serialized,
            Err(err) => {
                warn!("cart snapshot did not serialize, keeping in-memory state only: {err}");
                return;
            }
        };
        match self.write_slot(&path, &serialized) {
            Ok(()) => debug!("cart snapshot written ({} lines)", cart.lines.len()),
            Err(err) => {
                warn!("cart snapshot write failed, keeping in-memory state only: {err}");
            }
        }
    }

    fn load(&self) -> Cart {
        let path = self.slot_path(CART_SLOT);
        let raw = match self.read_slot(&path) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Cart::default(),
            Err(err) => {
                warn!("cart snapshot unreadable, starting empty: {err}");
                return Cart::default();
            }
        };
        match serde_json::from_str(&raw) {
            Ok(cart) => cart,
            Err(err) => {
                // Corrupt data is "no cart", never an error to propagate.
                warn!("cart snapshot corrupt, starting empty: {err}");
                Cart::default()
            }
        }
    }
}

impl TokenStore for LocalStore {
    fn load_token(&self) -> Option<String> {
        match self.read_slot(&self.slot_path(TOKEN_SLOT)) {
            Ok(raw) => raw
                .map(|token| token.trim().to_string())
                .filter(|token| !token.is_empty()),
            Err(err) => {
                warn!("token slot unreadable, treating as signed out: {err}");
                None
            }
        }
    }

    fn save_token(&self, token: &str) {
        if let Err(err) = self.write_slot(&self.slot_path(TOKEN_SLOT), token) {
            warn!("token write failed, session will not survive restart: {err}");
        }
    }

    fn clear_token(&self) {
        self.remove_slot(&self.slot_path(TOKEN_SLOT));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chipper_core::cart::CartLine;
    use chipper_core::products::Product;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn sample_cart() -> Cart {
        Cart {
            lines: vec![CartLine {
                local_id: Uuid::new_v4(),
                remote_id: Some(7),
                product: Product {
                    id: 1,
                    name: "Mug".to_string(),
                    description: None,
                    price: dec!(4.50),
                    image_url: String::new(),
                    stock: 3,
                    category_id: None,
                    category: None,
                },
                quantity: 2,
                revision: 4,
            }],
        }
    }

    #[test]
    fn cart_round_trip_preserves_lines() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());

        let cart = sample_cart();
        store.save(&cart);
        let loaded = store.load();

        assert_eq!(loaded, cart);
        assert_eq!(loaded.line_for_product(1).map(|l| l.quantity), Some(2));
    }

    #[test]
    fn missing_slot_loads_an_empty_cart() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path().join("never-written"));
        assert!(store.load().is_empty());
    }

    #[test]
    fn corrupt_slot_loads_an_empty_cart() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());
        std::fs::write(dir.path().join(CART_SLOT), "{definitely not json").unwrap();
        assert!(store.load().is_empty());
    }

    #[test]
    fn save_into_unwritable_directory_is_a_silent_no_op() {
        let dir = tempfile::tempdir().unwrap();
        // A file where the directory should be makes create_dir_all fail.
        let blocked = dir.path().join("blocked");
        std::fs::write(&blocked, "file").unwrap();
        let store = LocalStore::new(&blocked);
        store.save(&sample_cart());
        assert!(store.load().is_empty());
    }

    #[test]
    fn token_slot_set_get_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());

        assert!(store.load_token().is_none());
        store.save_token("abc.def.ghi\n");
        assert_eq!(store.load_token().as_deref(), Some("abc.def.ghi"));
        store.clear_token();
        assert!(store.load_token().is_none());
    }

    #[test]
    fn blank_token_counts_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());
        store.save_token("   ");
        assert!(store.load_token().is_none());
    }
}
