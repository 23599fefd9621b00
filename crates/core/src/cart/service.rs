//! Cart state manager: the single in-process authority for cart contents.
//!
//! Mutations land in memory first, are persisted through the [`CartStore`] on
//! every change, and are mirrored to the backend through the [`CartSyncApi`]
//! as fire-and-forget tasks when a session token is available. A sync failure
//! never blocks or reverts a local mutation: the cart must stay usable
//! offline, and a network hiccup must never make an action silently disappear
//! from the UI.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use log::{debug, warn};
use rust_decimal::Decimal;
use thiserror::Error;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::model::{Cart, CartLine};
use crate::auth::AuthManager;
use crate::products::Product;

/// Error raised by a [`CartSyncApi`] implementation. The service logs it and
/// moves on; it never reaches the mutating caller.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct CartSyncError {
    pub message: String,
}

impl CartSyncError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Acknowledgement of a remote add: the backend's identity for the line.
#[derive(Debug, Clone, Copy)]
pub struct RemoteLineAck {
    pub remote_id: i64,
}

/// Backend cart-line endpoints. One attempt per call, no retry or backoff;
/// quantities are absolute on the wire, never deltas.
#[async_trait]
pub trait CartSyncApi: Send + Sync {
    async fn add_line(
        &self,
        token: &str,
        product_id: i64,
        quantity: u32,
    ) -> Result<RemoteLineAck, CartSyncError>;

    async fn set_line_quantity(
        &self,
        token: &str,
        remote_id: i64,
        quantity: u32,
    ) -> Result<(), CartSyncError>;

    async fn remove_line(&self, token: &str, remote_id: i64) -> Result<(), CartSyncError>;

    async fn clear_lines(&self, token: &str) -> Result<(), CartSyncError>;
}

/// Durable slot for the serialized cart snapshot.
///
/// `save` must swallow its own failures and `load` must map a missing or
/// corrupt snapshot to an empty cart; neither may fail the cart manager.
pub trait CartStore: Send + Sync {
    fn save(&self, cart: &Cart);
    fn load(&self) -> Cart;
}

/// Remote effect decided while the state lock was held.
enum Dispatch {
    Add {
        product_id: i64,
        quantity: u32,
        revision: u64,
    },
    SetQuantity {
        remote_id: i64,
        quantity: u32,
    },
    Remove {
        remote_id: i64,
    },
    Clear,
    None,
}

pub struct CartService {
    state: Arc<Mutex<Cart>>,
    store: Arc<dyn CartStore>,
    sync: Arc<dyn CartSyncApi>,
    auth: Arc<AuthManager>,
    pending: Mutex<Vec<JoinHandle<()>>>,
}

impl CartService {
    /// Build the service, loading the persisted snapshot as the initial state.
    pub fn new(
        store: Arc<dyn CartStore>,
        sync: Arc<dyn CartSyncApi>,
        auth: Arc<AuthManager>,
    ) -> Self {
        let initial = store.load();
        Self {
            state: Arc::new(Mutex::new(initial)),
            store,
            sync,
            auth,
            pending: Mutex::new(Vec::new()),
        }
    }

    /// Snapshot of the current cart.
    pub fn cart(&self) -> Cart {
        lock(&self.state).clone()
    }

    pub fn total(&self) -> Decimal {
        lock(&self.state).total()
    }

    pub fn item_count(&self) -> u32 {
        lock(&self.state).item_count()
    }

    /// Add `quantity` of `product`. An existing line for the same product is
    /// incremented; otherwise a new line is appended with a fresh local id.
    /// No upper bound is enforced locally — stock validation belongs to the
    /// backend and surfaces at checkout.
    pub fn add_item(&self, product: &Product, quantity: u32) {
        if quantity == 0 {
            debug!("ignoring add of zero {}", product.name);
            return;
        }

        let (snapshot, dispatch) = {
            let mut cart = lock(&self.state);
            let dispatch = match cart
                .lines
                .iter_mut()
                .find(|line| line.product_id() == product.id)
            {
                Some(line) => {
                    line.quantity += quantity;
                    line.revision += 1;
                    line.product = product.clone();
                    match line.remote_id {
                        Some(remote_id) => Dispatch::SetQuantity {
                            remote_id,
                            quantity: line.quantity,
                        },
                        None => Dispatch::Add {
                            product_id: product.id,
                            quantity: line.quantity,
                            revision: line.revision,
                        },
                    }
                }
                None => {
                    cart.lines.push(CartLine {
                        local_id: Uuid::new_v4(),
                        remote_id: None,
                        product: product.clone(),
                        quantity,
                        revision: 1,
                    });
                    Dispatch::Add {
                        product_id: product.id,
                        quantity,
                        revision: 1,
                    }
                }
            };
            (cart.clone(), dispatch)
        };

        self.store.save(&snapshot);
        self.dispatch(dispatch);
    }

    /// Set the absolute quantity of a line. A quantity below one is
    /// equivalent to [`remove_item`](Self::remove_item).
    pub fn update_quantity(&self, local_id: Uuid, quantity: u32) {
        if quantity < 1 {
            self.remove_item(local_id);
            return;
        }

        let (snapshot, dispatch) = {
            let mut cart = lock(&self.state);
            let Some(line) = cart.lines.iter_mut().find(|line| line.local_id == local_id) else {
                debug!("update for unknown cart line {local_id}, ignoring");
                return;
            };
            line.quantity = quantity;
            line.revision += 1;
            let dispatch = match line.remote_id {
                Some(remote_id) => Dispatch::SetQuantity { remote_id, quantity },
                // The backend has not acknowledged this line yet, so there is
                // no remote identity to address. The pending add ack will be
                // discarded by the revision check.
                None => {
                    debug!("line {local_id} not yet synced, keeping update local");
                    Dispatch::None
                }
            };
            (cart.clone(), dispatch)
        };

        self.store.save(&snapshot);
        self.dispatch(dispatch);
    }

    /// Delete a line. The remote copy is deleted only when the backend knows
    /// about the line; a failed remote delete keeps the local removal.
    pub fn remove_item(&self, local_id: Uuid) {
        let (snapshot, dispatch) = {
            let mut cart = lock(&self.state);
            let Some(index) = cart.lines.iter().position(|line| line.local_id == local_id)
            else {
                debug!("remove for unknown cart line {local_id}, ignoring");
                return;
            };
            let line = cart.lines.remove(index);
            let dispatch = match line.remote_id {
                Some(remote_id) => Dispatch::Remove { remote_id },
                None => Dispatch::None,
            };
            (cart.clone(), dispatch)
        };

        self.store.save(&snapshot);
        self.dispatch(dispatch);
    }

    /// Empty the cart locally and, when a session exists, remotely.
    pub fn clear(&self) {
        let snapshot = {
            let mut cart = lock(&self.state);
            cart.lines.clear();
            cart.clone()
        };
        self.store.save(&snapshot);
        self.dispatch(Dispatch::Clear);
    }

    /// Replay every local line to the backend ("local wins" after login).
    /// Lines the backend already acknowledged get their quantity re-asserted.
    pub fn push_all(&self) {
        let dispatches: Vec<Dispatch> = lock(&self.state)
            .lines
            .iter()
            .map(|line| match line.remote_id {
                Some(remote_id) => Dispatch::SetQuantity {
                    remote_id,
                    quantity: line.quantity,
                },
                None => Dispatch::Add {
                    product_id: line.product_id(),
                    quantity: line.quantity,
                    revision: line.revision,
                },
            })
            .collect();
        for dispatch in dispatches {
            self.dispatch(dispatch);
        }
    }

    /// Await all outstanding remote sync tasks. Mutations never wait on this
    /// themselves; the composition root calls it before exit, and tests use
    /// it to observe sync outcomes deterministically.
    pub async fn flush(&self) {
        loop {
            let handles: Vec<JoinHandle<()>> = {
                let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
                pending.drain(..).collect()
            };
            if handles.is_empty() {
                return;
            }
            for handle in handles {
                if let Err(err) = handle.await {
                    debug!("sync task did not complete: {err}");
                }
            }
        }
    }

    fn dispatch(&self, dispatch: Dispatch) {
        if matches!(dispatch, Dispatch::None) {
            return;
        }
        let Some(token) = self.auth.token() else {
            return;
        };

        let sync = Arc::clone(&self.sync);
        let state = Arc::clone(&self.state);
        let store = Arc::clone(&self.store);

        self.spawn_sync(async move {
            match dispatch {
                Dispatch::Add {
                    product_id,
                    quantity,
                    revision,
                } => match sync.add_line(&token, product_id, quantity).await {
                    Ok(ack) => record_add_ack(&state, &*store, product_id, revision, ack),
                    Err(err) => {
                        warn!("cart sync: add for product {product_id} failed, keeping local line: {err}");
                    }
                },
                Dispatch::SetQuantity { remote_id, quantity } => {
                    if let Err(err) = sync.set_line_quantity(&token, remote_id, quantity).await {
                        warn!("cart sync: quantity update for line {remote_id} failed, keeping local state: {err}");
                    }
                }
                Dispatch::Remove { remote_id } => {
                    if let Err(err) = sync.remove_line(&token, remote_id).await {
                        warn!("cart sync: remote delete for line {remote_id} failed, keeping local removal: {err}");
                    }
                }
                Dispatch::Clear => {
                    if let Err(err) = sync.clear_lines(&token).await {
                        warn!("cart sync: remote clear failed, keeping local state: {err}");
                    }
                }
                Dispatch::None => {}
            }
        });
    }

    fn spawn_sync(&self, task: impl std::future::Future<Output = ()> + Send + 'static) {
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
                pending.retain(|existing| !existing.is_finished());
                pending.push(handle.spawn(task));
            }
            Err(_) => warn!("cart sync skipped: no async runtime available"),
        }
    }
}

fn lock(state: &Mutex<Cart>) -> MutexGuard<'_, Cart> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Apply a remote add acknowledgement, unless the line has moved on since the
/// call was dispatched. Quantities are absolute on the wire, so a discarded
/// ack loses nothing.
fn record_add_ack(
    state: &Mutex<Cart>,
    store: &dyn CartStore,
    product_id: i64,
    revision: u64,
    ack: RemoteLineAck,
) {
    let snapshot = {
        let mut cart = lock(state);
        let Some(line) = cart
            .lines
            .iter_mut()
            .find(|line| line.product_id() == product_id)
        else {
            debug!("add ack for product {product_id} arrived after removal, discarding");
            return;
        };
        if line.revision != revision {
            debug!(
                "stale add ack for product {product_id} (dispatched rev {revision}, now {}), discarding",
                line.revision
            );
            return;
        }
        line.remote_id = Some(ack.remote_id);
        cart.clone()
    };
    store.save(&snapshot);
}
