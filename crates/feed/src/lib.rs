//! Live event feed from the storefront backend.
//!
//! The backend pushes order and catalog mutations over a WebSocket so open
//! UIs can update without polling. [`FeedClient`] owns the connection with an
//! explicit `connect`/`disconnect` lifecycle and fans decoded events out over
//! a broadcast channel; there is no module-level singleton.

mod client;
mod events;

pub use client::{FeedClient, FeedError};
pub use events::{DeletedId, StockUpdate, StoreEvent};
