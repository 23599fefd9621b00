//! Cart state: the aggregate model and the in-process state manager.

mod model;
mod service;

pub use model::{Cart, CartLine};
pub use service::{CartService, CartStore, CartSyncApi, CartSyncError, RemoteLineAck};
