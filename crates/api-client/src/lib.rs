//! REST client for the Chipper storefront backend.
//!
//! Covers auth, the product/category catalog, orders, and the remote cart
//! line endpoints. [`ApiClient`] also implements the core crate's
//! [`CartSyncApi`](chipper_core::cart::CartSyncApi) seam, so the cart manager
//! can mirror mutations to the backend without depending on this crate.

mod client;
mod error;
mod types;

pub use client::ApiClient;
pub use error::{ApiError, Result};
pub use types::{CartResponse, RemoteCartLine, TokenResponse};
