//! Chipper client core: domain models, cart state, and session handling.
//!
//! This crate is transport-agnostic. The REST client, the local store and the
//! live event feed live in sibling crates and plug in through the trait seams
//! defined here ([`cart::CartSyncApi`], [`cart::CartStore`],
//! [`auth::TokenStore`]); the application binary wires everything together.

pub mod auth;
pub mod cart;
pub mod orders;
pub mod products;
pub mod reviews;

pub use auth::{decode_token, AuthManager, AuthSession, TokenDecodeError, TokenStore};
pub use cart::{Cart, CartLine, CartService, CartStore, CartSyncApi, CartSyncError, RemoteLineAck};
pub use orders::{NewOrder, Order, OrderStatus};
pub use products::{Category, CategoryPayload, Product, ProductPayload};
pub use reviews::{average_rating, Review, ReviewPayload, Reviewer};
