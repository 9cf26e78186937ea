//! # cart-core
//!
//! Session-scoped service cart for a services marketplace.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        ServiceCart                            │
//! │  ┌─────────────┐  ┌──────────────┐  ┌──────────────────────┐  │
//! │  │  CartItem   │  │ SessionStore │  │   PriceResolver      │  │
//! │  │ normalizer  │──│  (per-visitor│  │   (Strategy, used by │  │
//! │  │             │  │   key/value) │  │    the endpoints)    │  │
//! │  └─────────────┘  └──────────────┘  └──────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The cart is a plain ordered list stored under one session key. Every read
//! re-validates what is stored; every write replaces the whole list.

pub mod cart;
pub mod error;
pub mod item;
pub mod nonce;
pub mod notice;
pub mod pricing;
pub mod session;

pub use cart::{ServiceCart, SESSION_KEY};
pub use error::{CartError, Result};
pub use item::{CartItem, NewCartItem};
pub use nonce::{NonceAction, NonceSigner};
pub use notice::{Notice, NoticeCode, NoticeKind};
pub use pricing::{PriceQuery, PriceResolver};
pub use session::{MemorySessionStore, Session, SessionId, SessionStore};
