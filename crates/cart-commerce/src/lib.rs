//! # cart-commerce
//!
//! Checkout hand-off to the host commerce system and post-payment order sync.
//!
//! ## Hand-off Modes
//!
//! ### 1. Host cart (default)
//!
//! **Flow:** Service cart → one host cart line per service → host checkout
//!
//! ```text
//! ┌──────────────┐     ┌─────────────────┐     ┌─────────────────┐
//! │ Service Cart │────▶│    Host Cart    │────▶│  Host Checkout  │
//! │  (session)   │     │ (proxy product) │     │   (payment)     │
//! └──────────────┘     └─────────────────┘     └─────────────────┘
//! ```
//!
//! Each line shows the service's own title, thumbnail and link, and is
//! priced at the frozen cart price. A failure part-way through removes every
//! line added so far and leaves the service cart untouched.
//!
//! ### 2. Direct order
//!
//! **Flow:** Service cart → one pending order with a single fee line → order
//! payment page
//!
//! ```text
//! ┌──────────────┐     ┌──────────────────────────┐     ┌──────────────┐
//! │ Service Cart │────▶│  Order                   │────▶│ Payment Page │
//! │  (session)   │     │  fee: cart total         │     │              │
//! └──────────────┘     │  snapshot: cart items    │     └──────────────┘
//!                      └──────────────────────────┘
//! ```
//!
//! ## Order Sync
//!
//! A signed webhook reports order status changes. The first transition into
//! `paid` or `processing` hands every snapshot item to an
//! [`OrderSyncObserver`], exactly once per order.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use cart_commerce::{CheckoutHandoff, HandoffMode, MemoryCommerce, MemoryOrderStore};
//!
//! let orders = Arc::new(MemoryOrderStore::new());
//! let commerce = Arc::new(MemoryCommerce::new("https://shop.example/checkout", orders));
//! let handoff = CheckoutHandoff::new(commerce, catalog, HandoffMode::HostCart);
//!
//! if let Some(done) = handoff.proceed(&cart).await? {
//!     // Redirect the customer to: done.redirect_url
//! }
//! ```

mod error;
mod handoff;
mod host;
mod order;
mod sync;
mod webhook;

pub use error::{CommerceError, Result};
pub use handoff::{CheckoutHandoff, Handoff, HandoffMode};
pub use host::{HostCartLine, HostCommerce, LineDisplay, LineKey, MemoryCommerce, ProductId};
pub use order::{MemoryOrderStore, Order, OrderDraft, OrderId, OrderLine, OrderStatus, OrderStore};
pub use sync::{OrderSync, OrderSyncObserver, SyncOutcome, TracingObserver};
pub use webhook::{OrderEvent, WebhookVerifier, SIGNATURE_HEADER};
