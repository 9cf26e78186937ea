//! # cart-catalog
//!
//! Service entities and the price resolution chain used when a service is
//! added to the cart.
//!
//! ## Price resolution
//!
//! ```text
//! ┌──────────────────┐   Some(p >= 0)   ┌─────────┐
//! │  PriceResolver   │─────────────────▶│  price  │
//! │  (pluggable)     │                  └─────────┘
//! └────────┬─────────┘                       ▲
//!          │ None / negative                 │ first numeric >= 0
//!          ▼                                 │
//! ┌──────────────────────────────────────────┴──┐
//! │  metadata: _price → _service_price →        │
//! │            _regular_price → price           │
//! └─────────────────────┬───────────────────────┘
//!                       │ nothing usable
//!                       ▼
//!              warn! + price_error
//! ```

pub mod catalog;
pub mod error;
pub mod model;
pub mod pricing;

pub use catalog::{MemoryCatalog, ServiceCatalog};
pub use error::{CatalogError, Result};
pub use model::{Addon, Package, Service};
pub use pricing::{PackagePriceResolver, PriceResolution, PRICE_META_KEYS};
