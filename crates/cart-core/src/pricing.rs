//! Price Resolution Strategy
//!
//! Prices are always computed server-side when an item is added. The
//! `PriceResolver` trait is the pluggable calculator consulted first; the
//! catalogue metadata fallback lives in `cart-catalog`.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// What is being priced
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceQuery {
    pub service_id: u64,
    pub package_key: Option<String>,
    pub addon_ids: Vec<u64>,
}

impl PriceQuery {
    pub const fn new(service_id: u64) -> Self {
        Self {
            service_id,
            package_key: None,
            addon_ids: Vec::new(),
        }
    }
}

/// Price calculator (Strategy pattern)
///
/// Return `Ok(None)` to defer to the next price source. A negative price is
/// treated the same as `None` by callers.
#[async_trait]
pub trait PriceResolver: Send + Sync {
    async fn resolve(&self, query: &PriceQuery) -> Result<Option<Decimal>>;

    /// Resolver name for logs
    fn name(&self) -> &str;
}
