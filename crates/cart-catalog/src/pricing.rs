//! Price Resolution
//!
//! Turns a `PriceQuery` into a frozen cart price: the pluggable resolver is
//! asked first, then the service metadata is scanned in a fixed order.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;
use std::sync::Arc;

use cart_core::{PriceQuery, PriceResolver, Result as CoreResult};

use crate::catalog::ServiceCatalog;
use crate::error::Result;

/// Metadata fields holding a service price, highest priority first
pub const PRICE_META_KEYS: [&str; 4] = ["_price", "_service_price", "_regular_price", "price"];

/// Resolver chain: pluggable resolver, then catalogue metadata
pub struct PriceResolution {
    resolver: Option<Arc<dyn PriceResolver>>,
    catalog: Arc<dyn ServiceCatalog>,
}

impl PriceResolution {
    /// Metadata-only resolution
    pub fn new(catalog: Arc<dyn ServiceCatalog>) -> Self {
        Self {
            resolver: None,
            catalog,
        }
    }

    /// Resolution with a pluggable resolver consulted first
    pub fn with_resolver(catalog: Arc<dyn ServiceCatalog>, resolver: Arc<dyn PriceResolver>) -> Self {
        Self {
            resolver: Some(resolver),
            catalog,
        }
    }

    /// Resolve a non-negative price, or `None` when no source yields one.
    pub async fn resolve(&self, query: &PriceQuery) -> Result<Option<Decimal>> {
        if let Some(resolver) = &self.resolver {
            match resolver.resolve(query).await? {
                Some(price) if price >= Decimal::ZERO => {
                    tracing::debug!(
                        service_id = query.service_id,
                        resolver = resolver.name(),
                        price = %price,
                        "Price from resolver"
                    );
                    return Ok(Some(price));
                }
                Some(price) => {
                    tracing::debug!(
                        service_id = query.service_id,
                        resolver = resolver.name(),
                        price = %price,
                        "Ignoring negative resolver price"
                    );
                }
                None => {}
            }
        }

        let service = self.catalog.get_service(query.service_id).await?;
        let meta = service.map(|s| s.meta).unwrap_or_default();

        if let Some(price) = price_from_meta(&meta) {
            return Ok(Some(price));
        }

        tracing::warn!(
            service_id = query.service_id,
            meta = %serde_json::to_string(&meta).unwrap_or_default(),
            "Could not find price for service"
        );
        Ok(None)
    }
}

/// First numeric, non-negative value among [`PRICE_META_KEYS`]
pub fn price_from_meta(meta: &std::collections::BTreeMap<String, Value>) -> Option<Decimal> {
    PRICE_META_KEYS
        .iter()
        .filter_map(|key| meta.get(*key))
        .filter_map(numeric)
        .find(|price| *price >= Decimal::ZERO)
}

fn numeric(value: &Value) -> Option<Decimal> {
    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return None,
    };
    if text.is_empty() {
        return None;
    }
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}

/// Prices a package plus its add-ons from the catalogue
///
/// Only answers queries that name a package the service defines; everything
/// else is left to the metadata fallback. Unknown add-on ids are ignored.
pub struct PackagePriceResolver {
    catalog: Arc<dyn ServiceCatalog>,
}

impl PackagePriceResolver {
    pub fn new(catalog: Arc<dyn ServiceCatalog>) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl PriceResolver for PackagePriceResolver {
    async fn resolve(&self, query: &PriceQuery) -> CoreResult<Option<Decimal>> {
        let Some(package_key) = query.package_key.as_deref() else {
            return Ok(None);
        };

        let service = self
            .catalog
            .get_service(query.service_id)
            .await
            .map_err(|e| cart_core::CartError::Pricing(e.to_string()))?;
        let Some(service) = service else {
            return Ok(None);
        };
        let Some(package) = service.package(package_key) else {
            return Ok(None);
        };

        let addons: Decimal = query
            .addon_ids
            .iter()
            .filter_map(|id| service.addon(*id))
            .map(|a| a.price)
            .sum();

        Ok(Some(package.price + addons))
    }

    fn name(&self) -> &str {
        "package"
    }
}
