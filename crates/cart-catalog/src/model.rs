//! Domain Models
//!
//! Service entities as published by the marketplace. Uses `rust_decimal`
//! for all monetary values.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A purchasable service listing
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Service {
    /// Catalogue identifier
    pub id: u64,

    /// Display title
    pub title: String,

    /// Thumbnail image URL
    pub thumbnail_url: Option<String>,

    /// Public page of the service
    pub permalink: String,

    /// Free-form metadata (price fields live here for legacy listings)
    #[serde(default)]
    pub meta: BTreeMap<String, Value>,

    /// Pricing tiers
    #[serde(default)]
    pub packages: Vec<Package>,

    /// Optional extras
    #[serde(default)]
    pub addons: Vec<Addon>,
}

/// A pricing tier of a service
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    pub key: String,
    pub title: String,
    pub price: Decimal,
}

/// An optional extra that can be bought with a service
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Addon {
    pub id: u64,
    pub title: String,
    pub price: Decimal,
}

impl Service {
    pub fn new(id: u64, title: impl Into<String>, permalink: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            thumbnail_url: None,
            permalink: permalink.into(),
            meta: BTreeMap::new(),
            packages: Vec::new(),
            addons: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_thumbnail(mut self, url: impl Into<String>) -> Self {
        self.thumbnail_url = Some(url.into());
        self
    }

    #[must_use]
    pub fn with_meta(mut self, key: impl Into<String>, value: Value) -> Self {
        self.meta.insert(key.into(), value);
        self
    }

    #[must_use]
    pub fn with_package(mut self, key: impl Into<String>, title: impl Into<String>, price: Decimal) -> Self {
        self.packages.push(Package {
            key: key.into(),
            title: title.into(),
            price,
        });
        self
    }

    #[must_use]
    pub fn with_addon(mut self, id: u64, title: impl Into<String>, price: Decimal) -> Self {
        self.addons.push(Addon {
            id,
            title: title.into(),
            price,
        });
        self
    }

    pub fn package(&self, key: &str) -> Option<&Package> {
        self.packages.iter().find(|p| p.key == key)
    }

    pub fn addon(&self, id: u64) -> Option<&Addon> {
        self.addons.iter().find(|a| a.id == id)
    }
}
