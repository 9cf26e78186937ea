//! Cart Items
//!
//! A cart item is one service selection with a price frozen at add time.
//! Items only exist in normalized form: `service_id > 0`, `price >= 0`,
//! add-on ids positive and unique.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;
use uuid::Uuid;

/// One purchasable line of the service cart
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    /// Referenced service entity
    pub service_id: u64,

    /// Pricing tier, `None` for the default package
    pub package_key: Option<String>,

    /// Selected add-ons, in selection order
    pub addon_ids: Vec<u64>,

    /// Price resolved when the item was added
    pub price: Decimal,

    /// Stable line key, absent on items stored before keys existed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<Uuid>,
}

/// Unvalidated input for [`crate::ServiceCart::add_item`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewCartItem {
    pub service_id: i64,
    pub package_key: Option<String>,
    pub addon_ids: Vec<i64>,
    pub price: Decimal,
}

impl NewCartItem {
    pub const fn new(service_id: i64, price: Decimal) -> Self {
        Self {
            service_id,
            package_key: None,
            addon_ids: Vec::new(),
            price,
        }
    }

    #[must_use]
    pub fn with_package(mut self, package_key: impl Into<String>) -> Self {
        self.package_key = Some(package_key.into());
        self
    }

    #[must_use]
    pub fn with_addons(mut self, addon_ids: impl IntoIterator<Item = i64>) -> Self {
        self.addon_ids = addon_ids.into_iter().collect();
        self
    }
}

impl CartItem {
    /// Normalize fresh input, assigning a new line key.
    ///
    /// Returns `None` when the service id is not positive or the price is
    /// negative.
    pub fn from_new(input: NewCartItem) -> Option<Self> {
        let service_id = u64::try_from(input.service_id).ok().filter(|id| *id > 0)?;
        if input.price < Decimal::ZERO {
            return None;
        }

        Some(Self {
            service_id,
            package_key: normalize_package(input.package_key),
            addon_ids: normalize_addons(input.addon_ids),
            price: input.price,
            key: Some(Uuid::new_v4()),
        })
    }

    /// Re-validate a stored entry.
    ///
    /// Stored data may have drifted (older formats, numeric strings, manual
    /// edits), so every field is coerced leniently and the entry is dropped
    /// only when the invariants cannot be restored. A missing price reads as
    /// zero; an unparseable one drops the entry.
    pub fn from_stored(raw: &Value) -> Option<Self> {
        let obj = raw.as_object()?;

        let service_id = obj
            .get("service_id")
            .and_then(coerce_int)
            .and_then(|id| u64::try_from(id).ok())
            .filter(|id| *id > 0)?;

        let price = match obj.get("price") {
            None | Some(Value::Null) => Decimal::ZERO,
            Some(value) => coerce_decimal(value)?,
        };
        if price < Decimal::ZERO {
            return None;
        }

        let package_key = match obj.get("package_key") {
            Some(Value::String(s)) => normalize_package(Some(s.clone())),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };

        let addon_ids = obj
            .get("addon_ids")
            .and_then(Value::as_array)
            .map(|values| normalize_addons(values.iter().filter_map(coerce_int)))
            .unwrap_or_default();

        let key = obj
            .get("key")
            .and_then(Value::as_str)
            .and_then(|s| Uuid::parse_str(s).ok());

        Some(Self {
            service_id,
            package_key,
            addon_ids,
            price,
            key,
        })
    }
}

fn normalize_package(package_key: Option<String>) -> Option<String> {
    package_key
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
}

fn normalize_addons(ids: impl IntoIterator<Item = i64>) -> Vec<u64> {
    let mut out: Vec<u64> = Vec::new();
    for id in ids {
        if let Ok(id) = u64::try_from(id) {
            if id > 0 && !out.contains(&id) {
                out.push(id);
            }
        }
    }
    out
}

fn coerce_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_u64().and_then(|u| i64::try_from(u).ok())),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn coerce_decimal(value: &Value) -> Option<Decimal> {
    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return None,
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}
