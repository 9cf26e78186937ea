//! Add-to-Cart Processing
//!
//! Shared by the form and async transports. Checks run in a fixed order and
//! the first failure decides the outcome:
//!
//! ```text
//! token ─▶ login ─▶ service id ─▶ price ─▶ add_item
//!   │        │          │           │         │
//! security  login_    invalid_   price_     added
//!           required  service    error
//! ```

use cart_core::{NewCartItem, NonceAction, NoticeCode, PriceQuery};

use crate::error::AppError;
use crate::state::AppState;
use crate::visitor::Visitor;

/// Parsed add-to-cart form
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AddToCartForm {
    pub token: String,

    /// Raw service id, `0` when missing or unparseable
    pub service_id: i64,

    pub package_key: Option<String>,

    /// Positive add-on ids in submission order, duplicates removed
    pub addon_ids: Vec<i64>,
}

impl AddToCartForm {
    /// Build from urlencoded pairs, where `service_addons[]` may repeat
    pub fn from_pairs(pairs: &[(String, String)]) -> Self {
        let mut form = Self::default();
        for (name, value) in pairs {
            match name.as_str() {
                "_token" => form.token = value.trim().to_string(),
                "service_id" => form.service_id = value.trim().parse().unwrap_or(0),
                "service_package" => {
                    let key = value.trim();
                    form.package_key = (!key.is_empty()).then(|| key.to_string());
                }
                "service_addons[]" | "service_addons" => {
                    if let Ok(id) = value.trim().parse::<i64>() {
                        if id > 0 && !form.addon_ids.contains(&id) {
                            form.addon_ids.push(id);
                        }
                    }
                }
                _ => {}
            }
        }
        form
    }

    fn price_query(&self, service_id: u64) -> PriceQuery {
        PriceQuery {
            service_id,
            package_key: self.package_key.clone(),
            addon_ids: self
                .addon_ids
                .iter()
                .filter_map(|id| u64::try_from(*id).ok())
                .collect(),
        }
    }
}

/// Validate and apply one add-to-cart request.
///
/// Validation failures are returned as the outcome code; only internal
/// failures are errors.
pub async fn process_add_to_cart(
    state: &AppState,
    visitor: &Visitor,
    form: &AddToCartForm,
) -> Result<NoticeCode, AppError> {
    if !state
        .nonces
        .verify(NonceAction::AddToCart, &visitor.session_id, &form.token)
    {
        return Ok(NoticeCode::Security);
    }

    if state.config.require_login && !visitor.is_authenticated() {
        return Ok(NoticeCode::LoginRequired);
    }

    let Some(service_id) = u64::try_from(form.service_id).ok().filter(|id| *id > 0) else {
        return Ok(NoticeCode::InvalidService);
    };

    let Some(price) = state.pricing.resolve(&form.price_query(service_id)).await? else {
        return Ok(NoticeCode::PriceError);
    };

    let mut item = NewCartItem::new(form.service_id, price).with_addons(form.addon_ids.iter().copied());
    if let Some(key) = &form.package_key {
        item = item.with_package(key.clone());
    }
    state.cart(visitor).add_item(item)?;

    Ok(NoticeCode::Added)
}
