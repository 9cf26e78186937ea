//! Service Cart
//!
//! The only component that reads or writes the cart key of a session.
//! A `ServiceCart` is bound to one session and is cheap to construct, so
//! callers build one per request.

use rust_decimal::Decimal;
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::Result;
use crate::item::{CartItem, NewCartItem};
use crate::session::{SessionId, SessionStore};

/// Session key holding the cart list
pub const SESSION_KEY: &str = "service_cart";

/// Session-scoped list of pending service purchases
#[derive(Clone)]
pub struct ServiceCart {
    store: Arc<dyn SessionStore>,
    session: SessionId,
}

impl ServiceCart {
    pub fn new(store: Arc<dyn SessionStore>, session: SessionId) -> Self {
        Self { store, session }
    }

    pub const fn session(&self) -> &SessionId {
        &self.session
    }

    /// Append an item to the end of the cart.
    ///
    /// Input that fails normalization is dropped without error; only store
    /// failures are reported.
    pub fn add_item(&self, input: NewCartItem) -> Result<()> {
        let Some(item) = CartItem::from_new(input) else {
            tracing::debug!(session = %self.session, "Ignoring invalid cart item");
            return Ok(());
        };
        let entry = serde_json::to_value(&item)?;

        self.store.update(&self.session, SESSION_KEY, &mut |raw| {
            let mut items: Vec<Value> = read_items(raw)
                .into_iter()
                .map(|i| serde_json::to_value(i).unwrap_or(Value::Null))
                .collect();
            items.push(entry.clone());
            Value::Array(items)
        })?;

        tracing::info!(
            session = %self.session,
            service_id = item.service_id,
            price = %item.price,
            "Added service to cart"
        );
        Ok(())
    }

    /// Current items in insertion order.
    ///
    /// Never fails: store errors are logged and read as an empty cart.
    pub fn get_cart(&self) -> Vec<CartItem> {
        match self.store.get(&self.session, SESSION_KEY) {
            Ok(raw) => read_items(raw.as_ref()),
            Err(e) => {
                tracing::warn!(session = %self.session, error = %e, "Failed to read cart");
                Vec::new()
            }
        }
    }

    /// Remove the item at `index` (0-based, read order). Out of range is a no-op.
    pub fn remove_item(&self, index: usize) -> Result<()> {
        self.rewrite(|items| {
            if index < items.len() {
                items.remove(index);
            }
        })
    }

    /// Remove the item carrying `key`, returning whether one was removed.
    pub fn remove_by_key(&self, key: Uuid) -> Result<bool> {
        let mut removed = false;
        self.rewrite(|items| {
            if let Some(pos) = items.iter().position(|i| i.key == Some(key)) {
                items.remove(pos);
                removed = true;
            }
        })?;
        Ok(removed)
    }

    /// Reset the cart to empty.
    pub fn clear(&self) -> Result<()> {
        self.store
            .set(&self.session, SESSION_KEY, Value::Array(Vec::new()))
    }

    /// Sum of frozen prices, zero for an empty cart.
    pub fn get_total(&self) -> Decimal {
        self.get_cart().iter().map(|i| i.price).sum()
    }

    pub fn len(&self) -> usize {
        self.get_cart().len()
    }

    pub fn is_empty(&self) -> bool {
        self.get_cart().is_empty()
    }

    fn rewrite(&self, mut f: impl FnMut(&mut Vec<CartItem>)) -> Result<()> {
        self.store.update(&self.session, SESSION_KEY, &mut |raw| {
            let mut items = read_items(raw);
            f(&mut items);
            Value::Array(
                items
                    .iter()
                    .map(|i| serde_json::to_value(i).unwrap_or(Value::Null))
                    .collect(),
            )
        })
    }
}

fn read_items(raw: Option<&Value>) -> Vec<CartItem> {
    raw.and_then(Value::as_array)
        .map(|entries| entries.iter().filter_map(CartItem::from_stored).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MemorySessionStore;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn cart() -> (Arc<MemorySessionStore>, ServiceCart) {
        let store = Arc::new(MemorySessionStore::new());
        let cart = ServiceCart::new(store.clone(), SessionId::new());
        (store, cart)
    }

    #[test]
    fn test_empty_cart() {
        let (_, cart) = cart();
        assert!(cart.is_empty());
        assert_eq!(cart.get_total(), Decimal::ZERO);
    }

    #[test]
    fn test_add_single_item() {
        let (_, cart) = cart();

        cart.add_item(NewCartItem::new(42, dec!(19.99))).unwrap();

        let items = cart.get_cart();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].service_id, 42);
        assert_eq!(items[0].package_key, None);
        assert!(items[0].addon_ids.is_empty());
        assert_eq!(items[0].price, dec!(19.99));
        assert_eq!(cart.get_total(), dec!(19.99));
    }

    #[test]
    fn test_adds_keep_order_and_duplicates() {
        let (_, cart) = cart();
        let prices = [dec!(10), dec!(2.50), dec!(10), dec!(0)];

        for (i, price) in prices.iter().enumerate() {
            cart.add_item(NewCartItem::new(i as i64 + 1, *price)).unwrap();
        }
        cart.add_item(NewCartItem::new(1, dec!(10))).unwrap();

        let ids: Vec<u64> = cart.get_cart().iter().map(|i| i.service_id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 1]);
        assert_eq!(cart.get_total(), dec!(32.50));
    }

    #[test]
    fn test_invalid_add_leaves_cart_unchanged() {
        let (_, cart) = cart();
        cart.add_item(NewCartItem::new(1, dec!(5))).unwrap();

        cart.add_item(NewCartItem::new(0, dec!(5))).unwrap();
        cart.add_item(NewCartItem::new(-1, dec!(5))).unwrap();
        cart.add_item(NewCartItem::new(2, dec!(-5))).unwrap();

        assert_eq!(cart.len(), 1);
    }

    #[test]
    fn test_remove_by_index() {
        let (_, cart) = cart();
        cart.add_item(NewCartItem::new(1, dec!(1))).unwrap();
        cart.add_item(NewCartItem::new(2, dec!(2))).unwrap();

        cart.remove_item(0).unwrap();

        let items = cart.get_cart();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].service_id, 2);
    }

    #[test]
    fn test_remove_out_of_range_is_noop() {
        let (_, cart) = cart();
        cart.add_item(NewCartItem::new(1, dec!(1))).unwrap();

        cart.remove_item(1).unwrap();
        cart.remove_item(usize::MAX).unwrap();

        assert_eq!(cart.len(), 1);
    }

    #[test]
    fn test_remove_by_key() {
        let (_, cart) = cart();
        cart.add_item(NewCartItem::new(1, dec!(1))).unwrap();
        cart.add_item(NewCartItem::new(2, dec!(2))).unwrap();
        let key = cart.get_cart()[1].key.unwrap();

        assert!(cart.remove_by_key(key).unwrap());
        assert!(!cart.remove_by_key(key).unwrap());

        let ids: Vec<u64> = cart.get_cart().iter().map(|i| i.service_id).collect();
        assert_eq!(ids, vec![1]);
    }

    #[test]
    fn test_clear_is_idempotent() {
        let (_, cart) = cart();
        cart.add_item(NewCartItem::new(1, dec!(1))).unwrap();

        cart.clear().unwrap();
        assert!(cart.is_empty());
        cart.clear().unwrap();
        assert!(cart.is_empty());
        assert_eq!(cart.get_total(), Decimal::ZERO);
    }

    #[test]
    fn test_corrupt_entries_are_skipped_on_read() {
        let (store, cart) = cart();
        store
            .set(
                cart.session(),
                SESSION_KEY,
                json!([
                    {"service_id": 3, "price": "4.00"},
                    {"service_id": 0, "price": "4.00"},
                    "garbage",
                    {"service_id": 5, "price": -1},
                    {"service_id": "6", "price": 2}
                ]),
            )
            .unwrap();

        let ids: Vec<u64> = cart.get_cart().iter().map(|i| i.service_id).collect();
        assert_eq!(ids, vec![3, 6]);
        assert_eq!(cart.get_total(), dec!(6));
    }

    #[test]
    fn test_non_list_value_reads_empty() {
        let (store, cart) = cart();
        store.set(cart.session(), SESSION_KEY, json!({"x": 1})).unwrap();
        assert!(cart.is_empty());

        cart.add_item(NewCartItem::new(1, dec!(1))).unwrap();
        assert_eq!(cart.len(), 1);
    }

    #[test]
    fn test_carts_are_scoped_per_session() {
        let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
        let a = ServiceCart::new(store.clone(), SessionId::new());
        let b = ServiceCart::new(store, SessionId::new());

        a.add_item(NewCartItem::new(1, dec!(1))).unwrap();

        assert_eq!(a.len(), 1);
        assert!(b.is_empty());
    }

    #[test]
    fn test_concurrent_adds_are_not_lost() {
        let (_, cart) = cart();

        std::thread::scope(|scope| {
            for id in 1..=32 {
                let cart = cart.clone();
                scope.spawn(move || cart.add_item(NewCartItem::new(id, dec!(1))).unwrap());
            }
        });

        assert_eq!(cart.len(), 32);
        assert_eq!(cart.get_total(), dec!(32));
        let mut ids: Vec<u64> = cart.get_cart().iter().map(|i| i.service_id).collect();
        ids.sort_unstable();
        assert_eq!(ids, (1..=32).collect::<Vec<u64>>());
    }
}
