//! Host Commerce Integration
//!
//! The host commerce system owns the real cart, the orders and the payment
//! flow. Service cart items travel through it as lines of one hidden proxy
//! product; each line carries the original cart item, and its price and
//! identity come from that item rather than from the proxy product.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use cart_catalog::Service;
use cart_core::{CartItem, SessionId};

use crate::error::{CommerceError, Result};
use crate::order::{Order, OrderDraft, OrderLine, OrderStore};

/// Host product identifier
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductId(pub u64);

/// Host cart line identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineKey(pub String);

/// What a host cart line shows instead of the proxy product
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineDisplay {
    pub name: String,
    pub thumbnail_url: Option<String>,
    pub permalink: String,
}

/// One service inside the host cart
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostCartLine {
    /// Proxy product the host cart line is attached to
    pub product_id: ProductId,

    /// Service cart item carried by the line
    pub item: CartItem,

    /// Identity of the referenced service
    pub display: LineDisplay,
}

impl HostCartLine {
    pub fn new(product_id: ProductId, item: CartItem, service: &Service) -> Self {
        let name = item
            .package_key
            .as_deref()
            .and_then(|key| service.package(key))
            .map_or_else(
                || service.title.clone(),
                |package| format!("{} ({})", service.title, package.title),
            );

        Self {
            product_id,
            display: LineDisplay {
                name,
                thumbnail_url: service.thumbnail_url.clone(),
                permalink: service.permalink.clone(),
            },
            item,
        }
    }

    /// Displayed price, always the price frozen at add time
    pub const fn price(&self) -> Decimal {
        self.item.price
    }

    pub fn name(&self) -> &str {
        &self.display.name
    }
}

/// Host commerce system (Strategy pattern)
#[async_trait]
pub trait HostCommerce: Send + Sync {
    /// Hidden zero-priced product all service lines attach to, created on first use
    async fn ensure_proxy_product(&self) -> Result<ProductId>;

    /// Add a line to the visitor's host cart
    async fn add_cart_line(&self, session: &SessionId, line: HostCartLine) -> Result<LineKey>;

    /// Remove a line from the visitor's host cart
    async fn remove_cart_line(&self, session: &SessionId, key: &LineKey) -> Result<()>;

    /// Create a pending payment order
    async fn create_order(&self, draft: OrderDraft) -> Result<Order>;

    /// Host checkout page
    fn checkout_url(&self) -> &str;

    /// Backend name
    fn name(&self) -> &str;
}

/// In-memory host commerce system (for development/testing)
pub struct MemoryCommerce {
    checkout_url: String,
    proxy: Mutex<Option<ProductId>>,
    next_product_id: Mutex<u64>,
    carts: RwLock<HashMap<SessionId, Vec<(LineKey, HostCartLine)>>>,
    orders: Arc<dyn OrderStore>,
}

impl MemoryCommerce {
    pub fn new(checkout_url: impl Into<String>, orders: Arc<dyn OrderStore>) -> Self {
        Self {
            checkout_url: checkout_url.into(),
            proxy: Mutex::new(None),
            next_product_id: Mutex::new(1),
            carts: RwLock::new(HashMap::new()),
            orders,
        }
    }

    /// Lines currently in a visitor's host cart
    pub async fn cart_lines(&self, session: &SessionId) -> Vec<HostCartLine> {
        self.carts
            .read()
            .await
            .get(session)
            .map(|lines| lines.iter().map(|(_, l)| l.clone()).collect())
            .unwrap_or_default()
    }

    /// Host cart total using the overridden line prices
    pub async fn cart_total(&self, session: &SessionId) -> Decimal {
        self.cart_lines(session).await.iter().map(HostCartLine::price).sum()
    }

    /// Host checkout: turn the visitor's host cart into a pending order.
    ///
    /// The snapshot is built from the items the lines carry.
    pub async fn place_order(&self, session: &SessionId) -> Result<Order> {
        let lines = self.carts.write().await.remove(session).unwrap_or_default();
        if lines.is_empty() {
            return Err(CommerceError::Order("host cart is empty".into()));
        }

        let snapshot = lines.iter().map(|(_, l)| l.item.clone()).collect();
        let draft = OrderDraft {
            session_id: session.clone(),
            lines: lines.into_iter().map(|(_, l)| OrderLine::Service(l)).collect(),
            snapshot,
        };
        self.create_order(draft).await
    }
}

#[async_trait]
impl HostCommerce for MemoryCommerce {
    async fn ensure_proxy_product(&self) -> Result<ProductId> {
        let mut proxy = self.proxy.lock().await;
        if let Some(id) = *proxy {
            return Ok(id);
        }

        let mut next = self.next_product_id.lock().await;
        let id = ProductId(*next);
        *next += 1;
        *proxy = Some(id);

        tracing::info!(product_id = id.0, "Created service proxy product");
        Ok(id)
    }

    async fn add_cart_line(&self, session: &SessionId, line: HostCartLine) -> Result<LineKey> {
        let key = LineKey(uuid::Uuid::new_v4().simple().to_string());
        self.carts
            .write()
            .await
            .entry(session.clone())
            .or_default()
            .push((key.clone(), line));
        Ok(key)
    }

    async fn remove_cart_line(&self, session: &SessionId, key: &LineKey) -> Result<()> {
        if let Some(lines) = self.carts.write().await.get_mut(session) {
            lines.retain(|(k, _)| k != key);
        }
        Ok(())
    }

    async fn create_order(&self, draft: OrderDraft) -> Result<Order> {
        let order = Order::from_draft(draft, &self.checkout_url);
        self.orders.save(&order)?;

        tracing::info!(
            order_id = %order.id,
            total = %order.total,
            items = order.snapshot.len(),
            "Created host order"
        );
        Ok(order)
    }

    fn checkout_url(&self) -> &str {
        &self.checkout_url
    }

    fn name(&self) -> &str {
        "MemoryCommerce"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::MemoryOrderStore;
    use cart_core::NewCartItem;
    use rust_decimal_macros::dec;

    fn commerce() -> MemoryCommerce {
        MemoryCommerce::new("/checkout", Arc::new(MemoryOrderStore::new()))
    }

    fn service() -> Service {
        Service::new(7, "Logo Design", "/services/logo")
            .with_thumbnail("/img/logo.jpg")
            .with_meta("_price", serde_json::json!("99"))
            .with_package("premium", "Premium", dec!(149))
    }

    #[tokio::test]
    async fn test_proxy_product_created_once() {
        let commerce = commerce();
        let a = commerce.ensure_proxy_product().await.unwrap();
        let b = commerce.ensure_proxy_product().await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_line_uses_frozen_price_and_service_identity() {
        let item = CartItem::from_new(NewCartItem::new(7, dec!(42)).with_package("premium")).unwrap();

        let line = HostCartLine::new(ProductId(1), item, &service());

        assert_eq!(line.price(), dec!(42));
        assert_eq!(line.name(), "Logo Design (Premium)");
        assert_eq!(line.display.thumbnail_url.as_deref(), Some("/img/logo.jpg"));
        assert_eq!(line.display.permalink, "/services/logo");
    }

    #[tokio::test]
    async fn test_place_order_snapshots_lines() {
        let commerce = commerce();
        let session = SessionId::new();
        let proxy = commerce.ensure_proxy_product().await.unwrap();
        let item = CartItem::from_new(NewCartItem::new(7, dec!(42))).unwrap();

        commerce
            .add_cart_line(&session, HostCartLine::new(proxy, item.clone(), &service()))
            .await
            .unwrap();
        assert_eq!(commerce.cart_total(&session).await, dec!(42));

        let order = commerce.place_order(&session).await.unwrap();

        assert_eq!(order.snapshot, vec![item]);
        assert_eq!(order.total, dec!(42));
        assert!(commerce.cart_lines(&session).await.is_empty());
        assert!(commerce.place_order(&session).await.is_err());
    }

    #[tokio::test]
    async fn test_remove_cart_line() {
        let commerce = commerce();
        let session = SessionId::new();
        let item = CartItem::from_new(NewCartItem::new(7, dec!(1))).unwrap();
        let key = commerce
            .add_cart_line(&session, HostCartLine::new(ProductId(1), item, &service()))
            .await
            .unwrap();

        commerce.remove_cart_line(&session, &key).await.unwrap();

        assert!(commerce.cart_lines(&session).await.is_empty());
    }
}
