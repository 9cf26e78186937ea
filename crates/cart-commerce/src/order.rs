//! Host Orders
//!
//! Orders created at hand-off time, each carrying an immutable snapshot of
//! the service cart and a synced flag set once downstream orders exist.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

use cart_core::{CartItem, SessionId};

use crate::error::{CommerceError, Result};
use crate::host::HostCartLine;

/// Order identifier (formatted: ord_<32 hex>)
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(String);

impl OrderId {
    /// Generate a new order id
    pub fn generate() -> Self {
        Self(format!("ord_{}", uuid::Uuid::new_v4().simple()))
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Host order lifecycle
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Paid,
    Failed,
    Cancelled,
}

impl OrderStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Paid => "paid",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "processing" => Some(Self::Processing),
            "paid" | "completed" => Some(Self::Paid),
            "failed" => Some(Self::Failed),
            "cancelled" | "canceled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Whether reaching this status releases the snapshot downstream
    pub const fn triggers_sync(self) -> bool {
        matches!(self, Self::Paid | Self::Processing)
    }
}

/// One priced line of a host order
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderLine {
    /// Flat fee covering the whole service cart
    Fee { name: String, amount: Decimal },

    /// One service carried over from the host cart
    Service(HostCartLine),
}

impl OrderLine {
    pub fn name(&self) -> &str {
        match self {
            Self::Fee { name, .. } => name,
            Self::Service(line) => line.name(),
        }
    }

    pub fn amount(&self) -> Decimal {
        match self {
            Self::Fee { amount, .. } => *amount,
            Self::Service(line) => line.price(),
        }
    }
}

/// Order about to be created in the host system
#[derive(Clone, Debug)]
pub struct OrderDraft {
    pub session_id: SessionId,
    pub lines: Vec<OrderLine>,
    pub snapshot: Vec<CartItem>,
}

/// A host order record
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Order {
    /// Order identifier
    pub id: OrderId,

    /// Session the cart came from
    pub session_id: SessionId,

    /// Current status
    pub status: OrderStatus,

    /// Priced lines
    pub lines: Vec<OrderLine>,

    /// Sum of line amounts
    pub total: Decimal,

    /// Service cart as it was at hand-off
    pub snapshot: Vec<CartItem>,

    /// Downstream orders have been created
    pub synced: bool,

    /// Where the customer pays for this order
    pub payment_url: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last change timestamp
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Create a pending order from a draft
    pub fn from_draft(draft: OrderDraft, payment_base: &str) -> Self {
        let id = OrderId::generate();
        let total = draft.lines.iter().map(OrderLine::amount).sum();
        let now = Utc::now();
        Self {
            payment_url: format!("{}/order-pay/{}", payment_base.trim_end_matches('/'), id),
            id,
            session_id: draft.session_id,
            status: OrderStatus::Pending,
            lines: draft.lines,
            total,
            snapshot: draft.snapshot,
            synced: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn set_status(&mut self, status: OrderStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }

    pub fn mark_synced(&mut self) {
        self.synced = true;
        self.updated_at = Utc::now();
    }
}

/// Order storage trait
pub trait OrderStore: Send + Sync {
    /// Save or update an order
    fn save(&self, order: &Order) -> Result<()>;

    /// Get order by id
    fn get(&self, id: &OrderId) -> Result<Option<Order>>;

    /// Orders created from one session, oldest first
    fn list_for_session(&self, session_id: &SessionId) -> Result<Vec<Order>>;
}

/// In-memory order store (for development)
pub struct MemoryOrderStore {
    orders: RwLock<HashMap<OrderId, Order>>,
}

impl Default for MemoryOrderStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryOrderStore {
    pub fn new() -> Self {
        Self {
            orders: RwLock::new(HashMap::new()),
        }
    }
}

fn poisoned<T>(_: T) -> CommerceError {
    CommerceError::Storage("order store lock poisoned".into())
}

impl OrderStore for MemoryOrderStore {
    fn save(&self, order: &Order) -> Result<()> {
        let mut orders = self.orders.write().map_err(poisoned)?;
        orders.insert(order.id.clone(), order.clone());
        Ok(())
    }

    fn get(&self, id: &OrderId) -> Result<Option<Order>> {
        let orders = self.orders.read().map_err(poisoned)?;
        Ok(orders.get(id).cloned())
    }

    fn list_for_session(&self, session_id: &SessionId) -> Result<Vec<Order>> {
        let orders = self.orders.read().map_err(poisoned)?;
        let mut result: Vec<_> = orders
            .values()
            .filter(|o| &o.session_id == session_id)
            .cloned()
            .collect();
        result.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cart_core::NewCartItem;
    use rust_decimal_macros::dec;

    fn draft() -> OrderDraft {
        let item = CartItem::from_new(NewCartItem::new(5, dec!(12.50))).unwrap();
        OrderDraft {
            session_id: SessionId::new(),
            lines: vec![OrderLine::Fee {
                name: "Services".into(),
                amount: dec!(12.50),
            }],
            snapshot: vec![item],
        }
    }

    #[test]
    fn test_order_from_draft() {
        let order = Order::from_draft(draft(), "https://shop.test/checkout/");

        assert!(order.id.as_str().starts_with("ord_"));
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.total, dec!(12.50));
        assert!(!order.synced);
        assert_eq!(
            order.payment_url,
            format!("https://shop.test/checkout/order-pay/{}", order.id)
        );
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(OrderStatus::parse("Completed"), Some(OrderStatus::Paid));
        assert_eq!(OrderStatus::parse("processing"), Some(OrderStatus::Processing));
        assert_eq!(OrderStatus::parse("refunded"), None);
        assert!(OrderStatus::Paid.triggers_sync());
        assert!(!OrderStatus::Failed.triggers_sync());
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryOrderStore::new();
        let order = Order::from_draft(draft(), "/checkout");
        let session = order.session_id.clone();

        store.save(&order).unwrap();

        assert_eq!(store.get(&order.id).unwrap().unwrap().total, dec!(12.50));
        assert_eq!(store.list_for_session(&session).unwrap().len(), 1);
        assert!(store.list_for_session(&SessionId::new()).unwrap().is_empty());
    }
}
