//! Post-payment Order Sync
//!
//! When a host order reaches a paid or processing status, each item of its
//! snapshot becomes a downstream marketplace order. The order is flagged as
//! synced afterwards so that later status changes never emit twice, and the
//! buyer's service cart is cleared.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

use cart_core::{CartItem, ServiceCart, SessionStore};

use crate::error::{CommerceError, Result};
use crate::order::{Order, OrderStore};
use crate::webhook::OrderEvent;

/// Receives the snapshot of a paid order (Observer pattern)
#[async_trait]
pub trait OrderSyncObserver: Send + Sync {
    /// Called once before the first item is emitted
    async fn before_sync(&self, _order: &Order) {}

    /// Create the marketplace order for one purchased service
    async fn create_downstream_order(&self, item: &CartItem, order: &Order) -> Result<()>;

    /// Called once after every item has been emitted
    async fn after_sync(&self, _order: &Order) {}
}

/// Observer that only logs what it receives
#[derive(Debug, Default)]
pub struct TracingObserver;

#[async_trait]
impl OrderSyncObserver for TracingObserver {
    async fn create_downstream_order(&self, item: &CartItem, order: &Order) -> Result<()> {
        tracing::info!(
            order_id = %order.id,
            service_id = item.service_id,
            package = ?item.package_key,
            addons = ?item.addon_ids,
            price = %item.price,
            "Downstream service order requested"
        );
        Ok(())
    }
}

/// Result of handling one status event
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Snapshot items were emitted
    Synced { items: usize, failed: usize },

    /// The order had been synced before
    AlreadySynced,

    /// The order carries no snapshot
    NoSnapshot,

    /// The new status does not release the snapshot
    NotTriggered,
}

/// Applies order status events and runs the one-time sync
pub struct OrderSync {
    orders: Arc<dyn OrderStore>,
    sessions: Arc<dyn SessionStore>,
    observer: Arc<dyn OrderSyncObserver>,
    lock: Mutex<()>,
}

impl OrderSync {
    pub fn new(
        orders: Arc<dyn OrderStore>,
        sessions: Arc<dyn SessionStore>,
        observer: Arc<dyn OrderSyncObserver>,
    ) -> Self {
        Self {
            orders,
            sessions,
            observer,
            lock: Mutex::new(()),
        }
    }

    /// Record a status change and sync if it is a trigger status
    pub async fn handle(&self, event: &OrderEvent) -> Result<SyncOutcome> {
        let _guard = self.lock.lock().await;

        let mut order = self
            .orders
            .get(&event.order_id)?
            .ok_or_else(|| CommerceError::OrderNotFound(event.order_id.to_string()))?;

        if order.status != event.status {
            tracing::info!(
                order_id = %order.id,
                from = order.status.as_str(),
                to = event.status.as_str(),
                "Order status changed"
            );
            order.set_status(event.status);
            self.orders.save(&order)?;
        }

        if !event.status.triggers_sync() {
            return Ok(SyncOutcome::NotTriggered);
        }

        self.sync(order).await
    }

    async fn sync(&self, mut order: Order) -> Result<SyncOutcome> {
        if order.synced {
            tracing::debug!(order_id = %order.id, "Order already synced");
            return Ok(SyncOutcome::AlreadySynced);
        }
        if order.snapshot.is_empty() {
            tracing::debug!(order_id = %order.id, "Order has no service snapshot");
            return Ok(SyncOutcome::NoSnapshot);
        }

        self.observer.before_sync(&order).await;

        let mut failed = 0;
        for item in &order.snapshot {
            if let Err(e) = self.observer.create_downstream_order(item, &order).await {
                failed += 1;
                tracing::error!(
                    order_id = %order.id,
                    service_id = item.service_id,
                    error = %e,
                    "Downstream order creation failed"
                );
            }
        }

        order.mark_synced();
        self.orders.save(&order)?;

        self.observer.after_sync(&order).await;

        let cart = ServiceCart::new(self.sessions.clone(), order.session_id.clone());
        if let Err(e) = cart.clear() {
            tracing::warn!(order_id = %order.id, error = %e, "Could not clear service cart after sync");
        }

        let items = order.snapshot.len();
        tracing::info!(order_id = %order.id, items, failed, "Order synced");
        Ok(SyncOutcome::Synced { items, failed })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::{OrderDraft, OrderId, OrderLine, OrderStatus, MemoryOrderStore};
    use cart_core::{MemorySessionStore, NewCartItem, SessionId};
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingObserver {
        before: AtomicUsize,
        created: AtomicUsize,
        after: AtomicUsize,
        fail_service: Option<u64>,
    }

    #[async_trait]
    impl OrderSyncObserver for CountingObserver {
        async fn before_sync(&self, _order: &Order) {
            self.before.fetch_add(1, Ordering::SeqCst);
        }

        async fn create_downstream_order(&self, item: &CartItem, _order: &Order) -> Result<()> {
            if self.fail_service == Some(item.service_id) {
                return Err(CommerceError::Host("downstream unavailable".into()));
            }
            self.created.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn after_sync(&self, _order: &Order) {
            self.after.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct Fixture {
        orders: Arc<MemoryOrderStore>,
        cart: ServiceCart,
        observer: Arc<CountingObserver>,
        sync: OrderSync,
    }

    fn fixture(observer: CountingObserver) -> Fixture {
        let orders = Arc::new(MemoryOrderStore::new());
        let sessions: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
        let observer = Arc::new(observer);
        let cart = ServiceCart::new(sessions.clone(), SessionId::new());
        let sync = OrderSync::new(orders.clone(), sessions, observer.clone());
        Fixture {
            orders,
            cart,
            observer,
            sync,
        }
    }

    fn place(f: &Fixture, service_ids: &[i64]) -> OrderId {
        for id in service_ids {
            f.cart.add_item(NewCartItem::new(*id, dec!(10))).unwrap();
        }
        let snapshot = f.cart.get_cart();
        let order = Order::from_draft(
            OrderDraft {
                session_id: f.cart.session().clone(),
                lines: vec![OrderLine::Fee {
                    name: "Services".into(),
                    amount: f.cart.get_total(),
                }],
                snapshot,
            },
            "/checkout",
        );
        f.orders.save(&order).unwrap();
        order.id
    }

    fn event(id: &OrderId, status: OrderStatus) -> OrderEvent {
        OrderEvent {
            order_id: id.clone(),
            status,
        }
    }

    #[tokio::test]
    async fn test_sync_emits_once_per_item() {
        let f = fixture(CountingObserver::default());
        let id = place(&f, &[1, 2, 3]);

        let outcome = f.sync.handle(&event(&id, OrderStatus::Paid)).await.unwrap();

        assert_eq!(outcome, SyncOutcome::Synced { items: 3, failed: 0 });
        assert_eq!(f.observer.before.load(Ordering::SeqCst), 1);
        assert_eq!(f.observer.created.load(Ordering::SeqCst), 3);
        assert_eq!(f.observer.after.load(Ordering::SeqCst), 1);
        assert!(f.orders.get(&id).unwrap().unwrap().synced);
        assert!(f.cart.is_empty());
    }

    #[tokio::test]
    async fn test_second_trigger_is_idempotent() {
        let f = fixture(CountingObserver::default());
        let id = place(&f, &[1, 2]);

        f.sync.handle(&event(&id, OrderStatus::Processing)).await.unwrap();
        let outcome = f.sync.handle(&event(&id, OrderStatus::Paid)).await.unwrap();

        assert_eq!(outcome, SyncOutcome::AlreadySynced);
        assert_eq!(f.observer.created.load(Ordering::SeqCst), 2);
        assert_eq!(f.orders.get(&id).unwrap().unwrap().status, OrderStatus::Paid);
    }

    #[tokio::test]
    async fn test_concurrent_triggers_emit_once() {
        let f = fixture(CountingObserver::default());
        let id = place(&f, &[1, 2]);

        let paid = event(&id, OrderStatus::Paid);
        let processing = event(&id, OrderStatus::Processing);
        let (a, b) = tokio::join!(f.sync.handle(&paid), f.sync.handle(&processing));

        assert!(a.is_ok() && b.is_ok());
        assert_eq!(f.observer.created.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_non_trigger_status_only_records() {
        let f = fixture(CountingObserver::default());
        let id = place(&f, &[1]);

        let outcome = f.sync.handle(&event(&id, OrderStatus::Failed)).await.unwrap();

        assert_eq!(outcome, SyncOutcome::NotTriggered);
        assert_eq!(f.observer.created.load(Ordering::SeqCst), 0);
        assert_eq!(f.orders.get(&id).unwrap().unwrap().status, OrderStatus::Failed);
        assert_eq!(f.cart.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_snapshot_skipped() {
        let f = fixture(CountingObserver::default());
        let id = place(&f, &[]);

        let outcome = f.sync.handle(&event(&id, OrderStatus::Paid)).await.unwrap();

        assert_eq!(outcome, SyncOutcome::NoSnapshot);
        assert_eq!(f.observer.before.load(Ordering::SeqCst), 0);
        assert!(!f.orders.get(&id).unwrap().unwrap().synced);
    }

    #[tokio::test]
    async fn test_failed_item_does_not_abort() {
        let f = fixture(CountingObserver {
            fail_service: Some(2),
            ..CountingObserver::default()
        });
        let id = place(&f, &[1, 2, 3]);

        let outcome = f.sync.handle(&event(&id, OrderStatus::Paid)).await.unwrap();

        assert_eq!(outcome, SyncOutcome::Synced { items: 3, failed: 1 });
        assert_eq!(f.observer.created.load(Ordering::SeqCst), 2);
        assert!(f.orders.get(&id).unwrap().unwrap().synced);
    }

    #[tokio::test]
    async fn test_unknown_order() {
        let f = fixture(CountingObserver::default());

        let err = f
            .sync
            .handle(&event(&OrderId::from_string("ord_missing"), OrderStatus::Paid))
            .await
            .unwrap_err();

        assert!(matches!(err, CommerceError::OrderNotFound(_)));
    }
}
