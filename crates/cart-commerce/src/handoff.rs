//! Checkout Handoff
//!
//! Moves the service cart into the host commerce system exactly once.
//!
//! ```text
//! host_cart:     ServiceCart ──(one line per item)──▶ host cart ──▶ host checkout
//! direct_order:  ServiceCart ──(one fee line + snapshot)──▶ order ──▶ order payment page
//! ```
//!
//! Either the whole cart is handed off and the service cart is cleared, or
//! nothing is left behind in the host system and the service cart is kept.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use cart_catalog::ServiceCatalog;
use cart_core::{CartItem, ServiceCart, SessionId};

use crate::error::{CommerceError, Result};
use crate::host::{HostCartLine, HostCommerce, LineKey, ProductId};
use crate::order::{Order, OrderDraft, OrderLine};

/// How the cart reaches the host payment flow
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandoffMode {
    /// One host cart line per service, then the host checkout page
    #[default]
    HostCart,

    /// One order with a single fee line, then its payment page
    DirectOrder,
}

impl HandoffMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "host_cart" | "cart" => Some(Self::HostCart),
            "direct_order" | "order" => Some(Self::DirectOrder),
            _ => None,
        }
    }
}

/// Successful hand-off
#[derive(Clone, Debug)]
pub struct Handoff {
    /// Where to send the customer next
    pub redirect_url: String,

    /// Order created directly, if the mode creates one
    pub order: Option<Order>,

    /// Number of cart items handed over
    pub transferred: usize,
}

/// Hands the service cart over to the host commerce system
pub struct CheckoutHandoff {
    commerce: Arc<dyn HostCommerce>,
    catalog: Arc<dyn ServiceCatalog>,
    mode: HandoffMode,
    fee_label: String,
}

impl CheckoutHandoff {
    pub fn new(
        commerce: Arc<dyn HostCommerce>,
        catalog: Arc<dyn ServiceCatalog>,
        mode: HandoffMode,
    ) -> Self {
        Self {
            commerce,
            catalog,
            mode,
            fee_label: "Services Order".into(),
        }
    }

    #[must_use]
    pub fn with_fee_label(mut self, label: impl Into<String>) -> Self {
        self.fee_label = label.into();
        self
    }

    pub const fn mode(&self) -> HandoffMode {
        self.mode
    }

    /// Hand the cart off. `Ok(None)` when the cart is empty.
    pub async fn proceed(&self, cart: &ServiceCart) -> Result<Option<Handoff>> {
        let items = cart.get_cart();
        if items.is_empty() {
            return Ok(None);
        }

        let handoff = match self.mode {
            HandoffMode::HostCart => self.transfer_to_host_cart(cart, &items).await?,
            HandoffMode::DirectOrder => self.create_direct_order(cart, items).await?,
        };

        tracing::info!(
            session = %cart.session(),
            mode = ?self.mode,
            items = handoff.transferred,
            "Handed service cart to checkout"
        );
        Ok(Some(handoff))
    }

    async fn transfer_to_host_cart(&self, cart: &ServiceCart, items: &[CartItem]) -> Result<Handoff> {
        let session = cart.session();
        let proxy = self
            .commerce
            .ensure_proxy_product()
            .await
            .map_err(|e| CommerceError::Transfer(format!("proxy product unavailable: {e}")))?;

        let mut added: Vec<LineKey> = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            match self.transfer_item(session, proxy, item).await {
                Ok(key) => added.push(key),
                Err(e) => {
                    tracing::warn!(
                        session = %session,
                        index,
                        service_id = item.service_id,
                        error = %e,
                        "Host cart transfer failed, rolling back"
                    );
                    self.rollback(session, &added).await;
                    return Err(CommerceError::Transfer(format!(
                        "item {index} (service {}): {e}",
                        item.service_id
                    )));
                }
            }
        }

        if let Err(e) = cart.clear() {
            self.rollback(session, &added).await;
            return Err(CommerceError::Transfer(format!("could not clear service cart: {e}")));
        }

        Ok(Handoff {
            redirect_url: self.commerce.checkout_url().to_string(),
            order: None,
            transferred: added.len(),
        })
    }

    async fn transfer_item(&self, session: &SessionId, proxy: ProductId, item: &CartItem) -> Result<LineKey> {
        let service = self
            .catalog
            .get_service(item.service_id)
            .await?
            .ok_or_else(|| CommerceError::Transfer(format!("service {} no longer exists", item.service_id)))?;

        let line = HostCartLine::new(proxy, item.clone(), &service);
        self.commerce.add_cart_line(session, line).await
    }

    async fn rollback(&self, session: &SessionId, added: &[LineKey]) {
        for key in added {
            if let Err(e) = self.commerce.remove_cart_line(session, key).await {
                tracing::error!(session = %session, line = %key.0, error = %e, "Rollback of host cart line failed");
            }
        }
    }

    async fn create_direct_order(&self, cart: &ServiceCart, items: Vec<CartItem>) -> Result<Handoff> {
        let total: Decimal = items.iter().map(|i| i.price).sum();
        let transferred = items.len();
        let draft = OrderDraft {
            session_id: cart.session().clone(),
            lines: vec![OrderLine::Fee {
                name: self.fee_label.clone(),
                amount: total,
            }],
            snapshot: items,
        };

        let order = self
            .commerce
            .create_order(draft)
            .await
            .map_err(|e| CommerceError::Order(e.to_string()))?;

        // The order already holds the snapshot; a stale cart is cleared again on sync.
        if let Err(e) = cart.clear() {
            tracing::warn!(order_id = %order.id, error = %e, "Could not clear service cart after order creation");
        }

        Ok(Handoff {
            redirect_url: order.payment_url.clone(),
            order: Some(order),
            transferred,
        })
    }
}
