//! Application State

use std::sync::Arc;

use cart_catalog::{PackagePriceResolver, PriceResolution, ServiceCatalog};
use cart_commerce::{
    CheckoutHandoff, HostCommerce, MemoryCommerce, MemoryOrderStore, OrderStore, OrderSync,
    TracingObserver, WebhookVerifier,
};
use cart_core::{MemorySessionStore, NonceSigner, PriceResolver, ServiceCart, SessionStore};

use crate::config::Config;
use crate::error::AppError;
use crate::views::Views;
use crate::visitor::Visitor;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,

    /// Visitor sessions, home of every service cart
    pub sessions: Arc<dyn SessionStore>,

    /// Service listings
    pub catalog: Arc<dyn ServiceCatalog>,

    /// Package resolver, then metadata fallback
    pub pricing: Arc<PriceResolution>,

    /// Anti-forgery tokens
    pub nonces: Arc<NonceSigner>,

    /// Orders created by the host commerce system
    pub orders: Arc<dyn OrderStore>,

    /// Host commerce backend
    pub commerce: Arc<MemoryCommerce>,

    pub handoff: Arc<CheckoutHandoff>,

    pub order_sync: Arc<OrderSync>,

    /// Order webhook signature check
    pub webhook: Arc<WebhookVerifier>,

    /// Compiled page templates
    pub views: Arc<Views>,
}

impl AppState {
    /// Wire every component around in-memory stores
    pub fn new(config: Config, catalog: Arc<dyn ServiceCatalog>) -> Result<Self, AppError> {
        let views = Views::new()?;
        let sessions: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());

        let resolver: Arc<dyn PriceResolver> = Arc::new(PackagePriceResolver::new(catalog.clone()));
        let pricing = PriceResolution::with_resolver(catalog.clone(), resolver);

        let nonces = if let Some(secret) = &config.nonce_secret {
            NonceSigner::new(secret, config.nonce_lifetime)
        } else {
            tracing::warn!("NONCE_SECRET not set - using a random secret, forms expire on restart");
            NonceSigner::random(config.nonce_lifetime)
        };

        let webhook = if let Some(secret) = &config.webhook_secret {
            WebhookVerifier::new(secret)
        } else {
            tracing::warn!("WEBHOOK_SECRET not set - order webhooks cannot be verified");
            WebhookVerifier::new(uuid::Uuid::new_v4().as_bytes())
        };

        let orders: Arc<dyn OrderStore> = Arc::new(MemoryOrderStore::new());
        let commerce = Arc::new(MemoryCommerce::new(config.host_checkout_url.clone(), orders.clone()));
        let host: Arc<dyn HostCommerce> = commerce.clone();
        tracing::info!(backend = host.name(), mode = ?config.handoff_mode, "Checkout hand-off ready");

        let handoff = CheckoutHandoff::new(host, catalog.clone(), config.handoff_mode);
        let order_sync = OrderSync::new(orders.clone(), sessions.clone(), Arc::new(TracingObserver));

        Ok(Self {
            config: Arc::new(config),
            sessions,
            catalog,
            pricing: Arc::new(pricing),
            nonces: Arc::new(nonces),
            orders,
            commerce,
            handoff: Arc::new(handoff),
            order_sync: Arc::new(order_sync),
            webhook: Arc::new(webhook),
            views: Arc::new(views),
        })
    }

    /// The visitor's service cart
    pub fn cart(&self, visitor: &Visitor) -> ServiceCart {
        ServiceCart::new(self.sessions.clone(), visitor.session_id.clone())
    }

    /// Cart page URL carrying a one-shot notice
    pub fn cart_url_with_notice(&self, code: cart_core::NoticeCode) -> String {
        let base = &self.config.cart_page_url;
        let sep = if base.contains('?') { '&' } else { '?' };
        format!("{base}{sep}notice={}&code={}", code.kind().as_str(), code.as_str())
    }
}
