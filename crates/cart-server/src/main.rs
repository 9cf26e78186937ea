//! service-cart HTTP Server
//!
//! Axum-based server for the service cart: add-to-cart endpoints, the cart
//! page, checkout hand-off and the host order webhook.

mod config;
mod endpoint;
mod error;
mod handlers;
mod state;
mod views;
mod visitor;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cart_catalog::{MemoryCatalog, ServiceCatalog};

use crate::config::Config;
use crate::handlers::{
    add_to_cart, add_to_cart_async, add_to_cart_button, cart_json, cart_link, cart_page,
    health_check, host_checkout_page, not_found, order_payment_page, order_webhook, place_order,
    proceed_to_checkout, remove_item,
};
use crate::state::AppState;
use crate::visitor::resolve_visitor;

/// Build the application router
pub fn app(state: AppState) -> Router {
    // Routes that need the visitor's session
    let mut visitor_routes: Router<AppState> = Router::new()
        .route("/cart", get(cart_page))
        .route("/cart/add", post(add_to_cart))
        .route("/cart/add/async", post(add_to_cart_async))
        .route("/cart/remove", post(remove_item))
        .route("/cart/checkout", post(proceed_to_checkout))
        .route("/cart/link", get(cart_link))
        .route("/cart/button", get(add_to_cart_button))
        .route("/api/cart", get(cart_json));

    // In-process host checkout and order payment pages
    if let Some(checkout) = state.config.storefront_path() {
        visitor_routes = visitor_routes
            .route(checkout, get(host_checkout_page).post(place_order))
            .route(&format!("{checkout}/order-pay/{{order_id}}"), get(order_payment_page));
    }

    let visitor_routes =
        visitor_routes.route_layer(middleware::from_fn_with_state(state.clone(), resolve_visitor));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/webhook/orders", post(order_webhook))
        .merge(visitor_routes)
        .nest_service("/assets", ServeDir::new(&state.config.static_dir))
        .fallback(not_found)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    let catalog = Arc::new(MemoryCatalog::with_demo_services());
    tracing::info!(catalog = catalog.name(), "Loaded {} demo services", catalog.len().await);

    let addr = config.bind_addr.clone();
    tracing::info!(require_login = config.require_login, cart_page = %config.cart_page_url, "Cart configured");

    let storefront = config.storefront_path().map(str::to_string);
    let state = AppState::new(config, catalog)?;
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("service-cart running on http://{}", addr);
    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /cart             - Cart page");
    tracing::info!("  POST /cart/add         - Add service (form)");
    tracing::info!("  POST /cart/add/async   - Add service (JSON)");
    tracing::info!("  POST /cart/remove      - Remove cart line");
    tracing::info!("  POST /cart/checkout    - Proceed to payment");
    tracing::info!("  GET  /cart/link        - Cart link fragment");
    tracing::info!("  GET  /cart/button      - Add-to-cart button fragment");
    tracing::info!("  GET  /api/cart         - Cart as JSON");
    tracing::info!("  POST /webhook/orders   - Host order status webhook");
    if let Some(checkout) = storefront {
        tracing::info!("  GET  {checkout:<18}- Host checkout");
        tracing::info!("  POST {checkout:<18}- Place order");
        tracing::info!("  GET  {checkout}/order-pay/{{id}} - Order payment page");
    }

    axum::serve(listener, app(state)).await?;

    Ok(())
}
