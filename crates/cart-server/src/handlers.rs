//! HTTP Handlers

use std::collections::HashMap;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect},
    Extension, Form, Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use cart_catalog::Service;
use cart_commerce::{CommerceError, OrderId, SIGNATURE_HEADER};
use cart_core::{CartItem, NonceAction, Notice, NoticeCode};

use crate::config::parse_bool;
use crate::endpoint::{process_add_to_cart, AddToCartForm};
use crate::error::AppError;
use crate::state::AppState;
use crate::views::{AddButton, CartLink, CartPage, CartRow, HostCheckoutPage};
use crate::visitor::Visitor;

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Async add-to-cart reply
#[derive(Debug, Serialize)]
pub struct AddToCartResponse {
    pub success: bool,
    pub data: AddToCartData,
}

#[derive(Debug, Serialize)]
pub struct AddToCartData {
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cart_count: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cart_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct CartResponse {
    pub items: Vec<CartItem>,
    pub total: Decimal,
    pub count: usize,
}

#[derive(Debug, Default, Deserialize)]
pub struct NoticeQuery {
    pub notice: Option<String>,
    pub code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RemoveForm {
    #[serde(default, rename = "_token")]
    pub token: String,

    #[serde(default)]
    pub item_index: Option<String>,

    #[serde(default)]
    pub item_key: Option<String>,
}

/// Form whose only field is the anti-forgery token
#[derive(Debug, Deserialize)]
pub struct TokenForm {
    #[serde(default, rename = "_token")]
    pub token: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct CartLinkQuery {
    pub class: Option<String>,
    pub icon: Option<String>,
    pub show_count: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ButtonQuery {
    pub service_id: Option<String>,
    pub package: Option<String>,
    pub addons: Option<String>,
    pub text: Option<String>,
    pub class: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Add to cart, form transport: always redirects to the cart page
pub async fn add_to_cart(
    State(state): State<AppState>,
    Extension(visitor): Extension<Visitor>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Redirect {
    let form = AddToCartForm::from_pairs(&pairs);
    match process_add_to_cart(&state, &visitor, &form).await {
        Ok(code) => Redirect::to(&state.cart_url_with_notice(code)),
        Err(e) => {
            tracing::error!(session = %visitor.session_id, error = %e, "Add to cart failed");
            Redirect::to(&state.config.cart_page_url)
        }
    }
}

/// Add to cart, async transport
pub async fn add_to_cart_async(
    State(state): State<AppState>,
    Extension(visitor): Extension<Visitor>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> (StatusCode, Json<AddToCartResponse>) {
    let form = AddToCartForm::from_pairs(&pairs);
    let code = match process_add_to_cart(&state, &visitor, &form).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(session = %visitor.session_id, error = %e, "Async add to cart failed");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(AddToCartResponse {
                    success: false,
                    data: AddToCartData {
                        message: "Internal server error.".into(),
                        cart_count: None,
                        cart_url: None,
                        code: None,
                    },
                }),
            );
        }
    };

    let cart_count = state.cart(&visitor).len();
    let response = if code == NoticeCode::Added {
        AddToCartResponse {
            success: true,
            data: AddToCartData {
                message: code.message().into(),
                cart_count: Some(cart_count),
                cart_url: Some(state.config.cart_page_url.clone()),
                code: None,
            },
        }
    } else {
        AddToCartResponse {
            success: false,
            data: AddToCartData {
                message: code.message().into(),
                cart_count: Some(cart_count),
                cart_url: None,
                code: Some(code.as_str()),
            },
        }
    };

    let status = if code == NoticeCode::Security {
        StatusCode::FORBIDDEN
    } else {
        StatusCode::OK
    };
    (status, Json(response))
}

/// Cart page with a one-shot notice from the query string
pub async fn cart_page(
    State(state): State<AppState>,
    Extension(visitor): Extension<Visitor>,
    Query(query): Query<NoticeQuery>,
) -> Result<Html<String>, AppError> {
    let items = state.cart(&visitor).get_cart();
    let total: Decimal = items.iter().map(|i| i.price).sum();

    let mut ids: Vec<u64> = items.iter().map(|i| i.service_id).collect();
    ids.sort_unstable();
    ids.dedup();
    let services: HashMap<u64, Service> = state
        .catalog
        .get_services(&ids)
        .await
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Service lookup failed");
            Vec::new()
        })
        .into_iter()
        .map(|s| (s.id, s))
        .collect();

    let rows: Vec<CartRow> = items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match services.get(&item.service_id) {
            Some(service) => CartRow {
                index,
                title: service.title.clone(),
                thumbnail_url: service.thumbnail_url.clone(),
                permalink: Some(service.permalink.clone()),
                item,
            },
            None => CartRow {
                index,
                title: format!("Service #{}", item.service_id),
                thumbnail_url: None,
                permalink: None,
                item,
            },
        })
        .collect();

    let notice = match (query.notice.as_deref(), query.code.as_deref()) {
        (Some(kind), Some(code)) => Notice::from_query(kind, code),
        _ => None,
    };
    let remove_token = state.nonces.create(NonceAction::RemoveItem, &visitor.session_id);
    let proceed_token = state.nonces.create(NonceAction::ProceedToPayment, &visitor.session_id);

    let html = state.views.cart_page(&CartPage {
        rows: &rows,
        total,
        notice,
        remove_token: &remove_token,
        proceed_token: &proceed_token,
        currency_symbol: &state.config.currency_symbol,
    })?;
    Ok(Html(html))
}

/// Remove one cart line; the stable key wins over the index
pub async fn remove_item(
    State(state): State<AppState>,
    Extension(visitor): Extension<Visitor>,
    Form(form): Form<RemoveForm>,
) -> Result<Redirect, AppError> {
    if !state
        .nonces
        .verify(NonceAction::RemoveItem, &visitor.session_id, &form.token)
    {
        return Err(AppError::Forbidden);
    }

    let cart = state.cart(&visitor);
    let key = form
        .item_key
        .as_deref()
        .and_then(|k| uuid::Uuid::parse_str(k.trim()).ok());

    if let Some(key) = key {
        if !cart.remove_by_key(key)? {
            tracing::debug!(session = %visitor.session_id, %key, "Cart line already gone");
        }
    } else if let Some(index) = form.item_index.as_deref().and_then(|i| i.trim().parse::<usize>().ok()) {
        cart.remove_item(index)?;
    }

    Ok(Redirect::to(&state.config.cart_page_url))
}

/// Hand the cart to the host checkout
pub async fn proceed_to_checkout(
    State(state): State<AppState>,
    Extension(visitor): Extension<Visitor>,
    Form(form): Form<TokenForm>,
) -> Result<Redirect, AppError> {
    if !state
        .nonces
        .verify(NonceAction::ProceedToPayment, &visitor.session_id, &form.token)
    {
        return Err(AppError::Forbidden);
    }

    let cart = state.cart(&visitor);
    match state.handoff.proceed(&cart).await {
        Ok(Some(handoff)) => Ok(Redirect::to(&handoff.redirect_url)),
        Ok(None) => Ok(Redirect::to(&state.config.cart_page_url)),
        Err(e) => {
            tracing::error!(session = %visitor.session_id, error = %e, "Checkout handoff failed");
            Ok(Redirect::to(&state.cart_url_with_notice(e.notice_code())))
        }
    }
}

/// Cart contents as JSON
pub async fn cart_json(
    State(state): State<AppState>,
    Extension(visitor): Extension<Visitor>,
) -> Json<CartResponse> {
    let items = state.cart(&visitor).get_cart();
    Json(CartResponse {
        total: items.iter().map(|i| i.price).sum(),
        count: items.len(),
        items,
    })
}

/// Header cart link fragment
pub async fn cart_link(
    State(state): State<AppState>,
    Extension(visitor): Extension<Visitor>,
    Query(query): Query<CartLinkQuery>,
) -> Result<Html<String>, AppError> {
    let flag = |v: Option<&str>| v.map_or(Some(true), parse_bool).unwrap_or(false);

    let html = state.views.cart_link(&CartLink {
        url: &state.config.cart_page_url,
        count: state.cart(&visitor).len(),
        class: query.class.as_deref().unwrap_or("cart-link"),
        show_icon: flag(query.icon.as_deref()),
        show_count: flag(query.show_count.as_deref()),
    })?;
    Ok(Html(html))
}

/// Add-to-cart button fragment
pub async fn add_to_cart_button(
    State(state): State<AppState>,
    Extension(visitor): Extension<Visitor>,
    Query(query): Query<ButtonQuery>,
) -> Result<Html<String>, AppError> {
    let Some(service_id) = query
        .service_id
        .as_deref()
        .and_then(|id| id.trim().parse::<u64>().ok())
        .filter(|id| *id > 0)
    else {
        return Ok(Html("<!-- add-to-cart button: service_id required -->".into()));
    };

    let addon_ids: Vec<u64> = query
        .addons
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .filter_map(|id| id.trim().parse::<u64>().ok())
        .filter(|id| *id > 0)
        .collect();
    let token = state.nonces.create(NonceAction::AddToCart, &visitor.session_id);

    let html = state.views.add_to_cart_button(&AddButton {
        service_id,
        package_key: query.package.as_deref().map(str::trim).filter(|p| !p.is_empty()),
        addon_ids: &addon_ids,
        token: &token,
        text: query
            .text
            .as_deref()
            .filter(|t| !t.is_empty())
            .unwrap_or("Add to cart"),
        class: query
            .class
            .as_deref()
            .unwrap_or("button add-to-cart-button"),
        cart_url: &state.config.cart_page_url,
    })?;
    Ok(Html(html))
}

// ============================================================================
// Host Storefront
// ============================================================================

/// Host checkout page listing the transferred lines
pub async fn host_checkout_page(
    State(state): State<AppState>,
    Extension(visitor): Extension<Visitor>,
) -> Result<Html<String>, AppError> {
    let lines = state.commerce.cart_lines(&visitor.session_id).await;
    let token = state.nonces.create(NonceAction::PlaceOrder, &visitor.session_id);

    let html = state.views.host_checkout(&HostCheckoutPage {
        lines: &lines,
        token: &token,
        checkout_url: &state.config.host_checkout_url,
        cart_url: &state.config.cart_page_url,
        currency_symbol: &state.config.currency_symbol,
    })?;
    Ok(Html(html))
}

/// Place the host cart as a pending order, then go to its payment page
pub async fn place_order(
    State(state): State<AppState>,
    Extension(visitor): Extension<Visitor>,
    Form(form): Form<TokenForm>,
) -> Result<Redirect, AppError> {
    if !state
        .nonces
        .verify(NonceAction::PlaceOrder, &visitor.session_id, &form.token)
    {
        return Err(AppError::Forbidden);
    }

    match state.commerce.place_order(&visitor.session_id).await {
        Ok(order) => Ok(Redirect::to(&order.payment_url)),
        Err(e) => {
            tracing::warn!(session = %visitor.session_id, error = %e, "Place order failed");
            Ok(Redirect::to(&state.cart_url_with_notice(e.notice_code())))
        }
    }
}

/// Payment page of one of the visitor's orders
pub async fn order_payment_page(
    State(state): State<AppState>,
    Extension(visitor): Extension<Visitor>,
    Path(order_id): Path<String>,
) -> Result<Html<String>, AppError> {
    let id = OrderId::from_string(order_id);
    let order = state
        .orders
        .get(&id)?
        .filter(|order| order.session_id == visitor.session_id)
        .ok_or_else(|| CommerceError::OrderNotFound(id.to_string()))?;

    let html = state
        .views
        .order_payment(&order, &state.config.currency_symbol)?;
    Ok(Html(html))
}

/// Order status webhook from the host commerce system
pub async fn order_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, AppError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| CommerceError::WebhookSignature("missing signature header".into()))?;

    let event = state.webhook.parse_event(&body, signature)?;
    let outcome = state.order_sync.handle(&event).await?;

    tracing::info!(
        order_id = %event.order_id,
        status = event.status.as_str(),
        outcome = ?outcome,
        "Processed order webhook"
    );
    Ok(StatusCode::OK)
}

/// Unknown routes
pub async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Html("<h1>Not Found</h1>".to_string()))
}
