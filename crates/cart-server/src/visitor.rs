//! Visitor Sessions
//!
//! Resolves the session cookie on every request. Handlers receive the
//! visitor through `Extension<Visitor>`; a session is created and the cookie
//! set when the request carried none (or an unknown one).
//!
//! Login belongs to the host. When `USER_HEADER` is configured, the host's
//! auth proxy names the logged-in user in that header and the header is
//! authoritative: it attaches the user to the session, and its absence
//! detaches it. Without it a session only has the user it was saved with.

use axum::extract::{Request, State};
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use cart_core::{Session, SessionId};

use crate::error::AppError;
use crate::state::AppState;

/// The session behind the current request
#[derive(Clone, Debug)]
pub struct Visitor {
    pub session_id: SessionId,

    /// Logged-in user, `None` for guests
    pub user_id: Option<String>,
}

impl Visitor {
    pub const fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }
}

/// Session middleware
pub async fn resolve_visitor(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let cookie_name = state.config.session_cookie.as_str();

    let existing = cookie_value(request.headers(), cookie_name).and_then(|id| {
        state
            .sessions
            .load(&SessionId::from_string(id))
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Session lookup failed");
                None
            })
    });

    let (mut session, created) = match existing {
        Some(session) => (session, false),
        None => (Session::new(), true),
    };

    let mut dirty = created;
    if let Some(header) = state.config.user_header.as_deref() {
        let user_id = header_user(request.headers(), header);
        if user_id != session.user_id {
            tracing::debug!(session = %session.id, user = ?user_id, "Session user changed");
            session.user_id = user_id;
            dirty = true;
        }
    }

    if dirty {
        if let Err(e) = state.sessions.save(&session) {
            return AppError::from(e).into_response();
        }
    }
    if created {
        tracing::debug!(session = %session.id, "Started visitor session");
    }

    request.extensions_mut().insert(Visitor {
        session_id: session.id.clone(),
        user_id: session.user_id,
    });

    let mut response = next.run(request).await;

    if created {
        let cookie = format!("{cookie_name}={}; Path=/; HttpOnly; SameSite=Lax", session.id);
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            response.headers_mut().append(SET_COOKIE, value);
        }
    }
    response
}

fn header_user(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Value of one cookie from the request's `Cookie` headers
pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v.trim())
        .filter(|v| !v.is_empty())
}
