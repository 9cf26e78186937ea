//! Anti-forgery Tokens
//!
//! Tokens prove a form post originated from a page this server rendered for
//! the same session. A token is `hex(HMAC-SHA256(secret, action|session|tick))`
//! where the tick advances every half lifetime; tokens from the current and
//! the previous tick are accepted.

use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use uuid::Uuid;

use crate::session::SessionId;

type HmacSha256 = Hmac<Sha256>;

/// Form actions a token can be bound to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NonceAction {
    AddToCart,
    RemoveItem,
    ProceedToPayment,

    /// Host checkout place-order form
    PlaceOrder,
}

impl NonceAction {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AddToCart => "add_service_to_cart",
            Self::RemoveItem => "remove_cart_item",
            Self::ProceedToPayment => "proceed_to_payment",
            Self::PlaceOrder => "place_order",
        }
    }
}

/// Issues and verifies session-bound anti-forgery tokens
pub struct NonceSigner {
    secret: Vec<u8>,
    half_life_secs: i64,
}

impl NonceSigner {
    /// Default token lifetime, one day
    pub const DEFAULT_LIFETIME_SECS: i64 = 86_400;

    pub fn new(secret: impl AsRef<[u8]>, lifetime: Duration) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
            half_life_secs: (lifetime.num_seconds() / 2).max(1),
        }
    }

    /// Signer with a random per-process secret
    pub fn random(lifetime: Duration) -> Self {
        let mut secret = Uuid::new_v4().as_bytes().to_vec();
        secret.extend_from_slice(Uuid::new_v4().as_bytes());
        Self::new(secret, lifetime)
    }

    pub fn create(&self, action: NonceAction, session: &SessionId) -> String {
        self.create_at(action, session, Utc::now())
    }

    pub fn create_at(&self, action: NonceAction, session: &SessionId, now: DateTime<Utc>) -> String {
        self.mac(action, session, self.tick(now))
            .map(|mac| hex::encode(mac.finalize().into_bytes()))
            .unwrap_or_default()
    }

    pub fn verify(&self, action: NonceAction, session: &SessionId, token: &str) -> bool {
        self.verify_at(action, session, token, Utc::now())
    }

    pub fn verify_at(
        &self,
        action: NonceAction,
        session: &SessionId,
        token: &str,
        now: DateTime<Utc>,
    ) -> bool {
        let Ok(bytes) = hex::decode(token.trim()) else {
            return false;
        };
        if bytes.is_empty() {
            return false;
        }

        let tick = self.tick(now);
        [tick, tick - 1].into_iter().any(|t| {
            self.mac(action, session, t)
                .is_some_and(|mac| mac.verify_slice(&bytes).is_ok())
        })
    }

    fn tick(&self, now: DateTime<Utc>) -> i64 {
        now.timestamp().div_euclid(self.half_life_secs)
    }

    fn mac(&self, action: NonceAction, session: &SessionId, tick: i64) -> Option<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(&self.secret).ok()?;
        mac.update(action.as_str().as_bytes());
        mac.update(b"|");
        mac.update(session.as_str().as_bytes());
        mac.update(b"|");
        mac.update(tick.to_string().as_bytes());
        Some(mac)
    }
}

impl std::fmt::Debug for NonceSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NonceSigner")
            .field("half_life_secs", &self.half_life_secs)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> NonceSigner {
        NonceSigner::new("test-secret", Duration::hours(24))
    }

    #[test]
    fn test_roundtrip() {
        let signer = signer();
        let session = SessionId::new();
        let token = signer.create(NonceAction::AddToCart, &session);

        assert_eq!(token.len(), 64);
        assert!(signer.verify(NonceAction::AddToCart, &session, &token));
    }

    #[test]
    fn test_bound_to_action_and_session() {
        let signer = signer();
        let session = SessionId::new();
        let token = signer.create(NonceAction::AddToCart, &session);

        assert!(!signer.verify(NonceAction::ProceedToPayment, &session, &token));
        assert!(!signer.verify(NonceAction::AddToCart, &SessionId::new(), &token));
    }

    #[test]
    fn test_rejects_garbage() {
        let signer = signer();
        let session = SessionId::new();

        assert!(!signer.verify(NonceAction::AddToCart, &session, ""));
        assert!(!signer.verify(NonceAction::AddToCart, &session, "zz"));
        assert!(!signer.verify(NonceAction::AddToCart, &session, "deadbeef"));
    }

    #[test]
    fn test_expiry_window() {
        let signer = signer();
        let session = SessionId::new();
        let issued = DateTime::from_timestamp(43_200 * 40_000, 0).unwrap();
        let token = signer.create_at(NonceAction::RemoveItem, &session, issued);

        let later = issued + Duration::hours(13);
        assert!(signer.verify_at(NonceAction::RemoveItem, &session, &token, later));

        let expired = issued + Duration::hours(25);
        assert!(!signer.verify_at(NonceAction::RemoveItem, &session, &token, expired));
    }

    #[test]
    fn test_different_secrets_disagree() {
        let session = SessionId::new();
        let token = signer().create(NonceAction::AddToCart, &session);
        let other = NonceSigner::random(Duration::hours(24));

        assert!(!other.verify(NonceAction::AddToCart, &session, &token));
    }
}
