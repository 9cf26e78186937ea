//! Order Status Webhook
//!
//! The host commerce system reports order status changes by POSTing a JSON
//! body signed with a shared secret:
//!
//! ```text
//! x-commerce-signature: sha256=<hex(HMAC-SHA256(secret, body))>
//! {"order_id": "ord_…", "status": "paid"}
//! ```

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::{CommerceError, Result};
use crate::order::{OrderId, OrderStatus};

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the payload signature
pub const SIGNATURE_HEADER: &str = "x-commerce-signature";

/// Order status change reported by the host
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderEvent {
    pub order_id: OrderId,

    #[serde(deserialize_with = "deserialize_status")]
    pub status: OrderStatus,
}

fn deserialize_status<'de, D>(deserializer: D) -> std::result::Result<OrderStatus, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    OrderStatus::parse(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("unknown order status: {raw}")))
}

/// Verifies webhook signatures and parses events
pub struct WebhookVerifier {
    secret: Vec<u8>,
}

impl WebhookVerifier {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
        }
    }

    /// Signature header value for a payload
    pub fn sign(&self, payload: &[u8]) -> String {
        self.mac(payload)
            .map(|mac| format!("sha256={}", hex::encode(mac.finalize().into_bytes())))
            .unwrap_or_default()
    }

    /// Verify webhook signature and parse event
    pub fn parse_event(&self, payload: &[u8], signature: &str) -> Result<OrderEvent> {
        let signature = signature.trim();
        let hex_part = signature.strip_prefix("sha256=").unwrap_or(signature);
        let expected = hex::decode(hex_part)
            .map_err(|_| CommerceError::WebhookSignature("signature is not hex".into()))?;

        let mac = self
            .mac(payload)
            .ok_or_else(|| CommerceError::WebhookSignature("unusable webhook secret".into()))?;
        mac.verify_slice(&expected)
            .map_err(|_| CommerceError::WebhookSignature("signature mismatch".into()))?;

        serde_json::from_slice(payload).map_err(|e| CommerceError::WebhookParse(e.to_string()))
    }

    fn mac(&self, payload: &[u8]) -> Option<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(&self.secret).ok()?;
        mac.update(payload);
        Some(mac)
    }
}

impl std::fmt::Debug for WebhookVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookVerifier").finish_non_exhaustive()
    }
}
