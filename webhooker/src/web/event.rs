//! Webhook envelope and event classification.

use std::fmt;

use serde::Deserialize;

/// Header naming the GitHub event type of a delivery.
pub const EVENT_HEADER: &str = "X-GitHub-Event";

/// Minimal view of a webhook delivery body.
///
/// Only `action` is read; every other field is ignored. Push deliveries
/// carry no `action`, so it defaults to empty.
#[derive(Debug, Default, Deserialize)]
pub struct WebhookEnvelope {
    #[serde(default)]
    pub action: String,
}

/// Event types the server reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEvent {
    Push,
    Ping,
    Other(String),
}

impl WebhookEvent {
    /// Classify a delivery, preferring the event header over the body's
    /// `action` field.
    pub fn classify(header: Option<&str>, envelope: &WebhookEnvelope) -> Self {
        let name = header
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .unwrap_or(envelope.action.as_str());
        Self::from(name)
    }
}

impl From<&str> for WebhookEvent {
    fn from(name: &str) -> Self {
        match name {
            "push" => WebhookEvent::Push,
            "ping" => WebhookEvent::Ping,
            other => WebhookEvent::Other(other.to_string()),
        }
    }
}

impl fmt::Display for WebhookEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WebhookEvent::Push => f.write_str("push"),
            WebhookEvent::Ping => f.write_str("ping"),
            WebhookEvent::Other(name) => f.write_str(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(json: &str) -> WebhookEnvelope {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_envelope_ignores_other_fields() {
        let env = envelope(r#"{"action":"opened","ref":"refs/heads/main","zen":"x"}"#);
        assert_eq!(env.action, "opened");
    }

    #[test]
    fn test_envelope_without_action() {
        let env = envelope(r#"{"ref":"refs/heads/main"}"#);
        assert_eq!(env.action, "");
    }

    #[test]
    fn test_envelope_rejects_invalid_json() {
        assert!(serde_json::from_str::<WebhookEnvelope>("{not json").is_err());
    }

    #[test]
    fn test_classify_prefers_header() {
        let env = envelope(r#"{"action":"ping"}"#);
        assert_eq!(WebhookEvent::classify(Some("push"), &env), WebhookEvent::Push);
    }

    #[test]
    fn test_classify_falls_back_to_action() {
        let env = envelope(r#"{"action":"push"}"#);
        assert_eq!(WebhookEvent::classify(None, &env), WebhookEvent::Push);
        assert_eq!(WebhookEvent::classify(Some("  "), &env), WebhookEvent::Push);
    }

    #[test]
    fn test_classify_other() {
        let env = WebhookEnvelope::default();
        assert_eq!(
            WebhookEvent::classify(Some("issues"), &env),
            WebhookEvent::Other("issues".to_string())
        );
        assert_eq!(WebhookEvent::classify(None, &env).to_string(), "");
    }
}
