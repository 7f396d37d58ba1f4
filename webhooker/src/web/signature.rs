//! GitHub webhook signature verification.
//!
//! GitHub signs each delivery with HMAC-SHA256 over the raw request body,
//! keyed with the webhook secret, and sends it as
//! `X-Hub-Signature-256: sha256=<hex digest>`.
//! Reference: https://docs.github.com/en/webhooks/using-webhooks/validating-webhook-deliveries

use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::warn;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the delivery signature.
pub const SIGNATURE_HEADER: &str = "X-Hub-Signature-256";

/// Algorithm tag preceding the hex digest in the signature header.
pub const SIGNATURE_PREFIX: &str = "sha256=";

/// Verify a GitHub webhook signature.
///
/// # Arguments
///
/// * `secret` - The shared webhook secret
/// * `body` - The raw, unparsed request body
/// * `signature` - The value of the `X-Hub-Signature-256` header
///
/// # Returns
///
/// `true` only if the header is well formed and matches the body.
pub fn verify_github_signature(secret: &[u8], body: &[u8], signature: &str) -> bool {
    if secret.is_empty() {
        warn!("github_signature_no_secret");
        return false;
    }

    let provided = match signature.strip_prefix(SIGNATURE_PREFIX) {
        Some(digest) => digest,
        None => {
            warn!(
                header_length = signature.len(),
                "github_signature_malformed"
            );
            return false;
        }
    };

    let provided = match hex::decode(provided) {
        Ok(bytes) => bytes,
        Err(_) => {
            warn!(digest_length = provided.len(), "github_signature_not_hex");
            return false;
        }
    };

    let mut mac = match HmacSha256::new_from_slice(secret) {
        Ok(m) => m,
        Err(_) => {
            warn!("github_signature_invalid_key");
            return false;
        }
    };
    mac.update(body);

    // Constant-time comparison (subtle) to prevent timing attacks
    let valid = mac.verify_slice(&provided).is_ok();

    if !valid {
        warn!(actual_length = provided.len(), "github_signature_mismatch");
    }

    valid
}

/// Produce the `sha256=<hex>` header value GitHub would send for `body`.
pub fn sign_github_payload(secret: &[u8], body: &[u8]) -> String {
    let digest = compute_digest(secret, body).unwrap_or_default();
    format!("{}{}", SIGNATURE_PREFIX, digest)
}

fn compute_digest(secret: &[u8], body: &[u8]) -> Option<String> {
    let mut mac = match HmacSha256::new_from_slice(secret) {
        Ok(m) => m,
        Err(_) => {
            warn!("github_signature_invalid_key");
            return None;
        }
    };
    mac.update(body);
    Some(hex::encode(mac.finalize().into_bytes()))
}
