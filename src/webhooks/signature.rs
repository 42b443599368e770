//! Launchpad webhook signature verification using HMAC-SHA1.
//!
//! Launchpad signs each delivery with the webhook's shared secret and sends
//! the digest in the `X-Hub-Signature` header as `sha1=<hex>`.

use hmac::{Hmac, Mac};
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

const SIGNATURE_PREFIX: &str = "sha1=";

/// Parses a signature header (`sha1=<hex>`) into raw digest bytes.
///
/// The prefix is matched case-insensitively. Returns `None` when it is missing
/// or the hex is malformed, so a bare hex digest is rejected.
pub fn parse_signature_header(header: &str) -> Option<Vec<u8>> {
    let header = header.trim();
    let prefix = header.get(..SIGNATURE_PREFIX.len())?;
    if !prefix.eq_ignore_ascii_case(SIGNATURE_PREFIX) {
        return None;
    }
    hex::decode(header[SIGNATURE_PREFIX.len()..].trim()).ok()
}

/// Computes the HMAC-SHA1 digest of a payload.
#[cfg(test)]
pub fn compute_signature(payload: &[u8], secret: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha1::new_from_slice(secret).expect("HMAC can take key of any size");
    mac.update(payload);
    mac.finalize().into_bytes().to_vec()
}

/// Formats a digest as a header value (`sha1=<hex>`).
#[cfg(test)]
pub fn format_signature_header(signature: &[u8]) -> String {
    format!("{SIGNATURE_PREFIX}{}", hex::encode(signature))
}

/// Verifies a webhook signature against the raw body and shared secret.
///
/// An empty secret never verifies. The digest comparison is constant-time.
pub fn verify_signature(payload: &[u8], signature_header: &str, secret: &str) -> bool {
    if secret.is_empty() {
        return false;
    }

    let Some(provided) = parse_signature_header(signature_header) else {
        return false;
    };

    let mut mac = match HmacSha1::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return false,
    };
    mac.update(payload);
    mac.verify_slice(&provided).is_ok()
}
