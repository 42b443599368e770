//! Launchpad webhook authentication and delivery helpers.

pub mod signature;

pub use signature::verify_signature;
#[cfg(test)]
pub use signature::{compute_signature, format_signature_header};

/// Short content hash of a delivery body, used to correlate retried
/// deliveries in logs.
pub fn delivery_fingerprint(body: &[u8]) -> String {
    let hash = blake3::hash(body).to_hex();
    hash.as_str()[..16].to_string()
}
