//! Signed asset tokens.
//!
//! Payload: issued_at secs (u64 BE) || asset name bytes.
//! Token = base64url(payload || HMAC-SHA256(secret, payload)).
//!
//! Tokens are self-contained: no server-side session state, safe to verify
//! fully in parallel. The verifier enforces `now - issued_at <= MAX_AGE`.
//! Path resolution is a separate step in the asset store; a valid token
//! only proves who minted the name and when.

use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Maximum accepted token age.
pub const MAX_AGE: Duration = Duration::from_secs(3600);

const TS_LEN: usize = 8;
const MAC_LEN: usize = 32; // SHA256

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token is malformed")]
    Malformed,
    #[error("token signature is invalid")]
    BadSignature,
    #[error("token has expired")]
    Expired,
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

fn mac_for(payload: &[u8], secret: &[u8]) -> Hmac<Sha256> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret).expect("HMAC accepts any key size");
    mac.update(payload);
    mac
}

/// Mint a token authorizing retrieval of `asset_name`, stamped now.
pub fn issue(asset_name: &str, secret: &[u8]) -> String {
    issue_at(asset_name, secret, unix_now())
}

/// Mint a token with an explicit issue timestamp.
pub fn issue_at(asset_name: &str, secret: &[u8], issued_at: u64) -> String {
    let name = asset_name.as_bytes();
    let mut payload = Vec::with_capacity(TS_LEN + name.len());
    payload.extend_from_slice(&issued_at.to_be_bytes());
    payload.extend_from_slice(name);

    let tag = mac_for(&payload, secret).finalize().into_bytes();

    let mut token_bytes = payload;
    token_bytes.extend_from_slice(&tag);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(token_bytes)
}

/// Verify a token against the current clock and return the asset name.
pub fn verify(token: &str, secret: &[u8]) -> Result<String, TokenError> {
    verify_at(token, secret, unix_now())
}

/// Verify a token against an explicit clock.
pub fn verify_at(token: &str, secret: &[u8], now: u64) -> Result<String, TokenError> {
    let decoded = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(token)
        .map_err(|_| TokenError::Malformed)?;
    if decoded.len() <= TS_LEN + MAC_LEN {
        return Err(TokenError::Malformed);
    }

    let (payload, tag) = decoded.split_at(decoded.len() - MAC_LEN);
    mac_for(payload, secret)
        .verify_slice(tag)
        .map_err(|_| TokenError::BadSignature)?;

    let issued_at = u64::from_be_bytes(payload[..TS_LEN].try_into().expect("payload >= 8 bytes"));
    if now.saturating_sub(issued_at) > MAX_AGE.as_secs() {
        return Err(TokenError::Expired);
    }

    let name = std::str::from_utf8(&payload[TS_LEN..]).map_err(|_| TokenError::Malformed)?;
    Ok(name.to_string())
}
