//! Best-effort inspection of JWT-shaped credentials.
//!
//! Credentials are opaque to the client; this only reads the unverified `exp`
//! claim for diagnostics. Anything that is not a JWT yields `None`.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::Deserialize;

use crate::helpers::time::now_u64;

#[derive(Debug, Deserialize)]
struct JwtClaims {
    exp: u64,
}

/// Unix timestamp of the `exp` claim.
pub fn expires_at(token: &str) -> Option<u64> {
    let mut parts = token.split('.');
    let (_header, payload, _signature) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }
    // tolerate padded encoders
    let decoded = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    serde_json::from_slice::<JwtClaims>(&decoded).ok().map(|claims| claims.exp)
}

pub fn is_expired(token: &str) -> Option<bool> {
    expires_at(token).map(|exp| exp <= now_u64())
}
