//! Assurance-level read from the session access token.
//!
//! The token is the client's own bearer credential; the payload is decoded
//! without signature verification, the same trust the rest of the session
//! already carries. Only the `aal` claim is consumed.

use base64ct::{Base64UrlUnpadded, Encoding};
use serde::Deserialize;

use super::{error::IdentityError, types::AssuranceLevel};

#[derive(Debug, Deserialize)]
struct SessionClaims {
    #[serde(default)]
    aal: Option<String>,
}

/// Read the current assurance level from a JWT access token.
///
/// A missing or unknown `aal` claim reads as `aal1`; a token that is not a
/// decodable JWT is an error.
pub(crate) fn assurance_from_token(token: &str) -> Result<AssuranceLevel, IdentityError> {
    let payload = token
        .split('.')
        .nth(1)
        .ok_or_else(|| IdentityError::Parse("access token is not a JWT".to_string()))?;

    let bytes = Base64UrlUnpadded::decode_vec(payload)
        .map_err(|err| IdentityError::Parse(format!("Failed to decode token payload: {err}")))?;

    let claims: SessionClaims = serde_json::from_slice(&bytes)
        .map_err(|err| IdentityError::Parse(format!("Failed to parse token claims: {err}")))?;

    Ok(claims
        .aal
        .as_deref()
        .and_then(AssuranceLevel::from_str)
        .unwrap_or(AssuranceLevel::Aal1))
}

#[cfg(test)]
pub(crate) fn token_with_aal(aal: &str) -> String {
    let header = Base64UrlUnpadded::encode_string(br#"{"alg":"none","typ":"JWT"}"#);
    let payload = Base64UrlUnpadded::encode_string(format!(r#"{{"aal":"{aal}"}}"#).as_bytes());
    format!("{header}.{payload}.sig")
}
