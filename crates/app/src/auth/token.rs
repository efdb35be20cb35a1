//! Session token issuing and decoding.
//!
//! Access tokens are JWT-shaped: `base64url(header).base64url(claims).signature`
//! where the signature is the base64url SHA-256 digest of the first two
//! segments. They are only meant to look like hosted auth tokens; nothing
//! verifies them cryptographically.

use std::fmt;

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD as BASE64_URL};
use jiff::Timestamp;
use rand::{RngCore, rngs::OsRng};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::{Digest, Sha256};
use thiserror::Error;
use zeroize::Zeroize;

use crate::auth::{Session, User};

/// Access token lifetime in seconds.
pub const ACCESS_TOKEN_TTL_SECONDS: i64 = 3600;

/// Number of random bytes in a refresh token.
pub const REFRESH_TOKEN_BYTES: usize = 32;

/// Claims carried by an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: String,

    /// Email, when the user has one.
    #[serde(default)]
    pub email: Option<String>,

    /// Role from the user metadata.
    #[serde(default)]
    pub role: Option<String>,

    /// Issued at, in Unix seconds.
    pub iat: i64,

    /// Expiry, in Unix seconds.
    pub exp: i64,
}

/// Errors raised while issuing or decoding tokens.
#[derive(Debug, Error)]
pub enum TokenError {
    /// Not three dot-separated base64 segments.
    #[error("access token format is invalid")]
    InvalidFormat,

    /// The signature segment does not match the payload.
    #[error("access token signature does not match")]
    InvalidSignature,

    /// The payload is not a claims document.
    #[error("access token claims are invalid")]
    InvalidClaims(#[source] serde_json::Error),
}

struct RefreshSecret {
    bytes: [u8; REFRESH_TOKEN_BYTES],
}

impl RefreshSecret {
    fn generate() -> Self {
        let mut bytes = [0_u8; REFRESH_TOKEN_BYTES];

        OsRng.fill_bytes(&mut bytes);

        Self { bytes }
    }

    fn to_hex(&self) -> String {
        let mut encoded = String::with_capacity(REFRESH_TOKEN_BYTES * 2);

        for &byte in &self.bytes {
            encoded.push(hex_digit(byte >> 4));
            encoded.push(hex_digit(byte & 0x0f));
        }

        encoded
    }
}

impl fmt::Debug for RefreshSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RefreshSecret(**redacted**)")
    }
}

impl Drop for RefreshSecret {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

/// Issue a fresh session for `user` at `now`.
///
/// # Errors
///
/// Returns an error when the claims cannot be encoded.
pub fn issue_session(user: User, now: Timestamp) -> Result<Session, TokenError> {
    let issued_at = now.as_second();
    let expires_at = issued_at.saturating_add(ACCESS_TOKEN_TTL_SECONDS);

    let claims = Claims {
        sub: user.id.clone(),
        email: user.email.clone(),
        role: user.role().map(str::to_string),
        iat: issued_at,
        exp: expires_at,
    };

    Ok(Session {
        access_token: encode_access_token(&claims)?,
        token_type: "bearer".to_string(),
        expires_in: ACCESS_TOKEN_TTL_SECONDS,
        expires_at: Some(expires_at),
        refresh_token: RefreshSecret::generate().to_hex(),
        user,
    })
}

/// Encode `claims` as a JWT-shaped access token.
///
/// # Errors
///
/// Returns an error when the claims cannot be serialized.
pub fn encode_access_token(claims: &Claims) -> Result<String, TokenError> {
    let header = BASE64_URL.encode(json!({ "alg": "HS256", "typ": "JWT" }).to_string());
    let payload = BASE64_URL.encode(serde_json::to_vec(claims).map_err(TokenError::InvalidClaims)?);
    let signing_input = format!("{header}.{payload}");
    let signature = sign(&signing_input);

    Ok(format!("{signing_input}.{signature}"))
}

/// Decode and check the claims of an access token.
///
/// # Errors
///
/// Returns an error when the token is malformed or its signature segment
/// does not match.
pub fn decode_claims(token: &str) -> Result<Claims, TokenError> {
    let (signing_input, signature) = token.rsplit_once('.').ok_or(TokenError::InvalidFormat)?;
    let (_header, payload) = signing_input
        .split_once('.')
        .ok_or(TokenError::InvalidFormat)?;

    if sign(signing_input) != signature {
        return Err(TokenError::InvalidSignature);
    }

    let payload = BASE64_URL
        .decode(payload)
        .map_err(|_decode_error| TokenError::InvalidFormat)?;

    serde_json::from_slice(&payload).map_err(TokenError::InvalidClaims)
}

fn hex_digit(nibble: u8) -> char {
    char::from_digit(u32::from(nibble), 16).unwrap_or('0')
}

fn sign(signing_input: &str) -> String {
    BASE64_URL.encode(Sha256::digest(signing_input.as_bytes()))
}
