//! Request validation gate.
//!
//! [`LinkVerifier::check`] walks a request through every check in a fixed
//! order and stops at the first failure:
//!
//! 1. method is GET or HEAD, path is a decodable non-root path
//! 2. `expires_at` and `signature` are present
//! 3. `signature` is url-safe base64
//! 4. `expires_at` is a decimal i64
//! 5. `expires_at` is not before now
//! 6. the signature verifies over the canonical message of the request path
//!
//! Expiry is checked before the signature, so a client can tell an expired
//! link from a forged one. Signature failures never say which part was wrong.

use axum::http::Method;
use base64::Engine;
use ed25519_dalek::{Signature, VerifyingKey};
use percent_encoding::percent_decode_str;

use super::canonical::canonical_message;
use crate::error::ApiError;
use crate::models::{keys::URL_SAFE_LENIENT, ServerConfig};

pub const EXPIRES_AT_PARAM: &str = "expires_at";
pub const SIGNATURE_PARAM: &str = "signature";

/// The parts of an HTTP request the gate looks at.
#[derive(Debug, Clone)]
pub struct LinkRequest<'a> {
    pub method: Method,
    /// Path as it appeared on the wire, still percent-encoded.
    pub raw_path: &'a str,
    pub expires_at: Option<&'a str>,
    pub signature: Option<&'a str>,
}

/// A request that passed every check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedLink {
    /// Decoded request path, always starting with `/`.
    pub path: String,
    pub expires_at: i64,
    pub head_only: bool,
}

pub struct LinkVerifier {
    verifying_key: VerifyingKey,
    remote: Option<String>,
}

impl LinkVerifier {
    pub fn new(verifying_key: VerifyingKey) -> Self {
        Self {
            verifying_key,
            remote: None,
        }
    }

    /// Expect signatures that include `remote` as the first message field.
    pub fn with_bound_remote(mut self, remote: impl Into<String>) -> Self {
        self.remote = Some(remote.into());
        self
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        let verifier = Self::new(config.verifying_key);
        if config.bind_remote {
            verifier.with_bound_remote(config.remote.clone())
        } else {
            verifier
        }
    }

    /// Run the gate with `now` as the current Unix time in seconds.
    pub fn check(&self, request: &LinkRequest<'_>, now: i64) -> Result<VerifiedLink, ApiError> {
        // 1. method and shape
        let head_only = match request.method {
            Method::GET => false,
            Method::HEAD => true,
            _ => return Err(ApiError::NotFound),
        };
        let path = decode_path(request.raw_path).ok_or(ApiError::NotFound)?;

        // 2. parameter presence
        let expires_at = non_empty(request.expires_at).ok_or(ApiError::MissingParam(EXPIRES_AT_PARAM))?;
        let signature = non_empty(request.signature).ok_or(ApiError::MissingParam(SIGNATURE_PARAM))?;

        // 3. signature decode
        let signature = URL_SAFE_LENIENT
            .decode(signature)
            .map_err(|_| ApiError::BadEncoding(SIGNATURE_PARAM))?;

        // 4. expiry parse
        let expires_at: i64 = expires_at
            .parse()
            .map_err(|_| ApiError::BadEncoding(EXPIRES_AT_PARAM))?;

        // 5. expiry
        if expires_at < now {
            return Err(ApiError::Expired);
        }

        // 6. signature
        let signature = Signature::from_slice(&signature).map_err(|_| ApiError::BadSignature)?;
        let message = canonical_message(self.remote.as_deref(), &path, expires_at);
        self.verifying_key
            .verify_strict(&message, &signature)
            .map_err(|_| ApiError::BadSignature)?;

        Ok(VerifiedLink {
            path,
            expires_at,
            head_only,
        })
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Percent-decode a request path. `None` for the root or undecodable input.
fn decode_path(raw: &str) -> Option<String> {
    let decoded = percent_decode_str(raw).decode_utf8().ok()?;
    if decoded.trim_matches('/').is_empty() {
        return None;
    }

    if decoded.starts_with('/') {
        Some(decoded.into_owned())
    } else {
        Some(format!("/{decoded}"))
    }
}
