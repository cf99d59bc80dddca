use chrono::{DateTime, Duration, Utc};
use ed25519_dalek::{Signature, Signer, SigningKey};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS, NON_ALPHANUMERIC};
use std::fmt;

use super::canonical::canonical_message;
use crate::error::UsageError;
use crate::models::{keys, IssuerConfig};

/// Characters escaped in the URL path. `/` stays as a separator.
const PATH: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'\'')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Characters escaped in query values. Mostly for base64 padding.
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// How long an issued link stays valid.
pub fn default_validity() -> Duration {
    Duration::hours(48)
}

/// A file to sign, as given on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignTarget {
    pub remote: String,
    pub path: String,
}

impl SignTarget {
    /// Parse `path` or `remote:path`.
    ///
    /// A colon only separates a remote when the part before it has no `/`,
    /// so `docs/a:b.txt` is a plain path. The server serves one remote, so a
    /// compound target must name `configured_remote`.
    pub fn parse(input: &str, configured_remote: &str) -> Result<Self, UsageError> {
        let malformed = || UsageError::MalformedTarget(input.to_string());

        let (remote, path) = match input.split_once(':') {
            Some((remote, path)) if !remote.contains('/') => {
                if remote.is_empty() {
                    return Err(malformed());
                }
                if remote != configured_remote {
                    return Err(UsageError::RemoteMismatch {
                        target: remote.to_string(),
                        configured: configured_remote.to_string(),
                    });
                }
                (remote, path)
            }
            _ => (configured_remote, input),
        };

        if path.trim_matches('/').is_empty() {
            return Err(malformed());
        }

        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        };

        Ok(Self {
            remote: remote.to_string(),
            path,
        })
    }
}

/// A link ready to hand out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedUrl {
    pub url: String,
    pub path: String,
    pub expires_at: i64,
    pub signature: String,
}

impl SignedUrl {
    /// A shell command that downloads the file under its own name.
    pub fn download_command(&self) -> String {
        let name = self
            .path
            .rsplit('/')
            .find(|s| !s.is_empty())
            .unwrap_or("download");
        format!("curl -o {} {}", shell_quote(name), shell_quote(&self.url))
    }
}

impl fmt::Display for SignedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

/// Issues Ed25519-signed, expiring URLs.
pub struct UrlSigner {
    signing_key: SigningKey,
    base_url: String,
    remote: String,
    bind_remote: bool,
    validity: Duration,
}

impl UrlSigner {
    pub fn new(signing_key: SigningKey, base_url: impl Into<String>, remote: impl Into<String>) -> Self {
        Self {
            signing_key,
            base_url: base_url.into(),
            remote: remote.into(),
            bind_remote: false,
            validity: default_validity(),
        }
    }

    pub fn from_config(config: &IssuerConfig) -> Self {
        Self::new(config.signing_key.clone(), config.base_url(), config.remote.clone())
            .with_bind_remote(config.bind_remote)
    }

    /// Sign the remote name into every message.
    pub fn with_bind_remote(mut self, bind_remote: bool) -> Self {
        self.bind_remote = bind_remote;
        self
    }

    pub fn with_validity(mut self, validity: Duration) -> Self {
        self.validity = validity;
        self
    }

    pub fn remote(&self) -> &str {
        &self.remote
    }

    /// Parse a `path` or `remote:path` target and sign it.
    pub fn sign_target(&self, input: &str, now: DateTime<Utc>) -> Result<SignedUrl, UsageError> {
        let target = SignTarget::parse(input, &self.remote)?;
        Ok(self.sign(&target, now))
    }

    pub fn sign(&self, target: &SignTarget, now: DateTime<Utc>) -> SignedUrl {
        let expires_at = (now + self.validity).timestamp();

        let remote = self.bind_remote.then_some(target.remote.as_str());
        let message = canonical_message(remote, &target.path, expires_at);
        let signature: Signature = self.signing_key.sign(&message);
        let signature = keys::encode(&signature.to_bytes());

        let url = format!(
            "{}{}?expires_at={}&signature={}",
            self.base_url,
            utf8_percent_encode(&target.path, PATH),
            expires_at,
            utf8_percent_encode(&signature, QUERY_VALUE),
        );

        tracing::debug!(path = %target.path, expires_at, "Signed URL");

        SignedUrl {
            url,
            path: target.path.clone(),
            expires_at,
            signature,
        }
    }
}
