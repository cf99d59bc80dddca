//! Ed25519 key material and its configuration encoding.
//!
//! Keys travel as url-safe base64. `generate` emits the padded form; decoding
//! accepts values with or without padding.

use base64::{
    alphabet,
    engine::{general_purpose, DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    Engine,
};
use ed25519_dalek::{SigningKey, VerifyingKey, KEYPAIR_LENGTH, PUBLIC_KEY_LENGTH, SECRET_KEY_LENGTH};

use crate::error::ConfigError;

/// Url-safe base64 decoder that does not care about trailing `=`.
pub const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Encode bytes the way keys and signatures appear in configuration and URLs.
pub fn encode(bytes: &[u8]) -> String {
    general_purpose::URL_SAFE.encode(bytes)
}

/// A freshly generated signing keypair.
pub struct KeyPair {
    signing_key: SigningKey,
}

impl KeyPair {
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut rand::rngs::OsRng);
        Self { signing_key }
    }

    pub fn signing_key(&self) -> &SigningKey {
        &self.signing_key
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// Public half, 32 bytes encoded.
    pub fn public_encoded(&self) -> String {
        encode(self.verifying_key().as_bytes())
    }

    /// Private half in the 64-byte `seed || public` layout.
    pub fn private_encoded(&self) -> String {
        encode(&self.signing_key.to_keypair_bytes())
    }
}

fn decode_bytes(field: &'static str, value: &str) -> Result<Vec<u8>, ConfigError> {
    URL_SAFE_LENIENT
        .decode(value.trim())
        .map_err(|e| ConfigError::InvalidKey {
            field,
            reason: e.to_string(),
        })
}

/// Decode a verifying key from configuration.
pub fn decode_public_key(field: &'static str, value: &str) -> Result<VerifyingKey, ConfigError> {
    let bytes = decode_bytes(field, value)?;
    let bytes: [u8; PUBLIC_KEY_LENGTH] =
        bytes
            .as_slice()
            .try_into()
            .map_err(|_| ConfigError::InvalidKey {
                field,
                reason: format!("expected {PUBLIC_KEY_LENGTH} bytes, got {}", bytes.len()),
            })?;

    VerifyingKey::from_bytes(&bytes).map_err(|e| ConfigError::InvalidKey {
        field,
        reason: e.to_string(),
    })
}

/// Decode a signing key from configuration.
///
/// Accepts the 64-byte keypair layout or a bare 32-byte seed. For the keypair
/// layout the embedded public half must match the seed.
pub fn decode_private_key(field: &'static str, value: &str) -> Result<SigningKey, ConfigError> {
    let bytes = decode_bytes(field, value)?;

    match bytes.len() {
        KEYPAIR_LENGTH => {
            let mut keypair = [0u8; KEYPAIR_LENGTH];
            keypair.copy_from_slice(&bytes);
            SigningKey::from_keypair_bytes(&keypair).map_err(|e| ConfigError::InvalidKey {
                field,
                reason: e.to_string(),
            })
        }
        SECRET_KEY_LENGTH => {
            let mut seed = [0u8; SECRET_KEY_LENGTH];
            seed.copy_from_slice(&bytes);
            Ok(SigningKey::from_bytes(&seed))
        }
        n => Err(ConfigError::InvalidKey {
            field,
            reason: format!("expected {KEYPAIR_LENGTH} or {SECRET_KEY_LENGTH} bytes, got {n}"),
        }),
    }
}
