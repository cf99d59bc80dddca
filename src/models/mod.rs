pub mod config;
pub mod keys;

pub use config::{IssuerConfig, ServerConfig, Settings, DEFAULT_PORT};
pub use keys::{decode_private_key, decode_public_key, KeyPair};
