//! rserve - private file links
//!
//! Issues expiring, Ed25519-signed URLs for files in a storage remote and
//! serves a file only when its link verifies.
//! This library exposes modules for integration testing.

pub mod api;
pub mod error;
pub mod models;
pub mod server;
pub mod services;
