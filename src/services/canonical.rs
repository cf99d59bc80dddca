//! The byte string that signatures are computed over.
//!
//! Issuer and verifier must both go through [`canonical_message`]; any drift
//! between the two sides breaks every link.

/// Field separator. Not expected in a remote name or a decimal timestamp.
pub const DELIMITER: char = '|';

/// Build the signed message for `path` expiring at `expires_at` (Unix seconds).
///
/// A missing leading `/` is added so `docs/a.pdf` and `/docs/a.pdf` sign the
/// same. When `remote` is given it becomes the first field.
pub fn canonical_message(remote: Option<&str>, path: &str, expires_at: i64) -> Vec<u8> {
    let path = normalize_path(path);

    let message = match remote {
        Some(remote) => format!("{remote}{DELIMITER}{path}{DELIMITER}{expires_at}"),
        None => format!("{path}{DELIMITER}{expires_at}"),
    };

    message.into_bytes()
}

fn normalize_path(path: &str) -> std::borrow::Cow<'_, str> {
    if path.starts_with('/') {
        path.into()
    } else {
        format!("/{path}").into()
    }
}
