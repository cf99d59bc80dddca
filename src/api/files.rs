use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, Method, Uri},
    response::{IntoResponse, Response},
};
use futures_util::TryStreamExt;
use std::sync::Arc;

use crate::error::ApiError;
use crate::services::verifier::{EXPIRES_AT_PARAM, SIGNATURE_PARAM};
use crate::services::{BlobStore, LinkRequest, LinkVerifier, Resolution, Selection};

const OCTET_STREAM: &str = "application/octet-stream";

fn param<'a>(params: &'a [(String, String)], name: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
}

/// Serve one file behind a signed link.
///
/// Accepts `GET|HEAD /<path>?expires_at=<unix seconds>&signature=<base64url>`.
/// The link is validated before storage is touched; only a single object is
/// ever delivered.
pub async fn handle_file(
    State(verifier): State<Arc<LinkVerifier>>,
    State(store): State<Arc<dyn BlobStore>>,
    State(remote): State<Arc<str>>,
    method: Method,
    uri: Uri,
) -> Result<Response, ApiError> {
    let params = Query::<Vec<(String, String)>>::try_from_uri(&uri)
        .map(|Query(params)| params)
        .unwrap_or_default();

    let request = LinkRequest {
        method,
        raw_path: uri.path(),
        expires_at: param(&params, EXPIRES_AT_PARAM),
        signature: param(&params, SIGNATURE_PARAM),
    };

    let now = chrono::Utc::now().timestamp();
    let link = match verifier.check(&request, now) {
        Ok(link) => link,
        Err(e) => {
            tracing::debug!(method = %request.method, path = uri.path(), reason = %e, "Rejected request");
            return Err(e);
        }
    };

    // Fresh selection for every request
    let selection = Selection::new(remote.as_ref(), link.path.as_str());
    let object = match store.resolve(&selection).await? {
        Resolution::NotFound => {
            tracing::debug!(path = %link.path, "Object not found");
            return Err(ApiError::ObjectNotFound);
        }
        Resolution::Multiple => {
            tracing::debug!(path = %link.path, "Path resolves to multiple objects");
            return Err(ApiError::MultipleObjects);
        }
        Resolution::Single(object) => object,
    };

    tracing::info!(
        remote = %object.remote,
        key = %object.key,
        size = object.size,
        head = link.head_only,
        "Serving file"
    );

    let headers = [
        (header::CONTENT_LENGTH, object.size.to_string()),
        (header::CONTENT_TYPE, OCTET_STREAM.to_string()),
    ];

    if link.head_only {
        return Ok((headers, Body::empty()).into_response());
    }

    let key = object.key.clone();
    let stream = store.open(&object).await?.inspect_err(move |e| {
        // Headers are already sent; the connection is dropped
        tracing::error!(key = %key, error = %e, "Stream failed mid-response");
    });

    Ok((headers, Body::from_stream(stream)).into_response())
}
