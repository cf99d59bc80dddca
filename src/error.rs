use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Per-request failures. Every variant maps to a short plain-text response.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Wrong method or root path. Never a valid file target.
    #[error("Not found")]
    NotFound,

    #[error("Missing required parameter: {0}")]
    MissingParam(&'static str),

    #[error("Invalid encoding: {0}")]
    BadEncoding(&'static str),

    #[error("Link is no longer valid")]
    Expired,

    #[error("Signature verification failed")]
    BadSignature,

    #[error("Object not found")]
    ObjectNotFound,

    #[error("Can only serve single files")]
    MultipleObjects,

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound | ApiError::ObjectNotFound => StatusCode::NOT_FOUND,
            ApiError::MissingParam(_)
            | ApiError::BadEncoding(_)
            | ApiError::Expired
            | ApiError::BadSignature
            | ApiError::MultipleObjects => StatusCode::BAD_REQUEST,
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Backend details stay in the log
        let message = match &self {
            ApiError::Store(e) => {
                tracing::error!(error = %e, "Storage backend failure");
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        };

        (
            status,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            format!("{message}\n"),
        )
            .into_response()
    }
}

/// Errors raised by a blob store while resolving or opening an object.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unknown remote: {0}")]
    UnknownRemote(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Fatal startup errors. Each names the offending configuration field.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required configuration: {0}")]
    Missing(&'static str),

    #[error("invalid key in {field}: {reason}")]
    InvalidKey { field: &'static str, reason: String },

    #[error("invalid value for {field}: {value:?}")]
    InvalidValue { field: &'static str, value: String },

    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Command-line misuse detected before any signing happens.
#[derive(Debug, Error)]
pub enum UsageError {
    #[error("malformed target {0:?}: expected `path` or `remote:path`")]
    MalformedTarget(String),

    #[error("target remote {target:?} does not match configured remote {configured:?}")]
    RemoteMismatch { target: String, configured: String },
}

/// Failure of the post-issuance live check against the server.
#[derive(Debug, Error)]
pub enum LinkCheckError {
    #[error("server rejected signed URL with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("request to server failed: {0}")]
    Request(#[from] reqwest::Error),
}
