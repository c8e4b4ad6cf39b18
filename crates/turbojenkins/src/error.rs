//! Error types for the Jenkins client
//!
//! Every HTTP failure is classified by status code so callers can match on
//! the kind of failure instead of inspecting raw responses. Messages carry
//! the URL (and entry point where known) that produced them.

use std::time::Duration;
use thiserror::Error;
use turbojenkins_core::CoreError;

use crate::registry::Namespace;

/// Result type alias for operations that can fail with a client error.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the Jenkins client.
#[derive(Debug, Error)]
pub enum Error {
    /// The item does not exist (404).
    #[error("Not found: {0}")]
    NotFound(String),

    /// Credentials were rejected (401), or the crumb issuer refused them.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Authenticated, but not allowed (403).
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Jenkins rejected the request (400). The message is the `X-Error`
    /// header Jenkins attaches, e.g. a duplicate job name.
    #[error("Bad request: {message}")]
    BadRequest {
        /// Message from the `X-Error` header (or the body if absent)
        message: String,
    },

    /// Jenkins failed internally (500). Carries the response body, which is
    /// usually a stack trace page.
    #[error("Server error: {0}")]
    ServerError(String),

    /// Any other non-success, non-redirect status.
    #[error("HTTP {status} from {url}: {message}")]
    Http {
        /// HTTP status code
        status: u16,
        /// URL of the failed request
        url: String,
        /// Response body
        message: String,
    },

    /// The `_class` of a record has no registered wrapper.
    #[error(
        "No {namespace} wrapper registered for type tag '{tag}' (item {url}); \
         register one with Registry::register_{namespace}"
    )]
    UnregisteredTypeTag {
        /// Registry namespace that was searched
        namespace: Namespace,
        /// Missing tag (last component of `_class`)
        tag: String,
        /// URL of the offending record
        url: String,
    },

    /// A URL that does not belong to this Jenkins instance.
    #[error("{url} is not in {root}")]
    ForeignUrl {
        /// Offending URL
        url: String,
        /// Root of this session
        root: String,
    },

    /// Caller supplied arguments the endpoint cannot accept.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Dynamic field lookup for a name the item does not expose.
    #[error("{kind} has no field '{name}'")]
    UnknownField {
        /// Wrapper kind (e.g. `FreeStyleProject`)
        kind: String,
        /// Requested snake_case name
        name: String,
    },

    /// Failed to deserialize a response, or it lacked an expected field.
    #[error("Failed to parse response: {0}")]
    ResponseValidation(String),

    /// Network or connection error.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Request timeout.
    #[error("Request timeout after {0:?}")]
    Timeout(Duration),

    /// Invalid URL provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// HTTP client configuration or initialization error.
    #[error("HTTP client error: {0}")]
    HttpClient(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Missing required configuration.
    #[error("Missing required configuration: {0}")]
    MissingConfig(String),

    /// Invalid HTTP header name.
    #[error("Invalid HTTP header name: {0}")]
    InvalidHeaderName(String),

    /// Invalid HTTP header value.
    #[error("Invalid HTTP header value: {0}")]
    InvalidHeaderValue(String),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        /// Context description
        context: String,
        /// Underlying error
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Other errors not covered by specific variants.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Classify a failed HTTP response.
    ///
    /// Returns `None` for success and redirect statuses.
    pub fn from_response(
        status: u16,
        url: &str,
        headers: &http::HeaderMap,
        body: &str,
    ) -> Option<Self> {
        if (200..400).contains(&status) {
            return None;
        }
        let error = match status {
            404 => Error::NotFound(format!("404 Not found {url}")),
            401 => Error::Authentication(format!("401 Invalid authorization for {url}")),
            403 => Error::PermissionDenied(format!("403 No permission to access {url}")),
            400 => Error::BadRequest {
                message: headers
                    .get("X-Error")
                    .and_then(|v| v.to_str().ok())
                    .map(String::from)
                    .unwrap_or_else(|| format!("400 {url}: {body}")),
            },
            500 => Error::ServerError(body.to_string()),
            _ => Error::Http {
                status,
                url: url.to_string(),
                message: body.to_string(),
            },
        };
        Some(error)
    }

    /// Whether this is a "no such item" failure.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::NotFound(_) => true,
            Error::WithContext { source, .. } => source
                .downcast_ref::<Error>()
                .is_some_and(Error::is_not_found),
            _ => false,
        }
    }

    /// Whether this failure means the credentials are unusable.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Error::Authentication(_) | Error::PermissionDenied(_))
    }

    /// Add context to an error.
    pub fn context<C>(self, context: C) -> Self
    where
        C: std::fmt::Display + Send + Sync + 'static,
    {
        Error::WithContext {
            context: context.to_string(),
            source: Box::new(self),
        }
    }

    /// Shorthand for a response that parsed but lacked `field`.
    pub(crate) fn missing_field(field: &str, url: &str) -> Self {
        Error::ResponseValidation(format!("response from {url} has no '{field}' field"))
    }
}

impl From<CoreError> for Error {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ForeignUrl { url, root } => Error::ForeignUrl { url, root },
            CoreError::InvalidName { .. } => Error::InvalidArgument(err.to_string()),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            Error::HttpClient(err.to_string())
        } else {
            Error::Connection(err.to_string())
        }
    }
}
