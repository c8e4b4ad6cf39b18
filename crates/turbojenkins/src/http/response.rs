//! HTTP response wrapper

use crate::error::{Error, Result};
use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use serde::de::DeserializeOwned;

/// A fully-read HTTP response.
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    url: String,
    headers: HeaderMap,
    body: Bytes,
}

impl Response {
    /// Create a new response.
    pub fn new(
        status: StatusCode,
        url: impl Into<String>,
        headers: HeaderMap,
        body: impl Into<Bytes>,
    ) -> Self {
        Self {
            status,
            url: url.into(),
            headers,
            body: body.into(),
        }
    }

    /// Get the status code.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// URL the request was sent to.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Get the headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Get a header value as a string, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// The `Location` header, set by Jenkins on create/build/move/rename.
    pub fn location(&self) -> Option<&str> {
        self.header(http::header::LOCATION.as_str())
    }

    /// Get the raw body.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Body decoded as (lossy) UTF-8.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Deserialize the body as JSON.
    ///
    /// # Errors
    /// Returns [`Error::ResponseValidation`] naming the URL if the body does
    /// not match `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body)
            .map_err(|e| Error::ResponseValidation(format!("{}: {e}", self.url)))
    }

    /// Whether the status is 2xx or 3xx.
    ///
    /// Redirects are not followed, so a 302 after `createItem` is success.
    pub fn is_success(&self) -> bool {
        self.status.is_success() || self.status.is_redirection()
    }

    /// Turn a failure status into a classified [`Error`].
    ///
    /// # Errors
    /// See [`Error::from_response`] for the status mapping.
    pub fn error_for_status(self) -> Result<Self> {
        match Error::from_response(
            self.status.as_u16(),
            &self.url,
            &self.headers,
            &String::from_utf8_lossy(&self.body),
        ) {
            Some(err) => Err(err),
            None => Ok(self),
        }
    }
}
