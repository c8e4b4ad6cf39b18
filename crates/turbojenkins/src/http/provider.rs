//! HTTP provider trait for abstracting the transport
//!
//! The session never talks to `reqwest` directly. Tests substitute an
//! in-memory provider and production code uses [`ReqwestHttpProvider`].
//!
//! [`ReqwestHttpProvider`]: super::ReqwestHttpProvider

use crate::{
    error::Result,
    http::{Request, Response},
};
use async_trait::async_trait;
use std::fmt;

/// Provider trait for performing HTTP requests against a Jenkins server.
///
/// Implementations handle authentication and connection management. They
/// must **not** classify status codes: a 404 is a successful exchange at
/// this layer, and the session turns it into [`Error::NotFound`].
///
/// [`Error::NotFound`]: crate::Error::NotFound
#[async_trait]
pub trait HttpProvider: Send + Sync + fmt::Debug {
    /// Perform `request` and return the raw response.
    ///
    /// # Errors
    ///
    /// Returns an error if the request could not be sent or the response
    /// could not be read (network failure, timeout, invalid URL).
    async fn send(&self, request: Request) -> Result<Response>;

    /// Get the provider name for debugging/logging.
    fn provider_name(&self) -> &'static str;
}
