//! HTTP transport abstraction
//!
//! Every network call the client makes goes through [`HttpProvider::send`].
//! The session layers the crumb header and status classification on top.

pub use provider::HttpProvider;
pub use reqwest_provider::{ReqwestHttpProvider, ReqwestHttpProviderBuilder};
pub use request::{Body, Request};
pub use response::Response;

pub mod provider;
mod reqwest_provider;
mod request;
mod response;

// Re-export HTTP types from the http crate for convenience
pub use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
