//! HTTP request description

use crate::error::{Error, Result};
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use url::Url;

/// Content type Jenkins expects for `config.xml` and `createItem` bodies.
pub const XML_CONTENT_TYPE: &str = "text/xml; charset=utf-8";

/// Request payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Body {
    /// No body
    #[default]
    Empty,
    /// Raw XML sent as `text/xml; charset=utf-8`
    Xml(String),
    /// `application/x-www-form-urlencoded` fields, in order
    Form(Vec<(String, String)>),
}

/// A request against an absolute URL.
///
/// Built by items and the session, then handed to an [`HttpProvider`].
///
/// [`HttpProvider`]: super::HttpProvider
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    url: String,
    query: Vec<(String, String)>,
    headers: HeaderMap,
    body: Body,
}

impl Request {
    /// Create a new request.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: Body::Empty,
        }
    }

    /// Shorthand for a `GET` request.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    /// Shorthand for a `POST` request.
    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    /// Append a query parameter.
    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Append several query parameters.
    pub fn queries<I, K, V>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: ToString,
    {
        self.query
            .extend(pairs.into_iter().map(|(k, v)| (k.into(), v.to_string())));
        self
    }

    /// Set a header.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Try to set a header, returning an error if the name or value is invalid.
    ///
    /// # Errors
    /// Returns an error if the header name or value contains invalid characters.
    pub fn try_header(self, key: &str, value: &str) -> Result<Self> {
        let name = key
            .parse::<HeaderName>()
            .map_err(|e| Error::InvalidHeaderName(format!("'{key}': {e}")))?;
        let value = value
            .parse::<HeaderValue>()
            .map_err(|e| Error::InvalidHeaderValue(format!("'{value}': {e}")))?;
        Ok(self.header(name, value))
    }

    /// Send `xml` as the body.
    pub fn xml(mut self, xml: impl Into<String>) -> Self {
        self.body = Body::Xml(xml.into());
        self
    }

    /// Send form fields as the body.
    pub fn form<I, K, V>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.body = Body::Form(
            fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    /// Get the method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Get the URL without query parameters.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Get the query parameters.
    pub fn query_pairs(&self) -> &[(String, String)] {
        &self.query
    }

    /// Get the headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub(crate) fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Get the body.
    pub fn body(&self) -> &Body {
        &self.body
    }

    /// Resolve the URL with query parameters appended.
    ///
    /// # Errors
    /// Returns [`Error::InvalidUrl`] if the URL does not parse.
    pub fn full_url(&self) -> Result<Url> {
        let mut url =
            Url::parse(&self.url).map_err(|e| Error::InvalidUrl(format!("{}: {e}", self.url)))?;
        if !self.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&self.query);
        }
        Ok(url)
    }
}
