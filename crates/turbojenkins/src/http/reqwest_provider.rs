//! `reqwest`-backed HTTP provider
//!
//! Handles basic authentication, default headers, proxy and connection
//! pooling. Redirects are never followed: Jenkins answers `createItem`,
//! `build`, `move/move` and `confirmRename` with a 302/201 whose
//! `Location` header is the result the caller wants.

use super::{Body, HttpProvider, Request, Response, request::XML_CONTENT_TYPE};
use crate::{
    config::{ClientConfig, ConnectionPoolConfig, DEFAULT_TIMEOUT},
    error::{Error, Result},
    observability::Exchange,
};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::{sync::Arc, time::Duration};

/// HTTP provider backed by a pooled `reqwest::Client`.
///
/// # Example
///
/// ```rust,no_run
/// use turbojenkins::http::ReqwestHttpProvider;
///
/// let provider = ReqwestHttpProvider::builder()
///     .username("admin")
///     .api_token("11ab...")
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct ReqwestHttpProvider {
    inner: Arc<ProviderInner>,
}

#[derive(Debug)]
struct ProviderInner {
    /// HTTP client for making requests
    http_client: reqwest::Client,
    /// Basic-auth user
    username: Option<String>,
    /// Basic-auth secret
    api_token: Option<SecretString>,
    /// Custom headers to include with every request
    default_headers: http::HeaderMap,
    /// Request timeout, reported on timeout errors
    timeout: Duration,
}

impl ReqwestHttpProvider {
    /// Create a new builder.
    pub fn builder() -> ReqwestHttpProviderBuilder {
        ReqwestHttpProviderBuilder::default()
    }

    /// Build a provider from a [`ClientConfig`].
    ///
    /// # Errors
    /// Returns an error if the proxy URL is invalid or the HTTP client
    /// cannot be created.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let mut builder = Self::builder()
            .timeout(config.timeout)
            .accept_invalid_certs(config.accept_invalid_certs)
            .connection_pool(config.connection_pool.clone());
        builder.default_headers = config.default_headers.clone();
        builder.username = config.username.clone();
        builder.api_token = config.api_token.clone();
        builder.proxy = config.proxy.clone();
        builder.build()
    }

    fn apply_body(builder: reqwest::RequestBuilder, body: &Body) -> (reqwest::RequestBuilder, usize) {
        match body {
            Body::Empty => (builder, 0),
            Body::Xml(xml) => (
                builder
                    .header(http::header::CONTENT_TYPE, XML_CONTENT_TYPE)
                    .body(xml.clone()),
                xml.len(),
            ),
            Body::Form(fields) => {
                let size = fields.iter().map(|(k, v)| k.len() + v.len() + 2).sum();
                (builder.form(fields), size)
            }
        }
    }
}

#[async_trait]
impl HttpProvider for ReqwestHttpProvider {
    async fn send(&self, request: Request) -> Result<Response> {
        let url = request.full_url()?;
        let mut builder = self
            .inner
            .http_client
            .request(request.method().clone(), url.clone())
            .headers(self.inner.default_headers.clone())
            .headers(request.headers().clone());

        if let Some(username) = &self.inner.username {
            builder = builder.basic_auth(
                username,
                self.inner.api_token.as_ref().map(|t| t.expose_secret()),
            );
        }

        let (builder, body_size) = Self::apply_body(builder, request.body());
        let exchange = Exchange::begin(request.method(), request.url(), body_size);

        let resp = match builder.send().await {
            Ok(resp) => resp,
            Err(e) => {
                exchange.failed(&e);
                return Err(if e.is_timeout() {
                    Error::Timeout(self.inner.timeout)
                } else {
                    Error::from(e)
                });
            }
        };

        let status = resp.status();
        let headers = resp.headers().clone();
        let body = resp
            .bytes()
            .await
            .map_err(|e| Error::Connection(e.to_string()))?;

        exchange.finished(status.as_u16(), body.len());

        Ok(Response::new(status, request.url(), headers, body))
    }

    fn provider_name(&self) -> &'static str {
        "reqwest"
    }
}

/// Builder for [`ReqwestHttpProvider`].
#[derive(Default)]
pub struct ReqwestHttpProviderBuilder {
    username: Option<String>,
    api_token: Option<SecretString>,
    timeout: Option<Duration>,
    proxy: Option<String>,
    accept_invalid_certs: bool,
    connection_pool: ConnectionPoolConfig,
    default_headers: http::HeaderMap,
}

impl ReqwestHttpProviderBuilder {
    /// Set the basic-auth user name.
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Set the basic-auth API token (or password).
    pub fn api_token(mut self, api_token: impl Into<String>) -> Self {
        self.api_token = Some(SecretString::new(api_token.into().into_boxed_str()));
        self
    }

    /// Set the request timeout.
    ///
    /// Defaults to 60 seconds.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Route all requests through an HTTP proxy.
    pub fn proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    /// Accept invalid TLS certificates (self-signed test servers).
    pub fn accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }

    /// Set connection pool limits.
    pub fn connection_pool(mut self, pool: ConnectionPoolConfig) -> Self {
        self.connection_pool = pool;
        self
    }

    /// Add a custom header to include with every request.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Result<Self> {
        let key_str = key.into();
        let value_str = value.into();

        let key = key_str
            .parse::<http::HeaderName>()
            .map_err(|e| Error::InvalidHeaderName(format!("'{key_str}': {e}")))?;
        let value = value_str
            .parse::<http::HeaderValue>()
            .map_err(|e| Error::InvalidHeaderValue(format!("'{value_str}': {e}")))?;

        self.default_headers.insert(key, value);
        Ok(self)
    }

    /// Build the provider with the configured settings.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The proxy URL is invalid
    /// - HTTP client creation fails
    pub fn build(self) -> Result<ReqwestHttpProvider> {
        let timeout = self.timeout.unwrap_or(DEFAULT_TIMEOUT);
        let pool = &self.connection_pool;

        let mut client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(format!("turbojenkins-rust/{}", crate::VERSION))
            .redirect(reqwest::redirect::Policy::none())
            .pool_max_idle_per_host(pool.max_idle_per_host)
            .pool_idle_timeout(pool.idle_timeout)
            .tcp_keepalive(pool.tcp_keepalive)
            .danger_accept_invalid_certs(self.accept_invalid_certs);

        if let Some(proxy) = &self.proxy {
            let proxy = reqwest::Proxy::all(proxy)
                .map_err(|e| Error::HttpClient(format!("Invalid proxy '{proxy}': {e}")))?;
            client = client.proxy(proxy);
        }

        let http_client = client
            .build()
            .map_err(|e| Error::HttpClient(e.to_string()))?;

        Ok(ReqwestHttpProvider {
            inner: Arc::new(ProviderInner {
                http_client,
                username: self.username,
                api_token: self.api_token,
                default_headers: self.default_headers,
                timeout,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_builder_defaults() {
        let provider = ReqwestHttpProvider::builder().build().unwrap();
        assert_eq!(provider.provider_name(), "reqwest");
        assert_eq!(provider.inner.timeout, DEFAULT_TIMEOUT);
        assert!(provider.inner.username.is_none());
    }

    #[test]
    fn test_builder_rejects_invalid_header() {
        let result = ReqwestHttpProvider::builder().header("bad header", "x");
        assert!(matches!(result, Err(Error::InvalidHeaderName(_))));
    }

    #[tokio::test]
    async fn test_send_uses_basic_auth_and_query() {
        let server = MockServer::start().await;
        // admin:token
        Mock::given(method("GET"))
            .and(path("/api/json"))
            .and(query_param("depth", "0"))
            .and(header("authorization", "Basic YWRtaW46dG9rZW4="))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .expect(1)
            .mount(&server)
            .await;

        let provider = ReqwestHttpProvider::builder()
            .username("admin")
            .api_token("token")
            .build()
            .unwrap();
        let response = provider
            .send(Request::get(format!("{}/api/json", server.uri())).query("depth", 0))
            .await
            .unwrap();
        assert_eq!(response.status(), http::StatusCode::OK);
    }

    #[tokio::test]
    async fn test_send_does_not_follow_redirects() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/job/a/confirmRename"))
            .respond_with(
                ResponseTemplate::new(302).insert_header("Location", "http://ci/job/b"),
            )
            .mount(&server)
            .await;

        let provider = ReqwestHttpProvider::builder().build().unwrap();
        let response = provider
            .send(Request::post(format!("{}/job/a/confirmRename", server.uri())))
            .await
            .unwrap();
        assert_eq!(response.status(), http::StatusCode::FOUND);
        assert_eq!(response.location(), Some("http://ci/job/b"));
    }

    #[tokio::test]
    async fn test_send_xml_body_sets_content_type() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/createItem"))
            .and(header("content-type", XML_CONTENT_TYPE))
            .and(body_string("<project/>"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let provider = ReqwestHttpProvider::builder().build().unwrap();
        provider
            .send(Request::post(format!("{}/createItem", server.uri())).xml("<project/>"))
            .await
            .unwrap();
    }
}
