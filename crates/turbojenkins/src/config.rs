//! Configuration for the Jenkins client

use http::HeaderMap;
use secrecy::SecretString;
use std::time::Duration;

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Default delay between progressive log polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Connection settings for a [`Jenkins`](crate::Jenkins) session.
///
/// There is no retry policy; every failure reaches the caller.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Root URL of the Jenkins server, e.g. `http://127.0.0.1:8080/`
    pub base_url: Option<String>,

    /// User name for HTTP basic auth
    pub username: Option<String>,

    /// API token (or password) for HTTP basic auth
    pub api_token: Option<SecretString>,

    /// Default timeout for requests
    pub timeout: Duration,

    /// Custom headers to include with every request
    pub default_headers: HeaderMap,

    /// HTTP proxy URL
    pub proxy: Option<String>,

    /// Accept self-signed or otherwise invalid TLS certificates
    pub accept_invalid_certs: bool,

    /// Delay between polls when tailing build logs
    pub poll_interval: Duration,

    /// Connection pool configuration
    pub connection_pool: ConnectionPoolConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            username: None,
            api_token: None,
            timeout: DEFAULT_TIMEOUT,
            default_headers: HeaderMap::new(),
            proxy: None,
            accept_invalid_certs: false,
            poll_interval: DEFAULT_POLL_INTERVAL,
            connection_pool: ConnectionPoolConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Create a configuration for `base_url` with basic-auth credentials.
    pub fn with_credentials(
        base_url: impl Into<String>,
        username: impl Into<String>,
        api_token: impl Into<String>,
    ) -> Self {
        Self {
            base_url: Some(base_url.into()),
            username: Some(username.into()),
            api_token: Some(SecretString::new(api_token.into().into_boxed_str())),
            ..Default::default()
        }
    }

    /// Load configuration from `JENKINS_*` environment variables, reading a
    /// `.env` file first if one is present.
    ///
    /// | Variable | Field |
    /// |---|---|
    /// | `JENKINS_URL` | `base_url` |
    /// | `JENKINS_USER` | `username` |
    /// | `JENKINS_TOKEN`, else `JENKINS_PASSWORD` | `api_token` |
    /// | `JENKINS_TIMEOUT` (seconds) | `timeout` |
    /// | `JENKINS_POLL_INTERVAL_MS` | `poll_interval` |
    /// | `JENKINS_PROXY` | `proxy` |
    /// | `JENKINS_INSECURE` (`1`/`true`) | `accept_invalid_certs` |
    #[cfg(feature = "env")]
    pub fn from_env() -> Result<Self, crate::error::Error> {
        let _ = dotenvy::dotenv();
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());

        let mut config = Self {
            base_url: var("JENKINS_URL"),
            username: var("JENKINS_USER"),
            api_token: var("JENKINS_TOKEN")
                .or_else(|| var("JENKINS_PASSWORD"))
                .map(|token| SecretString::new(token.into_boxed_str())),
            proxy: var("JENKINS_PROXY"),
            accept_invalid_certs: var("JENKINS_INSECURE")
                .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true")),
            ..Default::default()
        };
        if let Some(secs) = var("JENKINS_TIMEOUT") {
            config.timeout = Duration::from_secs(parse_number("JENKINS_TIMEOUT", &secs)?);
        }
        if let Some(millis) = var("JENKINS_POLL_INTERVAL_MS") {
            config.poll_interval =
                Duration::from_millis(parse_number("JENKINS_POLL_INTERVAL_MS", &millis)?);
        }
        Ok(config)
    }

    /// Overlay `other` on this configuration. Fields `other` leaves at
    /// their defaults keep this configuration's values; headers are merged.
    pub fn merge(mut self, other: ClientConfig) -> Self {
        self.base_url = other.base_url.or(self.base_url);
        self.username = other.username.or(self.username);
        self.api_token = other.api_token.or(self.api_token);
        self.proxy = other.proxy.or(self.proxy);
        self.accept_invalid_certs |= other.accept_invalid_certs;
        if other.timeout != DEFAULT_TIMEOUT {
            self.timeout = other.timeout;
        }
        if other.poll_interval != DEFAULT_POLL_INTERVAL {
            self.poll_interval = other.poll_interval;
        }
        self.default_headers.extend(other.default_headers);
        self
    }
}

#[cfg(feature = "env")]
fn parse_number(name: &str, value: &str) -> Result<u64, crate::error::Error> {
    value.parse().map_err(|_| {
        crate::error::Error::MissingConfig(format!("{name} must be a whole number, got '{value}'"))
    })
}

/// Configuration for HTTP connection pooling.
#[derive(Debug, Clone)]
pub struct ConnectionPoolConfig {
    /// Maximum number of idle connections per host
    pub max_idle_per_host: usize,

    /// Idle connection timeout
    pub idle_timeout: Duration,

    /// TCP keep-alive interval
    pub tcp_keepalive: Option<Duration>,
}

impl Default for ConnectionPoolConfig {
    fn default() -> Self {
        Self {
            max_idle_per_host: 10,
            idle_timeout: Duration::from_secs(90),
            tcp_keepalive: Some(Duration::from_secs(60)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
        assert_eq!(config.poll_interval, Duration::from_secs(1));
        assert!(config.username.is_none());
        assert!(config.api_token.is_none());
        assert!(!config.accept_invalid_certs);
    }

    #[test]
    fn test_config_with_credentials() {
        let config = ClientConfig::with_credentials("http://ci/", "admin", "s3cret");
        assert_eq!(config.base_url.as_deref(), Some("http://ci/"));
        assert_eq!(config.username.as_deref(), Some("admin"));
        assert_eq!(config.api_token.unwrap().expose_secret(), "s3cret");
    }

    #[test]
    fn test_config_merge() {
        let base = ClientConfig::with_credentials("http://ci/", "admin", "one");
        let other = ClientConfig {
            base_url: Some("http://other/".into()),
            timeout: Duration::from_secs(5),
            ..Default::default()
        };

        let merged = base.merge(other);
        assert_eq!(merged.base_url.as_deref(), Some("http://other/"));
        assert_eq!(merged.username.as_deref(), Some("admin"));
        assert_eq!(merged.timeout, Duration::from_secs(5));
        assert_eq!(merged.poll_interval, DEFAULT_POLL_INTERVAL);
    }

    #[cfg(feature = "env")]
    #[test]
    fn test_config_from_env_variables() {
        temp_env::with_vars(
            [
                ("JENKINS_URL", Some("http://env-ci:8080/")),
                ("JENKINS_USER", Some("bot")),
                ("JENKINS_TOKEN", Some("11aa")),
                ("JENKINS_PASSWORD", None),
                ("JENKINS_TIMEOUT", Some("120")),
                ("JENKINS_PROXY", Some("http://proxy:3128")),
                ("JENKINS_POLL_INTERVAL_MS", Some("250")),
                ("JENKINS_INSECURE", Some("true")),
            ],
            || {
                let config = ClientConfig::from_env().unwrap();
                assert_eq!(config.base_url.as_deref(), Some("http://env-ci:8080/"));
                assert_eq!(config.username.as_deref(), Some("bot"));
                assert_eq!(config.api_token.unwrap().expose_secret(), "11aa");
                assert_eq!(config.timeout, Duration::from_secs(120));
                assert_eq!(config.proxy.as_deref(), Some("http://proxy:3128"));
                assert_eq!(config.poll_interval, Duration::from_millis(250));
                assert!(config.accept_invalid_certs);
            },
        );
    }

    #[cfg(feature = "env")]
    #[test]
    fn test_config_from_env_rejects_bad_timeout() {
        temp_env::with_vars([("JENKINS_TIMEOUT", Some("soon"))], || {
            assert!(ClientConfig::from_env().is_err());
        });
    }
}
