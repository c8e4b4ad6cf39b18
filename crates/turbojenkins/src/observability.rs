//! Structured logging of server exchanges
//!
//! Every request the reqwest provider sends is logged through an
//! [`Exchange`], so `RUST_LOG=turbojenkins=debug` shows each call with its
//! status and timing.

use std::time::{Duration, Instant};

use http::Method;
use tracing::{debug, info, warn};

/// One request/response round trip being timed.
#[derive(Debug, Clone)]
pub struct Exchange {
    method: Method,
    url: String,
    sent_bytes: usize,
    started: Instant,
}

impl Exchange {
    /// Log the outgoing request and start the clock.
    pub fn begin(method: &Method, url: &str, sent_bytes: usize) -> Self {
        debug!(method = %method, url, sent_bytes, "Sending request");
        Self {
            method: method.clone(),
            url: url.to_string(),
            sent_bytes,
            started: Instant::now(),
        }
    }

    /// Time since [`begin`](Self::begin).
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Bytes of request body sent.
    pub fn sent_bytes(&self) -> usize {
        self.sent_bytes
    }

    /// Log the response.
    ///
    /// Jenkins answers most `POST`s with a redirect to the affected item,
    /// so 3xx is logged like success. 4xx and 5xx go to `warn`.
    pub fn finished(&self, status: u16, received_bytes: usize) {
        let elapsed_ms = self.elapsed().as_millis();
        if status >= 400 {
            warn!(
                method = %self.method,
                url = %self.url,
                status,
                elapsed_ms,
                received_bytes,
                "Server returned an error status"
            );
        } else {
            info!(
                method = %self.method,
                url = %self.url,
                status,
                elapsed_ms,
                received_bytes,
                "Request completed"
            );
        }
    }

    /// Log a transport failure; no response was received.
    pub fn failed(&self, error: &dyn std::fmt::Display) {
        warn!(
            method = %self.method,
            url = %self.url,
            elapsed_ms = self.elapsed().as_millis(),
            error = %error,
            "Request failed before a response"
        );
    }
}

/// Log the outcome of the one-time crumb fetch.
pub fn log_crumb(field: Option<&str>) {
    match field {
        Some(field) => debug!(field, "Fetched CSRF crumb"),
        None => debug!("Crumb issuer unavailable, sending requests without crumb"),
    }
}

/// Install a `tracing` subscriber filtered by `RUST_LOG`.
///
/// Defaults to `turbojenkins=info` when `RUST_LOG` is unset. Later calls
/// are ignored.
#[cfg(feature = "trace")]
#[cfg_attr(docsrs, doc(cfg(feature = "trace")))]
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("turbojenkins=info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exchange_records_request() {
        let exchange = Exchange::begin(&Method::POST, "http://ci/createItem", 128);
        assert_eq!(exchange.sent_bytes(), 128);
        assert_eq!(exchange.url, "http://ci/createItem");
    }

    #[test]
    fn test_exchange_measures_time() {
        let exchange = Exchange::begin(&Method::GET, "http://ci/api/json", 0);
        std::thread::sleep(Duration::from_millis(10));
        assert!(exchange.elapsed() >= Duration::from_millis(10));
        exchange.finished(200, 42);
        exchange.failed(&"connection reset");
    }
}
