//! Common test utilities and helpers

use std::path::Path;
use std::time::Duration;

use turbojenkins::Jenkins;
use wiremock::MockServer;

/// Load a response fixture
#[allow(dead_code)]
pub fn load_response_fixture(name: &str) -> serde_json::Value {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    let path = Path::new(manifest_dir)
        .join("tests")
        .join("fixtures")
        .join("responses")
        .join(format!("{}.json", name));

    let text = std::fs::read_to_string(&path).unwrap_or_else(|e| {
        panic!(
            "Failed to load response fixture '{}' from {:?}: {}",
            name, path, e
        )
    });
    serde_json::from_str(&text).expect("Fixture is not valid JSON")
}

/// Session against the mock server with a short log poll interval
#[allow(dead_code)]
pub fn session(server: &MockServer) -> Jenkins {
    Jenkins::builder()
        .base_url(server.uri())
        .username("admin")
        .api_token("11aa22bb33cc")
        .poll_interval(Duration::from_millis(5))
        .build()
        .expect("Failed to build session")
}

/// Absolute URL on the mock server
#[allow(dead_code)]
pub fn url(server: &MockServer, path: &str) -> String {
    format!("{}/{}", server.uri(), path.trim_start_matches('/'))
}

/// Number of requests the server received for `path` with no `tree` projection
#[allow(dead_code)]
pub async fn full_fetches(server: &MockServer, path: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == path)
        .filter(|r| !r.url.query_pairs().any(|(k, _)| k == "tree"))
        .count()
}
