//! Session-level behavior: crumb handling, error classification, server info

mod common;

use assert_matches::assert_matches;
use futures::future::join_all;
use serde_json::json;
use turbojenkins::Error;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_root_jobs(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_class": "hudson.model.Hudson",
            "jobs": [{"_class": "hudson.model.FreeStyleProject", "name": "a", "url": "job/a/"}]
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_crumb_fetched_once_under_concurrency() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/crumbIssuer/api/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_class": "hudson.security.csrf.DefaultCrumbIssuer",
            "crumb": "c0ffee",
            "crumbRequestField": "Jenkins-Crumb"
        })))
        .expect(1)
        .mount(&server)
        .await;
    mount_root_jobs(&server).await;

    let jenkins = common::session(&server);
    let lookups = (0..8).map(|_| jenkins.get_job("a"));
    for job in join_all(lookups).await {
        assert!(job.unwrap().is_some());
    }

    let crumb = jenkins.crumb().await.unwrap();
    assert_eq!(crumb.field(), Some("Jenkins-Crumb"));
    assert_eq!(crumb.value(), Some("c0ffee"));
    server.verify().await;
}

#[tokio::test]
async fn test_crumb_attached_to_post() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/crumbIssuer/api/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "crumb": "c0ffee",
            "crumbRequestField": "Jenkins-Crumb"
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/createItem"))
        .and(header("Jenkins-Crumb", "c0ffee"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let jenkins = common::session(&server);
    jenkins
        .create_job("x", "<project/>", false)
        .await
        .expect("create failed");
    server.verify().await;
}

#[tokio::test]
async fn test_missing_crumb_issuer_sends_no_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/crumbIssuer/api/json"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    mount_root_jobs(&server).await;

    let jenkins = common::session(&server);
    assert!(jenkins.get_job("a").await.unwrap().is_some());
    assert!(jenkins.get_job("b").await.unwrap().is_none());
    assert!(jenkins.crumb().await.unwrap().is_empty());

    let requests = server.received_requests().await.unwrap();
    assert!(
        requests
            .iter()
            .all(|r| !r.headers.contains_key("Jenkins-Crumb"))
    );
    server.verify().await;
}

#[tokio::test]
async fn test_crumb_issuer_rejecting_credentials_is_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/crumbIssuer/api/json"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    mount_root_jobs(&server).await;

    let jenkins = common::session(&server);
    let err = jenkins.get_job("a").await.unwrap_err();
    assert_matches!(err, Error::Authentication(_));
}

#[tokio::test]
async fn test_duplicate_name_surfaces_server_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/createItem"))
        .respond_with(
            ResponseTemplate::new(400)
                .insert_header("X-Error", "A job already exists with the name 'x'"),
        )
        .mount(&server)
        .await;

    let jenkins = common::session(&server);
    let err = jenkins.create_job("x", "<project/>", false).await.unwrap_err();
    assert_matches!(err, Error::BadRequest { ref message } if message.contains("A job already exists with the name 'x'"));
}

#[tokio::test]
async fn test_status_classification() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/job/locked/api/json"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/job/broken/api/json"))
        .respond_with(ResponseTemplate::new(500).set_body_string("stack trace"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/job/busy/api/json"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let jenkins = common::session(&server);
    let fetch = |name: &str| {
        let item = jenkins.item(jenkins.name_to_url(name), "FreeStyleProject");
        async move { item.fetch_json("", 0).await.unwrap_err() }
    };

    assert_matches!(fetch("locked").await, Error::PermissionDenied(_));
    assert_matches!(fetch("broken").await, Error::ServerError(ref body) if body == "stack trace");
    assert_matches!(fetch("busy").await, Error::Http { status: 503, .. });
    assert!(fetch("missing").await.is_not_found());
}

#[tokio::test]
async fn test_version_and_liveness() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).insert_header("X-Jenkins", "2.452.3"))
        .mount(&server)
        .await;

    let jenkins = common::session(&server);
    assert_eq!(jenkins.version().await.unwrap(), "2.452.3");
    assert!(jenkins.exists().await);
}

#[tokio::test]
async fn test_server_rejecting_credentials_still_exists() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let jenkins = common::session(&server);
    assert!(jenkins.exists().await);
}

#[tokio::test]
async fn test_name_safety_check() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/checkJobName"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<div class=error>&lt;/&gt; is an unsafe character</div>"),
        )
        .mount(&server)
        .await;

    let jenkins = common::session(&server);
    assert!(!jenkins.is_name_safe("a/b").await.unwrap());
}
