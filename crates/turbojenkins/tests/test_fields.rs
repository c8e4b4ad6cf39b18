//! Dynamic field access by snake_case name

mod common;

use assert_matches::assert_matches;
use futures::future::join_all;
use serde_json::json;
use turbojenkins::{Error, Job, RemoteItem};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn project(jenkins: &turbojenkins::Jenkins, name: &str) -> Job {
    jenkins
        .new_item(&json!({
            "_class": "hudson.model.FreeStyleProject",
            "url": format!("job/{name}/")
        }))
        .unwrap()
}

async fn mount_project(server: &MockServer, name: &str) {
    let mut body = common::load_response_fixture("freestyle_project");
    body["name"] = json!(name);
    Mock::given(method("GET"))
        .and(path(format!("/job/{name}/api/json")))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_field_read_by_snake_case_name() {
    let server = MockServer::start().await;
    mount_project(&server, "build1").await;

    let jenkins = common::session(&server);
    let job = project(&jenkins, "build1");
    assert_eq!(job.get_field("next_build_number").await.unwrap(), json!(5));
    assert_eq!(job.get_field("display_name").await.unwrap(), json!("build1"));
    assert_eq!(job.get_field("in_queue").await.unwrap(), json!(false));
    assert_eq!(job.get_field("last_build").await.unwrap(), json!(null));
}

#[tokio::test]
async fn test_field_names_scanned_once_per_kind() {
    let server = MockServer::start().await;
    mount_project(&server, "a").await;
    mount_project(&server, "b").await;

    let jenkins = common::session(&server);
    let a = project(&jenkins, "a");
    let b = project(&jenkins, "b");

    let reads = (0..6).map(|i| {
        let job = if i % 2 == 0 { a.clone() } else { b.clone() };
        async move { job.get_field("next_build_number").await }
    });
    for value in join_all(reads).await {
        assert_eq!(value.unwrap(), json!(5));
    }
    assert_eq!(a.get_field("name").await.unwrap(), json!("a"));
    assert_eq!(b.get_field("name").await.unwrap(), json!("b"));

    let scans = common::full_fetches(&server, "/job/a/api/json").await
        + common::full_fetches(&server, "/job/b/api/json").await;
    assert_eq!(scans, 1);
}

#[tokio::test]
async fn test_field_values_are_fetched_fresh() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/job/a/api/json"))
        .and(query_param("tree", "nextBuildNumber"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"nextBuildNumber": 5})))
        .up_to_n_times(1)
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/job/a/api/json"))
        .and(query_param("tree", "nextBuildNumber"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"nextBuildNumber": 6})))
        .with_priority(2)
        .expect(1)
        .mount(&server)
        .await;
    mount_project(&server, "a").await;

    let jenkins = common::session(&server);
    let job = project(&jenkins, "a");
    assert_eq!(job.get_field("next_build_number").await.unwrap(), json!(5));
    assert_eq!(job.get_field("next_build_number").await.unwrap(), json!(6));
    assert_eq!(common::full_fetches(&server, "/job/a/api/json").await, 1);
    server.verify().await;
}

#[tokio::test]
async fn test_unknown_field_rescans_once_then_fails() {
    let server = MockServer::start().await;
    mount_project(&server, "a").await;

    let jenkins = common::session(&server);
    let job = project(&jenkins, "a");

    let err = job.get_field("no_such_field").await.unwrap_err();
    assert_matches!(
        err,
        Error::UnknownField { ref kind, ref name } if kind == "FreeStyleProject" && name == "no_such_field"
    );
    assert_eq!(common::full_fetches(&server, "/job/a/api/json").await, 2);
}

#[tokio::test]
async fn test_structured_fields_are_not_exposed() {
    let server = MockServer::start().await;
    mount_project(&server, "a").await;

    let jenkins = common::session(&server);
    let names = project(&jenkins, "a").item().field_names().await.unwrap();
    assert!(names.contains("next_build_number"));
    assert!(names.contains("concurrent_build"));
    assert!(!names.contains("builds"));
    assert!(!names.contains("actions"));
}
