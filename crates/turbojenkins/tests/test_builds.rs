//! Builds: console streaming, reports, pipeline inputs and artifacts

mod common;

use futures::TryStreamExt;
use pretty_assertions::assert_eq;
use serde_json::json;
use turbojenkins::{Build, RemoteItem};
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn build(jenkins: &turbojenkins::Jenkins, class: &str, url: &str) -> Build {
    jenkins
        .new_item(&json!({"_class": class, "url": url}))
        .unwrap()
}

#[tokio::test]
async fn test_progressive_output_follows_log_until_done() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/job/a/3/logText/progressiveText"))
        .and(query_param("start", "0"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("X-Text-Size", "6")
                .insert_header("X-More-Data", "true")
                .set_body_string("hello\n"),
        )
        .expect(1)
        .mount(&server)
        .await;
    // Nothing new yet, but the build is still running.
    Mock::given(method("GET"))
        .and(path("/job/a/3/logText/progressiveText"))
        .and(query_param("start", "6"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("X-Text-Size", "6")
                .insert_header("X-More-Data", "true"),
        )
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/job/a/3/logText/progressiveText"))
        .and(query_param("start", "6"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("X-Text-Size", "12")
                .set_body_string("world\n"),
        )
        .mount(&server)
        .await;

    let jenkins = common::session(&server);
    let run = build(&jenkins, "hudson.model.FreeStyleBuild", "job/a/3/");
    let chunks: Vec<String> = run.progressive_output(false).try_collect().await.unwrap();
    assert_eq!(chunks, vec!["hello\n", "world\n"]);
    server.verify().await;
}

#[tokio::test]
async fn test_progressive_output_of_finished_empty_log() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/job/a/4/logText/progressiveHtml"))
        .respond_with(ResponseTemplate::new(200).insert_header("X-Text-Size", "0"))
        .expect(1)
        .mount(&server)
        .await;

    let jenkins = common::session(&server);
    let run = build(&jenkins, "hudson.model.FreeStyleBuild", "job/a/4/");
    let chunks: Vec<String> = run.progressive_output(true).try_collect().await.unwrap();
    assert!(chunks.is_empty());
    server.verify().await;
}

#[tokio::test]
async fn test_progressive_output_without_size_header_yields_body_then_ends() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/job/a/8/logText/progressiveText"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("X-More-Data", "true")
                .set_body_string("partial line"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let jenkins = common::session(&server);
    let run = build(&jenkins, "hudson.model.FreeStyleBuild", "job/a/8/");
    let chunks: Vec<String> = run.progressive_output(false).try_collect().await.unwrap();
    assert_eq!(chunks, vec!["partial line"]);
    server.verify().await;
}

#[tokio::test]
async fn test_missing_test_report_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/job/a/5/testReport/api/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_class": "hudson.tasks.junit.TestResult",
            "duration": 1.5,
            "failCount": 1,
            "passCount": 2,
            "skipCount": 0,
            "suites": [{
                "name": "unit",
                "duration": 1.5,
                "cases": [
                    {"className": "t.A", "name": "ok", "status": "PASSED", "duration": 0.5},
                    {"className": "t.A", "name": "bad", "status": "FAILED", "duration": 1.0}
                ]
            }]
        })))
        .mount(&server)
        .await;

    let jenkins = common::session(&server);
    let with_report = build(&jenkins, "hudson.model.FreeStyleBuild", "job/a/5/");
    let report = with_report.test_report().await.unwrap().expect("report");
    assert_eq!(report.fail_count, 1);
    assert!(report.get("unit").is_some());

    let without = build(&jenkins, "hudson.model.FreeStyleBuild", "job/a/6/");
    assert!(without.test_report().await.unwrap().is_none());
}

#[tokio::test]
async fn test_build_knows_its_job() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/job/team/api/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_class": "com.cloudbees.hudson.plugins.folder.Folder",
            "jobs": [{
                "_class": "org.jenkinsci.plugins.workflow.job.WorkflowJob",
                "name": "p",
                "url": "job/team/job/p/"
            }]
        })))
        .mount(&server)
        .await;

    let jenkins = common::session(&server);
    let run = build(
        &jenkins,
        "org.jenkinsci.plugins.workflow.job.WorkflowRun",
        "job/team/job/p/17/",
    );
    let job = run.get_job().await.unwrap().expect("job");
    assert_eq!(job.full_name().unwrap(), "team/p");
}

#[tokio::test]
async fn test_pending_input_submit_and_artifacts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/job/p/2/wfapi/describe"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "2",
            "status": "PAUSED_PENDING_INPUT",
            "_links": {
                "self": {"href": "/job/p/2/wfapi/describe"},
                "pendingInputActions": {"href": "/job/p/2/wfapi/pendingInputActions"}
            }
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/job/p/2/wfapi/pendingInputActions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": "Deploy",
            "proceedText": "Go",
            "message": "Ship it?",
            "inputs": [{"name": "TARGET", "type": "StringParameterDefinition"}],
            "proceedUrl": "/job/p/2/wfapi/inputSubmit?inputId=Deploy",
            "abortUrl": "/job/p/2/input/Deploy/abort"
        }])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/job/p/2/input/Deploy/submit"))
        .and(body_string_contains("TARGET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/job/p/2/wfapi/artifacts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": "n1",
            "name": "app.jar",
            "path": "target/app.jar",
            "url": "/job/p/2/artifact/target/app.jar",
            "size": 4
        }])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/job/p/2/artifact/target/app.jar"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"\xCA\xFE\xBA\xBE".to_vec()))
        .mount(&server)
        .await;

    let jenkins = common::session(&server);
    let run = build(&jenkins, "org.jenkinsci.plugins.workflow.job.WorkflowRun", "job/p/2/");
    let workflow = run.as_workflow().expect("pipeline run");

    let input = workflow.get_pending_input().await.unwrap().expect("pending input");
    assert_eq!(input.url(), common::url(&server, "job/p/2/input/Deploy/"));
    assert_eq!(input.inputs(), vec!["TARGET"]);
    assert!(input.submit(&[("OTHER", json!("x"))]).await.is_err());
    input.submit(&[("TARGET", json!("prod"))]).await.unwrap();

    let artifacts = workflow.get_artifacts().await.unwrap();
    assert_eq!(artifacts.len(), 1);
    assert_eq!(artifacts[0].name(), "app.jar");

    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("app.jar");
    artifacts[0].save(&target).await.unwrap();
    assert_eq!(std::fs::read(&target).unwrap(), vec![0xCA, 0xFE, 0xBA, 0xBE]);
    server.verify().await;
}

#[tokio::test]
async fn test_build_timing_fields() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/job/a/7/api/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_class": "hudson.model.FreeStyleBuild",
            "timestamp": 1_700_000_000_000_i64,
            "duration": 1500,
            "building": false,
            "result": "SUCCESS"
        })))
        .mount(&server)
        .await;

    let jenkins = common::session(&server);
    let run = build(&jenkins, "hudson.model.FreeStyleBuild", "job/a/7/");
    let started = run.timestamp().await.unwrap().expect("timestamp");
    assert_eq!(started.timestamp(), 1_700_000_000);
    assert_eq!(run.duration().await.unwrap(), std::time::Duration::from_millis(1500));
    assert!(!run.is_building().await.unwrap());
    assert_eq!(run.result().await.unwrap().as_deref(), Some("SUCCESS"));
}

#[tokio::test]
async fn test_freestyle_build_has_no_workflow_view() {
    let server = MockServer::start().await;
    let jenkins = common::session(&server);
    let run = build(&jenkins, "hudson.model.FreeStyleBuild", "job/a/1/");
    assert!(!run.is_workflow());
    assert!(run.as_workflow().is_none());
}
