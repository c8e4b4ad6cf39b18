//! Builds (runs of a project) and pipeline-specific extras

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::stream::{self, BoxStream, StreamExt};
use http::Method;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, info};

use super::{Artifact, CoverageReport, Job, PendingInputAction, TestReport, take_array};
use crate::{
    capabilities::{Deletable, Describable},
    error::{Error, Result},
    item::{Item, RemoteItem},
};

/// Trailing build number segment of a build URL.
static BUILD_SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\w+/?$").expect("Failed to compile build segment regex"));

/// Chunks of console output as they are written.
pub type LogStream = BoxStream<'static, Result<String>>;

/// One run of a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Build {
    item: Item,
    workflow: bool,
}

impl Build {
    /// Constructor for classic (freestyle, matrix, maven) runs.
    pub fn run(item: Item) -> Self {
        Self {
            item,
            workflow: false,
        }
    }

    /// Constructor for pipeline runs.
    pub fn workflow_run(item: Item) -> Self {
        Self {
            item,
            workflow: true,
        }
    }

    /// Whether this is a pipeline run.
    pub fn is_workflow(&self) -> bool {
        self.workflow
    }

    /// Pipeline-only operations, if this is a pipeline run.
    pub fn as_workflow(&self) -> Option<WorkflowRun<'_>> {
        self.workflow.then_some(WorkflowRun { build: self })
    }

    /// Build number.
    pub async fn number(&self) -> Result<u64> {
        self.item
            .fetch_field("number")
            .await?
            .as_u64()
            .ok_or_else(|| Error::missing_field("number", self.item.url()))
    }

    /// Whole console log as plain text.
    pub async fn console_text(&self) -> Result<String> {
        self.item.get_text("consoleText").await
    }

    /// Tail the console log.
    ///
    /// Polls `logText/progressiveText` (or `progressiveHtml`) every
    /// poll interval. Items are raw chunks of the log as the server sends
    /// them, not split into lines; a chunk may end mid-line. The stream
    /// ends once the server stops announcing `X-More-Data`, or after a
    /// response with no `X-Text-Size` to continue from.
    pub fn progressive_output(&self, html: bool) -> LogStream {
        let entry = if html {
            "logText/progressiveHtml"
        } else {
            "logText/progressiveText"
        };
        let cursor = LogCursor {
            item: self.item.clone(),
            entry,
            start: 0,
            polled: false,
            finished: false,
        };
        stream::try_unfold(cursor, |cursor| cursor.next_chunk()).boxed()
    }

    /// Abort the build.
    pub async fn stop(&self) -> Result<()> {
        self.item.post("stop").await?;
        Ok(())
    }

    /// Forcibly terminate a build that ignored `stop`.
    pub async fn term(&self) -> Result<()> {
        self.item.post("term").await?;
        Ok(())
    }

    /// Hard-kill a build that ignored `term`.
    pub async fn kill(&self) -> Result<()> {
        self.item.post("kill").await?;
        Ok(())
    }

    /// The following build of the same project.
    pub async fn get_next_build(&self) -> Result<Option<Build>> {
        self.sibling("nextBuild").await
    }

    /// The preceding build of the same project.
    pub async fn get_previous_build(&self) -> Result<Option<Build>> {
        self.sibling("previousBuild").await
    }

    async fn sibling(&self, field: &str) -> Result<Option<Build>> {
        let record = self.item.fetch_field_tree(field, "url").await?;
        Ok(record
            .get("url")
            .and_then(Value::as_str)
            .map(|url| Self {
                item: self.item.with_url(url),
                workflow: self.workflow,
            }))
    }

    /// The project this build belongs to.
    pub async fn get_job(&self) -> Result<Option<Job>> {
        let job_url = BUILD_SEGMENT.replace(self.item.url(), "");
        let jenkins = self.item.jenkins();
        let name = jenkins.url_to_name(&job_url)?;
        jenkins.get_job(&name).await
    }

    /// Whether the build is still running.
    pub async fn is_building(&self) -> Result<bool> {
        Ok(self
            .item
            .fetch_field("building")
            .await?
            .as_bool()
            .unwrap_or(false))
    }

    /// `SUCCESS`, `FAILURE`, ... or `None` while running.
    pub async fn result(&self) -> Result<Option<String>> {
        Ok(self
            .item
            .fetch_field("result")
            .await?
            .as_str()
            .map(str::to_string))
    }

    /// When the build was scheduled.
    pub async fn timestamp(&self) -> Result<Option<DateTime<Utc>>> {
        Ok(self
            .item
            .fetch_field("timestamp")
            .await?
            .as_i64()
            .and_then(DateTime::from_timestamp_millis))
    }

    /// Run time, zero while the build is running.
    pub async fn duration(&self) -> Result<Duration> {
        Ok(Duration::from_millis(
            self.item.fetch_field("duration").await?.as_u64().unwrap_or(0),
        ))
    }

    /// Id of the queue item this build came from.
    pub async fn queue_id(&self) -> Result<Option<u64>> {
        Ok(self.item.fetch_field("queueId").await?.as_u64())
    }

    /// Parameters the build ran with.
    pub async fn get_parameters(&self) -> Result<Vec<BuildParameter>> {
        action_parameters(&self.item).await
    }

    /// Why the build was started.
    pub async fn get_causes(&self) -> Result<Vec<BuildCause>> {
        action_causes(&self.item).await
    }

    /// JUnit test results, or `None` when the build published none.
    pub async fn test_report(&self) -> Result<Option<TestReport>> {
        let report = self.item.with_url(self.item.endpoint("testReport/"));
        match report.fetch_as::<TestReport>("", 0).await {
            Ok(report) => Ok(Some(report)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// JaCoCo coverage published by the build.
    pub fn coverage_report(&self) -> CoverageReport {
        let url = self.item.endpoint("jacoco/");
        CoverageReport::new(self.item.jenkins().item(url, "CoverageReport"))
    }
}

remote_item!(Build);

impl Deletable for Build {}
impl Describable for Build {}

struct LogCursor {
    item: Item,
    entry: &'static str,
    start: u64,
    polled: bool,
    finished: bool,
}

impl LogCursor {
    async fn next_chunk(mut self) -> Result<Option<(String, Self)>> {
        loop {
            if self.finished {
                return Ok(None);
            }
            if self.polled {
                tokio::time::sleep(self.item.jenkins().poll_interval()).await;
            }
            self.polled = true;

            let response = self
                .item
                .send(
                    self.item
                        .request(Method::GET, self.entry)
                        .query("start", self.start),
                )
                .await?;
            let more = response.header("X-More-Data").is_some();
            let Some(size) = response
                .header("X-Text-Size")
                .and_then(|size| size.parse::<u64>().ok())
            else {
                self.finished = true;
                let text = response.text();
                if text.is_empty() {
                    return Ok(None);
                }
                debug!(url = %self.item.url(), start = self.start, "Log chunk without X-Text-Size");
                return Ok(Some((text, self)));
            };

            if size == self.start {
                if more {
                    continue;
                }
                return Ok(None);
            }

            debug!(url = %self.item.url(), start = self.start, size, more, "Read log chunk");
            self.start = size;
            self.finished = !more;
            return Ok(Some((response.text(), self)));
        }
    }
}

/// A `name=value` pair a build or queue item was given.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BuildParameter {
    /// Parameter name
    pub name: String,
    /// Value as the server reports it; absent for secrets
    #[serde(default)]
    pub value: Value,
}

/// Why a build was started.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildCause {
    /// Human readable reason, e.g. "Started by user admin"
    #[serde(default)]
    pub short_description: Option<String>,
    /// Id of the user who started the build
    #[serde(default)]
    pub user_id: Option<String>,
    /// Display name of the user who started the build
    #[serde(default)]
    pub user_name: Option<String>,
    /// Any other fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

const ACTIONS_TREE: &str =
    "actions[parameters[name,value],causes[shortDescription,userId,userName]]";

async fn fetch_actions(item: &Item) -> Result<Vec<Value>> {
    let mut data = item.fetch_json(ACTIONS_TREE, 0).await?;
    Ok(take_array(&mut data, "actions"))
}

fn collect_from_actions<T: serde::de::DeserializeOwned>(
    actions: Vec<Value>,
    key: &str,
    url: &str,
) -> Result<Vec<T>> {
    actions
        .into_iter()
        .flat_map(|mut action| take_array(&mut action, key))
        .map(|record| {
            serde_json::from_value(record)
                .map_err(|e| Error::ResponseValidation(format!("{key} of {url}: {e}")))
        })
        .collect()
}

/// Parameters recorded in the `actions` of a build or queue item.
pub(super) async fn action_parameters(item: &Item) -> Result<Vec<BuildParameter>> {
    collect_from_actions(fetch_actions(item).await?, "parameters", item.url())
}

/// Causes recorded in the `actions` of a build or queue item.
pub(super) async fn action_causes(item: &Item) -> Result<Vec<BuildCause>> {
    collect_from_actions(fetch_actions(item).await?, "causes", item.url())
}

/// Pipeline-only operations of a [`Build`].
#[derive(Debug, Clone, Copy)]
pub struct WorkflowRun<'a> {
    build: &'a Build,
}

impl WorkflowRun<'_> {
    /// The input step the pipeline is waiting on, if any.
    pub async fn get_pending_input(&self) -> Result<Option<PendingInputAction>> {
        let item = &self.build.item;
        let describe: Value = item
            .send(item.request(Method::GET, "wfapi/describe"))
            .await?
            .json()?;
        let pending = describe
            .pointer("/_links/pendingInputActions")
            .is_some_and(|link| !link.is_null());
        if !pending {
            return Ok(None);
        }

        let actions: Vec<Value> = item
            .send(item.request(Method::GET, "wfapi/pendingInputActions"))
            .await?
            .json()?;
        actions
            .into_iter()
            .next()
            .map(|raw| PendingInputAction::new(item.jenkins(), raw))
            .transpose()
    }

    /// Artifacts archived by the run.
    pub async fn get_artifacts(&self) -> Result<Vec<Artifact>> {
        let item = &self.build.item;
        let records: Option<Vec<Value>> = item
            .send(item.request(Method::GET, "wfapi/artifacts"))
            .await?
            .json()?;
        records
            .unwrap_or_default()
            .into_iter()
            .map(|raw| Artifact::new(item.jenkins(), raw))
            .collect()
    }

    /// Download every artifact as one zip archive to `path`.
    pub async fn save_artifacts(&self, path: impl AsRef<Path>) -> Result<()> {
        let item = &self.build.item;
        let response = item
            .send(item.request(Method::GET, "artifact/*zip*/archive.zip"))
            .await?;
        tokio::fs::write(path.as_ref(), response.body()).await?;
        info!(build = %item.url(), path = %path.as_ref().display(), "Saved artifacts");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Jenkins;
    use serde_json::json;

    fn session() -> Jenkins {
        Jenkins::builder().base_url("http://ci/").build().unwrap()
    }

    #[test]
    fn test_build_segment_strips_number() {
        assert_eq!(
            BUILD_SEGMENT.replace("http://ci/job/a/job/b/12/", ""),
            "http://ci/job/a/job/b/"
        );
        assert_eq!(
            BUILD_SEGMENT.replace("http://ci/job/a/lastBuild", ""),
            "http://ci/job/a/"
        );
    }

    #[test]
    fn test_workflow_view_only_for_pipelines() {
        let jenkins = session();
        let run = Build::workflow_run(jenkins.item("http://ci/job/p/1/", "WorkflowRun"));
        let classic = Build::run(jenkins.item("http://ci/job/f/1/", "FreeStyleBuild"));
        assert!(run.as_workflow().is_some());
        assert!(classic.as_workflow().is_none());
    }

    #[test]
    fn test_collect_parameters_across_actions() {
        let actions = vec![
            json!({"_class": "hudson.model.CauseAction", "causes": [
                {"shortDescription": "Started by user admin", "userId": "admin", "userName": "admin"}
            ]}),
            json!({}),
            json!({"_class": "hudson.model.ParametersAction", "parameters": [
                {"_class": "hudson.model.StringParameterValue", "name": "A", "value": "1"},
                {"_class": "hudson.model.BooleanParameterValue", "name": "B", "value": true}
            ]}),
        ];
        let params: Vec<BuildParameter> =
            collect_from_actions(actions.clone(), "parameters", "http://ci/job/a/1/").unwrap();
        assert_eq!(params.len(), 2);
        assert_eq!(params[1].value, json!(true));

        let causes: Vec<BuildCause> =
            collect_from_actions(actions, "causes", "http://ci/job/a/1/").unwrap();
        assert_eq!(causes[0].user_id.as_deref(), Some("admin"));
    }
}
