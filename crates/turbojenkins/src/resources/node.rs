//! Agents and the built-in node

use http::Method;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::{debug, info};
use turbojenkins_core::{EXECUTABLES_QUERY, computers_executables_query};

use super::{Build, take_array};
use crate::{
    capabilities::{Configurable, Deletable, ScriptRunner},
    client::Jenkins,
    error::{Error, Result},
    item::{Item, RemoteItem},
};

/// Descriptor used by `doCreateItem` for permanent agents.
const DUMB_SLAVE_DESCRIPTOR: &str = "hudson.slaves.DumbSlave$DescriptorImpl";

/// Settings for a new permanent agent.
///
/// Defaults describe a one-executor inbound (JNLP) agent that is always
/// kept online. Fields Jenkins accepts that are not modelled here go in
/// `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSettings {
    /// Free-form description
    pub node_description: String,
    /// Number of executors
    pub num_executors: u32,
    /// Agent work directory
    #[serde(rename = "remoteFS")]
    pub remote_fs: String,
    /// Space separated labels
    pub label_string: String,
    /// `NORMAL` or `EXCLUSIVE`
    pub mode: String,
    /// Retention strategy descriptor
    pub retention_strategy: Value,
    /// Node properties descriptor bag
    pub node_properties: Value,
    /// Launcher descriptor
    pub launcher: Value,
    /// Additional settings, merged into the submitted JSON
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for NodeSettings {
    fn default() -> Self {
        Self {
            node_description: String::new(),
            num_executors: 1,
            remote_fs: "/home/jenkins".to_string(),
            label_string: String::new(),
            mode: "NORMAL".to_string(),
            retention_strategy: json!({"stapler-class": "hudson.slaves.RetentionStrategy$Always"}),
            node_properties: json!({"stapler-class-bag": "true"}),
            launcher: json!({"stapler-class": "hudson.slaves.JNLPLauncher"}),
            extra: Map::new(),
        }
    }
}

impl NodeSettings {
    /// Set the description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.node_description = description.into();
        self
    }

    /// Set the executor count.
    pub fn executors(mut self, count: u32) -> Self {
        self.num_executors = count;
        self
    }

    /// Set the agent work directory.
    pub fn remote_fs(mut self, path: impl Into<String>) -> Self {
        self.remote_fs = path.into();
        self
    }

    /// Set the labels.
    pub fn labels(mut self, labels: impl Into<String>) -> Self {
        self.label_string = labels.into();
        self
    }

    /// Set any other field of the submitted JSON.
    pub fn set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ComputerRecord {
    #[serde(rename = "_class")]
    class: String,
    display_name: String,
}

#[derive(Deserialize)]
struct ComputerList {
    #[serde(default)]
    computer: Vec<ComputerRecord>,
}

/// Builds held by the executors of one computer record.
///
/// Pipeline runs show up twice: as a placeholder in `executors` and as
/// the real run in `oneOffExecutors`. Placeholders are skipped.
fn running_builds(jenkins: &Jenkins, mut computer: Value) -> Result<Vec<Build>> {
    let mut builds = Vec::new();
    for kind in ["executors", "oneOffExecutors"] {
        for mut executor in take_array(&mut computer, kind) {
            let executable = executor
                .get_mut("currentExecutable")
                .map(Value::take)
                .unwrap_or(Value::Null);
            let placeholder = executable
                .get("_class")
                .and_then(Value::as_str)
                .is_none_or(|class| class.ends_with("PlaceholderExecutable"));
            if executable.is_object() && !placeholder {
                builds.push(jenkins.new_item(&executable)?);
            }
        }
    }
    Ok(builds)
}

async fn only_building(builds: Vec<Build>) -> Result<Vec<Build>> {
    let mut building = Vec::new();
    for build in builds {
        if build.is_building().await? {
            building.push(build);
        }
    }
    Ok(building)
}

/// All computers, at `{root}computer/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nodes {
    item: Item,
}

impl Nodes {
    pub(crate) fn new(item: Item) -> Self {
        Self { item }
    }

    /// Create a permanent agent.
    pub async fn create(&self, name: &str, settings: &NodeSettings) -> Result<()> {
        let payload = serde_json::to_string(settings)?;
        self.item
            .send(self.item.request(Method::POST, "doCreateItem").form([
                ("name", name),
                ("type", DUMB_SLAVE_DESCRIPTOR),
                ("json", payload.as_str()),
            ]))
            .await?;
        info!(node = name, "Created node");
        Ok(())
    }

    async fn computers(&self) -> Result<Vec<ComputerRecord>> {
        let list: ComputerList = self.item.fetch_as("computer[displayName]", 0).await?;
        Ok(list.computer)
    }

    fn materialize(&self, record: &ComputerRecord) -> Result<Node> {
        let url = self.item.endpoint(&format!("{}/", record.display_name));
        self.item.jenkins().new_item_at(&record.class, &url)
    }

    /// Computer whose display name is `name`.
    pub async fn get(&self, name: &str) -> Result<Option<Node>> {
        self.computers()
            .await?
            .iter()
            .find(|record| record.display_name == name)
            .map(|record| self.materialize(record))
            .transpose()
    }

    /// Every computer.
    pub async fn iter(&self) -> Result<Vec<Node>> {
        self.computers()
            .await?
            .iter()
            .map(|record| self.materialize(record))
            .collect()
    }

    /// Builds currently on any executor.
    pub async fn iter_builds(&self) -> Result<Vec<Build>> {
        let mut data = self
            .item
            .fetch_json(&computers_executables_query(), 2)
            .await?;
        let jenkins = self.item.jenkins();
        let mut builds = Vec::new();
        for computer in take_array(&mut data, "computer") {
            builds.extend(running_builds(jenkins, computer)?);
        }
        debug!(count = builds.len(), "Listed running builds");
        Ok(builds)
    }

    /// Builds on any executor that are still running.
    pub async fn iter_building_builds(&self) -> Result<Vec<Build>> {
        only_building(self.iter_builds().await?).await
    }

    /// Computers carrying at least one of `labels`.
    pub async fn filter_by_label(&self, labels: &[&str]) -> Result<Vec<Node>> {
        let mut matching = Vec::new();
        for node in self.iter().await? {
            if node.has_any_label(labels).await? {
                matching.push(node);
            }
        }
        Ok(matching)
    }

    /// Computers that are online (`true`) or offline (`false`).
    pub async fn filter_by_status(&self, online: bool) -> Result<Vec<Node>> {
        let mut matching = Vec::new();
        for node in self.iter().await? {
            if node.is_offline().await? != online {
                matching.push(node);
            }
        }
        Ok(matching)
    }
}

remote_item!(Nodes);

/// One computer: an agent or the built-in node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    item: Item,
}

impl Node {
    /// Constructor for agent tags.
    pub fn computer(item: Item) -> Self {
        Self { item }
    }

    /// Constructor for the built-in node.
    ///
    /// Its URL does not follow its display name: it is `computer/(built-in)/`
    /// on current servers and `computer/(master)/` before 2.319.
    pub fn built_in(item: Item) -> Self {
        let name = if item.url().ends_with("/master/") {
            "master"
        } else {
            "built-in"
        };
        let url = format!("{}computer/({name})/", item.jenkins().root());
        Self {
            item: item.with_url(url),
        }
    }

    /// Whether the node is offline.
    pub async fn is_offline(&self) -> Result<bool> {
        self.item
            .fetch_field("offline")
            .await?
            .as_bool()
            .ok_or_else(|| Error::missing_field("offline", self.item.url()))
    }

    /// Bring the node online if it is offline.
    pub async fn enable(&self) -> Result<()> {
        if self.is_offline().await? {
            self.toggle_offline("").await?;
            info!(node = %self.item.url(), "Node enabled");
        }
        Ok(())
    }

    /// Take the node offline with `message` if it is online.
    pub async fn disable(&self, message: &str) -> Result<()> {
        if !self.is_offline().await? {
            self.toggle_offline(message).await?;
            info!(node = %self.item.url(), "Node disabled");
        }
        Ok(())
    }

    async fn toggle_offline(&self, message: &str) -> Result<()> {
        self.item
            .send(
                self.item
                    .request(Method::POST, "toggleOffline")
                    .query("offlineMessage", message),
            )
            .await?;
        Ok(())
    }

    /// Builds currently on this node's executors.
    pub async fn iter_builds(&self) -> Result<Vec<Build>> {
        let data = self.item.fetch_json(EXECUTABLES_QUERY, 2).await?;
        running_builds(self.item.jenkins(), data)
    }

    /// Builds on this node that are still running.
    pub async fn iter_building_builds(&self) -> Result<Vec<Build>> {
        only_building(self.iter_builds().await?).await
    }

    async fn has_any_label(&self, labels: &[&str]) -> Result<bool> {
        let assigned = self.item.fetch_json("assignedLabels[name]", 0).await?;
        Ok(assigned
            .get("assignedLabels")
            .and_then(Value::as_array)
            .is_some_and(|assigned| {
                assigned.iter().any(|label| {
                    label
                        .get("name")
                        .and_then(Value::as_str)
                        .is_some_and(|name| labels.contains(&name))
                })
            }))
    }
}

remote_item!(Node);

impl Configurable for Node {}
impl Deletable for Node {}
impl ScriptRunner for Node {}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn session() -> Jenkins {
        Jenkins::builder().base_url("http://ci/").build().unwrap()
    }

    #[test]
    fn test_node_settings_defaults_serialize() {
        let settings = NodeSettings::default().labels("linux docker").set("custom", 1);
        let value = serde_json::to_value(&settings).unwrap();
        assert_eq!(value["remoteFS"], json!("/home/jenkins"));
        assert_eq!(value["numExecutors"], json!(1));
        assert_eq!(value["labelString"], json!("linux docker"));
        assert_eq!(value["launcher"]["stapler-class"], json!("hudson.slaves.JNLPLauncher"));
        assert_eq!(value["custom"], json!(1));
    }

    #[test]
    fn test_built_in_url_rewrite() {
        let jenkins = session();
        let node = Node::built_in(jenkins.item("http://ci/computer/Built-In Node/", "MasterComputer"));
        assert_eq!(node.url(), "http://ci/computer/(built-in)/");

        let old = Node::built_in(jenkins.item("http://ci/computer/master/", "MasterComputer"));
        assert_eq!(old.url(), "http://ci/computer/(master)/");
    }

    #[test]
    fn test_running_builds_skip_placeholders() {
        let jenkins = session();
        let computer = json!({
            "executors": [
                {"currentExecutable": {
                    "_class": "org.jenkinsci.plugins.workflow.support.steps.ExecutorStepExecution$PlaceholderTask$PlaceholderExecutable",
                    "url": "http://ci/job/p/3/"
                }},
                {"currentExecutable": null},
                {"currentExecutable": {"_class": "hudson.model.FreeStyleBuild", "url": "http://ci/job/f/7/"}}
            ],
            "oneOffExecutors": [
                {"currentExecutable": {"_class": "org.jenkinsci.plugins.workflow.job.WorkflowRun", "url": "http://ci/job/p/3/"}}
            ]
        });
        let builds = running_builds(&jenkins, computer).unwrap();
        let urls: Vec<&str> = builds.iter().map(|b| b.url()).collect();
        assert_eq!(urls, vec!["http://ci/job/f/7/", "http://ci/job/p/3/"]);
        assert!(builds[1].is_workflow());
    }
}
