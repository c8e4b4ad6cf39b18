//! Jobs: folders and buildable projects

use std::fmt;

use http::Method;
use serde::{Deserialize, Deserializer};
use serde_json::{Value, json};
use tracing::{debug, info};
use turbojenkins_core::{nested_jobs_query, split_full_name};

use super::{Build, Credentials, QueueItem, Views, take_array};
use crate::{
    capabilities::{Configurable, Deletable, Describable, Enableable},
    client::Jenkins,
    error::{Error, Result},
    item::{Item, RemoteItem},
};

/// Query parameters `build` accepts without switching to
/// `buildWithParameters`.
const RESERVED_BUILD_PARAMS: [&str; 2] = ["token", "delay"];

/// A job: either a container of other jobs or something that builds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Job {
    /// Folders, multibranch projects and organization folders
    Folder(Folder),
    /// Pipelines, freestyle projects and other buildable kinds
    Project(Project),
}

impl Job {
    /// Constructor for folder-like type tags.
    pub fn folder(item: Item) -> Self {
        Job::Folder(Folder { item })
    }

    /// Constructor for buildable type tags.
    pub fn project(item: Item) -> Self {
        Job::Project(Project { item })
    }

    /// The folder, if this job is one.
    pub fn as_folder(&self) -> Option<&Folder> {
        match self {
            Job::Folder(folder) => Some(folder),
            Job::Project(_) => None,
        }
    }

    /// The project, if this job is one.
    pub fn as_project(&self) -> Option<&Project> {
        match self {
            Job::Project(project) => Some(project),
            Job::Folder(_) => None,
        }
    }

    /// `/`-delimited name relative to the root.
    pub fn full_name(&self) -> Result<String> {
        self.item().full_name()
    }

    /// The folder containing this job; the root folder for top-level jobs.
    pub fn parent(&self) -> Result<Folder> {
        parent_of(self.item())
    }

    /// Move the job into the folder `path`, returning it at its new URL.
    pub async fn move_to(&self, path: &str) -> Result<Job> {
        let destination = format!("/{}", path.trim_matches('/'));
        let item = self.item();
        let payload = json!({ "destination": destination }).to_string();
        let response = item
            .send(
                item.request(Method::POST, "move/move")
                    .form([("destination", destination.as_str()), ("json", payload.as_str())]),
            )
            .await?;
        let url = location(item, response.location())?;
        info!(from = %item.url(), to = %url, "Moved job");
        Ok(self.relocated(&url))
    }

    /// Rename the job, returning it at its new URL.
    pub async fn rename(&self, name: &str) -> Result<Job> {
        let item = self.item();
        let response = item
            .send(item.request(Method::POST, "confirmRename").query("newName", name))
            .await?;
        let url = location(item, response.location())?;
        info!(from = %item.url(), to = %url, "Renamed job");
        Ok(self.relocated(&url))
    }

    /// Create a copy of this job at `path`, possibly in another folder.
    pub async fn duplicate(&self, path: &str, recursive: bool) -> Result<()> {
        let xml = self.configure().await?;
        self.item()
            .jenkins()
            .create_job(path, &xml, recursive)
            .await
    }

    fn relocated(&self, url: &str) -> Job {
        match self {
            Job::Folder(folder) => Job::Folder(Folder {
                item: folder.item.with_url(url),
            }),
            Job::Project(project) => Job::Project(Project {
                item: project.item.with_url(url),
            }),
        }
    }
}

impl RemoteItem for Job {
    fn item(&self) -> &Item {
        match self {
            Job::Folder(folder) => &folder.item,
            Job::Project(project) => &project.item,
        }
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self.item(), f)
    }
}

impl Deletable for Job {}
impl Configurable for Job {}
impl Describable for Job {}

fn parent_of(item: &Item) -> Result<Folder> {
    let full_name = item.full_name()?;
    let (parent, _) = split_full_name(&full_name);
    Ok(Folder::at(item.jenkins(), parent))
}

/// Absolute URL from a `Location` header, which Jenkins may send relative.
fn location(item: &Item, header: Option<&str>) -> Result<String> {
    header
        .map(|url| item.jenkins().absolute_url(url))
        .ok_or_else(|| Error::missing_field("Location", item.url()))
}

#[derive(Deserialize)]
struct JobList {
    #[serde(default)]
    jobs: Vec<Value>,
}

#[derive(Deserialize)]
struct BuildList {
    #[serde(default)]
    builds: Vec<Value>,
}

/// Kind of the root item, whose fields differ from a real folder's.
const ROOT_KIND: &str = "Hudson";

/// A container of jobs. The Jenkins root acts as the top-level folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Folder {
    item: Item,
}

impl Folder {
    /// The folder with `full_name`; the empty name is the root.
    pub(crate) fn at(jenkins: &Jenkins, full_name: &str) -> Self {
        let url = jenkins.name_to_url(full_name);
        let kind = if url == jenkins.root() { ROOT_KIND } else { "Folder" };
        Self {
            item: jenkins.item(url, kind),
        }
    }

    /// Whether this is the Jenkins root rather than a real folder.
    pub fn is_root(&self) -> bool {
        self.item.url() == self.item.jenkins().root()
    }

    /// `/`-delimited name relative to the root; empty for the root.
    pub fn full_name(&self) -> Result<String> {
        self.item.full_name()
    }

    /// The enclosing folder.
    pub fn parent(&self) -> Result<Folder> {
        parent_of(&self.item)
    }

    /// Create a job named `name` in this folder from configuration XML.
    pub async fn create(&self, name: &str, xml: &str) -> Result<()> {
        self.item
            .send(
                self.item
                    .request(Method::POST, "createItem")
                    .query("name", name)
                    .xml(xml),
            )
            .await?;
        info!(folder = %self.item.url(), name, "Created job");
        Ok(())
    }

    /// Direct child named `name`, if any.
    pub async fn get(&self, name: &str) -> Result<Option<Job>> {
        let list: JobList = self.item.fetch_as("jobs[name,url]", 0).await?;
        list.jobs
            .iter()
            .find(|record| record.get("name").and_then(Value::as_str) == Some(name))
            .map(|record| self.item.jenkins().new_item(record))
            .transpose()
    }

    /// Jobs below this folder, `depth` levels of sub-folders deep, in
    /// depth-first pre-order.
    pub async fn iter(&self, depth: usize) -> Result<JobIter> {
        let mut data = self.item.fetch_json(&nested_jobs_query(depth), 0).await?;
        let jobs = take_array(&mut data, "jobs");
        debug!(folder = %self.item.url(), top_level = jobs.len(), "Listed jobs");
        Ok(JobIter::new(self.item.jenkins().clone(), jobs))
    }

    /// Copy the child `src` to a new child `dest`.
    pub async fn copy(&self, src: &str, dest: &str) -> Result<()> {
        self.item
            .send(self.item.request(Method::POST, "createItem").queries([
                ("name", dest),
                ("mode", "copy"),
                ("from", src),
            ]))
            .await?;
        Ok(())
    }

    /// Reload the folder's configuration from disk.
    pub async fn reload(&self) -> Result<()> {
        self.item.post("reload").await?;
        Ok(())
    }

    /// Views defined in this folder.
    pub fn views(&self) -> Views {
        Views::new(self.item.clone())
    }

    /// The folder's own credential store.
    pub fn credentials(&self) -> Credentials {
        let url = self.item.endpoint("credentials/store/folder/");
        Credentials::new(self.item.jenkins().item(url, "Credentials"))
    }
}

remote_item!(Folder);

impl Deletable for Folder {}
impl Configurable for Folder {}
impl Describable for Folder {}

/// Depth-first pre-order walk over a fetched job tree.
///
/// Each step yields the job for one record; a record whose type tag is
/// not registered yields an error without ending the walk.
#[derive(Debug)]
pub struct JobIter {
    jenkins: Jenkins,
    stack: Vec<Value>,
}

impl JobIter {
    pub(crate) fn new(jenkins: Jenkins, mut jobs: Vec<Value>) -> Self {
        jobs.reverse();
        Self {
            jenkins,
            stack: jobs,
        }
    }
}

impl Iterator for JobIter {
    type Item = Result<Job>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut record = self.stack.pop()?;
        let children = take_array(&mut record, "jobs");
        self.stack.extend(children.into_iter().rev());
        Some(self.jenkins.new_item(&record))
    }
}

/// Shortcut builds every project tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuildKey {
    /// `firstBuild`
    First,
    /// `lastBuild`
    Last,
    /// `lastCompletedBuild`
    LastCompleted,
    /// `lastFailedBuild`
    LastFailed,
    /// `lastStableBuild`
    LastStable,
    /// `lastUnstableBuild`
    LastUnstable,
    /// `lastSuccessfulBuild`
    LastSuccessful,
    /// `lastUnsuccessfulBuild`
    LastUnsuccessful,
}

impl BuildKey {
    /// Field name in the project's `api/json`.
    pub fn field(self) -> &'static str {
        match self {
            BuildKey::First => "firstBuild",
            BuildKey::Last => "lastBuild",
            BuildKey::LastCompleted => "lastCompletedBuild",
            BuildKey::LastFailed => "lastFailedBuild",
            BuildKey::LastStable => "lastStableBuild",
            BuildKey::LastUnstable => "lastUnstableBuild",
            BuildKey::LastSuccessful => "lastSuccessfulBuild",
            BuildKey::LastUnsuccessful => "lastUnsuccessfulBuild",
        }
    }
}

/// A parameter the project asks for when built.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ParameterDefinition {
    /// Parameter name
    pub name: String,
    /// Definition type, e.g. `StringParameterDefinition`
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    /// Help text
    #[serde(default)]
    pub description: Option<String>,
    /// Value used when the build does not supply one
    #[serde(
        rename = "defaultParameterValue",
        default,
        deserialize_with = "unwrap_value"
    )]
    pub default_value: Option<Value>,
}

fn unwrap_value<'de, D>(deserializer: D) -> std::result::Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Value> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|mut wrapper| wrapper.get_mut("value").map(Value::take)))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobProperty {
    #[serde(default)]
    parameter_definitions: Vec<ParameterDefinition>,
}

#[derive(Deserialize)]
struct JobProperties {
    #[serde(default)]
    property: Vec<JobProperty>,
}

/// A buildable job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    item: Item,
}

fn build_entry(params: &[(&str, &str)]) -> &'static str {
    if params
        .iter()
        .all(|(key, _)| RESERVED_BUILD_PARAMS.contains(key))
    {
        "build"
    } else {
        "buildWithParameters"
    }
}

impl Project {
    /// Queue a build.
    ///
    /// `token` and `delay` are passed to `build`; any other parameter
    /// switches to `buildWithParameters`. Returns the queue entry the
    /// server points at.
    pub async fn build(&self, params: &[(&str, &str)]) -> Result<QueueItem> {
        let entry = build_entry(params);
        let response = self
            .item
            .send(
                self.item
                    .request(Method::POST, entry)
                    .queries(params.iter().copied()),
            )
            .await?;
        let url = location(&self.item, response.location())?;
        info!(job = %self.item.url(), queue_item = %url, "Build queued");
        Ok(QueueItem::from_item(
            self.item.jenkins().item(url, "QueueItem"),
        ))
    }

    /// Build with `number`, if it still exists.
    pub async fn get_build(&self, number: u64) -> Result<Option<Build>> {
        let list: BuildList = self.item.fetch_as("builds[number,url]", 0).await?;
        list.builds
            .iter()
            .find(|record| record.get("number").and_then(Value::as_u64) == Some(number))
            .map(|record| self.item.jenkins().new_item(record))
            .transpose()
    }

    /// Retained builds, newest first.
    pub async fn iter_builds(&self) -> Result<Vec<Build>> {
        let list: BuildList = self.item.fetch_as("builds[number,url]", 0).await?;
        list.builds
            .iter()
            .map(|record| self.item.jenkins().new_item(record))
            .collect()
    }

    /// The build referenced by `key`, or `None` if there is none yet.
    pub async fn get_build_by(&self, key: BuildKey) -> Result<Option<Build>> {
        match self.item.fetch_field_tree(key.field(), "url").await? {
            Value::Null => Ok(None),
            record => self.item.jenkins().new_item(&record).map(Some),
        }
    }

    /// First retained build.
    pub async fn get_first_build(&self) -> Result<Option<Build>> {
        self.get_build_by(BuildKey::First).await
    }

    /// Most recent build.
    pub async fn get_last_build(&self) -> Result<Option<Build>> {
        self.get_build_by(BuildKey::Last).await
    }

    /// Most recent finished build.
    pub async fn get_last_completed_build(&self) -> Result<Option<Build>> {
        self.get_build_by(BuildKey::LastCompleted).await
    }

    /// Most recent failed build.
    pub async fn get_last_failed_build(&self) -> Result<Option<Build>> {
        self.get_build_by(BuildKey::LastFailed).await
    }

    /// Most recent stable build.
    pub async fn get_last_stable_build(&self) -> Result<Option<Build>> {
        self.get_build_by(BuildKey::LastStable).await
    }

    /// Most recent unstable build.
    pub async fn get_last_unstable_build(&self) -> Result<Option<Build>> {
        self.get_build_by(BuildKey::LastUnstable).await
    }

    /// Most recent successful build.
    pub async fn get_last_successful_build(&self) -> Result<Option<Build>> {
        self.get_build_by(BuildKey::LastSuccessful).await
    }

    /// Most recent unsuccessful build.
    pub async fn get_last_unsuccessful_build(&self) -> Result<Option<Build>> {
        self.get_build_by(BuildKey::LastUnsuccessful).await
    }

    /// Set the number the next build will get.
    pub async fn set_next_build_number(&self, number: u64) -> Result<()> {
        self.item
            .send(
                self.item
                    .request(Method::POST, "nextbuildnumber/submit")
                    .query("nextBuildNumber", number),
            )
            .await?;
        Ok(())
    }

    /// Whether any retained build is running.
    pub async fn is_building(&self) -> Result<bool> {
        let data = self.item.fetch_json("builds[building]", 0).await?;
        Ok(data
            .get("builds")
            .and_then(Value::as_array)
            .is_some_and(|builds| {
                builds
                    .iter()
                    .any(|b| b.get("building").and_then(Value::as_bool) == Some(true))
            }))
    }

    /// Parameters the project declares.
    pub async fn get_parameters(&self) -> Result<Vec<ParameterDefinition>> {
        let properties: JobProperties = self
            .item
            .fetch_as(
                "property[parameterDefinitions[name,type,description,defaultParameterValue[value]]]",
                0,
            )
            .await?;
        Ok(properties
            .property
            .into_iter()
            .flat_map(|p| p.parameter_definitions)
            .collect())
    }
}

remote_item!(Project);

impl Deletable for Project {}
impl Configurable for Project {}
impl Describable for Project {}
impl Enableable for Project {}
