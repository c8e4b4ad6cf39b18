//! Type-tag registry and polymorphic item factory
//!
//! Every record Jenkins returns carries a `_class` discriminator such as
//! `hudson.model.FreeStyleProject` or `hudson.model.Queue$LeftItem`. The
//! registry maps the last component of that name (the *type tag*) to a
//! constructor for the matching wrapper. Tables are kept per
//! [`Namespace`], so a tag only has meaning in the context it was found in.
//!
//! Jenkins plugins add job, build and node kinds this crate cannot know
//! about. Register them at runtime:
//!
//! ```rust,no_run
//! use turbojenkins::{Jenkins, Job};
//!
//! # async fn example() -> turbojenkins::Result<()> {
//! let jenkins = Jenkins::builder()
//!     .base_url("http://127.0.0.1:8080/")
//!     .build()?;
//! jenkins.registry().register_job("GitLabSCMNavigator", Job::folder);
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::fmt;

use parking_lot::RwLock;
use serde_json::Value;
use turbojenkins_core::type_tag;

use crate::error::{Error, Result};
use crate::item::Item;
use crate::resources::{Build, Job, Node, QueueItem, View};

/// Separate lookup tables, one per kind of record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// Folders, pipelines, freestyle projects, ...
    Job,
    /// Runs of a job
    Build,
    /// Computers (agents and the built-in node)
    Node,
    /// List views, nested views, ...
    View,
    /// Entries of the build queue
    QueueItem,
}

impl Namespace {
    fn as_str(self) -> &'static str {
        match self {
            Namespace::Job => "job",
            Namespace::Build => "build",
            Namespace::Node => "node",
            Namespace::View => "view",
            Namespace::QueueItem => "queue_item",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Builds a wrapper from a located item.
///
/// Constructors may adjust the URL (the built-in node and the "all" view
/// are addressed differently from what the server reports).
pub type Constructor<T> = fn(Item) -> T;

/// One namespace worth of tag → constructor mappings.
pub struct Table<T> {
    entries: RwLock<HashMap<String, Constructor<T>>>,
}

impl<T> Table<T> {
    fn with_entries(entries: &[(&str, Constructor<T>)]) -> Self {
        Self {
            entries: RwLock::new(
                entries
                    .iter()
                    .map(|(tag, ctor)| ((*tag).to_string(), *ctor))
                    .collect(),
            ),
        }
    }

    /// Add or replace the constructor for `tag`.
    pub fn register(&self, tag: impl Into<String>, constructor: Constructor<T>) {
        self.entries.write().insert(tag.into(), constructor);
    }

    /// Look up the constructor for `tag`.
    pub fn get(&self, tag: &str) -> Option<Constructor<T>> {
        self.entries.read().get(tag).copied()
    }

    /// Whether `tag` is registered.
    pub fn contains(&self, tag: &str) -> bool {
        self.entries.read().contains_key(tag)
    }

    /// Registered tags, sorted.
    pub fn tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = self.entries.read().keys().cloned().collect();
        tags.sort();
        tags
    }
}

impl<T> fmt::Debug for Table<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.tags()).finish()
    }
}

/// Per-session registry of wrapper constructors.
///
/// Pre-populated with the kinds shipped by stock Jenkins and its most
/// common plugins. Lookups take a read lock; registration a write lock.
#[derive(Debug)]
pub struct Registry {
    jobs: Table<Job>,
    builds: Table<Build>,
    nodes: Table<Node>,
    views: Table<View>,
    queue_items: Table<QueueItem>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Registry with the built-in tags.
    pub fn new() -> Self {
        Self {
            jobs: Table::with_entries(&[
                ("Folder", Job::folder),
                ("WorkflowMultiBranchProject", Job::folder),
                ("OrganizationFolder", Job::folder),
                ("WorkflowJob", Job::project),
                ("FreeStyleProject", Job::project),
                ("MatrixProject", Job::project),
                ("MavenModuleSet", Job::project),
                ("ExternalJob", Job::project),
                ("MultiJobProject", Job::project),
                ("IvyModuleSet", Job::project),
                ("BitbucketSCMNavigator", Job::project),
                ("GitHubSCMNavigator", Job::project),
            ]),
            builds: Table::with_entries(&[
                ("WorkflowRun", Build::workflow_run),
                ("FreeStyleBuild", Build::run),
                ("MatrixBuild", Build::run),
                ("MatrixRun", Build::run),
                ("MavenModuleSetBuild", Build::run),
            ]),
            nodes: Table::with_entries(&[
                ("MasterComputer", Node::built_in),
                ("SlaveComputer", Node::computer),
                ("KubernetesComputer", Node::computer),
                ("DockerComputer", Node::computer),
                ("EC2Computer", Node::computer),
            ]),
            views: Table::with_entries(&[
                ("AllView", View::all),
                ("MyView", View::plain),
                ("ListView", View::plain),
                ("Dashboard", View::plain),
                ("SectionedView", View::plain),
                ("NestedView", View::nested),
            ]),
            queue_items: Table::with_entries(&[
                ("WaitingItem", QueueItem::from_item),
                ("BlockedItem", QueueItem::from_item),
                ("BuildableItem", QueueItem::from_item),
                ("LeftItem", QueueItem::from_item),
            ]),
        }
    }

    /// Register a job wrapper for `tag`.
    pub fn register_job(&self, tag: impl Into<String>, constructor: Constructor<Job>) {
        self.jobs.register(tag, constructor);
    }

    /// Register a build wrapper for `tag`.
    pub fn register_build(&self, tag: impl Into<String>, constructor: Constructor<Build>) {
        self.builds.register(tag, constructor);
    }

    /// Register a node wrapper for `tag`.
    pub fn register_node(&self, tag: impl Into<String>, constructor: Constructor<Node>) {
        self.nodes.register(tag, constructor);
    }

    /// Register a view wrapper for `tag`.
    pub fn register_view(&self, tag: impl Into<String>, constructor: Constructor<View>) {
        self.views.register(tag, constructor);
    }

    /// Register a queue item wrapper for `tag`.
    pub fn register_queue_item(&self, tag: impl Into<String>, constructor: Constructor<QueueItem>) {
        self.queue_items.register(tag, constructor);
    }

    /// The table backing wrapper type `T`.
    pub fn table<T: Materialize>(&self) -> &Table<T> {
        T::table(self)
    }
}

/// Wrapper types the factory can produce.
pub trait Materialize: Sized {
    /// Namespace searched for this wrapper's tags.
    const NAMESPACE: Namespace;

    /// Select this wrapper's table.
    fn table(registry: &Registry) -> &Table<Self>;
}

impl Materialize for Job {
    const NAMESPACE: Namespace = Namespace::Job;

    fn table(registry: &Registry) -> &Table<Self> {
        &registry.jobs
    }
}

impl Materialize for Build {
    const NAMESPACE: Namespace = Namespace::Build;

    fn table(registry: &Registry) -> &Table<Self> {
        &registry.builds
    }
}

impl Materialize for Node {
    const NAMESPACE: Namespace = Namespace::Node;

    fn table(registry: &Registry) -> &Table<Self> {
        &registry.nodes
    }
}

impl Materialize for View {
    const NAMESPACE: Namespace = Namespace::View;

    fn table(registry: &Registry) -> &Table<Self> {
        &registry.views
    }
}

impl Materialize for QueueItem {
    const NAMESPACE: Namespace = Namespace::QueueItem;

    fn table(registry: &Registry) -> &Table<Self> {
        &registry.queue_items
    }
}

/// Read `_class` and `url` out of a record.
pub(crate) fn class_and_url(record: &Value) -> Result<(&str, &str)> {
    let url = record.get("url").and_then(Value::as_str).unwrap_or_default();
    let class = record
        .get("_class")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::missing_field("_class", url))?;
    if url.is_empty() {
        return Err(Error::missing_field("url", class));
    }
    Ok((class, url))
}

/// Resolve the constructor for `class` in `T`'s namespace.
pub(crate) fn constructor_for<T: Materialize>(
    registry: &Registry,
    class: &str,
    url: &str,
) -> Result<(Constructor<T>, String)> {
    let tag = type_tag(class);
    registry
        .table::<T>()
        .get(tag)
        .map(|ctor| (ctor, tag.to_string()))
        .ok_or_else(|| Error::UnregisteredTypeTag {
            namespace: T::NAMESPACE,
            tag: tag.to_string(),
            url: url.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builtin_tags() {
        let registry = Registry::new();
        assert!(registry.table::<Job>().contains("Folder"));
        assert!(registry.table::<Job>().contains("WorkflowJob"));
        assert!(registry.table::<Build>().contains("WorkflowRun"));
        assert!(registry.table::<Node>().contains("MasterComputer"));
        assert!(registry.table::<View>().contains("AllView"));
        assert!(registry.table::<QueueItem>().contains("LeftItem"));
    }

    #[test]
    fn test_namespaces_are_separate() {
        let registry = Registry::new();
        assert!(!registry.table::<Build>().contains("FreeStyleProject"));
        assert!(!registry.table::<Job>().contains("FreeStyleBuild"));
    }

    #[test]
    fn test_register_job_at_runtime() {
        let registry = Registry::new();
        assert!(!registry.table::<Job>().contains("GitLabSCMNavigator"));
        registry.register_job("GitLabSCMNavigator", Job::folder);
        assert!(registry.table::<Job>().contains("GitLabSCMNavigator"));
    }

    #[test]
    fn test_constructor_miss_names_tag_and_url() {
        let registry = Registry::new();
        let err = constructor_for::<Job>(
            &registry,
            "io.jenkins.plugins.gitlabbranchsource.GitLabSCMNavigator",
            "http://ci/job/gl/",
        )
        .unwrap_err();
        match err {
            Error::UnregisteredTypeTag { namespace, tag, url } => {
                assert_eq!(namespace, Namespace::Job);
                assert_eq!(tag, "GitLabSCMNavigator");
                assert_eq!(url, "http://ci/job/gl/");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_constructor_hit_splits_on_dollar() {
        let registry = Registry::new();
        let (_, tag) =
            constructor_for::<QueueItem>(&registry, "hudson.model.Queue$LeftItem", "http://ci/queue/item/1/")
                .unwrap();
        assert_eq!(tag, "LeftItem");
    }

    #[test]
    fn test_class_and_url_requires_class() {
        let err = class_and_url(&json!({"url": "http://ci/job/a/"})).unwrap_err();
        assert!(err.to_string().contains("_class"));
    }

    #[test]
    fn test_namespace_display() {
        assert_eq!(Namespace::QueueItem.to_string(), "queue_item");
        assert_eq!(Namespace::Job.to_string(), "job");
    }
}
