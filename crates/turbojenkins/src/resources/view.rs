//! Views of the main page, of folders and of nested views

use http::Method;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use super::Job;
use crate::{
    capabilities::{Configurable, Deletable, Describable},
    error::Result,
    item::Item,
};

#[derive(Deserialize)]
struct ViewList {
    #[serde(default)]
    views: Vec<Value>,
}

#[derive(Deserialize)]
struct JobList {
    #[serde(default)]
    jobs: Vec<Value>,
}

/// The views owned by the root, a folder or a nested view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Views {
    item: Item,
}

impl Views {
    /// Views of the owner at `owner`'s URL.
    pub(crate) fn new(owner: Item) -> Self {
        Self { item: owner }
    }

    /// View named `name`.
    pub async fn get(&self, name: &str) -> Result<Option<View>> {
        let list: ViewList = self.item.fetch_as("views[name,url]", 0).await?;
        list.views
            .iter()
            .find(|record| record.get("name").and_then(Value::as_str) == Some(name))
            .map(|record| self.item.jenkins().new_item(record))
            .transpose()
    }

    /// Every view of the owner.
    pub async fn iter(&self) -> Result<Vec<View>> {
        let list: ViewList = self.item.fetch_as("views[name,url]", 0).await?;
        list.views
            .iter()
            .map(|record| self.item.jenkins().new_item(record))
            .collect()
    }

    /// Create a view from its configuration XML.
    pub async fn create(&self, name: &str, xml: &str) -> Result<()> {
        self.item
            .send(
                self.item
                    .request(Method::POST, "createView")
                    .query("name", name)
                    .xml(xml),
            )
            .await?;
        info!(owner = %self.item.url(), name, "Created view");
        Ok(())
    }
}

remote_item!(Views);

/// A list of jobs shown together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct View {
    item: Item,
    nested: bool,
}

impl View {
    /// Constructor for list-like view tags.
    pub fn plain(item: Item) -> Self {
        Self {
            item,
            nested: false,
        }
    }

    /// Constructor for views that contain views.
    pub fn nested(item: Item) -> Self {
        Self { item, nested: true }
    }

    /// Constructor for the "all" view.
    ///
    /// The server reports the primary view at its owner's URL; the view
    /// itself lives at `view/all` under the root and `view/All` under a
    /// folder.
    pub fn all(item: Item) -> Self {
        if item.url().contains("/view/") {
            return Self::plain(item);
        }
        let suffix = if item.url() == item.jenkins().root() {
            "view/all"
        } else {
            "view/All"
        };
        let url = item.endpoint(suffix);
        Self::plain(item.with_url(url))
    }

    /// Job in the view named `name`.
    pub async fn get(&self, name: &str) -> Result<Option<Job>> {
        let list: JobList = self.item.fetch_as("jobs[name,url]", 0).await?;
        list.jobs
            .iter()
            .find(|record| record.get("name").and_then(Value::as_str) == Some(name))
            .map(|record| self.item.jenkins().new_item(record))
            .transpose()
    }

    /// Every job in the view.
    pub async fn iter(&self) -> Result<Vec<Job>> {
        let list: JobList = self.item.fetch_as("jobs[name,url]", 0).await?;
        list.jobs
            .iter()
            .map(|record| self.item.jenkins().new_item(record))
            .collect()
    }

    /// Add job `name` to the view.
    pub async fn include(&self, name: &str) -> Result<()> {
        self.item
            .send(
                self.item
                    .request(Method::POST, "addJobToView")
                    .query("name", name),
            )
            .await?;
        Ok(())
    }

    /// Remove job `name` from the view.
    pub async fn exclude(&self, name: &str) -> Result<()> {
        self.item
            .send(
                self.item
                    .request(Method::POST, "removeJobFromView")
                    .query("name", name),
            )
            .await?;
        Ok(())
    }

    /// Child views, for nested views only.
    pub fn views(&self) -> Option<Views> {
        self.nested.then(|| Views::new(self.item.clone()))
    }
}

remote_item!(View);

impl Configurable for View {}
impl Describable for View {}
impl Deletable for View {}
