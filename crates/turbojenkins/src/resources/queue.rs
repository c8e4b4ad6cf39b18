//! The build queue
//!
//! An entry moves through the queue roughly like this:
//!
//! ```text
//! (enter) --> waiting --+--> blocked
//!                       |      ^ |
//!                       |      | v
//!                       +--> buildable --> pending --> left
//! ```
//!
//! Only a left item knows its build; for buildable and waiting items the
//! build is found by scanning what the executors are running.

use http::Method;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;
use turbojenkins_core::type_tag;

use super::build::{action_causes, action_parameters};
use super::{Build, BuildCause, BuildParameter, Job};
use crate::{
    error::{Error, Result},
    item::{Item, RemoteItem},
};

/// Where a queue item is in its life cycle, from its `_class`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueueState {
    /// `Queue$WaitingItem`: in its quiet period
    Waiting,
    /// `Queue$BlockedItem`: waiting on a resource or another build
    Blocked,
    /// `Queue$BuildableItem`: waiting for an executor
    Buildable,
    /// `Queue$LeftItem`: handed to an executor or cancelled
    Left,
    /// A state added by a plugin
    Other(String),
}

impl QueueState {
    /// State for a `_class` value or bare type tag.
    pub fn from_class(class: &str) -> Self {
        match type_tag(class) {
            "WaitingItem" => QueueState::Waiting,
            "BlockedItem" => QueueState::Blocked,
            "BuildableItem" => QueueState::Buildable,
            "LeftItem" => QueueState::Left,
            other => QueueState::Other(other.to_string()),
        }
    }
}

#[derive(Deserialize)]
struct QueueList {
    #[serde(default)]
    items: Vec<Value>,
}

/// The build queue at `{root}queue/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Queue {
    item: Item,
}

impl Queue {
    pub(crate) fn new(item: Item) -> Self {
        Self { item }
    }

    /// Entry with `id`, if still queued or recently left.
    pub async fn get(&self, id: u64) -> Result<Option<QueueItem>> {
        let list: QueueList = self.item.fetch_as("items[_class,id,url]", 0).await?;
        list.items
            .iter()
            .find(|record| record.get("id").and_then(Value::as_u64) == Some(id))
            .map(|record| self.item.jenkins().new_item(record))
            .transpose()
    }

    /// Every queued entry.
    pub async fn iter(&self) -> Result<Vec<QueueItem>> {
        let list: QueueList = self.item.fetch_as("items[_class,id,url]", 0).await?;
        list.items
            .iter()
            .map(|record| self.item.jenkins().new_item(record))
            .collect()
    }

    /// Remove entry `id` from the queue.
    pub async fn cancel(&self, id: u64) -> Result<()> {
        self.item
            .send(self.item.request(Method::POST, "cancelItem").query("id", id))
            .await?;
        debug!(id, "Cancelled queue item");
        Ok(())
    }
}

remote_item!(Queue);

/// One entry of the build queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueItem {
    item: Item,
}

impl QueueItem {
    /// Constructor for every queue item tag.
    ///
    /// Servers behind a TLS-terminating proxy report `http://` URLs; they
    /// are upgraded when the session root is `https://`.
    pub fn from_item(item: Item) -> Self {
        let upgraded = item
            .jenkins()
            .root()
            .starts_with("https://")
            .then(|| item.url().strip_prefix("http://"))
            .flatten()
            .map(|rest| format!("https://{rest}"));
        match upgraded {
            Some(url) => Self {
                item: item.with_url(url),
            },
            None => Self { item },
        }
    }

    /// Queue id, the last path segment of the URL.
    pub fn id(&self) -> Result<u64> {
        self.item
            .url()
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .and_then(|segment| segment.parse().ok())
            .ok_or_else(|| {
                Error::InvalidUrl(format!("{} has no queue id", self.item.url()))
            })
    }

    /// Current state. Always asks the server; the state changes over time.
    pub async fn state(&self) -> Result<QueueState> {
        let class = self.item.fetch_field("_class").await?;
        let class = class
            .as_str()
            .ok_or_else(|| Error::missing_field("_class", self.item.url()))?;
        Ok(QueueState::from_class(class))
    }

    /// The build this entry turned into, once there is one.
    pub async fn get_build(&self) -> Result<Option<Build>> {
        match self.state().await? {
            QueueState::Left => {
                match self.item.fetch_field_tree("executable", "url").await? {
                    Value::Null => Ok(None),
                    record => self.item.jenkins().new_item(&record).map(Some),
                }
            }
            QueueState::Buildable | QueueState::Waiting => self.find_running_build().await,
            QueueState::Blocked | QueueState::Other(_) => Ok(None),
        }
    }

    async fn find_running_build(&self) -> Result<Option<Build>> {
        let id = self.id()?;
        for build in self.item.jenkins().nodes().iter_builds().await? {
            // Executors can hand out builds that were deleted meanwhile.
            if build.exists().await? && build.queue_id().await? == Some(id) {
                return Ok(Some(build));
            }
        }
        Ok(None)
    }

    /// The job this entry will build.
    pub async fn get_job(&self) -> Result<Option<Job>> {
        if self.state().await? == QueueState::Buildable {
            return match self.get_build().await? {
                Some(build) => build.get_job().await,
                None => Ok(None),
            };
        }
        match self.item.fetch_field_tree("task", "url").await? {
            Value::Null => Ok(None),
            record => self.item.jenkins().new_item(&record).map(Some),
        }
    }

    /// Remove this entry from the queue.
    pub async fn cancel(&self) -> Result<()> {
        self.item.jenkins().queue().cancel(self.id()?).await
    }

    /// Parameters the entry was queued with.
    pub async fn get_parameters(&self) -> Result<Vec<BuildParameter>> {
        action_parameters(&self.item).await
    }

    /// Why the entry was queued.
    pub async fn get_causes(&self) -> Result<Vec<BuildCause>> {
        action_causes(&self.item).await
    }
}

remote_item!(QueueItem);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Jenkins;

    #[test]
    fn test_state_from_class() {
        assert_eq!(QueueState::from_class("hudson.model.Queue$LeftItem"), QueueState::Left);
        assert_eq!(QueueState::from_class("hudson.model.Queue$BlockedItem"), QueueState::Blocked);
        assert_eq!(
            QueueState::from_class("x.y.Queue$ParkedItem"),
            QueueState::Other("ParkedItem".into())
        );
    }

    #[test]
    fn test_id_from_url() {
        let jenkins = Jenkins::builder().base_url("http://ci/").build().unwrap();
        let item = QueueItem::from_item(jenkins.item("http://ci/queue/item/42/", "LeftItem"));
        assert_eq!(item.id().unwrap(), 42);
    }

    #[test]
    fn test_https_upgrade() {
        let jenkins = Jenkins::builder().base_url("https://ci/").build().unwrap();
        let item = QueueItem::from_item(jenkins.item("http://ci/queue/item/3/", "QueueItem"));
        assert_eq!(item.url(), "https://ci/queue/item/3/");

        let plain = Jenkins::builder().base_url("http://ci/").build().unwrap();
        let item = QueueItem::from_item(plain.item("http://ci/queue/item/3/", "QueueItem"));
        assert_eq!(item.url(), "http://ci/queue/item/3/");
    }
}
