//! Typed wrappers for Jenkins resources
//!
//! Each wrapper owns an [`Item`](crate::item::Item) and opts into the
//! capability traits its endpoint family supports.

/// Implement [`RemoteItem`](crate::item::RemoteItem) and `Display` for a
/// wrapper whose item lives in the field `item`.
macro_rules! remote_item {
    ($($wrapper:ty),+ $(,)?) => {
        $(
            impl $crate::item::RemoteItem for $wrapper {
                fn item(&self) -> &$crate::item::Item {
                    &self.item
                }
            }

            impl ::std::fmt::Display for $wrapper {
                fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                    ::std::fmt::Display::fmt(&self.item, f)
                }
            }
        )+
    };
}

use serde_json::Value;

/// Detach the array under `key`, or an empty list if absent or null.
fn take_array(record: &mut Value, key: &str) -> Vec<Value> {
    match record.get_mut(key).map(Value::take) {
        Some(Value::Array(values)) => values,
        _ => Vec::new(),
    }
}

mod artifact;
mod build;
mod credential;
mod input;
mod job;
mod node;
mod plugin;
mod queue;
mod report;
mod system;
mod user;
mod view;

pub use artifact::Artifact;
pub use build::{Build, BuildCause, BuildParameter, LogStream, WorkflowRun};
pub use credential::{Credential, Credentials, Domain, GLOBAL_DOMAIN};
pub use input::PendingInputAction;
pub use job::{BuildKey, Folder, Job, JobIter, ParameterDefinition, Project};
pub use node::{Node, NodeSettings, Nodes};
pub use plugin::{Plugin, PluginManager, ProxySettings, UpdateCenter};
pub use queue::{Queue, QueueItem, QueueState};
pub use report::{Coverage, CoverageReport, CoverageType, TestCase, TestReport, TestSuite};
pub use system::System;
pub use user::{ApiToken, User, Users};
pub use view::{View, Views};
