//! # TurboJenkins
//!
//! Typed async client for the Jenkins REST API:
//! - Jobs addressed by full name (`folder/sub/job`) or URL
//! - Typed wrappers materialized from the server's `_class` tags
//! - Any scalar field readable by snake_case name
//! - CSRF crumb fetched once per session and sent with every request
//! - Builds, queue, nodes, credentials, views, plugins, users
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use turbojenkins::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let jenkins = Jenkins::new("http://127.0.0.1:8080/", "admin", "11ab...")?;
//!
//!     let item = jenkins.build_job("team/build1", &[("BRANCH", "main")]).await?;
//!     println!("queued as {}", item.id()?);
//!
//!     for job in jenkins.iter_jobs(1).await? {
//!         println!("{}", job?);
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// Re-export commonly used types
pub use client::{CrumbHeader, EMPTY_FOLDER_XML, Jenkins, JenkinsBuilder};
pub use config::ClientConfig;
pub use error::{Error, Result};
pub use item::{FieldNames, Item, RemoteItem};
pub use registry::{Constructor, Materialize, Namespace, Registry};
pub use resources::*;

// Module declarations
pub mod capabilities;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod item;
pub mod observability;
pub mod registry;
pub mod resources;

// Blocking facade over the async client
#[cfg(feature = "blocking")]
#[cfg_attr(docsrs, doc(cfg(feature = "blocking")))]
pub mod blocking;

// Re-export key dependencies for convenience
pub use async_trait::async_trait;
pub use serde_json::Value as JsonValue;

/// Prelude module for common imports
///
/// # Examples
///
/// ```rust
/// use turbojenkins::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        Build, Error, Folder, Jenkins, Job, Node, Project, QueueItem, RemoteItem, Result, View,
        capabilities::{Configurable, Deletable, Describable, Enableable, ScriptRunner},
    };
}

/// Crate version, automatically updated from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
