//! Files archived by a pipeline run

use std::fmt;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::{
    client::Jenkins,
    error::{Error, Result},
    http::Request,
};

#[derive(Deserialize)]
struct ArtifactRecord {
    #[serde(default)]
    id: Option<String>,
    name: String,
    #[serde(default)]
    path: String,
    url: String,
    #[serde(default)]
    size: Option<u64>,
}

/// An archived file, as listed by `wfapi/artifacts`.
///
/// Unlike other resources the download URL names a file, so it carries no
/// trailing slash.
#[derive(Debug, Clone)]
pub struct Artifact {
    jenkins: Jenkins,
    url: String,
    id: Option<String>,
    name: String,
    path: String,
    size: Option<u64>,
}

impl Artifact {
    pub(crate) fn new(jenkins: &Jenkins, raw: Value) -> Result<Self> {
        let record: ArtifactRecord = serde_json::from_value(raw)
            .map_err(|e| Error::ResponseValidation(format!("artifact record: {e}")))?;
        let url = format!(
            "{}{}",
            jenkins.root(),
            record.url.trim_start_matches('/').trim_end_matches('/')
        );
        Ok(Self {
            jenkins: jenkins.clone(),
            url,
            id: record.id,
            name: record.name,
            path: record.path,
            size: record.size,
        })
    }

    /// Download URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Artifact id within the run.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// File name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path relative to the archive root.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Size in bytes, if reported.
    pub fn size(&self) -> Option<u64> {
        self.size
    }

    /// Download to `path`.
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let response = self.jenkins.send(Request::get(&self.url)).await?;
        tokio::fs::write(path.as_ref(), response.body()).await?;
        info!(artifact = %self.url, path = %path.as_ref().display(), "Saved artifact");
        Ok(())
    }
}

impl PartialEq for Artifact {
    fn eq(&self, other: &Self) -> bool {
        self.url == other.url
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Artifact: {}>", self.url)
    }
}
