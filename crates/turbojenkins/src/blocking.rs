//! Blocking facade over the async client.
//!
//! Each [`Jenkins`] owns a single-threaded tokio runtime and drives the
//! async session on it. Calling these methods from inside another runtime
//! panics; use the async client there.
//!
//! ```rust,no_run
//! use turbojenkins::blocking::Jenkins;
//!
//! # fn main() -> turbojenkins::Result<()> {
//! let jenkins = Jenkins::new("http://127.0.0.1:8080/", "admin", "11ab...")?;
//! println!("server {}", jenkins.version()?);
//! # Ok(())
//! # }
//! ```

use std::{future::Future, sync::Arc};

use tokio::runtime::{Builder, Runtime};

use crate::{
    client::CrumbHeader,
    config::ClientConfig,
    error::Result,
    resources::{Job, JobIter, QueueItem},
};

/// Synchronous session. Clones share the runtime and the async session.
#[derive(Clone)]
pub struct Jenkins {
    runtime: Arc<Runtime>,
    inner: crate::Jenkins,
}

impl std::fmt::Debug for Jenkins {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("blocking::Jenkins")
            .field("root", &self.inner.root())
            .finish()
    }
}

impl Jenkins {
    /// Connect to `url` with basic-auth credentials.
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or the runtime cannot start.
    pub fn new(
        url: impl Into<String>,
        username: impl Into<String>,
        api_token: impl Into<String>,
    ) -> Result<Self> {
        Self::from_async(crate::Jenkins::new(url, username, api_token)?)
    }

    /// Create a session from a configuration object.
    ///
    /// # Errors
    /// Returns an error if `base_url` is missing or invalid.
    pub fn from_config(config: ClientConfig) -> Result<Self> {
        Self::from_async(crate::Jenkins::from_config(config)?)
    }

    /// Wrap an existing async session.
    ///
    /// # Errors
    /// Returns an error if the runtime cannot start.
    pub fn from_async(inner: crate::Jenkins) -> Result<Self> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        Ok(Self {
            runtime: Arc::new(runtime),
            inner,
        })
    }

    /// The wrapped async session.
    pub fn inner(&self) -> &crate::Jenkins {
        &self.inner
    }

    /// Run any future on this session's runtime, for operations not
    /// forwarded here.
    ///
    /// ```rust,no_run
    /// # fn main() -> turbojenkins::Result<()> {
    /// # let jenkins = turbojenkins::blocking::Jenkins::new("http://ci/", "u", "t")?;
    /// let nodes = jenkins.block_on(jenkins.inner().nodes().iter())?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    /// See [`crate::Jenkins::crumb`].
    pub fn crumb(&self) -> Result<CrumbHeader> {
        self.block_on(self.inner.crumb())
    }

    /// See [`crate::Jenkins::get_job`].
    pub fn get_job(&self, full_name: &str) -> Result<Option<Job>> {
        self.block_on(self.inner.get_job(full_name))
    }

    /// See [`crate::Jenkins::create_job`].
    pub fn create_job(&self, full_name: &str, xml: &str, recursive: bool) -> Result<()> {
        self.block_on(self.inner.create_job(full_name, xml, recursive))
    }

    /// See [`crate::Jenkins::iter_jobs`].
    pub fn iter_jobs(&self, depth: usize) -> Result<JobIter> {
        self.block_on(self.inner.iter_jobs(depth))
    }

    /// See [`crate::Jenkins::copy_job`].
    pub fn copy_job(&self, full_name: &str, dest: &str) -> Result<()> {
        self.block_on(self.inner.copy_job(full_name, dest))
    }

    /// See [`crate::Jenkins::delete_job`].
    pub fn delete_job(&self, full_name: &str) -> Result<()> {
        self.block_on(self.inner.delete_job(full_name))
    }

    /// See [`crate::Jenkins::build_job`].
    pub fn build_job(&self, full_name: &str, params: &[(&str, &str)]) -> Result<QueueItem> {
        self.block_on(self.inner.build_job(full_name, params))
    }

    /// See [`crate::Jenkins::rename_job`].
    pub fn rename_job(&self, full_name: &str, new_name: &str) -> Result<Job> {
        self.block_on(self.inner.rename_job(full_name, new_name))
    }

    /// See [`crate::Jenkins::move_job`].
    pub fn move_job(&self, full_name: &str, new_full_name: &str) -> Result<Job> {
        self.block_on(self.inner.move_job(full_name, new_full_name))
    }

    /// See [`crate::Jenkins::duplicate_job`].
    pub fn duplicate_job(&self, full_name: &str, new_name: &str, recursive: bool) -> Result<()> {
        self.block_on(self.inner.duplicate_job(full_name, new_name, recursive))
    }

    /// See [`crate::Jenkins::is_name_safe`].
    pub fn is_name_safe(&self, name: &str) -> Result<bool> {
        self.block_on(self.inner.is_name_safe(name))
    }

    /// See [`crate::Jenkins::validate_jenkinsfile`].
    pub fn validate_jenkinsfile(&self, content: &str) -> Result<String> {
        self.block_on(self.inner.validate_jenkinsfile(content))
    }

    /// See [`crate::Jenkins::version`].
    pub fn version(&self) -> Result<String> {
        self.block_on(self.inner.version())
    }

    /// See [`crate::Jenkins::exists`].
    pub fn exists(&self) -> bool {
        self.block_on(self.inner.exists())
    }
}
