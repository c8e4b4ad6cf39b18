//! Jenkins session
//!
//! [`Jenkins`] owns the HTTP provider, the CSRF crumb, the type registry
//! and the field-name cache. It is cheap to clone; clones share all of it.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use http::{HeaderMap, HeaderName, HeaderValue, Method};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::debug;
use turbojenkins_core::{
    append_slash, is_absolute_url, name_to_url, split_full_name, url_to_name, validate_full_name,
};
use url::Url;

use crate::{
    capabilities::Deletable,
    config::ClientConfig,
    error::{Error, Result},
    http::{HttpProvider, Request, ReqwestHttpProvider, Response},
    item::{FieldCache, Item, RemoteItem},
    observability::log_crumb,
    registry::{Constructor, Materialize, Registry, class_and_url, constructor_for},
    resources::{
        Build, Credentials, Folder, Job, JobIter, Node, Nodes, PluginManager, Queue, QueueItem,
        System, User, Users, View, Views,
    },
};

/// Minimal configuration of an empty folder, used to create missing
/// parents with [`Jenkins::create_job`].
pub const EMPTY_FOLDER_XML: &str =
    "<?xml version='1.0' encoding='UTF-8'?>\n<com.cloudbees.hudson.plugins.folder.Folder/>";

/// The CSRF protection header, or nothing when the server has CSRF
/// protection disabled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrumbHeader(Option<(HeaderName, HeaderValue)>);

impl CrumbHeader {
    fn new(field: &str, crumb: &str) -> Result<Self> {
        let name = field
            .parse::<HeaderName>()
            .map_err(|e| Error::InvalidHeaderName(format!("crumb field '{field}': {e}")))?;
        let value = crumb
            .parse::<HeaderValue>()
            .map_err(|e| Error::InvalidHeaderValue(format!("crumb: {e}")))?;
        Ok(Self(Some((name, value))))
    }

    /// Whether no crumb is sent.
    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }

    /// Header name the server asked for, e.g. `Jenkins-Crumb`.
    pub fn field(&self) -> Option<&str> {
        self.0.as_ref().map(|(name, _)| name.as_str())
    }

    /// Crumb value.
    pub fn value(&self) -> Option<&str> {
        self.0.as_ref().and_then(|(_, value)| value.to_str().ok())
    }

    fn apply(&self, headers: &mut HeaderMap) {
        if let Some((name, value)) = &self.0 {
            headers.insert(name.clone(), value.clone());
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CrumbIssuer {
    crumb_request_field: String,
    crumb: String,
}

/// Connection to one Jenkins server.
///
/// # Example
///
/// ```rust,no_run
/// use turbojenkins::Jenkins;
///
/// # async fn example() -> turbojenkins::Result<()> {
/// let jenkins = Jenkins::new("http://127.0.0.1:8080/", "admin", "11ab...")?;
/// if let Some(job) = jenkins.get_job("team/build1").await? {
///     println!("{job}");
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Jenkins {
    inner: Arc<JenkinsInner>,
}

struct JenkinsInner {
    /// HTTP provider for making requests
    provider: Arc<dyn HttpProvider>,
    /// Server root, always ending with `/`
    root: String,
    /// Basic-auth user, used by [`Jenkins::me`]
    username: Option<String>,
    /// Delay between progressive log polls
    poll_interval: Duration,
    /// Fetched at most once per session
    crumb: OnceCell<CrumbHeader>,
    registry: Registry,
    fields: FieldCache,
}

impl Jenkins {
    /// Connect to `url` with basic-auth credentials.
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or the HTTP client cannot be
    /// created.
    pub fn new(
        url: impl Into<String>,
        username: impl Into<String>,
        api_token: impl Into<String>,
    ) -> Result<Self> {
        Self::builder()
            .base_url(url)
            .username(username)
            .api_token(api_token)
            .build()
    }

    /// Create a builder for advanced configuration.
    pub fn builder() -> JenkinsBuilder {
        JenkinsBuilder::default()
    }

    /// Create a session from a configuration object.
    ///
    /// # Errors
    /// Returns an error if `base_url` is missing or invalid.
    pub fn from_config(config: ClientConfig) -> Result<Self> {
        Self::builder().config(config).build()
    }

    /// Create a session from `JENKINS_*` environment variables.
    ///
    /// # Errors
    /// Returns an error if `JENKINS_URL` is missing or invalid.
    #[cfg(feature = "env")]
    pub fn from_env() -> Result<Self> {
        Self::from_config(ClientConfig::from_env()?)
    }

    /// Create a session that sends everything through `provider`.
    ///
    /// # Errors
    /// Returns an error if `root` is not an absolute HTTP(S) URL.
    pub fn from_provider(root: impl AsRef<str>, provider: Arc<dyn HttpProvider>) -> Result<Self> {
        Self::builder()
            .base_url(root.as_ref())
            .provider(provider)
            .build()
    }

    /// Server root URL, ending with `/`.
    pub fn root(&self) -> &str {
        &self.inner.root
    }

    /// User the session authenticates as, if any.
    pub fn username(&self) -> Option<&str> {
        self.inner.username.as_deref()
    }

    /// The session's type registry.
    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    /// Name of the HTTP provider in use.
    pub fn provider_name(&self) -> &'static str {
        self.inner.provider.provider_name()
    }

    pub(crate) fn field_cache(&self) -> &FieldCache {
        &self.inner.fields
    }

    pub(crate) fn poll_interval(&self) -> Duration {
        self.inner.poll_interval
    }

    /// The CSRF crumb header.
    ///
    /// Fetched from `crumbIssuer/api/json` on first use and cached for the
    /// lifetime of the session. Concurrent first callers share a single
    /// fetch. When the issuer does not exist the empty header is cached.
    ///
    /// # Errors
    /// Returns [`Error::Authentication`] if the issuer rejects the
    /// credentials. Transport errors are returned and not cached.
    pub async fn crumb(&self) -> Result<CrumbHeader> {
        self.inner
            .crumb
            .get_or_try_init(|| self.fetch_crumb())
            .await
            .cloned()
    }

    async fn fetch_crumb(&self) -> Result<CrumbHeader> {
        let url = format!("{}crumbIssuer/api/json", self.root());
        let response = self.inner.provider.send(Request::get(url)).await?;
        match response.error_for_status() {
            Ok(response) => {
                let issuer: CrumbIssuer = response.json()?;
                let crumb = CrumbHeader::new(&issuer.crumb_request_field, &issuer.crumb)?;
                log_crumb(crumb.field());
                Ok(crumb)
            }
            Err(e) if e.is_auth_failure() => {
                Err(Error::Authentication(format!("crumb issuer refused credentials: {e}")))
            }
            Err(e) => {
                debug!(error = %e, "Crumb issuer request failed");
                log_crumb(None);
                Ok(CrumbHeader::default())
            }
        }
    }

    /// Send `request` with the crumb attached and classify the status.
    ///
    /// # Errors
    /// Returns the classified error for non-success statuses, see
    /// [`Error::from_response`].
    pub async fn send(&self, mut request: Request) -> Result<Response> {
        let crumb = self.crumb().await?;
        crumb.apply(request.headers_mut());
        self.inner.provider.send(request).await?.error_for_status()
    }

    /// An item of `kind` at `url`.
    pub fn item(&self, url: impl AsRef<str>, kind: impl Into<String>) -> Item {
        Item::new(self.clone(), url, kind)
    }

    pub(crate) fn root_item(&self) -> Item {
        self.item(self.root(), "Jenkins")
    }

    /// Resolve a possibly relative server URL against the root.
    pub(crate) fn absolute_url(&self, url: &str) -> String {
        if is_absolute_url(url) {
            url.to_string()
        } else {
            format!("{}{}", self.root(), url.trim_start_matches('/'))
        }
    }

    /// Materialize the wrapper for a record carrying `_class` and `url`.
    ///
    /// # Errors
    /// Returns [`Error::UnregisteredTypeTag`] if no wrapper is registered
    /// for the record's type tag in `T`'s namespace.
    pub fn new_item<T: Materialize>(&self, record: &Value) -> Result<T> {
        let (class, url) = class_and_url(record)?;
        self.new_item_at(class, url)
    }

    /// Materialize the wrapper for `class` located at `url`.
    ///
    /// # Errors
    /// Returns [`Error::UnregisteredTypeTag`] on a registry miss.
    pub fn new_item_at<T: Materialize>(&self, class: &str, url: &str) -> Result<T> {
        let url = self.absolute_url(url);
        let (constructor, tag) = constructor_for::<T>(self.registry(), class, &url)?;
        Ok(constructor(self.item(&url, tag)))
    }

    /// URL of the job with `full_name`.
    pub fn name_to_url(&self, full_name: &str) -> String {
        name_to_url(self.root(), full_name)
    }

    /// Full name of the job at `url`.
    ///
    /// # Errors
    /// Returns [`Error::ForeignUrl`] if `url` is not under the root.
    pub fn url_to_name(&self, url: &str) -> Result<String> {
        Ok(url_to_name(self.root(), url)?)
    }

    /// Split a full name (or job URL) into its parent folder and short name.
    ///
    /// Top-level jobs resolve to the root folder.
    ///
    /// # Errors
    /// Returns [`Error::ForeignUrl`] for URLs outside the root and
    /// [`Error::InvalidArgument`] for empty names.
    pub fn resolve(&self, name_or_url: &str) -> Result<(Folder, String)> {
        let full_name = if is_absolute_url(name_or_url) {
            self.url_to_name(name_or_url)?
        } else {
            name_or_url.to_string()
        };
        validate_full_name(&full_name)?;
        let (parent, short) = split_full_name(&full_name);
        Ok((Folder::at(self, parent), short.to_string()))
    }

    /// Get the job with `full_name`, or `None` if it (or its folder) does
    /// not exist.
    pub async fn get_job(&self, full_name: &str) -> Result<Option<Job>> {
        let (folder, name) = self.resolve(full_name)?;
        if !folder.exists().await? {
            return Ok(None);
        }
        folder.get(&name).await
    }

    async fn require_job(&self, full_name: &str) -> Result<Job> {
        self.get_job(full_name)
            .await?
            .ok_or_else(|| Error::NotFound(format!("No such job: {full_name}")))
    }

    /// Create a job from its configuration XML.
    ///
    /// With `recursive`, missing parent folders are created first as
    /// empty folders.
    pub async fn create_job(&self, full_name: &str, xml: &str, recursive: bool) -> Result<()> {
        let (folder, name) = self.resolve(full_name)?;
        if recursive {
            let mut missing = Vec::new();
            let mut current = folder.clone();
            while !current.is_root() && !current.exists().await? {
                let parent = current.parent()?;
                missing.push(current);
                current = parent;
            }
            for folder in missing.iter().rev() {
                let (parent, short) = self.resolve(&folder.full_name()?)?;
                debug!(folder = %folder.url(), "Creating missing parent folder");
                parent
                    .create(&short, EMPTY_FOLDER_XML)
                    .await
                    .map_err(|e| e.context(format!("Failed to create folder '{short}'")))?;
            }
        }
        folder.create(&name, xml).await
    }

    /// Walk the job tree from the root, `depth` folder levels deep.
    ///
    /// The whole tree is fetched in one request; jobs are materialized
    /// lazily in depth-first pre-order as the iterator is consumed.
    pub async fn iter_jobs(&self, depth: usize) -> Result<JobIter> {
        Folder::at(self, "").iter(depth).await
    }

    /// Copy `full_name` to `dest` in the same folder.
    pub async fn copy_job(&self, full_name: &str, dest: &str) -> Result<()> {
        let (folder, name) = self.resolve(full_name)?;
        folder.copy(&name, dest).await
    }

    /// Delete the job if it exists.
    pub async fn delete_job(&self, full_name: &str) -> Result<()> {
        if let Some(job) = self.get_job(full_name).await? {
            job.delete().await?;
        }
        Ok(())
    }

    /// Trigger a build. See [`crate::resources::Project::build`].
    ///
    /// # Errors
    /// Returns [`Error::NotFound`] if the job does not exist and
    /// [`Error::InvalidArgument`] if it is a folder.
    pub async fn build_job(&self, full_name: &str, params: &[(&str, &str)]) -> Result<QueueItem> {
        let job = self.require_job(full_name).await?;
        match job.as_project() {
            Some(project) => project.build(params).await,
            None => Err(Error::InvalidArgument(format!(
                "{full_name} is a {}, not a buildable project",
                job.item().kind()
            ))),
        }
    }

    /// Rename a job, returning it at its new location.
    pub async fn rename_job(&self, full_name: &str, new_name: &str) -> Result<Job> {
        self.require_job(full_name).await?.rename(new_name).await
    }

    /// Move a job to another folder, returning it at its new location.
    pub async fn move_job(&self, full_name: &str, new_full_name: &str) -> Result<Job> {
        self.require_job(full_name).await?.move_to(new_full_name).await
    }

    /// Create a copy of a job anywhere in the tree.
    pub async fn duplicate_job(&self, full_name: &str, new_name: &str, recursive: bool) -> Result<()> {
        self.require_job(full_name)
            .await?
            .duplicate(new_name, recursive)
            .await
    }

    /// Ask the server whether `name` is a legal job name.
    pub async fn is_name_safe(&self, name: &str) -> Result<bool> {
        let item = self.root_item();
        let response = self
            .send(item.request(Method::GET, "checkJobName").query("value", name))
            .await?;
        Ok(!response.text().contains("is an unsafe character"))
    }

    /// Lint a declarative Jenkinsfile; returns the server's verdict.
    pub async fn validate_jenkinsfile(&self, content: &str) -> Result<String> {
        let item = self.root_item();
        let response = self
            .send(
                item.request(Method::POST, "pipeline-model-converter/validate")
                    .form([("jenkinsfile", content)]),
            )
            .await?;
        Ok(response.text())
    }

    /// Server version from the `X-Jenkins` header.
    pub async fn version(&self) -> Result<String> {
        let response = self.send(Request::get(self.root())).await?;
        response
            .header("X-Jenkins")
            .map(str::to_string)
            .ok_or_else(|| Error::missing_field("X-Jenkins", self.root()))
    }

    /// Whether the server is up. A server rejecting our credentials is up.
    pub async fn exists(&self) -> bool {
        match self.send(Request::get(self.root())).await {
            Ok(_) => true,
            Err(e) => e.is_auth_failure(),
        }
    }

    /// The build queue.
    pub fn queue(&self) -> Queue {
        Queue::new(self.item(format!("{}queue/", self.root()), "Queue"))
    }

    /// Agents and the built-in node.
    pub fn nodes(&self) -> Nodes {
        Nodes::new(self.item(format!("{}computer/", self.root()), "Nodes"))
    }

    /// The system credential store.
    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.item(format!("{}credentials/store/system/", self.root()), "Credentials"))
    }

    /// Plugin management.
    pub fn plugins(&self) -> PluginManager {
        PluginManager::new(self.item(format!("{}pluginManager/", self.root()), "PluginManager"))
    }

    /// Views of the main page.
    pub fn views(&self) -> Views {
        Views::new(self.root_item())
    }

    /// Known users.
    pub fn users(&self) -> Users {
        Users::new(self.item(format!("{}asynchPeople/", self.root()), "Users"))
    }

    /// Restart, shutdown and script console.
    pub fn system(&self) -> System {
        System::new(self.item(self.root(), "System"))
    }

    /// The authenticated user, if the session has one.
    pub fn me(&self) -> Option<User> {
        self.username()
            .map(|name| User::new(self.item(format!("{}user/{name}/", self.root()), "User")))
    }
}

impl fmt::Debug for Jenkins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Jenkins")
            .field("root", &self.inner.root)
            .field("provider", &self.inner.provider.provider_name())
            .finish()
    }
}

impl fmt::Display for Jenkins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Jenkins: {}>", self.inner.root)
    }
}

impl PartialEq for Jenkins {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Jenkins {}

/// Builder for [`Jenkins`].
#[derive(Default)]
pub struct JenkinsBuilder {
    config: ClientConfig,
    provider: Option<Arc<dyn HttpProvider>>,
    registry: Registry,
}

impl JenkinsBuilder {
    /// Set the server root URL.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = Some(base_url.into());
        self
    }

    /// Set the basic-auth user.
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.config.username = Some(username.into());
        self
    }

    /// Set the basic-auth API token (or password).
    pub fn api_token(mut self, api_token: impl Into<String>) -> Self {
        self.config.api_token = Some(secrecy::SecretString::new(
            api_token.into().into_boxed_str(),
        ));
        self
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Route requests through an HTTP proxy.
    pub fn proxy(mut self, proxy: impl Into<String>) -> Self {
        self.config.proxy = Some(proxy.into());
        self
    }

    /// Accept invalid TLS certificates.
    pub fn accept_invalid_certs(mut self, accept: bool) -> Self {
        self.config.accept_invalid_certs = accept;
        self
    }

    /// Delay between progressive log polls.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval;
        self
    }

    /// Add a header sent with every request.
    ///
    /// # Errors
    /// Returns an error if the header name or value is invalid.
    pub fn default_header(mut self, key: &str, value: &str) -> Result<Self> {
        let name = key
            .parse::<HeaderName>()
            .map_err(|e| Error::InvalidHeaderName(format!("'{key}': {e}")))?;
        let value = value
            .parse::<HeaderValue>()
            .map_err(|e| Error::InvalidHeaderValue(format!("'{value}': {e}")))?;
        self.config.default_headers.insert(name, value);
        Ok(self)
    }

    /// Merge a configuration object; its set fields win.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = self.config.merge(config);
        self
    }

    /// Use a custom HTTP provider instead of the `reqwest` one.
    pub fn provider(mut self, provider: Arc<dyn HttpProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Register a job wrapper for a plugin-provided type tag.
    pub fn register_job(self, tag: impl Into<String>, constructor: Constructor<Job>) -> Self {
        self.registry.register_job(tag, constructor);
        self
    }

    /// Register a build wrapper for a plugin-provided type tag.
    pub fn register_build(self, tag: impl Into<String>, constructor: Constructor<Build>) -> Self {
        self.registry.register_build(tag, constructor);
        self
    }

    /// Register a node wrapper for a plugin-provided type tag.
    pub fn register_node(self, tag: impl Into<String>, constructor: Constructor<Node>) -> Self {
        self.registry.register_node(tag, constructor);
        self
    }

    /// Register a view wrapper for a plugin-provided type tag.
    pub fn register_view(self, tag: impl Into<String>, constructor: Constructor<View>) -> Self {
        self.registry.register_view(tag, constructor);
        self
    }

    /// Register a queue item wrapper for a plugin-provided type tag.
    pub fn register_queue_item(
        self,
        tag: impl Into<String>,
        constructor: Constructor<QueueItem>,
    ) -> Self {
        self.registry.register_queue_item(tag, constructor);
        self
    }

    /// Build the session.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No base URL is configured
    /// - The base URL is not an absolute HTTP(S) URL
    /// - HTTP client creation fails
    pub fn build(self) -> Result<Jenkins> {
        let base_url = self.config.base_url.clone().ok_or_else(|| {
            Error::MissingConfig("base URL (set JENKINS_URL or call base_url)".to_string())
        })?;
        let root = validate_root(&base_url)?;

        let provider = match self.provider {
            Some(provider) => provider,
            None => Arc::new(ReqwestHttpProvider::from_config(&self.config)?),
        };

        debug!(root = %root, provider = provider.provider_name(), "Created Jenkins session");

        Ok(Jenkins {
            inner: Arc::new(JenkinsInner {
                provider,
                root,
                username: self.config.username,
                poll_interval: self.config.poll_interval,
                crumb: OnceCell::new(),
                registry: self.registry,
                fields: FieldCache::default(),
            }),
        })
    }
}

fn validate_root(base_url: &str) -> Result<String> {
    if base_url.trim().is_empty() {
        return Err(Error::InvalidUrl("Base URL cannot be empty".to_string()));
    }
    let parsed: Url = base_url
        .parse()
        .map_err(|e| Error::InvalidUrl(format!("{base_url}: {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(append_slash(base_url)),
        scheme => Err(Error::InvalidUrl(format!(
            "Invalid URL scheme '{scheme}'. Only 'http' and 'https' are supported."
        ))),
    }
}
