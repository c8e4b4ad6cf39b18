//! Base item shared by every remote resource wrapper
//!
//! An [`Item`] is a URL on a Jenkins server plus the session that reaches
//! it. It knows how to fetch its own `api/json`, optionally projected with
//! `tree=` and expanded with `depth=`, and how to read scalar fields by
//! snake_case name without a hand-written accessor per field.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use http::Method;
use parking_lot::{Mutex, RwLock};
use serde::de::DeserializeOwned;
use serde_json::Value;
use turbojenkins_core::{append_slash, camel_to_snake, snake_to_camel};

use crate::client::Jenkins;
use crate::error::{Error, Result};
use crate::http::{Request, Response};

/// Snake_case names of the scalar fields a wrapper kind exposes.
pub type FieldNames = Arc<BTreeSet<String>>;

/// A remote resource: absolute URL, owning session and wrapper kind.
///
/// Two items are equal when they have the same kind and the same URL.
#[derive(Clone)]
pub struct Item {
    jenkins: Jenkins,
    url: String,
    kind: String,
}

impl Item {
    /// Create an item. The URL is normalised to end with `/`.
    pub fn new(jenkins: Jenkins, url: impl AsRef<str>, kind: impl Into<String>) -> Self {
        Self {
            jenkins,
            url: append_slash(url.as_ref()),
            kind: kind.into(),
        }
    }

    /// The owning session.
    pub fn jenkins(&self) -> &Jenkins {
        &self.jenkins
    }

    /// Absolute URL, always ending with `/`.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Wrapper kind, normally the type tag of the server's `_class`.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Same kind, different location.
    pub fn with_url(&self, url: impl AsRef<str>) -> Self {
        Self::new(self.jenkins.clone(), url, self.kind.clone())
    }

    /// Full job name of this item, relative to the session root.
    ///
    /// # Errors
    /// Returns [`Error::ForeignUrl`] if the item is not under the root.
    pub fn full_name(&self) -> Result<String> {
        self.jenkins.url_to_name(&self.url)
    }

    /// Absolute URL of `entry` below this item.
    pub fn endpoint(&self, entry: &str) -> String {
        format!("{}{}", self.url, entry)
    }

    /// Start a request against `entry` below this item.
    pub fn request(&self, method: Method, entry: &str) -> Request {
        Request::new(method, self.endpoint(entry))
    }

    /// Send a request through the session (crumb attached, status classified).
    pub async fn send(&self, request: Request) -> Result<Response> {
        self.jenkins.send(request).await
    }

    /// `POST` to `entry` with no body.
    pub async fn post(&self, entry: &str) -> Result<Response> {
        self.send(self.request(Method::POST, entry)).await
    }

    /// `GET` `entry` and return the body as text.
    pub async fn get_text(&self, entry: &str) -> Result<String> {
        Ok(self.send(self.request(Method::GET, entry)).await?.text())
    }

    /// Fetch `api/json`, projected to `tree` (if non-empty) at `depth`.
    ///
    /// The projection syntax is passed to the server verbatim.
    pub async fn fetch_json(&self, tree: &str, depth: u32) -> Result<Value> {
        self.fetch_as(tree, depth).await
    }

    /// Like [`fetch_json`](Self::fetch_json), deserialized into `T`.
    pub async fn fetch_as<T: DeserializeOwned>(&self, tree: &str, depth: u32) -> Result<T> {
        let mut request = self.request(Method::GET, "api/json").query("depth", depth);
        if !tree.is_empty() {
            request = request.query("tree", tree);
        }
        self.send(request).await?.json()
    }

    /// Fetch a single top-level field of `api/json`.
    pub(crate) async fn fetch_field(&self, field: &str) -> Result<Value> {
        let mut data = self.fetch_json(field, 0).await?;
        Ok(data
            .get_mut(field)
            .map(Value::take)
            .unwrap_or(Value::Null))
    }

    /// Fetch `field[subtree]` and return the field, `Null` if absent.
    pub(crate) async fn fetch_field_tree(&self, field: &str, subtree: &str) -> Result<Value> {
        let mut data = self.fetch_json(&format!("{field}[{subtree}]"), 0).await?;
        Ok(data
            .get_mut(field)
            .map(Value::take)
            .unwrap_or(Value::Null))
    }

    /// Fetch `api/xml`, projected to `tree` if non-empty.
    pub async fn api_xml(&self, tree: &str) -> Result<String> {
        let mut request = self.request(Method::GET, "api/xml");
        if !tree.is_empty() {
            request = request.query("tree", tree);
        }
        Ok(self.send(request).await?.text())
    }

    /// Whether the item exists.
    ///
    /// Only a not-found response means `false`; any other failure, such
    /// as a permission error, is returned as an error.
    pub async fn exists(&self) -> Result<bool> {
        match self.fetch_json("_class", 0).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Names of the scalar fields this item's kind exposes.
    ///
    /// Computed from the first instance of the kind that asks and shared
    /// by every instance of the kind in the session.
    pub async fn field_names(&self) -> Result<FieldNames> {
        let entry = self.jenkins.field_cache().entry(&self.kind);
        entry.get_or_init(|| self.scan_field_names()).await
    }

    /// Read a scalar field by snake_case name, e.g. `next_build_number`.
    ///
    /// The value is always fetched fresh; only the set of names is cached.
    /// A name missing from the cached set triggers one re-scan from this
    /// instance before [`Error::UnknownField`] is returned.
    pub async fn get_field(&self, name: &str) -> Result<Value> {
        let mut names = self.field_names().await?;
        if !names.contains(name) {
            let entry = self.jenkins.field_cache().entry(&self.kind);
            names = entry.refresh(&names, || self.scan_field_names()).await?;
        }
        if !names.contains(name) {
            return Err(Error::UnknownField {
                kind: self.kind.clone(),
                name: name.to_string(),
            });
        }
        self.fetch_field(&snake_to_camel(name)).await
    }

    /// Read a field and deserialize it.
    pub async fn get_field_as<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        let value = self.get_field(name).await?;
        serde_json::from_value(value).map_err(|e| {
            Error::ResponseValidation(format!("field '{name}' of {}: {e}", self.url))
        })
    }

    async fn scan_field_names(&self) -> Result<BTreeSet<String>> {
        let data = self.fetch_json("", 0).await?;
        let object = data
            .as_object()
            .ok_or_else(|| Error::ResponseValidation(format!("{} is not a JSON object", self.url)))?;
        Ok(object
            .iter()
            .filter(|(_, v)| is_scalar(v))
            .map(|(k, _)| camel_to_snake(k))
            .collect())
    }
}

fn is_scalar(value: &Value) -> bool {
    matches!(
        value,
        Value::String(_) | Value::Number(_) | Value::Bool(_) | Value::Null
    )
}

impl PartialEq for Item {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.url == other.url
    }
}

impl Eq for Item {}

impl std::hash::Hash for Item {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        self.url.hash(state);
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}: {}>", self.kind, self.url)
    }
}

impl fmt::Debug for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Item")
            .field("kind", &self.kind)
            .field("url", &self.url)
            .finish()
    }
}

/// Anything backed by an [`Item`].
///
/// Provided methods forward to the item so every wrapper gets them.
#[async_trait]
pub trait RemoteItem: Send + Sync {
    /// The underlying item.
    fn item(&self) -> &Item;

    /// Absolute URL.
    fn url(&self) -> &str {
        self.item().url()
    }

    /// Wrapper kind.
    fn kind(&self) -> &str {
        self.item().kind()
    }

    /// See [`Item::fetch_json`].
    async fn fetch_json(&self, tree: &str, depth: u32) -> Result<Value> {
        self.item().fetch_json(tree, depth).await
    }

    /// See [`Item::exists`].
    async fn exists(&self) -> Result<bool> {
        self.item().exists().await
    }

    /// See [`Item::get_field`].
    async fn get_field(&self, name: &str) -> Result<Value> {
        self.item().get_field(name).await
    }
}

impl RemoteItem for Item {
    fn item(&self) -> &Item {
        self
    }
}

/// Session-wide cache of field names, keyed by wrapper kind.
#[derive(Debug, Default)]
pub(crate) struct FieldCache {
    kinds: Mutex<HashMap<String, Arc<KindFields>>>,
}

impl FieldCache {
    pub(crate) fn entry(&self, kind: &str) -> Arc<KindFields> {
        Arc::clone(self.kinds.lock().entry(kind.to_string()).or_default())
    }
}

/// Single-flight slot for one kind's field names.
#[derive(Debug, Default)]
pub(crate) struct KindFields {
    cached: RwLock<Option<FieldNames>>,
    resolve_lock: tokio::sync::Mutex<()>,
}

impl KindFields {
    /// Return the cached names, or compute them exactly once even when
    /// several callers race on first access.
    pub(crate) async fn get_or_init<F, Fut>(&self, scan: F) -> Result<FieldNames>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<BTreeSet<String>>>,
    {
        if let Some(names) = self.cached_names() {
            return Ok(names);
        }

        let _guard = self.resolve_lock.lock().await;
        if let Some(names) = self.cached_names() {
            return Ok(names);
        }

        let names: FieldNames = Arc::new(scan().await?);
        *self.cached.write() = Some(Arc::clone(&names));
        Ok(names)
    }

    fn cached_names(&self) -> Option<FieldNames> {
        self.cached.read().clone()
    }

    /// Re-scan after a lookup in `seen` missed.
    ///
    /// If another caller already replaced `seen` while this one waited for
    /// the lock, that newer set is returned without scanning, so concurrent
    /// misses cost one scan. A scan is merged into the cached set so that
    /// instances of one kind with different fields do not evict each other.
    pub(crate) async fn refresh<F, Fut>(&self, seen: &FieldNames, scan: F) -> Result<FieldNames>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<BTreeSet<String>>>,
    {
        let _guard = self.resolve_lock.lock().await;
        if let Some(current) = self.cached_names() {
            if !Arc::ptr_eq(&current, seen) {
                return Ok(current);
            }
        }

        let mut merged = scan().await?;
        if let Some(current) = self.cached_names() {
            merged.extend(current.iter().cloned());
        }
        let names: FieldNames = Arc::new(merged);
        *self.cached.write() = Some(Arc::clone(&names));
        Ok(names)
    }
}
