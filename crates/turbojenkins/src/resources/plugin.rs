//! Plugin management and the update center

use std::time::Duration;

use http::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::{
    error::{Error, Result},
    item::Item,
};

/// Delay between installation status checks of a blocking install.
const INSTALL_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Proxy the server uses to reach update sites.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxySettings {
    /// Proxy host
    pub name: String,
    /// Proxy port
    pub port: u16,
    /// Proxy user
    pub user_name: String,
    /// Proxy password
    pub password: String,
    /// Hosts reached directly, one pattern per line
    pub no_proxy_host: String,
    /// URL used to validate the proxy
    pub test_url: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PluginRecord {
    short_name: String,
}

#[derive(Deserialize)]
struct PluginList {
    #[serde(default)]
    plugins: Vec<PluginRecord>,
}

/// The plugin manager at `{root}pluginManager/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginManager {
    item: Item,
}

impl PluginManager {
    pub(crate) fn new(item: Item) -> Self {
        Self { item }
    }

    fn plugin_at(&self, short_name: &str) -> Plugin {
        let url = self.item.endpoint(&format!("plugin/{short_name}/"));
        Plugin {
            item: self.item.jenkins().item(url, "Plugin"),
        }
    }

    async fn short_names(&self) -> Result<Vec<String>> {
        let list: PluginList = self.item.fetch_as("plugins[shortName]", 0).await?;
        Ok(list.plugins.into_iter().map(|p| p.short_name).collect())
    }

    /// Installed plugin with `short_name`.
    pub async fn get(&self, short_name: &str) -> Result<Option<Plugin>> {
        Ok(self
            .short_names()
            .await?
            .iter()
            .find(|name| *name == short_name)
            .map(|name| self.plugin_at(name)))
    }

    /// Every installed plugin.
    pub async fn iter(&self) -> Result<Vec<Plugin>> {
        Ok(self
            .short_names()
            .await?
            .iter()
            .map(|name| self.plugin_at(name))
            .collect())
    }

    /// Install plugins by short name, optionally pinned as `name@version`.
    ///
    /// With `block`, waits until the update center reports no pending
    /// installation.
    pub async fn install(&self, names: &[&str], block: bool) -> Result<()> {
        self.item
            .send(
                self.item
                    .request(Method::POST, "installNecessaryPlugins")
                    .xml(install_xml(names)),
            )
            .await?;
        info!(plugins = ?names, "Requested plugin installation");

        let update_center = self.update_center();
        while block && !update_center.installation_done().await? {
            debug!("Plugin installation pending");
            tokio::time::sleep(INSTALL_POLL_INTERVAL).await;
        }
        Ok(())
    }

    /// Uninstall plugins by short name.
    pub async fn uninstall(&self, names: &[&str]) -> Result<()> {
        for name in names {
            self.plugin_at(name).uninstall().await?;
        }
        Ok(())
    }

    /// Point the server at another update site and refresh it.
    pub async fn set_site(&self, url: &str) -> Result<()> {
        self.item
            .send(
                self.item
                    .request(Method::POST, "siteConfigure")
                    .query("site", url),
            )
            .await?;
        self.check_updates_server().await
    }

    /// Refresh the update site metadata.
    pub async fn check_updates_server(&self) -> Result<()> {
        self.item.post("checkUpdatesServer").await?;
        Ok(())
    }

    /// Configure the proxy used for update sites.
    pub async fn set_proxy(&self, settings: &ProxySettings) -> Result<()> {
        let payload = serde_json::to_string(settings)?;
        self.item
            .send(
                self.item
                    .request(Method::POST, "proxyConfigure")
                    .form([("json", payload)]),
            )
            .await?;
        Ok(())
    }

    /// The update center.
    pub fn update_center(&self) -> UpdateCenter {
        let jenkins = self.item.jenkins();
        UpdateCenter {
            item: jenkins.item(format!("{}updateCenter/", jenkins.root()), "UpdateCenter"),
        }
    }

    /// See [`UpdateCenter::site`].
    pub async fn site(&self) -> Result<Option<String>> {
        self.update_center().site().await
    }

    /// See [`UpdateCenter::restart_required`].
    pub async fn restart_required(&self) -> Result<bool> {
        self.update_center().restart_required().await
    }

    /// See [`UpdateCenter::installation_done`].
    pub async fn installation_done(&self) -> Result<bool> {
        self.update_center().installation_done().await
    }
}

remote_item!(PluginManager);

fn escape_attribute(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// `<jenkins><install plugin="name@version"/>...</jenkins>`; unpinned
/// names get `@latest`.
fn install_xml(names: &[&str]) -> String {
    let mut xml = String::from("<jenkins>");
    for name in names {
        let spec = if name.contains('@') {
            (*name).to_string()
        } else {
            format!("{name}@latest")
        };
        xml.push_str(&format!("<install plugin=\"{}\"/>", escape_attribute(&spec)));
    }
    xml.push_str("</jenkins>");
    xml
}

/// One installed plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plugin {
    item: Item,
}

impl Plugin {
    /// Uninstall the plugin; takes effect after a restart.
    pub async fn uninstall(&self) -> Result<()> {
        self.item.post("doUninstall").await?;
        info!(plugin = %self.item.url(), "Uninstalled plugin");
        Ok(())
    }
}

remote_item!(Plugin);

/// The update center at `{root}updateCenter/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateCenter {
    item: Item,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct InstallJob {
    #[serde(default)]
    install_status: Option<String>,
}

#[derive(Deserialize)]
struct InstallData {
    #[serde(default)]
    jobs: Vec<InstallJob>,
}

#[derive(Deserialize)]
struct InstallStatus {
    data: InstallData,
}

impl UpdateCenter {
    /// Whether no plugin installation is pending.
    pub async fn installation_done(&self) -> Result<bool> {
        let status: InstallStatus = self
            .item
            .send(self.item.request(Method::GET, "installStatus"))
            .await?
            .json()?;
        Ok(status
            .data
            .jobs
            .iter()
            .all(|job| job.install_status.as_deref() != Some("Pending")))
    }

    /// Whether a restart is needed to finish installations.
    pub async fn restart_required(&self) -> Result<bool> {
        Ok(self
            .item
            .fetch_field("restartRequiredForCompletion")
            .await?
            .as_bool()
            .unwrap_or(false))
    }

    /// URL of the first update site.
    pub async fn site(&self) -> Result<Option<String>> {
        let sites = self.item.fetch_field_tree("sites", "url").await?;
        let sites = sites
            .as_array()
            .ok_or_else(|| Error::missing_field("sites", self.item.url()))?;
        Ok(sites
            .first()
            .and_then(|site| site.get("url"))
            .and_then(Value::as_str)
            .map(str::to_string))
    }
}

remote_item!(UpdateCenter);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_xml_pins_latest() {
        assert_eq!(
            install_xml(&["git", "workflow-aggregator@2.6"]),
            "<jenkins><install plugin=\"git@latest\"/><install plugin=\"workflow-aggregator@2.6\"/></jenkins>"
        );
    }

    #[test]
    fn test_install_xml_escapes() {
        assert!(install_xml(&["a\"b"]).contains("a&quot;b@latest"));
    }

    #[test]
    fn test_proxy_settings_field_names() {
        let value = serde_json::to_value(ProxySettings {
            name: "proxy".into(),
            port: 3128,
            no_proxy_host: "localhost".into(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(value["noProxyHost"], "localhost");
        assert_eq!(value["userName"], "");
        assert_eq!(value["port"], 3128);
    }
}
