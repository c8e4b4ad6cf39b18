//! Credential stores, domains and credentials

use http::Method;
use serde_json::{Map, Value};
use tracing::info;

use crate::{
    capabilities::{Configurable, Deletable},
    error::Result,
    item::Item,
};

/// Name of the domain every store has.
pub const GLOBAL_DOMAIN: &str = "_";

/// A credential store (system-wide or owned by a folder).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    item: Item,
}

impl Credentials {
    pub(crate) fn new(item: Item) -> Self {
        Self { item }
    }

    fn domain_at(&self, key: &str) -> Domain {
        let url = self.item.endpoint(&format!("domain/{key}/"));
        Domain {
            item: self.item.jenkins().item(url, "Domain"),
        }
    }

    /// Domain keys. The response is an object keyed by domain name.
    async fn domain_keys(&self) -> Result<Vec<String>> {
        let mut data = self.item.fetch_json("domains[urlName]", 0).await?;
        let domains = match data.get_mut("domains").map(Value::take) {
            Some(Value::Object(domains)) => domains,
            _ => Map::new(),
        };
        Ok(domains.into_iter().map(|(key, _)| key).collect())
    }

    /// Domain with key `name`.
    pub async fn get(&self, name: &str) -> Result<Option<Domain>> {
        Ok(self
            .domain_keys()
            .await?
            .iter()
            .find(|key| *key == name)
            .map(|key| self.domain_at(key)))
    }

    /// Every domain of the store.
    pub async fn iter(&self) -> Result<Vec<Domain>> {
        Ok(self
            .domain_keys()
            .await?
            .iter()
            .map(|key| self.domain_at(key))
            .collect())
    }

    /// Create a domain from its XML description.
    pub async fn create(&self, xml: &str) -> Result<()> {
        self.item
            .send(self.item.request(Method::POST, "createDomain").xml(xml))
            .await?;
        info!(store = %self.item.url(), "Created credential domain");
        Ok(())
    }

    /// The global (`_`) domain.
    pub async fn global_domain(&self) -> Result<Option<Domain>> {
        self.get(GLOBAL_DOMAIN).await
    }
}

remote_item!(Credentials);

/// A credential domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Domain {
    item: Item,
}

impl Domain {
    fn credential_at(&self, id: &str) -> Credential {
        let url = self.item.endpoint(&format!("credential/{id}/"));
        Credential {
            item: self.item.jenkins().item(url, "Credential"),
        }
    }

    async fn credential_ids(&self) -> Result<Vec<String>> {
        let data = self.item.fetch_json("credentials[id]", 0).await?;
        Ok(data
            .get("credentials")
            .and_then(Value::as_array)
            .map(|credentials| {
                credentials
                    .iter()
                    .filter_map(|c| c.get("id").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default())
    }

    /// Credential with `id`.
    pub async fn get(&self, id: &str) -> Result<Option<Credential>> {
        Ok(self
            .credential_ids()
            .await?
            .iter()
            .find(|candidate| *candidate == id)
            .map(|id| self.credential_at(id)))
    }

    /// Every credential in the domain.
    pub async fn iter(&self) -> Result<Vec<Credential>> {
        Ok(self
            .credential_ids()
            .await?
            .iter()
            .map(|id| self.credential_at(id))
            .collect())
    }

    /// Create a credential from its XML description.
    pub async fn create(&self, xml: &str) -> Result<()> {
        self.item
            .send(self.item.request(Method::POST, "createCredentials").xml(xml))
            .await?;
        info!(domain = %self.item.url(), "Created credential");
        Ok(())
    }
}

remote_item!(Domain);

impl Configurable for Domain {}
impl Deletable for Domain {}

/// One stored credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    item: Item,
}

remote_item!(Credential);

impl Configurable for Credential {}
impl Deletable for Credential {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Jenkins;
    use crate::item::RemoteItem;

    #[test]
    fn test_domain_and_credential_urls() {
        let jenkins = Jenkins::builder().base_url("http://ci/").build().unwrap();
        let store = jenkins.credentials();
        let domain = store.domain_at(GLOBAL_DOMAIN);
        assert_eq!(domain.url(), "http://ci/credentials/store/system/domain/_/");
        assert_eq!(
            domain.credential_at("deploy-key").url(),
            "http://ci/credentials/store/system/domain/_/credential/deploy-key/"
        );
    }
}
