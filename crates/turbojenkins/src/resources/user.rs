//! Users and their API tokens

use http::Method;
use serde::Deserialize;
use tracing::info;

use crate::{error::Result, item::Item};

const API_TOKEN_DESCRIPTOR: &str = "descriptorByName/jenkins.security.ApiTokenProperty";

/// A freshly generated API token. The value is only shown once.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiToken {
    /// Token name
    #[serde(rename = "tokenName")]
    pub name: String,
    /// Id used to revoke the token
    #[serde(rename = "tokenUuid")]
    pub uuid: String,
    /// Secret value
    #[serde(rename = "tokenValue")]
    pub value: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    data: ApiToken,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserRecord {
    id: String,
    absolute_url: String,
}

#[derive(Deserialize)]
struct UserEntry {
    user: UserRecord,
}

#[derive(Deserialize)]
struct UserList {
    #[serde(default)]
    users: Vec<UserEntry>,
}

/// Known users, at `{root}asynchPeople/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Users {
    item: Item,
}

impl Users {
    pub(crate) fn new(item: Item) -> Self {
        Self { item }
    }

    async fn records(&self) -> Result<Vec<UserRecord>> {
        let list: UserList = self
            .item
            .fetch_as("users[user[id,absoluteUrl]]", 0)
            .await?;
        Ok(list.users.into_iter().map(|entry| entry.user).collect())
    }

    /// User with `id`.
    pub async fn get(&self, id: &str) -> Result<Option<User>> {
        let jenkins = self.item.jenkins();
        Ok(self
            .records()
            .await?
            .into_iter()
            .find(|record| record.id == id)
            .map(|record| User::new(jenkins.item(record.absolute_url, "User"))))
    }

    /// Every known user.
    pub async fn iter(&self) -> Result<Vec<User>> {
        let jenkins = self.item.jenkins();
        Ok(self
            .records()
            .await?
            .into_iter()
            .map(|record| User::new(jenkins.item(record.absolute_url, "User")))
            .collect())
    }
}

remote_item!(Users);

/// One user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    item: Item,
}

impl User {
    pub(crate) fn new(item: Item) -> Self {
        Self { item }
    }

    /// Generate an API token named `name`.
    pub async fn generate_token(&self, name: &str) -> Result<ApiToken> {
        let response: TokenResponse = self
            .item
            .send(
                self.item
                    .request(Method::POST, &format!("{API_TOKEN_DESCRIPTOR}/generateNewToken"))
                    .query("newTokenName", name),
            )
            .await?
            .json()?;
        info!(user = %self.item.url(), token = %response.data.name, "Generated API token");
        Ok(response.data)
    }

    /// Revoke the token with `uuid`.
    pub async fn revoke_token(&self, uuid: &str) -> Result<()> {
        self.item
            .send(
                self.item
                    .request(Method::POST, &format!("{API_TOKEN_DESCRIPTOR}/revoke"))
                    .query("tokenUuid", uuid),
            )
            .await?;
        Ok(())
    }
}

remote_item!(User);

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_token_response_parses() {
        let response: TokenResponse = serde_json::from_value(json!({
            "status": "ok",
            "data": {"tokenName": "ci", "tokenUuid": "u-1", "tokenValue": "11aa"}
        }))
        .unwrap();
        assert_eq!(
            response.data,
            ApiToken {
                name: "ci".into(),
                uuid: "u-1".into(),
                value: "11aa".into()
            }
        );
    }
}
