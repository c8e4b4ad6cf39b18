//! Operations shared by several kinds of item
//!
//! Each trait is a single endpoint family. Wrappers opt in by implementing
//! the empty trait; the provided methods do the work through
//! [`RemoteItem::item`].

use async_trait::async_trait;
use http::Method;

use crate::error::Result;
use crate::item::RemoteItem;

/// Items removed with `POST doDelete`.
#[async_trait]
pub trait Deletable: RemoteItem {
    /// Delete the item on the server.
    async fn delete(&self) -> Result<()> {
        self.item().post("doDelete").await?;
        Ok(())
    }
}

/// Items configured through `config.xml`.
#[async_trait]
pub trait Configurable: RemoteItem {
    /// Current configuration XML.
    async fn configure(&self) -> Result<String> {
        self.item().get_text("config.xml").await
    }

    /// Replace the configuration with `xml`.
    async fn update_config(&self, xml: &str) -> Result<()> {
        let item = self.item();
        item.send(item.request(Method::POST, "config.xml").xml(xml))
            .await?;
        Ok(())
    }
}

/// Items with an editable description.
#[async_trait]
pub trait Describable: RemoteItem {
    /// Set the description shown on the item's page.
    async fn set_description(&self, text: &str) -> Result<()> {
        let item = self.item();
        item.send(
            item.request(Method::POST, "submitDescription")
                .query("description", text),
        )
        .await?;
        Ok(())
    }
}

/// Items that can be switched on and off.
#[async_trait]
pub trait Enableable: RemoteItem {
    /// `POST enable`
    async fn enable(&self) -> Result<()> {
        self.item().post("enable").await?;
        Ok(())
    }

    /// `POST disable`
    async fn disable(&self) -> Result<()> {
        self.item().post("disable").await?;
        Ok(())
    }
}

/// Items with a Groovy script console.
#[async_trait]
pub trait ScriptRunner: RemoteItem {
    /// Run `script` and return its output.
    async fn run_script(&self, script: &str) -> Result<String> {
        let item = self.item();
        let response = item
            .send(
                item.request(Method::POST, "scriptText")
                    .form([("script", script)]),
            )
            .await?;
        Ok(response.text())
    }
}
