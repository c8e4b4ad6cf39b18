//! Server lifecycle and the script console

use tracing::warn;

use crate::{capabilities::ScriptRunner, error::Result, item::Item};

/// Restart, shutdown and quiet-down controls of the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct System {
    item: Item,
}

impl System {
    pub(crate) fn new(item: Item) -> Self {
        Self { item }
    }

    async fn lifecycle(&self, entry: &str) -> Result<()> {
        warn!(server = %self.item.url(), action = entry, "Sending lifecycle request");
        self.item.post(entry).await?;
        Ok(())
    }

    /// Restart immediately.
    pub async fn restart(&self) -> Result<()> {
        self.lifecycle("restart").await
    }

    /// Restart once running builds finish.
    pub async fn safe_restart(&self) -> Result<()> {
        self.lifecycle("safeRestart").await
    }

    /// Shut down immediately.
    pub async fn exit(&self) -> Result<()> {
        self.lifecycle("exit").await
    }

    /// Shut down once running builds finish.
    pub async fn safe_exit(&self) -> Result<()> {
        self.lifecycle("safeExit").await
    }

    /// Stop starting new builds.
    pub async fn quiet_down(&self) -> Result<()> {
        self.lifecycle("quietDown").await
    }

    /// Resume starting builds.
    pub async fn cancel_quiet_down(&self) -> Result<()> {
        self.lifecycle("cancelQuietDown").await
    }
}

remote_item!(System);

impl ScriptRunner for System {}
