use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;

pub mod bridge;

pub use bridge::BridgeTransport;

/// Capability set the dispatch loop needs from a messaging backend.
///
/// The backend is a single stateful session: `find_by_identifier`
/// focuses the matched chat, and the `send_*` calls deliver to whatever
/// chat is focused. Callers must not interleave tasks concurrently.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Acquire the session. Called once, before any other capability.
    async fn open(&self) -> Result<()>;

    /// Release the session. Called once, on every exit path after `open`.
    async fn close(&self) -> Result<()>;

    /// Look up a recipient and focus their chat. A clean "not found" is
    /// `Ok(false)`, not an error.
    async fn find_by_identifier(&self, key: &str) -> Result<bool>;

    async fn send_text(&self, message: &str) -> Result<()>;

    async fn send_image(&self, path: &Path, caption: Option<&str>) -> Result<()>;

    async fn send_video(&self, path: &Path, caption: Option<&str>) -> Result<()>;

    async fn send_file(&self, path: &Path, caption: Option<&str>) -> Result<()>;

    /// Block until the transport confirms the last send left the outbox.
    async fn wait_for_sent_ack(&self) -> Result<()>;
}
