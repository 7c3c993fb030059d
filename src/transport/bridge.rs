//! HTTP adapter for a local messaging-automation gateway.
//!
//! The gateway wraps the real messaging client behind a small REST API,
//! one session per run: `POST api/{session}/session/start`, chat lookup,
//! text/media sends against the focused chat, and a last-message status
//! endpoint the ack wait polls.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::{json, Value};
use std::fmt;
use std::path::Path;
use std::time::Duration;
use tokio::fs;
use tracing::{debug, warn};

use crate::config::Bridge;
use crate::transport::Transport;

const ACK_POLL_INTERVAL: Duration = Duration::from_millis(500);

pub struct BridgeTransport {
    http: Client,
    base_url: Url,
    session: String,
    token: Option<String>,
}

impl fmt::Debug for BridgeTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeTransport")
            .field("base_url", &self.base_url)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct FindResponse {
    found: bool,
}

#[derive(Deserialize)]
struct StatusResponse {
    status: String,
}

impl BridgeTransport {
    pub fn from_config(cfg: &Bridge) -> Result<Self> {
        let base_url = Url::parse(&cfg.base_url)
            .with_context(|| format!("invalid bridge base URL: {}", cfg.base_url))?;
        Ok(Self::with_base_url(
            base_url,
            cfg.session.clone(),
            cfg.token.clone(),
        ))
    }

    pub fn with_base_url(base_url: Url, session: String, token: Option<String>) -> Self {
        let http = Client::builder()
            .user_agent("bulksend/0.1")
            .no_proxy()
            .build()
            .expect("reqwest client");
        Self {
            http,
            base_url,
            session,
            token,
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(&format!("api/{}/{}", self.session, path))
            .context("invalid bridge base URL")
    }

    fn json_request(&self, path: &str, body: &Value) -> Result<reqwest::Request> {
        let mut builder = self.http.post(self.endpoint(path)?).json(body);
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        builder.build().context("failed to build bridge request")
    }

    async fn post_json(&self, path: &str, body: Value) -> Result<Value> {
        let request = self.json_request(path, &body)?;
        debug!(url = %request.url(), "bridge request");
        let res = self
            .http
            .execute(request)
            .await
            .context("failed to reach bridge")?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            warn!(%status, %body, "bridge error response");
            return Err(anyhow!("bridge error {}: {}", status, body));
        }
        res.json().await.context("invalid bridge response JSON")
    }

    async fn send_media(&self, kind: &str, path: &Path, caption: Option<&str>) -> Result<()> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| anyhow!("invalid media file name"))?
            .to_string();
        let content = fs::read(path)
            .await
            .with_context(|| format!("failed to read media file: {}", path.display()))?;

        let mut form = reqwest::multipart::Form::new().part(
            "file",
            reqwest::multipart::Part::bytes(content)
                .file_name(file_name)
                .mime_str(content_type_for(path))?,
        );
        if let Some(caption) = caption {
            form = form.text("caption", caption.to_string());
        }

        let mut builder = self
            .http
            .post(self.endpoint(&format!("message/{}", kind))?)
            .multipart(form);
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        let res = builder.send().await.context("failed to reach bridge")?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(anyhow!("bridge {} send failed {}: {}", kind, status, body));
        }
        Ok(())
    }
}

#[async_trait]
impl Transport for BridgeTransport {
    async fn open(&self) -> Result<()> {
        self.post_json("session/start", json!({})).await?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.post_json("session/stop", json!({})).await?;
        Ok(())
    }

    async fn find_by_identifier(&self, key: &str) -> Result<bool> {
        let value = self.post_json("chat/find", json!({ "query": key })).await?;
        let resp: FindResponse =
            serde_json::from_value(value).context("invalid chat/find response")?;
        Ok(resp.found)
    }

    async fn send_text(&self, message: &str) -> Result<()> {
        self.post_json("message/text", json!({ "body": message }))
            .await?;
        Ok(())
    }

    async fn send_image(&self, path: &Path, caption: Option<&str>) -> Result<()> {
        self.send_media("image", path, caption).await
    }

    async fn send_video(&self, path: &Path, caption: Option<&str>) -> Result<()> {
        self.send_media("video", path, caption).await
    }

    async fn send_file(&self, path: &Path, caption: Option<&str>) -> Result<()> {
        self.send_media("file", path, caption).await
    }

    async fn wait_for_sent_ack(&self) -> Result<()> {
        // Polls until the gateway reports the last message as sent. The
        // dispatch loop bounds this with its own ack timeout.
        loop {
            let value = self.post_json("message/last/status", json!({})).await?;
            let resp: StatusResponse =
                serde_json::from_value(value).context("invalid status response")?;
            match resp.status.as_str() {
                "sent" => return Ok(()),
                "failed" => return Err(anyhow!("bridge reported the last send as failed")),
                _ => tokio::time::sleep(ACK_POLL_INTERVAL).await,
            }
        }
    }
}

fn content_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|s| s.to_ascii_lowercase())
    {
        Some(ext) if ext == "jpg" || ext == "jpeg" => "image/jpeg",
        Some(ext) if ext == "png" => "image/png",
        Some(ext) if ext == "gif" => "image/gif",
        Some(ext) if ext == "mp4" => "video/mp4",
        Some(ext) if ext == "mov" => "video/quicktime",
        Some(ext) if ext == "avi" => "video/x-msvideo",
        Some(ext) if ext == "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}
