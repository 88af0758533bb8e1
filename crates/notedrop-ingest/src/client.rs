//! Telegram Bot API client.
//!
//! Thin wrapper over reqwest for the three calls the ingestion path needs:
//! resolving a `file_id` to a download path, downloading the file, and
//! sending a confirmation message back to the chat.

use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error};

use notedrop_core::{Error, Result};

/// Default Bot API host.
const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Envelope every Bot API response is wrapped in.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FileInfo {
    file_path: Option<String>,
}

/// Telegram Bot API client.
#[derive(Clone)]
pub struct BotClient {
    http: reqwest::Client,
    token: String,
    api_base: String,
}

impl BotClient {
    /// Create a client for the given bot token.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            token: token.into(),
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }

    /// Override the API host. Used by tests to point at a local server.
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }

    /// Resolve a `file_id` to its server-side file path.
    pub async fn get_file_path(&self, file_id: &str) -> Result<String> {
        let url = format!("{}/bot{}/getFile", self.api_base, self.token);
        let response: ApiResponse<FileInfo> = self
            .http
            .get(&url)
            .query(&[("file_id", file_id)])
            .send()
            .await?
            .json()
            .await?;

        if !response.ok {
            let description = response
                .description
                .unwrap_or_else(|| "unknown error".to_string());
            return Err(Error::Request(format!(
                "Telegram getFile failed for {}: {}",
                file_id, description
            )));
        }

        response
            .result
            .and_then(|info| info.file_path)
            .ok_or_else(|| Error::Request("Telegram getFile returned no file_path".to_string()))
    }

    /// Temporary download URL for a resolved file path.
    pub fn download_url(&self, file_path: &str) -> String {
        format!("{}/file/bot{}/{}", self.api_base, self.token, file_path)
    }

    /// Download a file by its resolved path.
    pub async fn download(&self, file_path: &str) -> Result<Vec<u8>> {
        let url = self.download_url(file_path);
        let response = self.http.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(Error::Request(format!(
                "Telegram file download failed with status {}",
                response.status()
            )));
        }
        let bytes = response.bytes().await?;
        debug!(size = bytes.len(), "downloaded telegram file");
        Ok(bytes.to_vec())
    }

    /// Send a Markdown-formatted message to a chat.
    ///
    /// Failures are logged and swallowed: a missed confirmation must not
    /// fail the note that was already saved.
    pub async fn send_message(&self, chat_id: i64, text: &str) {
        let url = format!("{}/bot{}/sendMessage", self.api_base, self.token);
        let payload = json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "Markdown",
        });

        match self.http.post(&url).json(&payload).send().await {
            Ok(response) if !response.status().is_success() => {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                error!(%status, body, "failed to send telegram message");
            }
            Ok(_) => {}
            Err(e) => error!(error = %e, "error sending telegram message"),
        }
    }
}
