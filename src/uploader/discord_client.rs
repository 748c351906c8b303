use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_LENGTH};
use reqwest::{Body, Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use tokio::time::Duration;

use super::batch_planner::{Batch, CandidateFile};
use super::gateway::{StorageGateway, UploadSlot, UploadedReference};
use super::progress_tracker::RunTally;
use super::retry::CallOutcome;
use crate::errors::AppResult;

pub const DEFAULT_API_BASE_URL: &str = "https://discord.com/api/v9";

/// Longest error body kept in log lines and failure reasons
const MAX_ERROR_BODY_CHARS: usize = 300;

/// Slowest upload rate a transfer is allowed before it times out
const MIN_UPLOAD_BYTES_PER_SEC: u64 = 256 * 1024;

#[derive(Debug, Serialize)]
struct AttachmentRequest<'a> {
    filename: &'a str,
    file_size: u64,
    id: String,
    is_clip: bool,
}

#[derive(Debug, Serialize)]
struct ReserveRequest<'a> {
    files: Vec<AttachmentRequest<'a>>,
}

#[derive(Debug, Deserialize)]
struct ReserveResponse {
    attachments: Vec<UploadSlot>,
}

#[derive(Debug, Serialize)]
struct MessageRequest<'a> {
    content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    attachments: Option<&'a [UploadedReference]>,
}

/// Discord channel client speaking the attachment upload protocol
pub struct DiscordClient {
    client: Client,
    api_base_url: String,
    channel_id: String,
    token: String,
    request_timeout: Duration,
}

impl DiscordClient {
    pub fn new(
        api_base_url: &str,
        token: &str,
        channel_id: &str,
        request_timeout: Duration,
    ) -> AppResult<Self> {
        let client = Client::builder().connect_timeout(request_timeout).build()?;

        Ok(Self {
            client,
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            channel_id: channel_id.to_string(),
            token: token.to_string(),
            request_timeout,
        })
    }

    fn channel_url(&self, endpoint: &str) -> String {
        format!(
            "{}/channels/{}/{}",
            self.api_base_url, self.channel_id, endpoint
        )
    }

    fn api_post<T: Serialize>(&self, endpoint: &str, payload: &T) -> RequestBuilder {
        self.client
            .post(self.channel_url(endpoint))
            .header(AUTHORIZATION, &self.token)
            .timeout(self.request_timeout)
            .json(payload)
    }

    /// Uploads get the API deadline plus enough time to push the body at the minimum rate
    fn transfer_timeout(&self, size_bytes: u64) -> Duration {
        self.request_timeout + Duration::from_secs(size_bytes / MIN_UPLOAD_BYTES_PER_SEC)
    }

    /// Send one request and classify the response
    async fn send(&self, request: RequestBuilder) -> CallOutcome<String> {
        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => return CallOutcome::transport(e.to_string()),
        };

        let status = response.status();
        match response.text().await {
            Ok(body) if status.is_success() => CallOutcome::Success(body),
            Ok(body) => {
                log::debug!("Discord API error {}: {}", status, truncate(&body));
                CallOutcome::from_error_status(status.as_u16(), truncate(&body))
            }
            Err(e) if status.is_success() => CallOutcome::transport(e.to_string()),
            Err(_) => CallOutcome::from_error_status(status.as_u16(), "Unknown error"),
        }
    }
}

#[async_trait]
impl StorageGateway for DiscordClient {
    async fn reserve_slots(&self, batch: &Batch) -> AppResult<CallOutcome<Vec<UploadSlot>>> {
        let payload = ReserveRequest {
            files: batch
                .files()
                .iter()
                .enumerate()
                .map(|(index, file)| AttachmentRequest {
                    filename: &file.display_name,
                    file_size: file.size_bytes,
                    id: index.to_string(),
                    is_clip: false,
                })
                .collect(),
        };
        let request = self.api_post("attachments", &payload);

        let outcome = match self.send(request).await {
            CallOutcome::Success(body) => match serde_json::from_str::<ReserveResponse>(&body) {
                Ok(parsed) => CallOutcome::Success(parsed.attachments),
                Err(e) => {
                    log::error!("Unexpected attachment response: {}", truncate(&body));
                    CallOutcome::Failed {
                        status: Some(200),
                        reason: format!("malformed attachment response: {}", e),
                    }
                }
            },
            other => other.map(|_| Vec::new()),
        };

        Ok(outcome)
    }

    async fn transfer(
        &self,
        slot: &UploadSlot,
        file: &CandidateFile,
    ) -> AppResult<CallOutcome<UploadedReference>> {
        let opened = match tokio::fs::File::open(&file.path).await {
            Ok(handle) => handle.metadata().await.map(|metadata| (handle, metadata.len())),
            Err(e) => Err(e),
        };
        let (handle, length) = match opened {
            Ok(opened) => opened,
            Err(e) => {
                return Ok(CallOutcome::transport(format!(
                    "could not read {}: {}",
                    file.path.display(),
                    e
                )))
            }
        };

        // Streamed so a full batch never sits in memory at once
        let request = self
            .client
            .put(&slot.upload_url)
            .header(CONTENT_LENGTH, length)
            .timeout(self.transfer_timeout(length))
            .body(Body::from(handle));

        Ok(self.send(request).await.map(|_| UploadedReference {
            id: slot.id.clone(),
            filename: file.display_name.clone(),
            uploaded_filename: slot.upload_filename.clone(),
        }))
    }

    async fn publish(
        &self,
        _batch: &Batch,
        references: &[UploadedReference],
    ) -> AppResult<CallOutcome<()>> {
        let payload = MessageRequest {
            content: "",
            attachments: Some(references),
        };
        let request = self.api_post("messages", &payload);

        Ok(self.send(request).await.map(|_| ()))
    }

    async fn notify_run_summary(&self, tally: &RunTally) -> AppResult<CallOutcome<()>> {
        let content = tally.summary_message();
        let payload = MessageRequest {
            content: &content,
            attachments: None,
        };
        let request = self.api_post("messages", &payload);

        Ok(self.send(request).await.map(|_| ()))
    }
}

fn truncate(text: &str) -> String {
    text.chars().take(MAX_ERROR_BODY_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_url_strips_trailing_slash() {
        let client = DiscordClient::new(
            "https://discord.com/api/v9/",
            "token",
            "123456789012345678",
            Duration::from_secs(5),
        )
        .unwrap();

        assert_eq!(
            client.channel_url("attachments"),
            "https://discord.com/api/v9/channels/123456789012345678/attachments"
        );
    }

    #[test]
    fn test_transfer_deadline_grows_with_file_size() {
        let client = DiscordClient::new(
            DEFAULT_API_BASE_URL,
            "token",
            "123456789012345678",
            Duration::from_secs(120),
        )
        .unwrap();

        assert_eq!(client.transfer_timeout(0), Duration::from_secs(120));
        assert_eq!(
            client.transfer_timeout(500 * 1024 * 1024),
            Duration::from_secs(120 + 2000)
        );
    }

    #[test]
    fn test_reserve_request_shape() {
        let payload = ReserveRequest {
            files: vec![AttachmentRequest {
                filename: "a.png",
                file_size: 42,
                id: "0".to_string(),
                is_clip: false,
            }],
        };

        let json = serde_json::to_value(&payload).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "files": [{"filename": "a.png", "file_size": 42, "id": "0", "is_clip": false}]
            })
        );
    }

    #[test]
    fn test_summary_request_omits_attachments() {
        let payload = MessageRequest {
            content: "done",
            attachments: None,
        };

        let json = serde_json::to_value(&payload).unwrap();

        assert_eq!(json, serde_json::json!({"content": "done"}));
    }

    #[test]
    fn test_truncate_keeps_char_boundaries() {
        let body = "é".repeat(MAX_ERROR_BODY_CHARS + 10);
        assert_eq!(truncate(&body).chars().count(), MAX_ERROR_BODY_CHARS);
    }
}
