//! The outbound chat API, behind a trait so rendering and error-policy
//! logic can be exercised against a stub instead of a live bot API.

use async_trait::async_trait;
use gridwatch_protocol::error::ChannelAccessError;
use serde::Deserialize;

/// A send/edit/delete outcome. `NotModified` mirrors a bot API's
/// "message is not modified" response to an edit whose content is
/// unchanged — callers treat it as success, not failure.
#[derive(Debug)]
pub enum ChatError {
    ChannelAccess(ChannelAccessError),
    NotModified,
    Other(anyhow::Error),
}

impl std::fmt::Display for ChatError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChatError::ChannelAccess(e) => write!(f, "{e}"),
            ChatError::NotModified => write!(f, "message is not modified"),
            ChatError::Other(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ChatError {}

#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn send_message(&self, channel_id: i64, text: &str) -> Result<i64, ChatError>;

    async fn send_photo(
        &self,
        channel_id: i64,
        image: &[u8],
        filename: &str,
        caption: Option<&str>,
    ) -> Result<i64, ChatError>;

    async fn edit_photo(
        &self,
        channel_id: i64,
        message_id: i64,
        image: &[u8],
        filename: &str,
        caption: Option<&str>,
    ) -> Result<(), ChatError>;

    async fn delete_message(&self, channel_id: i64, message_id: i64) -> Result<(), ChatError>;
}

#[derive(Deserialize)]
struct ApiResult {
    #[serde(default)]
    message_id: Option<i64>,
    #[serde(default)]
    description: Option<String>,
}

fn classify(status: reqwest::StatusCode, description: Option<&str>) -> ChatError {
    let description = description.unwrap_or_default().to_ascii_lowercase();
    if description.contains("not modified") {
        return ChatError::NotModified;
    }
    if description.contains("chat not found") {
        return ChatError::ChannelAccess(ChannelAccessError::ChatNotFound);
    }
    if description.contains("kicked") {
        return ChatError::ChannelAccess(ChannelAccessError::BotKicked);
    }
    if description.contains("not enough rights") && description.contains("photo") {
        return ChatError::ChannelAccess(ChannelAccessError::NoPhotoRights);
    }
    if description.contains("not enough rights") || description.contains("post messages") {
        return ChatError::ChannelAccess(ChannelAccessError::NoPostRights);
    }
    ChatError::Other(anyhow::anyhow!(
        "chat API error {status}: {}",
        if description.is_empty() { "unknown" } else { &description }
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(code: u16) -> reqwest::StatusCode {
        reqwest::StatusCode::from_u16(code).unwrap()
    }

    #[test]
    fn classifies_known_channel_access_failures() {
        assert!(matches!(
            classify(status(400), Some("Bad Request: chat not found")),
            ChatError::ChannelAccess(ChannelAccessError::ChatNotFound)
        ));
        assert!(matches!(
            classify(status(403), Some("Forbidden: bot was kicked from the group chat")),
            ChatError::ChannelAccess(ChannelAccessError::BotKicked)
        ));
        assert!(matches!(
            classify(status(400), Some("not enough rights to send photo to the chat")),
            ChatError::ChannelAccess(ChannelAccessError::NoPhotoRights)
        ));
        assert!(matches!(
            classify(status(400), Some("not enough rights to post messages")),
            ChatError::ChannelAccess(ChannelAccessError::NoPostRights)
        ));
    }

    #[test]
    fn classifies_not_modified_as_idempotent_success() {
        assert!(matches!(
            classify(status(400), Some("Bad Request: message is not modified")),
            ChatError::NotModified
        ));
    }

    #[test]
    fn unrecognized_failures_are_transient() {
        assert!(matches!(
            classify(status(500), Some("Internal Server Error")),
            ChatError::Other(_)
        ));
    }
}

pub struct HttpChatClient {
    base_url: String,
    http: reqwest::Client,
}

impl HttpChatClient {
    pub fn new(base_url: String, token: String) -> anyhow::Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::AUTHORIZATION,
            reqwest::header::HeaderValue::from_str(&format!("Bearer {token}"))?,
        );
        let http = reqwest::Client::builder().default_headers(headers).build()?;
        Ok(Self { base_url, http })
    }

    async fn handle(&self, response: reqwest::Response) -> Result<ApiResult, ChatError> {
        let status = response.status();
        let body: ApiResult = response
            .json()
            .await
            .map_err(|e| ChatError::Other(e.into()))?;
        if status.is_success() {
            Ok(body)
        } else {
            Err(classify(status, body.description.as_deref()))
        }
    }
}

#[async_trait]
impl ChatClient for HttpChatClient {
    async fn send_message(&self, channel_id: i64, text: &str) -> Result<i64, ChatError> {
        let url = format!("{}/sendMessage", self.base_url);
        let response = self
            .http
            .post(url)
            .json(&serde_json::json!({ "chat_id": channel_id, "text": text }))
            .send()
            .await
            .map_err(|e| ChatError::Other(e.into()))?;
        let result = self.handle(response).await?;
        result
            .message_id
            .ok_or_else(|| ChatError::Other(anyhow::anyhow!("chat API returned no message_id")))
    }

    async fn send_photo(
        &self,
        channel_id: i64,
        image: &[u8],
        filename: &str,
        caption: Option<&str>,
    ) -> Result<i64, ChatError> {
        let url = format!("{}/sendPhoto", self.base_url);
        let mut form = reqwest::multipart::Form::new()
            .text("chat_id", channel_id.to_string())
            .part(
                "photo",
                reqwest::multipart::Part::bytes(image.to_vec()).file_name(filename.to_string()),
            );
        if let Some(caption) = caption {
            form = form.text("caption", caption.to_string());
        }
        let response = self
            .http
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ChatError::Other(e.into()))?;
        let result = self.handle(response).await?;
        result
            .message_id
            .ok_or_else(|| ChatError::Other(anyhow::anyhow!("chat API returned no message_id")))
    }

    async fn edit_photo(
        &self,
        channel_id: i64,
        message_id: i64,
        image: &[u8],
        filename: &str,
        caption: Option<&str>,
    ) -> Result<(), ChatError> {
        let url = format!("{}/editMessageMedia", self.base_url);
        let mut form = reqwest::multipart::Form::new()
            .text("chat_id", channel_id.to_string())
            .text("message_id", message_id.to_string())
            .part(
                "photo",
                reqwest::multipart::Part::bytes(image.to_vec()).file_name(filename.to_string()),
            );
        if let Some(caption) = caption {
            form = form.text("caption", caption.to_string());
        }
        let response = self
            .http
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ChatError::Other(e.into()))?;
        self.handle(response).await?;
        Ok(())
    }

    async fn delete_message(&self, channel_id: i64, message_id: i64) -> Result<(), ChatError> {
        let url = format!("{}/deleteMessage", self.base_url);
        let response = self
            .http
            .post(url)
            .json(&serde_json::json!({ "chat_id": channel_id, "message_id": message_id }))
            .send()
            .await
            .map_err(|e| ChatError::Other(e.into()))?;
        self.handle(response).await?;
        Ok(())
    }
}
