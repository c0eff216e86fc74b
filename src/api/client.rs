use super::logging::emit_debug_payload;
use crate::config::{is_loopback_url, Config};
use crate::types::{
    ChatRequest, ConversationId, ConversationSummary, CreateConversationRequest, Message,
};
use anyhow::{anyhow, Context, Result};
use bytes::Bytes;
use futures::future::BoxFuture;
use futures::{FutureExt, Stream, StreamExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::pin::Pin;

pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// The conversation service as seen by the client.
///
/// Everything here is owned by the server; the client only lists, creates,
/// deletes, reads and streams.
pub trait ChatService: Send + Sync {
    fn list_conversations(&self) -> BoxFuture<'_, Result<Vec<ConversationSummary>>>;

    fn create_conversation<'a>(
        &'a self,
        title: &'a str,
    ) -> BoxFuture<'a, Result<ConversationSummary>>;

    fn delete_conversation(&self, id: ConversationId) -> BoxFuture<'_, Result<()>>;

    fn list_messages(&self, id: ConversationId) -> BoxFuture<'_, Result<Vec<Message>>>;

    /// Submits a user turn and returns the raw newline-delimited response body.
    fn send_chat<'a>(
        &'a self,
        id: ConversationId,
        text: &'a str,
    ) -> BoxFuture<'a, Result<ByteStream>>;
}

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    debug_payload: bool,
}

impl ApiClient {
    pub fn new(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url: config.server_url.trim().trim_end_matches('/').to_string(),
            debug_payload: config.debug_payload,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.endpoint(path);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|error| map_api_request_error(error, &url))?
            .error_for_status()
            .map_err(|error| map_api_request_error(error, &url))?;

        response
            .json::<T>()
            .await
            .with_context(|| format!("unexpected response body from '{url}'"))
    }

    async fn post_json<B: Serialize>(&self, path: &str, body: &B) -> Result<reqwest::Response> {
        let url = self.endpoint(path);
        if self.debug_payload {
            if let Ok(payload) = serde_json::to_value(body) {
                emit_debug_payload(&url, &payload);
            }
        }

        self.http
            .post(&url)
            .header("content-type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|error| map_api_request_error(error, &url))?
            .error_for_status()
            .map_err(|error| map_api_request_error(error, &url))
    }

    pub async fn fetch_conversations(&self) -> Result<Vec<ConversationSummary>> {
        self.get_json("/api/conversations").await
    }

    pub async fn create(&self, title: &str) -> Result<ConversationSummary> {
        let url = self.endpoint("/api/conversations");
        self.post_json("/api/conversations", &CreateConversationRequest { title })
            .await?
            .json::<ConversationSummary>()
            .await
            .with_context(|| format!("unexpected response body from '{url}'"))
    }

    pub async fn delete(&self, id: ConversationId) -> Result<()> {
        let url = self.endpoint(&format!("/api/conversations/{id}"));
        self.http
            .delete(&url)
            .send()
            .await
            .map_err(|error| map_api_request_error(error, &url))?
            .error_for_status()
            .map_err(|error| map_api_request_error(error, &url))?;
        Ok(())
    }

    pub async fn fetch_messages(&self, id: ConversationId) -> Result<Vec<Message>> {
        self.get_json(&format!("/api/conversations/{id}/messages"))
            .await
    }

    pub async fn create_stream(&self, id: ConversationId, text: &str) -> Result<ByteStream> {
        let request_url = self.endpoint("/api/chat");
        let response = self
            .post_json(
                "/api/chat",
                &ChatRequest {
                    conversation_id: id,
                    message: text,
                },
            )
            .await?;

        let stream = response.bytes_stream().map(move |item| {
            item.map_err(|error| map_api_request_error(error, &request_url))
        });
        Ok(Box::pin(stream))
    }
}

impl ChatService for ApiClient {
    fn list_conversations(&self) -> BoxFuture<'_, Result<Vec<ConversationSummary>>> {
        self.fetch_conversations().boxed()
    }

    fn create_conversation<'a>(
        &'a self,
        title: &'a str,
    ) -> BoxFuture<'a, Result<ConversationSummary>> {
        self.create(title).boxed()
    }

    fn delete_conversation(&self, id: ConversationId) -> BoxFuture<'_, Result<()>> {
        self.delete(id).boxed()
    }

    fn list_messages(&self, id: ConversationId) -> BoxFuture<'_, Result<Vec<Message>>> {
        self.fetch_messages(id).boxed()
    }

    fn send_chat<'a>(
        &'a self,
        id: ConversationId,
        text: &'a str,
    ) -> BoxFuture<'a, Result<ByteStream>> {
        self.create_stream(id, text).boxed()
    }
}

fn map_api_request_error(error: reqwest::Error, request_url: &str) -> anyhow::Error {
    if error.is_connect() && is_loopback_url(request_url) {
        return anyhow!(
            "cannot reach local chat server '{}': {}. Start the server or update CHATSTREAM_SERVER_URL.",
            request_url,
            error
        );
    }
    if error.is_connect() {
        return anyhow!("cannot reach chat server '{}': {}", request_url, error);
    }
    if error.is_timeout() {
        return anyhow!("request to '{}' timed out: {}", request_url, error);
    }
    if let Some(status) = error.status() {
        return anyhow!(
            "chat server '{}' returned HTTP {}: {}",
            request_url,
            status,
            error
        );
    }
    anyhow!("request to '{}' failed: {}", request_url, error)
}
