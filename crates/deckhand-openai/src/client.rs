//! OpenAI API client for chat completions and image generation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};
use url::Url;

use deckhand_core::OpenAiSettings;

use crate::error::{OpenAiError, Result};

/// Language and image model operations.
#[async_trait]
pub trait AiProvider: Send + Sync {
    /// Answer a single user prompt.
    async fn chat_completion(&self, api_key: &str, prompt: &str) -> Result<String>;

    /// Generate one image and return its URL.
    async fn generate_image(&self, api_key: &str, prompt: &str) -> Result<String>;
}

/// OpenAI API client implementing [`AiProvider`].
#[derive(Clone)]
pub struct OpenAiClient {
    client: reqwest::Client,
    base_url: Url,
    model: String,
    image_model: String,
    image_size: String,
}

/// Chat completion request.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
}

/// A message in the chat conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatMessage {
    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: Some(content.into()),
        }
    }
}

/// Chat completion response.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    pub choices: Vec<ChatChoice>,
    #[serde(default)]
    pub usage: Option<ChatUsage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    pub message: ChatMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatUsage {
    pub total_tokens: u32,
}

/// Image generation request.
#[derive(Debug, Clone, Serialize)]
pub struct ImageRequest {
    pub model: String,
    pub prompt: String,
    pub n: u32,
    pub size: String,
}

/// Image generation response.
#[derive(Debug, Clone, Deserialize)]
pub struct ImageResponse {
    pub data: Vec<ImageData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImageData {
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

impl OpenAiClient {
    /// Create a client for the configured endpoint and models.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(settings: &OpenAiSettings, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: settings.base_url.clone(),
            model: settings.model.clone(),
            image_model: settings.image_model.clone(),
            image_size: settings.image_size.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.as_str().trim_end_matches('/'), path)
    }

    async fn post<T: Serialize + std::fmt::Debug>(
        &self,
        api_key: &str,
        path: &str,
        body: &T,
    ) -> Result<Response> {
        trace!("Sending OpenAI request: {:?}", body);
        let response = self
            .client
            .post(self.endpoint(path))
            .bearer_auth(api_key)
            .json(body)
            .send()
            .await?;
        check(response).await
    }
}

#[async_trait]
impl AiProvider for OpenAiClient {
    async fn chat_completion(&self, api_key: &str, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage::user(prompt)],
        };
        let response = self.post(api_key, "chat/completions", &request).await?;
        let response: ChatResponse = response
            .json()
            .await
            .map_err(|e| OpenAiError::Decode(format!("Failed to parse response: {}", e)))?;

        debug!(
            "Chat response received: {} tokens used",
            response.usage.as_ref().map_or(0, |u| u.total_tokens)
        );

        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|text| text.trim().to_string())
            .ok_or_else(|| OpenAiError::Decode("response contained no choices".into()))
    }

    async fn generate_image(&self, api_key: &str, prompt: &str) -> Result<String> {
        let request = ImageRequest {
            model: self.image_model.clone(),
            prompt: prompt.to_string(),
            n: 1,
            size: self.image_size.clone(),
        };
        let response = self.post(api_key, "images/generations", &request).await?;
        let response: ImageResponse = response
            .json()
            .await
            .map_err(|e| OpenAiError::Decode(format!("Failed to parse response: {}", e)))?;

        let url = response
            .data
            .into_iter()
            .find_map(|d| d.url)
            .ok_or_else(|| OpenAiError::Decode("response contained no image url".into()))?;
        debug!(url = %url, "image generated");
        Ok(url)
    }
}

async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorEnvelope>(&text)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| format!("OpenAI API error {}: {}", status, text.trim()));

    Err(if status == StatusCode::UNAUTHORIZED {
        OpenAiError::Unauthorized(message)
    } else {
        OpenAiError::Api {
            status: status.as_u16(),
            message,
        }
    })
}
