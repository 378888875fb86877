//! The analysis client. Re-encodes an image as a PNG data URI, wraps it with
//! the user's prompts into an OpenAI-style chat-completion request, posts it
//! to OpenRouter and normalizes whatever comes back into an `AnalysisResult`

use crate::config::DEFAULT_USER_PROMPT;
use crate::error::AnalysisError;
use crate::settings::Settings;
use anyhow::Context;
use base64::{engine::general_purpose, Engine as _};
use image::{DynamicImage, GenericImageView, ImageOutputFormat};
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use serde_json::Value;
use std::fmt::Debug;
use std::io::Cursor;
use tracing::{debug, info, warn};

/// Everything needed for one analysis. Lives for a single HTTP request
pub struct AnalysisRequest {
    pub api_key: String,
    pub model: String,
    pub system_prompt: String,
    pub user_prompt: String,
    pub image: DynamicImage,
}

impl Debug for AnalysisRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (width, height) = self.image.dimensions();
        write!(
            f,
            "AnalysisRequest {{ api_key: <redacted>, model: {:?}, system_prompt: {:?}, user_prompt: {:?}, image: <{}x{}> }}",
            self.model, self.system_prompt, self.user_prompt, width, height
        )
    }
}

/// The outcome of an analysis. The only shape that crosses from the client
/// to the request handler
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisResult {
    Success { analysis_text: String },
    Failure { message: String },
}

impl AnalysisResult {
    pub fn is_success(&self) -> bool {
        matches!(self, AnalysisResult::Success { .. })
    }
}

impl From<AnalysisError> for AnalysisResult {
    fn from(err: AnalysisError) -> Self {
        AnalysisResult::Failure {
            message: err.to_string(),
        }
    }
}

/// Body of a chat-completion request
#[derive(Debug, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: MessageContent,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

/// An image reference, here always a `data:` URI
#[derive(Serialize)]
pub struct ImageUrl {
    pub url: String,
}

impl Debug for ImageUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ImageUrl {{ url: <{} bytes> }}", self.url.len())
    }
}

impl ChatRequest {
    /// An optional system message followed by one user message holding the
    /// prompt text and the image
    pub fn new(model: String, system_prompt: &str, user_prompt: String, data_uri: String) -> Self {
        let mut messages = Vec::with_capacity(2);

        if !system_prompt.is_empty() {
            messages.push(ChatMessage {
                role: Role::System,
                content: MessageContent::Text(system_prompt.to_string()),
            });
        }

        messages.push(ChatMessage {
            role: Role::User,
            content: MessageContent::Parts(vec![
                ContentPart::Text { text: user_prompt },
                ContentPart::ImageUrl {
                    image_url: ImageUrl { url: data_uri },
                },
            ]),
        });

        ChatRequest { model, messages }
    }
}

/// The prompt actually sent: the user's, or the fallback phrase when empty
pub fn effective_prompt(user_prompt: String) -> String {
    match user_prompt.is_empty() {
        true => DEFAULT_USER_PROMPT.to_string(),
        false => user_prompt,
    }
}

/// Encode `image` as PNG and wrap it in a base 64 `data:` URI
pub fn png_data_uri(image: &DynamicImage) -> Result<String, AnalysisError> {
    let mut png: Vec<u8> = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut png), ImageOutputFormat::Png)
        .map_err(AnalysisError::Encode)?;

    Ok(format!(
        "data:image/png;base64,{}",
        general_purpose::STANDARD.encode(png)
    ))
}

/// Pull `choices[0].message.content` out of a chat-completion reply. The
/// content is either a string or a list of parts whose `text` entries are
/// joined
pub fn extract_analysis(reply: &Value) -> Result<String, AnalysisError> {
    let content = reply
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first())
        .and_then(|choice| choice.pointer("/message/content"))
        .and_then(content_text);

    match content {
        Some(text) => Ok(text),
        None => {
            let raw = serde_json::to_string_pretty(reply)?;
            Err(AnalysisError::UnexpectedResponse(raw))
        }
    }
}

fn content_text(content: &Value) -> Option<String> {
    match content {
        Value::String(text) => Some(text.clone()),
        Value::Array(parts) => {
            let texts: Vec<&str> = parts
                .iter()
                .filter(|part| part.get("type").and_then(Value::as_str) == Some("text"))
                .filter_map(|part| part.get("text").and_then(Value::as_str))
                .collect();
            match texts.is_empty() {
                true => None,
                false => Some(texts.concat()),
            }
        }
        _ => None,
    }
}

/// Client for the remote chat-completion API. Holds no per-request state;
/// one instance is shared by every handler
#[derive(Debug, Clone)]
pub struct AnalysisClient {
    http: reqwest::Client,
    endpoint: String,
    referer: String,
    title: String,
}

impl AnalysisClient {
    pub fn new(settings: &Settings) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(settings.request_timeout())
            .build()
            .context("failed to build the HTTP client")?;

        Ok(AnalysisClient {
            http,
            endpoint: settings.endpoint.clone(),
            referer: settings.referer.clone(),
            title: settings.title.clone(),
        })
    }

    /// Run one analysis. Never fails: every error comes back as
    /// `AnalysisResult::Failure`
    #[tracing::instrument(skip(self, request), fields(model = %request.model))]
    pub async fn analyze(&self, request: AnalysisRequest) -> AnalysisResult {
        match self.try_analyze(request).await {
            Ok(text) => {
                info!(chars = text.len(), "analysis completed");
                AnalysisResult::Success {
                    analysis_text: text,
                }
            }
            Err(err) => {
                warn!(kind = err.kind(), "analysis failed: {err}");
                err.into()
            }
        }
    }

    async fn try_analyze(&self, request: AnalysisRequest) -> Result<String, AnalysisError> {
        let AnalysisRequest {
            api_key,
            model,
            system_prompt,
            user_prompt,
            image,
        } = request;

        if api_key.is_empty() {
            return Err(AnalysisError::MissingApiKey);
        }

        let user_prompt = effective_prompt(user_prompt);
        let data_uri = tokio::task::spawn_blocking(move || png_data_uri(&image)).await??;
        let body = ChatRequest::new(model, &system_prompt, user_prompt, data_uri);

        debug!(
            messages = body.messages.len(),
            endpoint = %self.endpoint,
            "sending chat-completion request"
        );

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&api_key)
            .header(CONTENT_TYPE, "application/json")
            .header("HTTP-Referer", &self.referer)
            .header("X-Title", &self.title)
            .json(&body)
            .send()
            .await
            .and_then(|res| res.error_for_status())
            .map_err(AnalysisError::Transport)?;

        let raw = response.text().await.map_err(AnalysisError::Transport)?;
        let reply: Value = serde_json::from_str(&raw)?;

        extract_analysis(&reply)
    }
}
