use std::{path::Path, time::Duration};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::{
    error::{ConfigError, ModelError},
    llm::{transcriber::Transcriber, ChatRequest, TextModel, VisionModel},
};

/// Client for Groq's OpenAI-compatible API. Serves transcription, vision
/// and text generation; clone it freely, the underlying connection pool is
/// shared.
#[derive(Debug, Clone)]
pub struct GroqClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GroqClient {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.groq.com/openai/v1";
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

    /// Every request made by the client is bounded by `timeout`; nothing is retried.
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self, ConfigError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ConfigError::MissingSecret("GROQ_API_KEY"));
        }

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            api_key,
            base_url: Self::DEFAULT_BASE_URL.into(),
        })
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub async fn send_transcribe_request(
        &self,
        file: &Path,
        model_name: &str,
    ) -> Result<TranscribeResponse, ModelError> {
        let bytes = tokio::fs::read(file).await?;
        let file_name = file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "media".into());

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(media_mime_type(file))?;

        let form = reqwest::multipart::Form::new()
            .text("model", model_name.to_string())
            .text("response_format", "json")
            .text("language", "en")
            .part("file", part);

        let resp = self
            .client
            .post(format!("{}/audio/transcriptions", self.base_url))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to make http request"))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let message = resp.text().await.unwrap_or_default();
            return Err(ModelError::Api { status, message });
        }

        Ok(resp.json::<TranscribeResponse>().await?)
    }

    pub async fn send_completion_request(
        &self,
        body: serde_json::Value,
    ) -> Result<CompletionResponse, ModelError> {
        let resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to make http request"))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let message = resp.text().await.unwrap_or_default();
            return Err(ModelError::Api { status, message });
        }

        Ok(resp.json::<CompletionResponse>().await?)
    }
}

fn media_mime_type(file: &Path) -> &'static str {
    match file
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .as_deref()
    {
        Some("mp3") => "audio/mpeg",
        Some("m4a") => "audio/mp4",
        Some("wav") => "audio/wav",
        Some("webm") => "video/webm",
        Some("mp4") => "video/mp4",
        _ => "application/octet-stream",
    }
}

#[derive(Debug, Deserialize)]
pub struct TranscribeResponse {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct CompletionResponse {
    pub id: String,
    pub choices: Vec<CompletionChoice>,
}

impl CompletionResponse {
    fn into_content(self) -> Result<String, ModelError> {
        self.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(ModelError::EmptyResponse)
    }
}

#[derive(Debug, Deserialize)]
pub struct CompletionChoice {
    pub index: u32,
    pub message: CompletionMessage,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CompletionMessage {
    pub role: String,
    pub content: Option<String>,
}

impl Transcriber for GroqClient {
    const TRANSCRIBER_MODEL: &'static str = "whisper-large-v3";

    async fn transcribe(&self, media: &Path) -> Result<String, ModelError> {
        let response = self
            .send_transcribe_request(media, Self::TRANSCRIBER_MODEL)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to transcribe media"))?;

        Ok(response.text.trim().to_string())
    }
}

impl TextModel for GroqClient {
    const TEXT_MODEL: &'static str = "llama3-70b-8192";

    async fn complete(&self, request: ChatRequest) -> Result<String, ModelError> {
        let body = json!({
            "model": Self::TEXT_MODEL,
            "messages": [
                { "role": "system", "content": request.system },
                { "role": "user", "content": request.user }
            ],
            "temperature": request.temperature,
            "max_tokens": request.max_tokens
        });

        self.send_completion_request(body)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to generate completion"))?
            .into_content()
    }
}

impl VisionModel for GroqClient {
    const VISION_MODEL: &'static str = "llama-3.2-90b-vision-preview";

    async fn describe_image(&self, image: &Path, request: ChatRequest) -> Result<String, ModelError> {
        let bytes = tokio::fs::read(image).await?;
        let data_url = format!("data:image/jpeg;base64,{}", STANDARD.encode(bytes));

        let body = json!({
            "model": Self::VISION_MODEL,
            "messages": [
                { "role": "system", "content": request.system },
                {
                    "role": "user",
                    "content": [
                        { "type": "text", "text": request.user },
                        { "type": "image_url", "image_url": { "url": data_url } }
                    ]
                }
            ],
            "temperature": request.temperature,
            "max_tokens": request.max_tokens
        });

        self.send_completion_request(body)
            .await
            .inspect_err(|e| tracing::error!(error = %e, image = %image.display(), "Failed to describe image"))?
            .into_content()
    }
}
