pub mod groq;
pub mod summarizer;
pub mod transcriber;
pub mod visual;

use std::{future::Future, path::Path};

use crate::error::ModelError;

/// A single chat-style request: system role instruction plus user prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub system: String,
    pub user: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl ChatRequest {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            temperature: 0.7,
            max_tokens: 1024,
        }
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// Hosted text generation
pub trait TextModel {
    const TEXT_MODEL: &'static str;

    fn complete(&self, request: ChatRequest)
        -> impl Future<Output = Result<String, ModelError>> + Send;
}

/// Hosted vision-language model, one image per call
pub trait VisionModel {
    const VISION_MODEL: &'static str;

    fn describe_image(
        &self,
        image: &Path,
        request: ChatRequest,
    ) -> impl Future<Output = Result<String, ModelError>> + Send;
}
