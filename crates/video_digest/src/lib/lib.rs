mod error;
mod llm;
pub mod media;
mod orchestrator;
mod rate_limiter;
pub mod server;
pub mod stage;
pub mod tracing;
pub mod types;

pub use error::{AcquisitionError, AnalysisError, ConfigError, ModelError, StageErrorKind};
pub use llm::groq;
pub use llm::{
    summarizer::Summarizer,
    transcriber::{transcribe_or_empty, Transcriber},
    visual::VisualAnalyzer,
    ChatRequest, TextModel, VisionModel,
};
pub use orchestrator::{builder::AnalysisOrchestratorBuilder, AnalysisOrchestrator, PipelineState};
pub use rate_limiter::RateLimiter;
