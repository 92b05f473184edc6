pub mod builder;

use std::{any::Any, fmt, panic::AssertUnwindSafe, sync::Arc};

use futures::FutureExt;
use tracing::Instrument;

use crate::{
    error::AnalysisError,
    llm::{
        summarizer::Summarizer,
        transcriber::{transcribe_or_empty, Transcriber},
        visual::VisualAnalyzer,
        TextModel, VisionModel,
    },
    media::MediaAcquirer,
    rate_limiter::RateLimiter,
    stage::{StageKind, StageOutcome},
    types::{AnalysisResult, MediaBundle},
};

/// Where a single analysis currently is. Only used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Acquiring,
    RateLimited,
    Analyzing,
    Summarizing,
    Cleaning,
    Done,
    Failed,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self {
            PipelineState::Acquiring => "acquiring",
            PipelineState::RateLimited => "rate_limited",
            PipelineState::Analyzing => "analyzing",
            PipelineState::Summarizing => "summarizing",
            PipelineState::Cleaning => "cleaning",
            PipelineState::Done => "done",
            PipelineState::Failed => "failed",
        };
        f.write_str(state)
    }
}

// The video analysis pipeline: acquire -> (transcribe || analyze frames) -> summarize
#[derive(Debug)]
pub struct AnalysisOrchestrator<M, T, C>
where
    M: MediaAcquirer + Send + Sync + 'static,
    T: Transcriber + Send + Sync + 'static,
    C: VisionModel + TextModel + Send + Sync + 'static,
{
    media: Arc<M>,
    transcriber: T,
    visual_analyzer: VisualAnalyzer<C>,
    summarizer: Summarizer<C>,
    rate_limiter: Arc<RateLimiter>,
}

impl<M, T, C> AnalysisOrchestrator<M, T, C>
where
    M: MediaAcquirer + Send + Sync + 'static,
    T: Transcriber + Send + Sync + 'static,
    C: VisionModel + TextModel + Send + Sync + 'static,
{
    /// Runs the whole pipeline for `url`.
    ///
    /// Transcription, frame analysis and summarization degrade to empty values
    /// instead of failing. Only acquisition failures, or a panic inside the
    /// pipeline, produce an error. Whatever was acquired is released exactly
    /// once before this returns, or in the background if this future is
    /// dropped first.
    #[tracing::instrument(skip(self), fields(bundle_id = tracing::field::Empty))]
    pub async fn analyze(&self, url: &str) -> Result<AnalysisResult, AnalysisError> {
        tracing::debug!(state = %PipelineState::Acquiring, "Acquiring media");
        let bundle = self.media.acquire(url).await.inspect_err(|e| {
            tracing::error!(error = %e, state = %PipelineState::Failed, "Media acquisition failed")
        })?;
        tracing::Span::current().record("bundle_id", bundle.id.as_str());
        let lease = BundleLease::new(Arc::clone(&self.media), &bundle.id);
        tracing::info!(
            title = %bundle.title,
            frames = bundle.frame_paths.len(),
            "Media acquired"
        );

        let outcome = AssertUnwindSafe(self.run_stages(url, &bundle))
            .catch_unwind()
            .await;

        tracing::debug!(state = %PipelineState::Cleaning, "Releasing media");
        lease.release().await;

        match outcome {
            Ok(result) => {
                tracing::info!(
                    state = %PipelineState::Done,
                    degraded = ?result.degraded_stages,
                    "Video analysis complete"
                );
                Ok(result)
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                tracing::error!(error = %message, state = %PipelineState::Failed, "Video analysis aborted");
                Err(AnalysisError::Internal(message))
            }
        }
    }

    async fn run_stages(&self, url: &str, bundle: &MediaBundle) -> AnalysisResult {
        tracing::debug!(state = %PipelineState::RateLimited, "Waiting for rate limiter");
        self.rate_limiter.acquire().await;

        tracing::debug!(state = %PipelineState::Analyzing, "Transcribing and analyzing frames");
        let (transcript, visual_analysis) = tokio::join!(
            transcribe_or_empty(&self.transcriber, bundle.transcription_source()),
            self.visual_analyzer.analyze(&bundle.frame_paths),
        );

        let mut degraded_stages = Vec::new();
        let transcript = settle(transcript, &mut degraded_stages);
        let visual_analysis = settle(visual_analysis, &mut degraded_stages);

        tracing::debug!(state = %PipelineState::RateLimited, "Waiting for rate limiter");
        self.rate_limiter.acquire().await;

        tracing::debug!(state = %PipelineState::Summarizing, "Summarizing");
        let summary = self.summarizer.summarize(&transcript, &visual_analysis).await;
        let summary = settle(summary, &mut degraded_stages);

        AnalysisResult {
            url: url.to_string(),
            title: bundle.title.clone(),
            duration: bundle.duration,
            transcript,
            visual_analysis,
            summary,
            degraded_stages,
            analyzed_at: chrono::Utc::now(),
        }
    }
}

/// Owns the release of one acquired bundle. Dropping an unreleased lease
/// spawns the release on the current runtime.
struct BundleLease<M: MediaAcquirer + Send + Sync + 'static> {
    media: Arc<M>,
    bundle_id: Option<String>,
}

impl<M: MediaAcquirer + Send + Sync + 'static> BundleLease<M> {
    fn new(media: Arc<M>, bundle_id: &str) -> Self {
        Self {
            media,
            bundle_id: Some(bundle_id.to_string()),
        }
    }

    async fn release(mut self) {
        if let Some(bundle_id) = self.bundle_id.take() {
            self.media.release(&bundle_id).await;
        }
    }
}

impl<M: MediaAcquirer + Send + Sync + 'static> Drop for BundleLease<M> {
    fn drop(&mut self) {
        let Some(bundle_id) = self.bundle_id.take() else {
            return;
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                tracing::warn!(%bundle_id, "Analysis cancelled, releasing media in the background");
                let media = Arc::clone(&self.media);
                handle.spawn(
                    async move { media.release(&bundle_id).await }.in_current_span(),
                );
            }
            Err(_) => {
                tracing::error!(%bundle_id, "No runtime left to release media on");
            }
        }
    }
}

fn settle<T: Default>(outcome: StageOutcome<T>, degraded: &mut Vec<StageKind>) -> T {
    if let StageOutcome::Degraded { stage, .. } = &outcome {
        degraded.push(*stage);
    }
    outcome.into_value()
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "analysis task panicked".to_string())
}
