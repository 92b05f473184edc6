use std::sync::Arc;

use crate::{
    llm::{
        summarizer::Summarizer, transcriber::Transcriber, visual::VisualAnalyzer, TextModel,
        VisionModel,
    },
    media::MediaAcquirer,
    rate_limiter::RateLimiter,
    AnalysisOrchestrator,
};

pub struct AnalysisOrchestratorBuilder<M = (), T = (), C = ()> {
    media: M,
    transcriber: T,
    model: C,
    rate_limiter: Option<Arc<RateLimiter>>,
    batch_size: usize,
    transcript_limit: usize,
}

impl AnalysisOrchestratorBuilder {
    pub fn new() -> Self {
        Self {
            media: (),
            transcriber: (),
            model: (),
            rate_limiter: None,
            batch_size: 4,
            transcript_limit: 2000,
        }
    }
}

impl Default for AnalysisOrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl<M, T, C> AnalysisOrchestratorBuilder<M, T, C> {
    pub fn media_acquirer<M2: MediaAcquirer + Send + Sync + 'static>(
        self,
        media: M2,
    ) -> AnalysisOrchestratorBuilder<M2, T, C> {
        AnalysisOrchestratorBuilder {
            media,
            transcriber: self.transcriber,
            model: self.model,
            rate_limiter: self.rate_limiter,
            batch_size: self.batch_size,
            transcript_limit: self.transcript_limit,
        }
    }

    pub fn transcriber<T2: Transcriber + Send + Sync + 'static>(
        self,
        transcriber: T2,
    ) -> AnalysisOrchestratorBuilder<M, T2, C> {
        AnalysisOrchestratorBuilder {
            media: self.media,
            transcriber,
            model: self.model,
            rate_limiter: self.rate_limiter,
            batch_size: self.batch_size,
            transcript_limit: self.transcript_limit,
        }
    }

    /// The model client used for frame analysis, aggregation and summarization
    pub fn model<C2: VisionModel + TextModel + Send + Sync + 'static>(
        self,
        model: Arc<C2>,
    ) -> AnalysisOrchestratorBuilder<M, T, Arc<C2>> {
        AnalysisOrchestratorBuilder {
            media: self.media,
            transcriber: self.transcriber,
            model,
            rate_limiter: self.rate_limiter,
            batch_size: self.batch_size,
            transcript_limit: self.transcript_limit,
        }
    }

    /// Shares a limiter with other orchestrators; a private one allowing
    /// [`RateLimiter::DEFAULT_CALLS_PER_MINUTE`] is created otherwise.
    pub fn rate_limiter(mut self, rate_limiter: Arc<RateLimiter>) -> Self {
        self.rate_limiter = Some(rate_limiter);
        self
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn transcript_limit(mut self, transcript_limit: usize) -> Self {
        self.transcript_limit = transcript_limit;
        self
    }
}

impl<M, T, C> AnalysisOrchestratorBuilder<M, T, Arc<C>>
where
    M: MediaAcquirer + Send + Sync + 'static,
    T: Transcriber + Send + Sync + 'static,
    C: VisionModel + TextModel + Send + Sync + 'static,
{
    pub fn build(self) -> AnalysisOrchestrator<M, T, C> {
        AnalysisOrchestrator {
            media: Arc::new(self.media),
            transcriber: self.transcriber,
            visual_analyzer: VisualAnalyzer::new(self.model.clone())
                .with_batch_size(self.batch_size),
            summarizer: Summarizer::new(self.model).with_transcript_limit(self.transcript_limit),
            rate_limiter: self.rate_limiter.unwrap_or_default(),
        }
    }
}
