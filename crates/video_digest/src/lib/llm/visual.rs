use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use futures::future::join_all;
use itertools::Itertools;

use crate::{
    error::StageErrorKind,
    llm::{ChatRequest, TextModel, VisionModel},
    stage::{StageKind, StageOutcome},
    types::{FrameFinding, VisualAnalysis},
};

/// Describes frames with a vision model in fixed-size batches, then merges
/// the per-frame findings with one text model call.
#[derive(Debug)]
pub struct VisualAnalyzer<C> {
    model: Arc<C>,
    batch_size: usize,
}

impl<C> VisualAnalyzer<C>
where
    C: VisionModel + TextModel + Send + Sync + 'static,
{
    pub const DEFAULT_BATCH_SIZE: usize = 4;

    const FRAME_SYSTEM_PROMPT: &'static str = "Analyze this frame from an educational video. Focus on identifying educational elements, visual aids, and teaching methods.";
    const FRAME_USER_PROMPT: &'static str =
        "Describe the educational elements and visual content in this frame.";
    const AGGREGATION_SYSTEM_PROMPT: &'static str = "Summarize the visual analysis of multiple video frames into a cohesive educational content analysis.";

    pub fn new(model: Arc<C>) -> Self {
        Self {
            model,
            batch_size: Self::DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Analyzes `frames` in order. Batch `n + 1` is only dispatched once every
    /// frame of batch `n` has a finding, so at most `batch_size` vision calls
    /// are in flight.
    #[tracing::instrument(skip_all, fields(frames = frames.len(), batch_size = self.batch_size))]
    pub async fn analyze(&self, frames: &[PathBuf]) -> StageOutcome<VisualAnalysis> {
        if frames.is_empty() {
            tracing::info!("No frames to analyze");
            return StageOutcome::Completed(VisualAnalysis::default());
        }

        let mut findings = Vec::with_capacity(frames.len());
        let mut last_error = None;
        for (batch, chunk) in frames.chunks(self.batch_size).enumerate() {
            tracing::debug!(batch, size = chunk.len(), "Dispatching frame batch");
            let results = join_all(chunk.iter().map(|frame| self.analyze_frame(frame))).await;
            for (finding, error_kind) in results {
                last_error = error_kind.or(last_error);
                findings.push(finding);
            }
        }

        let described = findings.iter().filter(|f| !f.description.is_empty()).count();
        tracing::info!(described, total = findings.len(), "Frame analysis complete");

        if described == 0 {
            let kind = last_error.unwrap_or(StageErrorKind::EmptyResponse);
            return StageOutcome::degraded_with(
                StageKind::VisualAnalysis,
                kind,
                format!("none of {} frames could be described", findings.len()),
                VisualAnalysis {
                    frame_count: findings.len(),
                    summary: String::new(),
                    frame_details: findings,
                },
            );
        }

        let request =
            ChatRequest::new(Self::AGGREGATION_SYSTEM_PROMPT, aggregation_prompt(&findings))
                .max_tokens(500);

        match self.model.complete(request).await {
            Ok(summary) => StageOutcome::Completed(VisualAnalysis {
                frame_count: findings.len(),
                summary,
                frame_details: findings,
            }),
            Err(e) => StageOutcome::degraded(StageKind::VisualAnalysis, &e),
        }
    }

    /// A failed frame gets an empty description and reports its error kind
    async fn analyze_frame(&self, frame: &Path) -> (FrameFinding, Option<StageErrorKind>) {
        let request =
            ChatRequest::new(Self::FRAME_SYSTEM_PROMPT, Self::FRAME_USER_PROMPT).max_tokens(300);

        let (description, error_kind) = match self.model.describe_image(frame, request).await {
            Ok(description) => (description, None),
            Err(e) => {
                tracing::warn!(
                    frame = %frame.display(),
                    error_kind = %e.kind(),
                    error = %e,
                    "Frame analysis failed"
                );
                (String::new(), Some(e.kind()))
            }
        };

        let finding = FrameFinding {
            frame_path: frame.to_path_buf(),
            description,
        };
        (finding, error_kind)
    }
}

/// Lists the non-empty findings in temporal order for the aggregation call
fn aggregation_prompt(findings: &[FrameFinding]) -> String {
    let observations = findings
        .iter()
        .enumerate()
        .filter(|(_, finding)| !finding.description.is_empty())
        .map(|(idx, finding)| {
            let name = finding
                .frame_path
                .file_name()
                .map(|name| name.to_string_lossy())
                .unwrap_or_default();
            format!("Frame {} ({name}):\n{}", idx + 1, finding.description.trim())
        })
        .join("\n\n");

    format!(
        "The following observations were made on frames sampled from an educational video, in temporal order.\n\n{observations}"
    )
}
