//! Degrade-not-abort stage results.
//!
//! Transcription, visual analysis and summarization never fail the pipeline.
//! Their errors are logged where they happen and turned into a
//! [`StageOutcome::Degraded`] marker carrying whatever partial value the
//! stage still produced, usually the stage's empty value.

use std::fmt;

use serde::Serialize;

use crate::error::{ModelError, StageErrorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Transcription,
    VisualAnalysis,
    Summarization,
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match self {
            StageKind::Transcription => "transcription",
            StageKind::VisualAnalysis => "visual_analysis",
            StageKind::Summarization => "summarization",
        };
        f.write_str(stage)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome<T> {
    Completed(T),
    Degraded {
        stage: StageKind,
        kind: StageErrorKind,
        reason: String,
        partial: T,
    },
}

impl<T: Default> StageOutcome<T> {
    /// Converts a model call result into an outcome, logging the failure.
    pub fn capture(stage: StageKind, result: Result<T, ModelError>) -> Self {
        match result {
            Ok(value) => StageOutcome::Completed(value),
            Err(e) => StageOutcome::degraded(stage, &e),
        }
    }

    pub fn degraded(stage: StageKind, error: &ModelError) -> Self {
        Self::degraded_with(stage, error.kind(), error.to_string(), T::default())
    }

    /// A degraded outcome that still keeps what the stage managed to produce
    pub fn degraded_with(stage: StageKind, kind: StageErrorKind, reason: String, partial: T) -> Self {
        tracing::warn!(%stage, error_kind = %kind, error = %reason, "Stage degraded");
        StageOutcome::Degraded {
            stage,
            kind,
            reason,
            partial,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, StageOutcome::Degraded { .. })
    }

    /// The produced value, or the partial value of a degraded stage
    pub fn into_value(self) -> T {
        match self {
            StageOutcome::Completed(value) => value,
            StageOutcome::Degraded { partial, .. } => partial,
        }
    }
}
