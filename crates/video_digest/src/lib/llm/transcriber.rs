use std::{future::Future, path::Path};

use crate::{
    error::ModelError,
    stage::{StageKind, StageOutcome},
};

pub trait Transcriber {
    const TRANSCRIBER_MODEL: &'static str;

    /// One speech-to-text call for the given audio or video file
    fn transcribe(&self, media: &Path) -> impl Future<Output = Result<String, ModelError>> + Send;
}

/// Transcribes `media`, degrading to an empty transcript on failure.
#[tracing::instrument(skip(transcriber))]
pub async fn transcribe_or_empty<T>(transcriber: &T, media: &Path) -> StageOutcome<String>
where
    T: Transcriber + Send + Sync,
{
    let outcome = StageOutcome::capture(StageKind::Transcription, transcriber.transcribe(media).await);
    if let StageOutcome::Completed(text) = &outcome {
        tracing::info!(chars = text.len(), "Transcription complete");
    }
    outcome
}
