use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::stage::StageKind;

#[derive(Debug, Clone, Deserialize)]
pub struct VideoRequest {
    pub url: String,
}

/// Everything acquired for one analysis request. Owned by that request only;
/// `id` is what [`crate::media::MediaAcquirer::release`] needs to remove it again.
#[derive(Debug, Clone)]
pub struct MediaBundle {
    pub id: String,
    pub video_path: PathBuf,
    pub audio_path: Option<PathBuf>,
    /// Extracted stills in temporal order
    pub frame_paths: Vec<PathBuf>,
    pub title: String,
    pub duration: Option<f64>,
}

impl MediaBundle {
    /// The resource handed to the transcriber: the extracted audio track when
    /// there is one, the full video otherwise.
    pub fn transcription_source(&self) -> &Path {
        self.audio_path.as_deref().unwrap_or(&self.video_path)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FrameFinding {
    pub frame_path: PathBuf,
    /// Empty when the vision call for this frame failed
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VisualAnalysis {
    pub frame_count: usize,
    pub summary: String,
    pub frame_details: Vec<FrameFinding>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Summary {
    pub summary: String,
    /// Score in `1..=10` parsed out of the generated summary
    pub educational_value: Option<u8>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResult {
    pub url: String,
    pub title: String,
    pub duration: Option<f64>,
    pub transcript: String,
    pub visual_analysis: VisualAnalysis,
    pub summary: Summary,
    pub degraded_stages: Vec<StageKind>,
    pub analyzed_at: DateTime<Utc>,
}
