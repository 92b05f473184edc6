use std::sync::{Arc, LazyLock};

use regex::Regex;

use crate::{
    llm::{ChatRequest, TextModel},
    stage::{StageKind, StageOutcome},
    types::{Summary, VisualAnalysis},
};

/// Strips rubric hints like "(1-10)" so they are not read as a score
static SCORE_RANGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(?\b1\s*(?:-|–|to)\s*10\b\)?").unwrap());

static SCORE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(\d{1,2}(?:\.\d+)?)\b").unwrap());

/// Combines transcript and visual findings into an educational summary
#[derive(Debug)]
pub struct Summarizer<C> {
    model: Arc<C>,
    transcript_limit: usize,
}

impl<C> Summarizer<C>
where
    C: TextModel + Send + Sync + 'static,
{
    pub const DEFAULT_TRANSCRIPT_LIMIT: usize = 2000;

    const SYSTEM_PROMPT: &'static str = "You are an educational content analyzer. Provide detailed, structured analysis of YouTube content focusing on educational value, key concepts, and practical insights.";

    pub fn new(model: Arc<C>) -> Self {
        Self {
            model,
            transcript_limit: Self::DEFAULT_TRANSCRIPT_LIMIT,
        }
    }

    /// Maximum number of transcript characters included in the prompt
    pub fn with_transcript_limit(mut self, transcript_limit: usize) -> Self {
        self.transcript_limit = transcript_limit;
        self
    }

    #[tracing::instrument(skip_all, fields(transcript_chars = transcript.len(), frames = visual_analysis.frame_count))]
    pub async fn summarize(
        &self,
        transcript: &str,
        visual_analysis: &VisualAnalysis,
    ) -> StageOutcome<Summary> {
        let prompt = summary_prompt(transcript, visual_analysis, self.transcript_limit);
        let request = ChatRequest::new(Self::SYSTEM_PROMPT, prompt).max_tokens(1024);

        match self.model.complete(request).await {
            Ok(text) => {
                let educational_value = extract_educational_value(&text);
                tracing::info!(?educational_value, "Summary generated");
                StageOutcome::Completed(Summary {
                    summary: text,
                    educational_value,
                })
            }
            Err(e) => StageOutcome::degraded(StageKind::Summarization, &e),
        }
    }
}

fn truncate_chars(text: &str, limit: usize) -> (&str, bool) {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => (&text[..idx], true),
        None => (text, false),
    }
}

fn summary_prompt(transcript: &str, visual_analysis: &VisualAnalysis, limit: usize) -> String {
    let (excerpt, truncated) = truncate_chars(transcript.trim(), limit);
    let excerpt = if excerpt.is_empty() {
        "(no transcript available)".to_string()
    } else if truncated {
        format!("{excerpt}...")
    } else {
        excerpt.to_string()
    };

    let visual = serde_json::json!({
        "frame_count": visual_analysis.frame_count,
        "summary": visual_analysis.summary,
    });

    format!(
        "Analyze the following YouTube video content:

TRANSCRIPT:
{excerpt}

VISUAL ELEMENTS:
{visual}

Please provide:
1. A concise summary of the main educational content
2. Key concepts and themes discussed
3. Practical insights and takeaways
4. Educational value assessment (1-10)
5. Target audience recommendation"
    )
}

/// Finds the first score in `1..=10` following an "educational value" mention
fn extract_educational_value(text: &str) -> Option<u8> {
    const MARKER: &str = "educational value";
    // ascii lowercasing keeps byte offsets aligned with `text`
    let lowered = text.to_ascii_lowercase();

    lowered.match_indices(MARKER).find_map(|(idx, _)| {
        let tail = &text[idx + MARKER.len()..];
        let window = match tail.char_indices().nth(120) {
            Some((end, _)) => &tail[..end],
            None => tail,
        };
        let window = SCORE_RANGE_RE.replace_all(window, "");

        SCORE_RE
            .captures(&window)
            .and_then(|caps| caps[1].parse::<f32>().ok())
            .map(|score| score.round())
            .filter(|score| (1.0..=10.0).contains(score))
            .map(|score| score as u8)
    })
}
