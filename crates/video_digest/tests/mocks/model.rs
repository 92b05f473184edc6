use std::{
    collections::{HashMap, HashSet},
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};
use tokio::time::Instant;
use video_digest::{ChatRequest, ModelError, TextModel, VisionModel};

pub const SUMMARY_TEXT: &str =
    "## Summary\nAn introduction to derivatives.\n\n4. Educational value assessment (1-10): 8";
pub const AGGREGATED_TEXT: &str = "Whiteboard derivations alternating with slides.";

/// Vision + text model double. Frame descriptions are derived from the frame
/// file name so tests can check ordering.
#[derive(Clone)]
pub struct MockModel {
    pub frame_calls: Arc<Mutex<Vec<(PathBuf, Instant)>>>,
    pub text_calls: Arc<Mutex<Vec<ChatRequest>>>,
    pub failing_frames: HashSet<PathBuf>,
    /// Text calls whose system prompt contains this fail
    pub fail_text_matching: Option<String>,
    pub frame_delay: Duration,
    pub frame_delays: HashMap<PathBuf, Duration>,
    pub in_flight: Arc<AtomicUsize>,
    pub max_in_flight: Arc<AtomicUsize>,
}

impl Default for MockModel {
    fn default() -> Self {
        Self {
            frame_calls: Arc::new(Mutex::new(Vec::new())),
            text_calls: Arc::new(Mutex::new(Vec::new())),
            failing_frames: HashSet::new(),
            fail_text_matching: None,
            frame_delay: Duration::ZERO,
            frame_delays: HashMap::new(),
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl MockModel {
    pub fn with_frame_delay(delay: Duration) -> Self {
        Self {
            frame_delay: delay,
            ..Default::default()
        }
    }

    pub fn failing_text(system_prompt_fragment: &str) -> Self {
        Self {
            fail_text_matching: Some(system_prompt_fragment.to_string()),
            ..Default::default()
        }
    }

    pub fn description_for(frame: &Path) -> String {
        format!(
            "description of {}",
            frame.file_name().unwrap().to_string_lossy()
        )
    }

    /// Distinct instants at which frame calls started
    pub fn dispatch_instants(&self) -> Vec<Instant> {
        let mut instants = self
            .frame_calls
            .lock()
            .unwrap()
            .iter()
            .map(|(_, at)| *at)
            .collect::<Vec<_>>();
        instants.sort();
        instants.dedup();
        instants
    }
}

impl VisionModel for MockModel {
    const VISION_MODEL: &'static str = "mock-vision";

    async fn describe_image(&self, image: &Path, _request: ChatRequest) -> Result<String, ModelError> {
        self.frame_calls
            .lock()
            .unwrap()
            .push((image.to_path_buf(), Instant::now()));

        let now_in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now_in_flight, Ordering::SeqCst);

        let delay = self
            .frame_delays
            .get(image)
            .copied()
            .unwrap_or(self.frame_delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing_frames.contains(image) {
            return Err(ModelError::Api {
                status: 500,
                message: format!("vision model rejected {}", image.display()),
            });
        }
        Ok(Self::description_for(image))
    }
}

impl TextModel for MockModel {
    const TEXT_MODEL: &'static str = "mock-llama";

    async fn complete(&self, request: ChatRequest) -> Result<String, ModelError> {
        self.text_calls.lock().unwrap().push(request.clone());

        if let Some(ref fragment) = self.fail_text_matching {
            if request.system.contains(fragment.as_str()) {
                return Err(ModelError::Api {
                    status: 429,
                    message: "rate limited upstream".into(),
                });
            }
        }

        if request.system.contains("visual analysis of multiple video frames") {
            Ok(AGGREGATED_TEXT.to_string())
        } else {
            Ok(SUMMARY_TEXT.to_string())
        }
    }
}
