use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};
use video_digest::{ModelError, Transcriber};

#[derive(Clone)]
pub struct MockTranscriber {
    pub response_text: String,
    pub calls: Arc<Mutex<Vec<PathBuf>>>,
    pub fail_with: Option<String>,
    pub panic_with: Option<String>,
}

impl MockTranscriber {
    pub fn new(response_text: &str) -> Self {
        Self {
            response_text: response_text.to_string(),
            calls: Arc::new(Mutex::new(Vec::new())),
            fail_with: None,
            panic_with: None,
        }
    }

    pub fn failing(msg: &str) -> Self {
        Self {
            fail_with: Some(msg.to_string()),
            ..Self::new("")
        }
    }

    pub fn panicking(msg: &str) -> Self {
        Self {
            panic_with: Some(msg.to_string()),
            ..Self::new("")
        }
    }
}

impl Transcriber for MockTranscriber {
    const TRANSCRIBER_MODEL: &'static str = "mock-whisper";

    async fn transcribe(&self, media: &Path) -> Result<String, ModelError> {
        self.calls.lock().unwrap().push(media.to_path_buf());
        if let Some(ref msg) = self.panic_with {
            panic!("{}", msg);
        }
        if let Some(ref msg) = self.fail_with {
            return Err(ModelError::Api {
                status: 503,
                message: msg.clone(),
            });
        }
        Ok(self.response_text.clone())
    }
}
