use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
};
use video_digest::{media::MediaAcquirer, types::MediaBundle, AcquisitionError};

#[derive(Clone)]
pub struct MockMediaAcquirer {
    pub frame_count: usize,
    pub with_audio: bool,
    pub acquired: Arc<Mutex<Vec<String>>>,
    pub released: Arc<Mutex<Vec<String>>>,
    pub fail_with: Option<String>,
}

impl Default for MockMediaAcquirer {
    fn default() -> Self {
        Self::with_frames(8)
    }
}

impl MockMediaAcquirer {
    pub fn with_frames(frame_count: usize) -> Self {
        Self {
            frame_count,
            with_audio: false,
            acquired: Arc::new(Mutex::new(Vec::new())),
            released: Arc::new(Mutex::new(Vec::new())),
            fail_with: None,
        }
    }

    pub fn failing(msg: &str) -> Self {
        Self {
            fail_with: Some(msg.to_string()),
            ..Self::with_frames(0)
        }
    }

    pub fn frame_paths(frame_count: usize) -> Vec<PathBuf> {
        (1..=frame_count)
            .map(|i| PathBuf::from(format!("/tmp/mock/frames/frame_{i:05}.jpg")))
            .collect()
    }
}

impl MediaAcquirer for MockMediaAcquirer {
    async fn acquire(&self, url: &str) -> Result<MediaBundle, AcquisitionError> {
        let bundle_number = {
            let mut acquired = self.acquired.lock().unwrap();
            acquired.push(url.to_string());
            acquired.len()
        };

        if let Some(ref msg) = self.fail_with {
            return Err(AcquisitionError::Unavailable(msg.clone()));
        }

        Ok(MediaBundle {
            id: format!("bundle-{bundle_number}"),
            video_path: PathBuf::from("/tmp/mock/video.mp4"),
            audio_path: self
                .with_audio
                .then(|| PathBuf::from("/tmp/mock/audio.mp3")),
            frame_paths: Self::frame_paths(self.frame_count),
            title: "Mock lecture".to_string(),
            duration: Some(90.0),
        })
    }

    async fn release(&self, bundle_id: &str) {
        self.released.lock().unwrap().push(bundle_id.to_string());
    }
}
