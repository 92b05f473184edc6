use std::{
    path::{Path, PathBuf},
    process::{Output, Stdio},
};

use serde::Deserialize;
use tokio::process::Command;
use uuid::Uuid;

use crate::{error::AcquisitionError, media::MediaAcquirer, types::MediaBundle};

/// Downloads videos with `yt-dlp` and samples frames with `ffmpeg`.
///
/// Each acquisition lives in its own `<workdir>/<bundle id>/` directory:
///
/// ```text
/// <bundle id>/
///   video.mp4
///   audio.mp3
///   frames/frame_00001.jpg ...
/// ```
#[derive(Debug, Clone)]
pub struct YtDlpAcquirer {
    workdir: PathBuf,
    ytdlp_path: PathBuf,
    ffmpeg_path: PathBuf,
    frame_interval: u32,
}

#[derive(Debug, Deserialize)]
struct VideoMetadata {
    id: String,
    title: Option<String>,
    duration: Option<f64>,
}

impl YtDlpAcquirer {
    pub const DEFAULT_FRAME_INTERVAL: u32 = 30;

    const VIDEO_FORMAT: &'static str = "bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]";
    const FRAMES_DIR: &'static str = "frames";
    const VIDEO_STEM: &'static str = "video";

    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
            ytdlp_path: "yt-dlp".into(),
            ffmpeg_path: "ffmpeg".into(),
            frame_interval: Self::DEFAULT_FRAME_INTERVAL,
        }
    }

    pub fn with_binaries(mut self, ytdlp: impl Into<PathBuf>, ffmpeg: impl Into<PathBuf>) -> Self {
        self.ytdlp_path = ytdlp.into();
        self.ffmpeg_path = ffmpeg.into();
        self
    }

    /// Keep every `frame_interval`-th decoded frame
    pub fn with_frame_interval(mut self, frame_interval: u32) -> Self {
        self.frame_interval = frame_interval.max(1);
        self
    }

    fn bundle_dir(&self, bundle_id: &str) -> PathBuf {
        self.workdir.join(bundle_id)
    }

    /// Downloads the video into `bundle_dir`, returning yt-dlp's metadata
    #[tracing::instrument(skip(self))]
    async fn download_video(
        &self,
        url: &str,
        bundle_dir: &Path,
    ) -> Result<(VideoMetadata, PathBuf), AcquisitionError> {
        let output_template = bundle_dir.join(format!("{}.%(ext)s", Self::VIDEO_STEM));

        let mut command = Command::new(&self.ytdlp_path);
        command
            .args(["--no-playlist", "--no-warnings", "--quiet"])
            .args(["--dump-single-json", "--no-simulate"])
            .args(["-f", Self::VIDEO_FORMAT, "--merge-output-format", "mp4"])
            .arg("-o")
            .arg(&output_template)
            .arg(url);

        let output = run_command(command)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to download video"))?;
        let metadata = serde_json::from_slice::<VideoMetadata>(&output.stdout)?;

        let video_path = find_video_file(bundle_dir)
            .await?
            .ok_or_else(|| AcquisitionError::MissingVideo(bundle_dir.to_path_buf()))?;

        tracing::info!(video_id = %metadata.id, path = %video_path.display(), "Video downloaded");
        Ok((metadata, video_path))
    }

    /// Writes every `frame_interval`-th frame to `frames_dir` and returns
    /// them in temporal order. A video shorter than one interval, or one
    /// ffmpeg cannot decode, yields none.
    #[tracing::instrument(skip(self))]
    async fn extract_frames(&self, video_path: &Path, frames_dir: &Path) -> Vec<PathBuf> {
        let select = format!("select=not(mod(n\\,{}))", self.frame_interval);

        let mut command = Command::new(&self.ffmpeg_path);
        command
            .args(["-nostdin", "-v", "error", "-i"])
            .arg(video_path)
            .args(["-vf", select.as_str(), "-vsync", "vfr", "-q:v", "2"])
            .arg(frames_dir.join("frame_%05d.jpg"));

        if let Err(e) = run_command(command).await {
            tracing::warn!(error = %e, "Frame extraction failed, continuing without frames");
            return Vec::new();
        }

        match list_frames(frames_dir).await {
            Ok(frames) => {
                tracing::info!(count = frames.len(), "Frames extracted");
                frames
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to list extracted frames");
                Vec::new()
            }
        }
    }

    /// Extracts a mono speech-quality audio track for transcription
    #[tracing::instrument(skip(self))]
    async fn extract_audio(
        &self,
        video_path: &Path,
        bundle_dir: &Path,
    ) -> Result<PathBuf, AcquisitionError> {
        let audio_path = bundle_dir.join("audio.mp3");

        let mut command = Command::new(&self.ffmpeg_path);
        command
            .args(["-nostdin", "-v", "error", "-y", "-i"])
            .arg(video_path)
            .args(["-vn", "-ac", "1", "-ar", "16000", "-b:a", "48k"])
            .arg(&audio_path);

        run_command(command).await?;
        Ok(audio_path)
    }

    async fn populate(
        &self,
        url: &str,
        bundle_id: &str,
        bundle_dir: &Path,
    ) -> Result<MediaBundle, AcquisitionError> {
        let (metadata, video_path) = self.download_video(url, bundle_dir).await?;

        let frames_dir = bundle_dir.join(Self::FRAMES_DIR);
        let (frames, audio) = tokio::join!(
            self.extract_frames(&video_path, &frames_dir),
            self.extract_audio(&video_path, bundle_dir),
        );

        // without a separate audio track the transcriber gets the whole video
        let audio_path = audio
            .inspect_err(|e| tracing::warn!(error = %e, "Audio extraction failed, using video"))
            .ok();

        Ok(MediaBundle {
            id: bundle_id.to_string(),
            video_path,
            audio_path,
            frame_paths: frames,
            title: metadata.title.unwrap_or(metadata.id),
            duration: metadata.duration,
        })
    }
}

impl MediaAcquirer for YtDlpAcquirer {
    #[tracing::instrument(skip(self))]
    async fn acquire(&self, url: &str) -> Result<MediaBundle, AcquisitionError> {
        let parsed = reqwest::Url::parse(url)
            .map_err(|e| AcquisitionError::InvalidUrl(format!("{url}: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(AcquisitionError::InvalidUrl(url.to_string()));
        }

        let bundle_id = Uuid::new_v4().to_string();
        let bundle_dir = self.bundle_dir(&bundle_id);
        tokio::fs::create_dir_all(bundle_dir.join(Self::FRAMES_DIR)).await?;

        match self.populate(url, &bundle_id, &bundle_dir).await {
            Ok(bundle) => Ok(bundle),
            Err(e) => {
                // the caller never sees this bundle, so nobody else will release it
                self.release(&bundle_id).await;
                Err(e)
            }
        }
    }

    #[tracing::instrument(skip(self))]
    async fn release(&self, bundle_id: &str) {
        if Uuid::parse_str(bundle_id).is_err() {
            tracing::warn!("Refusing to release a bundle id that was not issued here");
            return;
        }

        let bundle_dir = self.bundle_dir(bundle_id);
        match tokio::fs::remove_dir_all(&bundle_dir).await {
            Ok(()) => tracing::info!(path = ?bundle_dir, "Cleaned up media bundle"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = ?bundle_dir, "Media bundle already released")
            }
            Err(e) => {
                tracing::warn!(error = ?e, path = ?bundle_dir, "Failed to clean up media bundle")
            }
        }
    }
}

async fn run_command(mut command: Command) -> Result<Output, AcquisitionError> {
    let program = command
        .as_std()
        .get_program()
        .to_string_lossy()
        .into_owned();

    let output = command
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|source| AcquisitionError::Spawn {
            program: program.clone(),
            source,
        })?;

    if !output.status.success() {
        return Err(AcquisitionError::CommandFailed {
            program,
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(output)
}

async fn find_video_file(bundle_dir: &Path) -> std::io::Result<Option<PathBuf>> {
    let mut entries = tokio::fs::read_dir(bundle_dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_video = path.file_stem().is_some_and(|stem| stem == YtDlpAcquirer::VIDEO_STEM)
            && entry.file_type().await?.is_file();
        if is_video {
            return Ok(Some(path));
        }
    }
    Ok(None)
}

/// Frame files in extraction order. ffmpeg widens the counter past five
/// digits, so order follows the parsed index rather than the name.
async fn list_frames(frames_dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut frames = Vec::new();
    let mut entries = tokio::fs::read_dir(frames_dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if let Some(index) = frame_index(&path) {
            frames.push((index, path));
        }
    }
    frames.sort();
    Ok(frames.into_iter().map(|(_, path)| path).collect())
}

/// `frame_00042.jpg` -> 42
fn frame_index(path: &Path) -> Option<u64> {
    if !path.extension().is_some_and(|ext| ext == "jpg") {
        return None;
    }
    path.file_stem()?
        .to_str()?
        .strip_prefix("frame_")?
        .parse()
        .ok()
}
