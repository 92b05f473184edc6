pub mod ytdlp;

use std::future::Future;

use crate::{error::AcquisitionError, types::MediaBundle};

pub trait MediaAcquirer {
    /// Downloads the video behind `url` and extracts its frames.
    fn acquire(&self, url: &str)
        -> impl Future<Output = Result<MediaBundle, AcquisitionError>> + Send;

    /// Best-effort removal of everything a prior `acquire` left on disk.
    /// Failures are logged, never returned; an unknown id is a no-op.
    fn release(&self, bundle_id: &str) -> impl Future<Output = ()> + Send;
}
