//! The transcode → size-fit → upload pipeline.
//!
//! The pipeline takes the media file downloaded from Telegram, re-encodes
//! it as an optimized GIF that fits the configured size budget and pushes
//! the result to a public file hosting.

mod artifact;
mod fit;
mod profile;
mod transcode;
mod upload;

pub(crate) use artifact::*;
pub(crate) use fit::*;
pub(crate) use profile::*;
pub(crate) use transcode::*;
pub(crate) use upload::*;

use crate::http;
use crate::util::units::MB;
use serde::Deserialize;

#[derive(Deserialize, Clone)]
pub(crate) struct Config {
    /// Target ceiling for the final artifact, in megabytes. It is a soft
    /// target: if even the most aggressive profile overshoots it, the
    /// smallest artifact obtained is shipped anyway.
    #[serde(default = "default_max_size_mb")]
    max_size_mb: u64,
}

fn default_max_size_mb() -> u64 {
    3
}

impl Config {
    pub(crate) fn size_budget(&self) -> u64 {
        self.max_size_mb * MB
    }
}

pub(crate) struct MediaService {
    transcoder: FfmpegTranscoder,
    uploader: UploadDispatcher,
    budget: u64,
}

impl MediaService {
    pub(crate) fn new(cfg: &Config, http: http::Client) -> Self {
        Self {
            transcoder: FfmpegTranscoder,
            uploader: UploadDispatcher::new(http),
            budget: cfg.size_budget(),
        }
    }

    /// Converts the input into a GIF that fits the size budget. Never fails:
    /// the worst case is passing the original input through unmodified.
    pub(crate) async fn optimize(&self, input: MediaArtifact) -> MediaArtifact {
        fit(&self.transcoder, input, DEFAULT_LADDER, self.budget).await
    }

    /// Pushes the final artifact to a public file hosting and returns the
    /// download link.
    pub(crate) async fn publish(&self, artifact: &MediaArtifact) -> Result<url::Url, UploadError> {
        self.uploader.upload(artifact).await
    }
}
