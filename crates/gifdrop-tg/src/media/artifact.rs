use std::path::Path;
use tempfile::TempPath;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MediaFormat {
    /// The file as it was downloaded from Telegram.
    Source,
    /// A GIF produced by the transcoder.
    Gif,
}

/// A file produced or held during the pipeline.
///
/// The backing file lives in the scratch directory and is deleted when the
/// artifact is dropped. Whoever holds the artifact owns the file; the
/// size-fit loop relies on this to discard superseded attempts.
#[derive(Debug)]
pub(crate) struct MediaArtifact {
    path: TempPath,
    size: u64,
    format: MediaFormat,
}

impl MediaArtifact {
    /// Binds an artifact to a file already written at `path`.
    pub(crate) async fn from_scratch_path(
        path: TempPath,
        format: MediaFormat,
    ) -> Result<Self, std::io::Error> {
        let size = fs_err::tokio::metadata(&path).await?.len();
        Ok(Self { path, size, format })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn size(&self) -> u64 {
        self.size
    }

    pub(crate) fn format(&self) -> MediaFormat {
        self.format
    }
}
