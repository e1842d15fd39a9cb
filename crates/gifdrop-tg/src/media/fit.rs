use super::{ConversionError, MediaArtifact, Profile, Transcode};
use crate::prelude::*;

/// Shrinks `input` until it fits into `budget` bytes.
///
/// Profiles are tried in descending-quality order. The first artifact that
/// fits the budget is returned immediately; an oversized artifact is
/// discarded as soon as the next profile produces something. When the whole
/// ladder is exhausted the smallest artifact obtained is returned anyway:
/// the budget is a soft target, not a hard rejection criterion.
///
/// A profile that fails to transcode is never retried; the loop advances to
/// the next one. If the conversion tool is missing entirely, the original
/// input is passed through unmodified.
#[instrument(skip_all, fields(input_size = input.size(), budget))]
pub(crate) async fn fit(
    transcoder: &impl Transcode,
    input: MediaArtifact,
    ladder: &[Profile],
    budget: u64,
) -> MediaArtifact {
    debug_assert!(budget > 0);

    // At most one transcoded artifact is alive at a time. Replacing it
    // drops the superseded scratch file from disk.
    let mut best = None;

    for profile in ladder {
        let artifact = match transcoder.transcode(&input, profile).await {
            Ok(artifact) => artifact,
            Err(err @ ConversionError::ToolUnavailable { .. }) => {
                warn!(
                    err = tracing_err(&err),
                    "Conversion tool is missing, passing the input through"
                );
                return best.unwrap_or(input);
            }
            Err(err) => {
                warn!(
                    err = tracing_err(&err),
                    profile = profile.name,
                    "Profile failed, advancing to the next one"
                );
                continue;
            }
        };

        metrics::histogram!("gif_profile_output_size_bytes", artifact.size() as f64);

        if artifact.size() <= budget {
            info!(
                size = artifact.size(),
                profile = profile.name,
                "Artifact fits the budget"
            );
            return artifact;
        }

        info!(
            size = artifact.size(),
            profile = profile.name,
            "Artifact is over budget"
        );

        best = Some(artifact);
    }

    match best {
        Some(best) => {
            info!(size = best.size(), "Budget not met, returning the smallest artifact");
            best
        }
        None => {
            warn!("Every profile failed, passing the input through");
            input
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{MediaFormat, DEFAULT_LADDER};
    use crate::util::temp_file::scratch_path;
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::Mutex;

    enum Outcome {
        /// Write an output file of this many bytes
        Produce(u64),
        Fail,
        Unavailable,
    }

    /// Replays scripted outcomes instead of invoking ffmpeg, and records
    /// the paths of the files it produced so tests can check cleanup.
    struct ScriptedTranscoder {
        outcomes: Mutex<Vec<Outcome>>,
        produced: Mutex<Vec<PathBuf>>,
    }

    impl ScriptedTranscoder {
        fn new(outcomes: Vec<Outcome>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes),
                produced: Mutex::new(vec![]),
            }
        }

        fn produced(&self) -> Vec<PathBuf> {
            self.produced.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transcode for ScriptedTranscoder {
        async fn transcode(
            &self,
            _input: &MediaArtifact,
            profile: &Profile,
        ) -> Result<MediaArtifact, ConversionError> {
            let outcome = self.outcomes.lock().unwrap().remove(0);

            match outcome {
                Outcome::Produce(size) => {
                    let path = scratch_path("gif");
                    fs_err::tokio::write(&path, vec![0u8; size as usize])
                        .await
                        .unwrap();
                    self.produced.lock().unwrap().push(path.to_path_buf());
                    Ok(MediaArtifact::from_scratch_path(path, MediaFormat::Gif)
                        .await
                        .unwrap())
                }
                Outcome::Fail => Err(ConversionError::ConversionFailed {
                    profile: profile.name,
                    source: None,
                }),
                Outcome::Unavailable => Err(ConversionError::ToolUnavailable {
                    source: crate::util::process::ProcessError::NotFound {
                        program: "ffmpeg".to_owned(),
                    },
                }),
            }
        }
    }

    async fn source_artifact(size: u64) -> MediaArtifact {
        let path = scratch_path("mp4");
        fs_err::tokio::write(&path, vec![0u8; size as usize])
            .await
            .unwrap();
        MediaArtifact::from_scratch_path(path, MediaFormat::Source)
            .await
            .unwrap()
    }

    #[test_log::test(tokio::test)]
    async fn first_fitting_profile_wins_and_discards_the_oversized_attempt() {
        // The concrete scenario: 20-byte input, budget 8, ladder produces
        // 10 then 6. Profile A's file must be gone once B is returned.
        let transcoder =
            ScriptedTranscoder::new(vec![Outcome::Produce(10), Outcome::Produce(6)]);
        let input = source_artifact(20).await;

        let result = fit(&transcoder, input, DEFAULT_LADDER, 8).await;

        assert_eq!(result.size(), 6);
        assert_eq!(result.format(), MediaFormat::Gif);

        let produced = transcoder.produced();
        assert!(!produced[0].exists(), "superseded artifact must be deleted");
        assert!(produced[1].exists());
    }

    #[test_log::test(tokio::test)]
    async fn first_profile_fitting_returns_without_trying_later_ones() {
        // Only one outcome is scripted: a second transcode would panic.
        let transcoder = ScriptedTranscoder::new(vec![Outcome::Produce(5)]);
        let input = source_artifact(20).await;

        let result = fit(&transcoder, input, DEFAULT_LADDER, 8).await;

        assert_eq!(result.size(), 5);
    }

    #[test_log::test(tokio::test)]
    async fn exhausted_ladder_returns_the_smallest_artifact_not_the_input() {
        let transcoder = ScriptedTranscoder::new(vec![
            Outcome::Produce(12),
            Outcome::Produce(11),
            Outcome::Produce(10),
        ]);
        let input = source_artifact(20).await;
        let input_path = input.path().to_path_buf();

        let result = fit(&transcoder, input, DEFAULT_LADDER, 8).await;

        assert_eq!(result.size(), 10);
        assert_eq!(result.format(), MediaFormat::Gif);

        // Everything superseded is gone, including the original input
        let produced = transcoder.produced();
        assert!(!produced[0].exists());
        assert!(!produced[1].exists());
        assert!(produced[2].exists());
        assert!(!input_path.exists());
    }

    #[test_log::test(tokio::test)]
    async fn tool_unavailable_passes_the_input_through() {
        let transcoder = ScriptedTranscoder::new(vec![Outcome::Unavailable]);
        let input = source_artifact(20).await;
        let input_path = input.path().to_path_buf();

        let result = fit(&transcoder, input, DEFAULT_LADDER, 8).await;

        assert_eq!(result.size(), 20);
        assert_eq!(result.format(), MediaFormat::Source);
        assert_eq!(result.path(), input_path);
    }

    #[test_log::test(tokio::test)]
    async fn failed_profile_advances_without_retry() {
        let transcoder =
            ScriptedTranscoder::new(vec![Outcome::Fail, Outcome::Produce(4)]);
        let input = source_artifact(20).await;

        let result = fit(&transcoder, input, DEFAULT_LADDER, 8).await;

        assert_eq!(result.size(), 4);
    }

    #[test_log::test(tokio::test)]
    async fn all_profiles_failing_passes_the_input_through() {
        let transcoder =
            ScriptedTranscoder::new(vec![Outcome::Fail, Outcome::Fail, Outcome::Fail]);
        let input = source_artifact(20).await;

        let result = fit(&transcoder, input, DEFAULT_LADDER, 8).await;

        assert_eq!(result.size(), 20);
        assert_eq!(result.format(), MediaFormat::Source);
    }
}
