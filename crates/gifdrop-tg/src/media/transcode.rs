use super::{MediaArtifact, MediaFormat, Palette, Profile};
use crate::prelude::*;
use crate::util::process::{self, ProcessError};
use crate::util::temp_file::scratch_path;
use async_trait::async_trait;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub(crate) enum ConversionError {
    /// The conversion tool is missing on the host. The caller is expected
    /// to pass the original input through unmodified.
    #[error("The conversion tool is not available on this host")]
    ToolUnavailable { source: ProcessError },

    /// The tool ran, but produced no usable output for this profile.
    /// Recoverable by advancing to the next profile.
    #[error("Conversion with profile `{profile}` produced no usable output")]
    ConversionFailed {
        profile: &'static str,
        source: Option<ProcessError>,
    },
}

#[async_trait]
pub(crate) trait Transcode {
    async fn transcode(
        &self,
        input: &MediaArtifact,
        profile: &Profile,
    ) -> Result<MediaArtifact, ConversionError>;
}

/// Turns the input media into an optimized GIF by shelling out to ffmpeg.
pub(crate) struct FfmpegTranscoder;

#[async_trait]
impl Transcode for FfmpegTranscoder {
    #[instrument(skip_all, fields(
        input = %input.path().display(),
        profile = profile.name,
    ))]
    async fn transcode(
        &self,
        input: &MediaArtifact,
        profile: &Profile,
    ) -> Result<MediaArtifact, ConversionError> {
        let output = scratch_path("gif");

        let filters = format!(
            "fps={},scale={}:-1:flags=lanczos",
            profile.fps, profile.scale_width
        );

        let result = match &profile.palette {
            Some(palette) => {
                palette_encode(input.path(), &output, &filters, palette).await
            }
            None => plain_encode(input.path(), &output, &filters).await,
        };

        result.map_err(|source| match source {
            ProcessError::NotFound { .. } => ConversionError::ToolUnavailable { source },
            source => ConversionError::ConversionFailed {
                profile: profile.name,
                source: Some(source),
            },
        })?;

        // ffmpeg exiting with 0 while writing nothing is still a failure
        let artifact = MediaArtifact::from_scratch_path(output, MediaFormat::Gif)
            .await
            .map_err(|_| ConversionError::ConversionFailed {
                profile: profile.name,
                source: None,
            })?;

        if artifact.size() == 0 {
            return Err(ConversionError::ConversionFailed {
                profile: profile.name,
                source: None,
            });
        }

        Ok(artifact)
    }
}

/// Single-pass encode with the default 256-color palette.
async fn plain_encode(input: &Path, output: &Path, filters: &str) -> Result<(), ProcessError> {
    let input_arg = input.to_string_lossy();
    let output_arg = output.to_string_lossy();
    let log_message = format!("Converting to GIF with output at {output:?}");

    // Rustfmt is doing a bad job of condensing this code, so let's disable it
    #[rustfmt::skip]
    let args: [&str; 6] = [
        // Set input path
        "-i",
        &input_arg,

        // Frame rate reduction and lanczos downscale
        "-vf",
        filters,

        // Overwrite output file without interactive confirmation
        "-y",
        &output_arg,
    ];

    ffmpeg(&args).with_duration_log(&log_message).await?;

    Ok(())
}

/// Two-pass encode: generate a reduced palette from the source first, then
/// re-encode using that palette with ordered dithering. Better visual
/// fidelity at equal size.
async fn palette_encode(
    input: &Path,
    output: &Path,
    filters: &str,
    palette: &Palette,
) -> Result<(), ProcessError> {
    // The palette image is transient. Its handle is dropped at the end of
    // this function, so it can never leak into the upload set.
    let palette_path = scratch_path("png");

    let input_arg = input.to_string_lossy();
    let output_arg = output.to_string_lossy();
    let palette_arg = palette_path.to_string_lossy();

    let palettegen = format!("{filters},palettegen=stats_mode=diff");
    let log_message = format!("Generating a palette at {palette_path:?}");

    // Rustfmt is doing a bad job of condensing this code, so let's disable it
    #[rustfmt::skip]
    let args: [&str; 6] = [
        "-i",
        &input_arg,

        // Build the palette from the frames that actually differ
        "-vf",
        &palettegen,

        "-y",
        &palette_arg,
    ];

    ffmpeg(&args).with_duration_log(&log_message).await?;

    let paletteuse = format!(
        "{filters}[x];[x][1:v]paletteuse=dither=bayer:bayer_scale={}",
        palette.bayer_scale
    );
    let log_message = format!("Converting to GIF with output at {output:?}");

    // Rustfmt is doing a bad job of condensing this code, so let's disable it
    #[rustfmt::skip]
    let args: [&str; 8] = [
        "-i",
        &input_arg,

        // The palette is the second input stream
        "-i",
        &palette_arg,

        // Re-encode through the palette with ordered dithering
        "-lavfi",
        &paletteuse,

        "-y",
        &output_arg,
    ];

    ffmpeg(&args).with_duration_log(&log_message).await?;

    Ok(())
}

async fn ffmpeg(args: &[&str]) -> Result<Vec<u8>, ProcessError> {
    process::run("ffmpeg", args).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::DEFAULT_LADDER;

    /// Requires ffmpeg on the host and a real input file. Run manually:
    /// `GIF_SANDBOX_INPUT=./sample.mp4 cargo test manual_sandbox -- --ignored`
    #[test_log::test(tokio::test)]
    #[ignore]
    async fn manual_sandbox() {
        let input = std::env::var("GIF_SANDBOX_INPUT").unwrap();

        let path = scratch_path("mp4");
        fs_err::tokio::copy(&input, &path).await.unwrap();

        let input = MediaArtifact::from_scratch_path(path, MediaFormat::Source)
            .await
            .unwrap();

        let artifact = FfmpegTranscoder
            .transcode(&input, &DEFAULT_LADDER[0])
            .await
            .unwrap();

        dbg!(artifact.size());
    }
}
