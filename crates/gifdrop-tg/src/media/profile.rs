/// One rung of the quality ladder: a fixed set of transcode parameters.
#[derive(Debug)]
pub(crate) struct Profile {
    pub(crate) name: &'static str,

    /// Output frame rate. GIFs don't need the full source frame rate.
    pub(crate) fps: u32,

    /// Output width in pixels. Height is computed by ffmpeg preserving the
    /// aspect ratio.
    pub(crate) scale_width: u32,

    /// Two-pass palette encoding gives noticeably better colors at the same
    /// size, at the cost of a second ffmpeg invocation. The most aggressive
    /// profiles skip it.
    pub(crate) palette: Option<Palette>,
}

#[derive(Debug)]
pub(crate) struct Palette {
    pub(crate) bayer_scale: u32,
}

/// Profiles are tried strictly in order, from the highest quality (largest
/// output) to the lowest. The parameter values were picked empirically on
/// real chat GIFs.
pub(crate) const DEFAULT_LADDER: &[Profile] = &[
    Profile {
        name: "high",
        fps: 12,
        scale_width: 320,
        palette: Some(Palette { bayer_scale: 5 }),
    },
    Profile {
        name: "medium",
        fps: 10,
        scale_width: 288,
        palette: Some(Palette { bayer_scale: 5 }),
    },
    Profile {
        name: "low",
        fps: 8,
        scale_width: 250,
        palette: None,
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ladder_quality_strictly_decreases() {
        for pair in DEFAULT_LADDER.windows(2) {
            assert!(pair[0].fps >= pair[1].fps);
            assert!(pair[0].scale_width > pair[1].scale_width);
        }
    }
}
