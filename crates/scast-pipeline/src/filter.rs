//! Audio-duration image filter.
//!
//! When the caller supplies the real audio length, images whose scene
//! starts at or past the audio end would never be seen during playback
//! and are dropped from the payload.

use tracing::info;

use scast_models::GeneratedImage;

/// Outcome of an audio-duration filter pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterReport {
    /// Images entering the filter
    pub original: u32,
    /// Images surviving the filter
    pub kept: u32,
    /// Images dropped
    pub dropped: u32,
}

/// Drop images whose timestamp is at or past the audio end.
///
/// A missing, non-finite, or non-positive audio duration disables the
/// filter; every image is kept.
pub fn filter_by_audio_duration(
    images: Vec<GeneratedImage>,
    audio_duration: Option<f64>,
) -> (Vec<GeneratedImage>, FilterReport) {
    let original = images.len() as u32;

    let limit = match audio_duration {
        Some(d) if d.is_finite() && d > 0.0 => d,
        _ => {
            return (
                images,
                FilterReport {
                    original,
                    kept: original,
                    dropped: 0,
                },
            )
        }
    };

    let kept_images: Vec<GeneratedImage> = images
        .into_iter()
        .filter(|image| image.timestamp < limit)
        .collect();

    let report = FilterReport {
        original,
        kept: kept_images.len() as u32,
        dropped: original - kept_images.len() as u32,
    };

    if report.dropped > 0 {
        info!(
            audio_duration = limit,
            kept = report.kept,
            dropped = report.dropped,
            "Dropped images past audio end"
        );
    }

    (kept_images, report)
}
