//! Payload and timing estimates for stream reporting.

use scast_models::{CompletionMeta, DownloadTiers, GeneratedImage};

use crate::filter::FilterReport;

const FAST_MBPS: f64 = 50.0;
const MEDIUM_MBPS: f64 = 10.0;
const SLOW_MBPS: f64 = 2.0;

/// Seconds a single provider image call typically takes.
const SECS_PER_IMAGE: f64 = 12.0;

/// Pacing delay between generation calls, in seconds.
const INTER_REQUEST_SECS: f64 = 0.8;

/// Estimated seconds to download `total_bytes` at three bandwidth tiers.
pub fn download_tiers(total_bytes: u64) -> DownloadTiers {
    let bits = total_bytes as f64 * 8.0;
    DownloadTiers {
        fast: bits / (FAST_MBPS * 1_000_000.0),
        medium: bits / (MEDIUM_MBPS * 1_000_000.0),
        slow: bits / (SLOW_MBPS * 1_000_000.0),
    }
}

/// Estimated wall-clock seconds for a run of `scene_count` images.
///
/// Sequential generation: one provider call per scene plus the pacing
/// delay between calls (none after the last).
pub fn pre_run_estimate_secs(scene_count: u32) -> f64 {
    if scene_count == 0 {
        return 0.0;
    }
    scene_count as f64 * SECS_PER_IMAGE + (scene_count - 1) as f64 * INTER_REQUEST_SECS
}

/// Build the completion metadata from the filtered payload.
pub fn completion_meta(
    word_count: u32,
    chunk_duration: f64,
    images: &[GeneratedImage],
    filter: &FilterReport,
) -> CompletionMeta {
    let total_bytes: u64 = images.iter().map(|i| i.size_bytes).sum();
    let average_image_bytes = if images.is_empty() {
        0
    } else {
        total_bytes / images.len() as u64
    };

    CompletionMeta {
        word_count,
        chunk_duration,
        average_image_bytes,
        estimated_download_secs: download_tiers(total_bytes),
        images_before_filter: filter.original,
        images_after_filter: filter.kept,
        dropped_by_filter: filter.dropped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(size_bytes: u64) -> GeneratedImage {
        GeneratedImage {
            scene_index: 1,
            timestamp: 0.0,
            filename: "scene_01.png".to_string(),
            data: String::new(),
            size_bytes,
            mime_type: "image/png".to_string(),
            prompt: String::new(),
            description: String::new(),
        }
    }

    #[test]
    fn test_download_tiers_scale_with_bandwidth() {
        // 10 MB => 80 Mbit
        let tiers = download_tiers(10_000_000);
        assert!((tiers.fast - 1.6).abs() < 1e-9);
        assert!((tiers.medium - 8.0).abs() < 1e-9);
        assert!((tiers.slow - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_payload_estimates_zero() {
        let tiers = download_tiers(0);
        assert_eq!(tiers.fast, 0.0);
        assert_eq!(tiers.slow, 0.0);
        assert_eq!(pre_run_estimate_secs(0), 0.0);
    }

    #[test]
    fn test_pre_run_estimate_counts_pacing_gaps() {
        // 5 images: 5 * 12s + 4 * 0.8s
        assert!((pre_run_estimate_secs(5) - 63.2).abs() < 1e-9);
        assert!((pre_run_estimate_secs(1) - 12.0).abs() < 1e-9);
    }

    #[test]
    fn test_completion_meta_averages_and_filter_counts() {
        let images = vec![image(1000), image(3000)];
        let filter = FilterReport { original: 3, kept: 2, dropped: 1 };
        let meta = completion_meta(150, 12.5, &images, &filter);

        assert_eq!(meta.word_count, 150);
        assert_eq!(meta.chunk_duration, 12.5);
        assert_eq!(meta.average_image_bytes, 2000);
        assert_eq!(meta.images_before_filter, 3);
        assert_eq!(meta.images_after_filter, 2);
        assert_eq!(meta.dropped_by_filter, 1);
        assert!(meta.estimated_download_secs.slow > meta.estimated_download_secs.fast);
    }
}
