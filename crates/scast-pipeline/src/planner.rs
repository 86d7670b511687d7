//! Scene planning.
//!
//! Two paths produce a scene plan:
//! - the heuristic path chunks the script's words into evenly timed
//!   windows (pure arithmetic, deterministic);
//! - the generative path takes a model's proposed breakdown and
//!   re-normalizes its timings before trusting it.
//!
//! Both are capped by [`MAX_SCENES_PER_RUN`].

use tracing::{debug, info};

use scast_models::{PlanDiagnostics, ProposedScene, SceneSpec, MIN_SCENE_DURATION_SECS};

use crate::error::{PipelineError, PipelineResult};
use crate::prompt;

/// Hard ceiling on scenes (and therefore images) per generation run.
/// Non-negotiable regardless of duration or requested rate.
pub const MAX_SCENES_PER_RUN: usize = 10;

/// Target seconds of narration per scene for mid-length runs.
const SCENE_CADENCE_SECS: f64 = 15.0;

/// Compute the target scene count for a run.
///
/// - up to 60s: between 4 and 6 scenes;
/// - 60-300s: one scene per 15 seconds;
/// - beyond 300s: the larger of the rate-based count and the 15s cadence.
///
/// Always capped at [`MAX_SCENES_PER_RUN`].
pub fn target_scene_count(effective_duration: f64, max_images_per_minute: u32) -> usize {
    let cadence = (effective_duration / SCENE_CADENCE_SECS).ceil() as usize;

    let target = if effective_duration <= 60.0 {
        cadence.clamp(4, 6)
    } else if effective_duration <= 300.0 {
        cadence
    } else {
        let rate_based =
            (effective_duration / 60.0 * max_images_per_minute as f64).ceil() as usize;
        rate_based.max(cadence)
    };

    target.clamp(1, MAX_SCENES_PER_RUN)
}

/// Plan scenes heuristically from the script text.
///
/// Words are divided into contiguous chunks sized to hit the target scene
/// count; each chunk becomes one evenly timed scene with a synthesized
/// image prompt. Scenes whose start would land at or past the effective
/// duration are dropped, not clipped.
pub fn plan_scenes(
    script: &str,
    effective_duration: f64,
    max_images_per_minute: u32,
) -> Vec<SceneSpec> {
    let words: Vec<&str> = script.split_whitespace().collect();
    if words.is_empty() || effective_duration <= 0.0 {
        return Vec::new();
    }

    let target = target_scene_count(effective_duration, max_images_per_minute);
    let words_per_chunk = (words.len() / target).max(1);

    let mut chunks: Vec<String> = words
        .chunks(words_per_chunk)
        .map(|chunk| chunk.join(" "))
        .collect();
    // Division rounding can overshoot the target by one short tail chunk
    chunks.truncate(target);

    let count = chunks.len();
    let slot = effective_duration / count as f64;

    let scenes: Vec<SceneSpec> = chunks
        .into_iter()
        .enumerate()
        .filter_map(|(i, source_text)| {
            let start_time = i as f64 * slot;
            if start_time >= effective_duration {
                return None;
            }
            let prompt = prompt::synthesize_prompt(&source_text, slot);
            Some(SceneSpec {
                index: i as u32 + 1,
                start_time,
                end_time: start_time + slot,
                duration: slot,
                source_text,
                prompt,
            })
        })
        .collect();

    debug!(
        scenes = scenes.len(),
        target,
        words = words.len(),
        duration = effective_duration,
        "Planned scenes heuristically"
    );

    scenes
}

/// Validate and re-normalize a model-proposed scene breakdown.
///
/// The model's own timings are discarded: every scene gets an even split
/// of the total duration, scenes too short to be worth an image are
/// dropped, and start times are rewritten from index position. Prompts
/// are sanitized before use since model-authored dramatic language can
/// trip provider content filters.
pub fn validate_model_plan(
    proposed: &[ProposedScene],
    total_duration: f64,
) -> PipelineResult<(Vec<SceneSpec>, PlanDiagnostics)> {
    if proposed.is_empty() {
        return Err(PipelineError::NoValidScenes);
    }

    let even_duration = total_duration / proposed.len() as f64;

    let survivors: Vec<&ProposedScene> = proposed
        .iter()
        .filter(|_| even_duration >= MIN_SCENE_DURATION_SECS)
        .collect();

    if survivors.is_empty() {
        info!(
            proposed = proposed.len(),
            even_duration, "All proposed scenes below minimum duration"
        );
        return Err(PipelineError::NoValidScenes);
    }

    let scenes: Vec<SceneSpec> = survivors
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let start_time = i as f64 * even_duration;
            SceneSpec {
                index: i as u32 + 1,
                start_time,
                end_time: start_time + even_duration,
                duration: even_duration,
                source_text: p.description.clone(),
                prompt: prompt::finalize_model_prompt(&p.image_prompt, even_duration),
            }
        })
        .collect();

    let total_planned = even_duration * scenes.len() as f64;
    let diagnostics = PlanDiagnostics {
        total_scenes: scenes.len() as u32,
        average_scene_duration: even_duration,
        fits_requested_duration: total_planned <= total_duration + f64::EPSILON,
    };

    debug!(
        validated = diagnostics.total_scenes,
        average = diagnostics.average_scene_duration,
        "Validated model scene plan"
    );

    Ok((scenes, diagnostics))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(n: usize) -> String {
        (0..n).map(|i| format!("word{}", i)).collect::<Vec<_>>().join(" ")
    }

    fn proposed(n: usize) -> Vec<ProposedScene> {
        (0..n)
            .map(|i| ProposedScene {
                title: format!("Scene {}", i + 1),
                description: format!("Description {}", i + 1),
                image_prompt: format!("Prompt {}", i + 1),
                duration: 3.0,
                start_time: i as f64 * 3.0,
            })
            .collect()
    }

    #[test]
    fn test_short_durations_get_four_to_six_scenes() {
        for duration in [10.0, 20.0, 30.0, 45.0, 59.0, 60.0] {
            let scenes = plan_scenes(&words(200), duration, 4);
            assert!(
                (4..=6).contains(&scenes.len()),
                "duration {} produced {} scenes",
                duration,
                scenes.len()
            );
        }
    }

    #[test]
    fn test_ceiling_never_exceeded() {
        for duration in [60.0, 150.0, 300.0, 600.0, 1800.0, 3600.0] {
            for rate in [1, 4, 10] {
                let scenes = plan_scenes(&words(500), duration, rate);
                assert!(
                    scenes.len() <= MAX_SCENES_PER_RUN,
                    "duration {} rate {} produced {} scenes",
                    duration,
                    rate,
                    scenes.len()
                );
            }
        }
    }

    #[test]
    fn test_no_start_at_or_past_effective_duration() {
        for duration in [25.0, 50.0, 120.0, 900.0] {
            for scene in plan_scenes(&words(150), duration, 4) {
                assert!(scene.start_time < duration);
            }
        }
    }

    #[test]
    fn test_planner_is_deterministic() {
        let script = words(150);
        let first = plan_scenes(&script, 90.0, 4);
        let second = plan_scenes(&script, 90.0, 4);
        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.start_time, b.start_time);
            assert_eq!(a.end_time, b.end_time);
            assert_eq!(a.source_text, b.source_text);
        }
    }

    #[test]
    fn test_scenes_ordered_and_contiguous() {
        let scenes = plan_scenes(&words(120), 120.0, 4);
        for pair in scenes.windows(2) {
            assert!(pair[0].start_time <= pair[1].start_time);
            assert!((pair[0].end_time - pair[1].start_time).abs() < 1e-9);
        }
        assert_eq!(scenes[0].index, 1);
    }

    #[test]
    fn test_spec_example_fifty_second_audio() {
        // 150 words, effective duration 50s, rate 4 => 4 scenes
        let scenes = plan_scenes(&words(150), 50.0, 4);
        assert_eq!(scenes.len(), 4);
        for scene in &scenes {
            assert!(scene.start_time < 50.0);
        }
    }

    #[test]
    fn test_mid_length_uses_fifteen_second_cadence() {
        // 150s / 15 = 10 scenes, exactly at the ceiling
        let scenes = plan_scenes(&words(400), 150.0, 4);
        assert_eq!(scenes.len(), 10);
        // 90s / 15 = 6 scenes
        let scenes = plan_scenes(&words(400), 90.0, 4);
        assert_eq!(scenes.len(), 6);
    }

    #[test]
    fn test_long_duration_rate_based_still_capped() {
        // 600s at 10/min would want 100 images; ceiling wins
        assert_eq!(target_scene_count(600.0, 10), MAX_SCENES_PER_RUN);
    }

    #[test]
    fn test_empty_script_plans_nothing() {
        assert!(plan_scenes("", 60.0, 4).is_empty());
        assert!(plan_scenes("   ", 60.0, 4).is_empty());
    }

    #[test]
    fn test_model_plan_even_split() {
        // 8 scenes over 90s => 11.25s each, all survive
        let (scenes, diag) = validate_model_plan(&proposed(8), 90.0).unwrap();
        assert_eq!(scenes.len(), 8);
        assert!((diag.average_scene_duration - 11.25).abs() < 1e-9);
        assert_eq!(diag.total_scenes, 8);
        assert!(diag.fits_requested_duration);
        assert!((scenes[3].start_time - 33.75).abs() < 1e-9);
    }

    #[test]
    fn test_model_plan_too_many_scenes_all_dropped() {
        // 10 scenes over 30s => 3s each, below the 5s minimum
        let err = validate_model_plan(&proposed(10), 30.0).unwrap_err();
        assert!(matches!(err, PipelineError::NoValidScenes));
    }

    #[test]
    fn test_model_plan_empty_is_fatal() {
        let err = validate_model_plan(&[], 90.0).unwrap_err();
        assert!(matches!(err, PipelineError::NoValidScenes));
    }

    #[test]
    fn test_model_plan_rewrites_timings_from_index() {
        let mut scenes = proposed(4);
        // Model timings are nonsense on purpose
        scenes[0].start_time = 500.0;
        scenes[2].duration = 0.1;
        let (validated, _) = validate_model_plan(&scenes, 60.0).unwrap();
        for (i, scene) in validated.iter().enumerate() {
            assert!((scene.start_time - i as f64 * 15.0).abs() < 1e-9);
            assert!((scene.duration - 15.0).abs() < 1e-9);
        }
    }
}
