//! Image prompt synthesis.
//!
//! A prompt is built from three parts: a style-intensity qualifier derived
//! from the scene's duration, a scene-context sentence extracted from the
//! script chunk, and fixed framing boilerplate. Category detection and
//! sentence rendering are separate steps so each is testable on its own.

pub mod context;
pub mod sanitize;

pub use context::{detect_context, render_context, SceneContext};
pub use sanitize::sanitize_prompt;

/// Fixed instructions appended to every prompt.
const PROMPT_BOILERPLATE: &str =
    "Vertical 9:16 composition, no text overlays, photographic quality, cinematic lighting.";

/// Fallback description when a chunk has no usable text.
const FALLBACK_DESCRIPTION: &str =
    "A cinematic establishing shot matching the tone of a spoken narration";

/// Style-intensity qualifier for a scene of the given duration.
///
/// Short scenes flash by and need a single clear subject; long scenes
/// hold on screen and can carry more detail.
pub fn style_intensity(duration_secs: f64) -> &'static str {
    if duration_secs <= 10.0 {
        "clean, focused"
    } else if duration_secs <= 20.0 {
        "detailed, cinematic"
    } else {
        "rich, immersive"
    }
}

/// Synthesize an image prompt for a script chunk (heuristic path).
pub fn synthesize_prompt(chunk: &str, scene_duration_secs: f64) -> String {
    let intensity = style_intensity(scene_duration_secs);

    if chunk.trim().is_empty() {
        return format!("{}, {} style. {}", FALLBACK_DESCRIPTION, intensity, PROMPT_BOILERPLATE);
    }

    let ctx = detect_context(chunk);
    let context_sentence = render_context(&ctx);

    if context_sentence.is_empty() {
        format!(
            "A {} illustration of: {}. {}",
            intensity, chunk, PROMPT_BOILERPLATE
        )
    } else {
        format!(
            "A {} illustration of: {}. {} {}",
            intensity, chunk, context_sentence, PROMPT_BOILERPLATE
        )
    }
}

/// Finalize a model-authored prompt (generative path).
///
/// Model output gets the sanitization pass; heuristic prompts do not need
/// it because the keyword tables never emit flagged language.
pub fn finalize_model_prompt(raw: &str, scene_duration_secs: f64) -> String {
    let sanitized = sanitize_prompt(raw);
    let intensity = style_intensity(scene_duration_secs);
    format!("{}, {} style. {}", sanitized.trim(), intensity, PROMPT_BOILERPLATE)
}
