//! Scene-context extraction from script text.
//!
//! Pure substring matching over curated keyword tables. Detection returns
//! a structured [`SceneContext`]; rendering it to a sentence is a separate
//! step.

/// One category table: (descriptor, trigger keywords).
type Category = (&'static str, &'static [&'static str]);

static SETTINGS: &[Category] = &[
    ("in a warm home interior", &["home", "house", "living room", "kitchen", "bedroom", "couch"]),
    ("in a modern office", &["office", "desk", "meeting", "workplace", "cubicle", "boss"]),
    ("in a school setting", &["school", "classroom", "teacher", "student", "homework", "lecture"]),
    ("in a restaurant", &["restaurant", "cafe", "diner", "waiter", "menu", "dinner table"]),
    ("in a medical facility", &["hospital", "doctor", "clinic", "nurse", "patient", "waiting room"]),
    ("inside a vehicle", &["car", "driving", "bus", "train", "steering wheel", "highway"]),
    ("in an outdoor location", &["park", "forest", "beach", "mountain", "garden", "trail", "street"]),
    ("in a retail store", &["store", "shop", "mall", "market", "checkout", "aisle"]),
];

static LIGHTING: &[Category] = &[
    ("soft morning light", &["morning", "sunrise", "dawn", "breakfast"]),
    ("bright midday light", &["noon", "midday", "afternoon", "lunch"]),
    ("warm golden-hour light", &["evening", "sunset", "dusk"]),
    ("moody night lighting", &["night", "midnight", "dark", "late"]),
];

static WEATHER: &[Category] = &[
    ("rainy atmosphere", &["rain", "raining", "drizzle", "umbrella"]),
    ("snowy atmosphere", &["snow", "snowing", "frost", "winter"]),
    ("stormy atmosphere", &["storm", "thunder", "lightning", "wind howling"]),
    ("clear sunny weather", &["sunny", "sunshine", "clear sky", "blue sky"]),
    ("foggy atmosphere", &["fog", "mist", "haze"]),
];

static CHARACTERS: &[Category] = &[
    ("a group of people", &["family", "everyone", "group", "crowd", "friends", "they all"]),
    ("a man", &["man", "father", "dad", "husband", "boyfriend", "grandfather"]),
    ("a woman", &["woman", "mother", "mom", "wife", "girlfriend", "grandmother"]),
    ("a child", &["child", "kid", "boy", "girl", "toddler", "baby"]),
];

static EMOTIONS: &[Category] = &[
    ("a joyful mood", &["happy", "joy", "laugh", "smile", "celebrate", "excited"]),
    ("a somber mood", &["sad", "tears", "cry", "grief", "heartbroken", "mourning"]),
    ("a tense mood", &["angry", "furious", "argument", "shout", "yell", "frustrated"]),
    ("an anxious mood", &["afraid", "scared", "nervous", "worried", "panic"]),
    ("a calm mood", &["calm", "peaceful", "quiet", "relaxed", "serene"]),
];

static ACTIONS: &[Category] = &[
    ("in dynamic motion", &["running", "rushing", "chasing", "jumping", "racing"]),
    ("walking through the scene", &["walking", "strolling", "wandering", "pacing"]),
    ("in quiet conversation", &["talking", "speaking", "whisper", "conversation", "discussing"]),
    ("focused on work", &["working", "typing", "writing", "studying", "reading"]),
    ("preparing food", &["cooking", "baking", "chopping", "stirring"]),
];

/// Structured scene context detected from a script chunk.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneContext {
    pub setting: Option<&'static str>,
    pub lighting: Option<&'static str>,
    pub weather: Option<&'static str>,
    pub characters: Option<&'static str>,
    pub emotion: Option<&'static str>,
    pub action: Option<&'static str>,
}

fn match_category(text: &str, table: &[Category]) -> Option<&'static str> {
    table
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| text.contains(k)))
        .map(|(descriptor, _)| *descriptor)
}

/// Detect scene context categories in a script chunk.
pub fn detect_context(chunk: &str) -> SceneContext {
    let text = chunk.to_lowercase();
    SceneContext {
        setting: match_category(&text, SETTINGS),
        lighting: match_category(&text, LIGHTING),
        weather: match_category(&text, WEATHER),
        characters: match_category(&text, CHARACTERS),
        emotion: match_category(&text, EMOTIONS),
        action: match_category(&text, ACTIONS),
    }
}

/// Render a detected context to a short scene-context sentence.
///
/// Returns an empty string when nothing was detected.
pub fn render_context(ctx: &SceneContext) -> String {
    let mut parts: Vec<&str> = Vec::new();

    if let Some(characters) = ctx.characters {
        parts.push(characters);
    }
    if let Some(action) = ctx.action {
        parts.push(action);
    }
    if let Some(setting) = ctx.setting {
        parts.push(setting);
    }
    if let Some(lighting) = ctx.lighting {
        parts.push(lighting);
    }
    if let Some(weather) = ctx.weather {
        parts.push(weather);
    }
    if let Some(emotion) = ctx.emotion {
        parts.push(emotion);
    }

    if parts.is_empty() {
        return String::new();
    }

    let mut sentence = String::from("Scene shows ");
    sentence.push_str(&parts.join(", "));
    sentence.push('.');
    sentence
}
