//! Prompt label encoding for model conditioning inputs.
//!
//! The exported graph takes four conditioning ids. The tables below must stay
//! in sync with the ids the model was trained with: a drift here does not fail
//! anything, it silently degrades transcription.

use std::fmt;

const LANGUAGES: &[(&str, u32)] = &[
    ("auto", 0),
    ("zh", 3),
    ("en", 4),
    ("yue", 7),
    ("ja", 11),
    ("ko", 12),
    ("nospeech", 13),
];

const TEXT_NORMS: &[(&str, u32)] = &[("withitn", 14), ("woitn", 15)];

const EVENTS: &[(&str, u32)] = &[("HAPPY", 1), ("SAD", 2), ("ANGRY", 3), ("NEUTRAL", 4)];

const EVENT_TYPES: &[(&str, u32)] = &[("Speech", 2), ("Music", 3), ("Applause", 4)];

/// Fallback ids for unrecognized labels.
const DEFAULT_LANGUAGE_ID: u32 = 4;
const DEFAULT_TEXT_NORM_ID: u32 = 15;
const DEFAULT_EVENT_ID: u32 = 1;
const DEFAULT_EVENT_TYPE_ID: u32 = 2;

fn lookup(table: &[(&str, u32)], label: &str, default: u32) -> u32 {
    table
        .iter()
        .find(|(name, _)| *name == label)
        .map_or(default, |&(_, id)| id)
}

/// Semantic prompt labels.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PromptLabels {
    /// Language code (e.g. `auto`, `en`, `zh`)
    pub language: String,
    /// Emotion event (e.g. `HAPPY`)
    pub event: String,
    /// Audio event type (e.g. `Speech`)
    pub event_type: String,
    /// Text normalization mode (`withitn` or `woitn`)
    pub text_norm: String,
}

impl Default for PromptLabels {
    fn default() -> Self {
        Self {
            language: "auto".to_string(),
            event: "HAPPY".to_string(),
            event_type: "Speech".to_string(),
            text_norm: "woitn".to_string(),
        }
    }
}

impl PromptLabels {
    pub fn encode(&self) -> PromptSpec {
        PromptSpec::encode(&self.language, &self.event, &self.event_type, &self.text_norm)
    }
}

/// Encoded conditioning ids, in model input order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PromptSpec {
    pub language_id: u32,
    pub event_id: u32,
    pub event_type_id: u32,
    pub text_norm_id: u32,
}

impl PromptSpec {
    /// Encode semantic labels into conditioning ids.
    ///
    /// Never fails: each unrecognized label falls back to its own default
    /// (English, `HAPPY`, `Speech`, without ITN) independently of the others.
    pub fn encode(language: &str, event: &str, event_type: &str, text_norm: &str) -> Self {
        Self {
            language_id: lookup(LANGUAGES, language, DEFAULT_LANGUAGE_ID),
            event_id: lookup(EVENTS, event, DEFAULT_EVENT_ID),
            event_type_id: lookup(EVENT_TYPES, event_type, DEFAULT_EVENT_TYPE_ID),
            text_norm_id: lookup(TEXT_NORMS, text_norm, DEFAULT_TEXT_NORM_ID),
        }
    }

    /// Ids as `[language, event, event_type, text_norm]`.
    pub fn to_array(self) -> [u32; 4] {
        [
            self.language_id,
            self.event_id,
            self.event_type_id,
            self.text_norm_id,
        ]
    }
}

impl Default for PromptSpec {
    fn default() -> Self {
        PromptLabels::default().encode()
    }
}

/// Comma-separated ids, as passed to the graph exporter.
impl fmt::Display for PromptSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [l, e, t, n] = self.to_array();
        write!(f, "{l},{e},{t},{n}")
    }
}
