use serde::{Deserialize, Serialize};

/// A time-bounded unit of transcribed speech, in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

impl Segment {
    pub fn new<S: Into<String>>(start: f64, end: f64, text: S) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }
}

/// A segment paired with the text that ends up in the subtitle file.
///
/// `translated_text` is never empty for a segment with non-empty source text:
/// whenever a translation is unavailable it holds the source text instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslatedSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
    pub translated_text: String,
}

impl TranslatedSegment {
    /// Pair a segment with a translation, keeping the source text when the
    /// translation is blank.
    pub fn with_translation(segment: &Segment, translation: Option<&str>) -> Self {
        let translated_text = match translation.map(str::trim) {
            Some(t) if !t.is_empty() => t.to_string(),
            _ => segment.text.clone(),
        };

        Self {
            start: segment.start,
            end: segment.end,
            text: segment.text.clone(),
            translated_text,
        }
    }

    pub fn untranslated(segment: &Segment) -> Self {
        Self::with_translation(segment, None)
    }

    /// Subtitle text equals the source text, either from a fallback or
    /// because the translation happened to be identical.
    pub fn is_unchanged(&self) -> bool {
        self.translated_text == self.text
    }
}

/// Output of a transcriber: ordered segments plus the detected language.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Transcript {
    pub language: Option<String>,
    pub segments: Vec<Segment>,
}

impl Transcript {
    pub fn new(language: Option<String>, segments: Vec<Segment>) -> Self {
        Self { language, segments }
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}
