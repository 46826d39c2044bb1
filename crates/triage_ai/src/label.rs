//! The closed label set emails are sorted into.

use serde::{Deserialize, Serialize};

/// A triage label for an email.
///
/// The model is told to answer with exactly one of the four named labels;
/// anything else is mapped to [`Label::Unclassified`] rather than passed
/// through raw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Label {
    Urgent,
    Meeting,
    General,
    Fun,
    /// The model's output did not name exactly one known label.
    Unclassified,
}

impl Label {
    /// The labels the model may choose from (excludes `Unclassified`).
    pub const CHOICES: [Label; 4] = [Label::Urgent, Label::Meeting, Label::General, Label::Fun];

    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Urgent => "Urgent",
            Label::Meeting => "Meeting",
            Label::General => "General",
            Label::Fun => "Fun",
            Label::Unclassified => "Unclassified",
        }
    }

    /// Comma-separated choice list for embedding into the prompt.
    pub fn choices_joined() -> String {
        Self::CHOICES
            .iter()
            .map(|l| l.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Strictly parse model output into a label.
    ///
    /// Accepts the label name surrounded by whitespace, quotes, or trailing
    /// punctuation, case-insensitively. If the cleaned output is not an exact
    /// match, the whole text is scanned; only when exactly one label name
    /// occurs is that label returned. Everything else is `Unclassified`.
    pub fn from_model_output(output: &str) -> Label {
        let cleaned = output
            .trim()
            .trim_matches(|c: char| c == '"' || c == '\'' || c == '`' || c == '.' || c == '!');

        for label in Self::CHOICES {
            if cleaned.eq_ignore_ascii_case(label.as_str()) {
                return label;
            }
        }

        let lowered = output.to_ascii_lowercase();
        let mentioned: Vec<Label> = Self::CHOICES
            .into_iter()
            .filter(|l| lowered.contains(&l.as_str().to_ascii_lowercase()))
            .collect();

        match mentioned.as_slice() {
            [single] => *single,
            _ => Label::Unclassified,
        }
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
