//! Intent classification
//!
//! Maps raw query text to one of a small fixed set of intents plus the
//! residual content string. Deterministic prefix matching, nothing more.

use serde::{Deserialize, Serialize};

/// The classified purpose of a user query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    Explain,
    Summarize,
    General,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Explain => "explain",
            Intent::Summarize => "summarize",
            Intent::General => "general",
        }
    }
}

/// Classify a query: trim, lowercase, then check for a leading command
/// word. The command word and its trailing separator are consumed; any
/// other input is a general question with the full normalized text as
/// content.
pub fn classify(query: &str) -> (Intent, String) {
    let query = query.trim().to_lowercase();

    if let Some(content) = query.strip_prefix("explain ") {
        return (Intent::Explain, content.to_string());
    }
    if let Some(content) = query.strip_prefix("summarize ") {
        return (Intent::Summarize, content.to_string());
    }

    (Intent::General, query)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explain_prefix_stripped() {
        let (intent, content) = classify("Explain transformer attention");
        assert_eq!(intent, Intent::Explain);
        assert_eq!(content, "transformer attention");
    }

    #[test]
    fn test_summarize_prefix_stripped() {
        let (intent, content) = classify("  SUMMARIZE 2103.12112  ");
        assert_eq!(intent, Intent::Summarize);
        assert_eq!(content, "2103.12112");
    }

    #[test]
    fn test_general_keeps_full_text() {
        let (intent, content) = classify("What IS a B-tree?");
        assert_eq!(intent, Intent::General);
        assert_eq!(content, "what is a b-tree?");
    }

    #[test]
    fn test_command_word_without_separator_is_general() {
        let (intent, content) = classify("explain");
        assert_eq!(intent, Intent::General);
        assert_eq!(content, "explain");

        let (intent, content) = classify("explanations of sorting");
        assert_eq!(intent, Intent::General);
        assert_eq!(content, "explanations of sorting");
    }
}
