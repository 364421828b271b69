// Advisory messages surfaced to the user about recognizable output
// patterns. Suggestions never block success.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One advisory message, identified by a stable code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub code: String,
    pub message: String,
}

/// Accumulates suggestions during a run, keeping the first occurrence per
/// distinct code.
#[derive(Debug, Default)]
pub struct SuggestionCollector {
    seen: IndexMap<String, Suggestion>,
}

impl SuggestionCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, code: &str, message: impl Into<String>) {
        if !self.seen.contains_key(code) {
            self.seen.insert(
                code.to_string(),
                Suggestion {
                    code: code.to_string(),
                    message: message.into(),
                },
            );
        }
    }

    pub fn extend(&mut self, suggestions: impl IntoIterator<Item = Suggestion>) {
        for suggestion in suggestions {
            self.push(&suggestion.code, suggestion.message);
        }
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// The deduplicated suggestions, sorted by code.
    pub fn into_sorted(self) -> Vec<Suggestion> {
        let mut suggestions: Vec<_> = self.seen.into_values().collect();
        suggestions.sort_by(|a, b| a.code.cmp(&b.code));
        suggestions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_occurrence_per_code_wins() {
        let mut collector = SuggestionCollector::new();
        collector.push("CV102", "first wording");
        collector.push("CV102", "second wording");
        let suggestions = collector.into_sorted();
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].message, "first wording");
    }

    #[test]
    fn test_report_is_sorted_by_code() {
        let mut collector = SuggestionCollector::new();
        collector.push("CV201", "later");
        collector.push("CV101", "earlier");
        let codes: Vec<_> = collector
            .into_sorted()
            .into_iter()
            .map(|s| s.code)
            .collect();
        assert_eq!(codes, vec!["CV101", "CV201"]);
    }
}
