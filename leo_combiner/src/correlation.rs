use serde::{Deserialize, Serialize};

use crate::error::{MissingCorrelationStartSnafu, Result};

/// Correlation markers supplied by the caller for an event.
///
/// The input is written verbatim to the `correlation_id` field of the wire
/// record. Absent markers are omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrelationInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
}

/// Correlation attached to a combined record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Correlation {
    pub source: String,
    pub start: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
}

impl CorrelationInput {
    /// Correlation starting at the given id.
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Default::default()
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_end(mut self, end: impl Into<String>) -> Self {
        self.end = Some(end.into());
        self
    }
}

impl Correlation {
    /// Resolves the caller's markers.
    ///
    /// `id` wins over `start`. The source falls back to `default_source`.
    pub fn resolve(input: &CorrelationInput, default_source: &str, event: &str) -> Result<Self> {
        let Some(start) = input.id.as_ref().or(input.start.as_ref()) else {
            return MissingCorrelationStartSnafu { event }.fail();
        };

        Ok(Self {
            source: input
                .source
                .clone()
                .unwrap_or_else(|| default_source.to_string()),
            start: start.clone(),
            end: input.end.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CombinerError;

    #[test]
    fn test_source_and_id_pass_through() {
        let input = CorrelationInput::with_id("abc").with_source("svc-a");

        let correlation = Correlation::resolve(&input, "default", "ev").unwrap();

        assert_eq!(
            correlation,
            Correlation {
                source: "svc-a".to_string(),
                start: "abc".to_string(),
                end: None,
            }
        );
    }

    #[test]
    fn test_id_wins_over_start() {
        let input = CorrelationInput {
            id: Some("id-1".to_string()),
            start: Some("start-1".to_string()),
            ..Default::default()
        };

        let correlation = Correlation::resolve(&input, "default", "ev").unwrap();
        assert_eq!(correlation.start, "id-1");
    }

    #[test]
    fn test_start_and_default_source() {
        let input = CorrelationInput {
            start: Some("start-1".to_string()),
            ..Default::default()
        };

        let correlation = Correlation::resolve(&input, "my-bot", "ev").unwrap();
        assert_eq!(correlation.source, "my-bot");
        assert_eq!(correlation.start, "start-1");
    }

    #[test]
    fn test_end_is_propagated() {
        let input = CorrelationInput::with_id("a").with_end("z");

        let correlation = Correlation::resolve(&input, "bot", "ev").unwrap();
        assert_eq!(correlation.end.as_deref(), Some("z"));
    }

    #[test]
    fn test_missing_start_fails() {
        let input = CorrelationInput::default().with_source("svc-a");

        let err = Correlation::resolve(&input, "bot", "orders").unwrap_err();
        assert!(matches!(
            err,
            CombinerError::MissingCorrelationStart { ref event } if event == "orders"
        ));
    }

    #[test]
    fn test_input_serialization_skips_absent_markers() {
        let input = CorrelationInput::with_id("abc").with_source("svc-a");

        let json = serde_json::to_string(&input).unwrap();
        assert_eq!(json, r#"{"source":"svc-a","id":"abc"}"#);
    }
}
