//! Satisfaction metric schemas and their extraction from model output.
//!
//! The model answers with one JSON object. Each metric group is read either
//! from a nested object under its own key or, failing that, from the object's
//! top-level fields.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::deserializers::{de_count_forgiving, de_score_forgiving};
use crate::error::{Result, SurveyError};
use crate::message::Message;
use crate::usage::Usage;

/// Sentiment of the customer's side of the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentMetrics {
    /// Mean sentiment across the customer's messages, typically -1 to +1.
    #[serde(deserialize_with = "de_score_forgiving")]
    pub average_sentiment_score: f64,
    /// Regression slope of sentiment over the conversation; positive means it improved.
    #[serde(deserialize_with = "de_score_forgiving")]
    pub sentiment_trend_slope: f64,
    /// Mean sentiment of the customer's final few messages.
    #[serde(deserialize_with = "de_score_forgiving")]
    pub final_sentiment_state: f64,
}

/// How hard the customer had to work to get an answer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CustomerEffortMetrics {
    /// Times the customer repeated the same question or need.
    #[serde(deserialize_with = "de_count_forgiving")]
    pub frequency_of_repeated_intent: u32,
    /// Count of effort or frustration keywords ("again", "still", "useless"...).
    #[serde(deserialize_with = "de_count_forgiving")]
    pub negative_signal_word_frequency: u32,
    /// Share of the customer's messages that are questions.
    #[serde(deserialize_with = "de_score_forgiving")]
    pub question_density: f64,
}

/// Relevance of the agent's answers to the customer's questions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SemanticCohesionMetric {
    #[serde(deserialize_with = "de_score_forgiving")]
    pub question_answer_cosine_similarity: f64,
}

/// Full outcome of one survey run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveyResult {
    pub messages: Vec<Message>,
    pub usage: Usage,
    pub sentiment_metrics: SentimentMetrics,
    pub customer_effort_metrics: CustomerEffortMetrics,
    pub semantic_cohesion_metric: SemanticCohesionMetric,
}

/// A metric group that can be validated out of the model's JSON answer.
pub trait MetricSchema: DeserializeOwned {
    /// Key under which the group may be nested.
    const KEY: &'static str;
}

impl MetricSchema for SentimentMetrics {
    const KEY: &'static str = "sentiment_metrics";
}

impl MetricSchema for CustomerEffortMetrics {
    const KEY: &'static str = "customer_effort_metrics";
}

impl MetricSchema for SemanticCohesionMetric {
    const KEY: &'static str = "semantic_cohesion_metric";
}

/// Validate one metric group from the model's JSON object.
pub fn parse_metric<T: MetricSchema>(output: &Value) -> Result<T> {
    let source = match output.get(T::KEY) {
        Some(nested) if nested.is_object() => nested,
        _ => output,
    };
    T::deserialize(source).map_err(|e| SurveyError::Validation {
        message: format!("{} does not match schema: {}", T::KEY, e),
    })
}

static FENCED_JSON_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```(?:json|JSON)?\s*(\{.*?\})\s*```").expect("fenced json regex is valid")
});

/// Recover the JSON object from free model text.
///
/// Tries, in order: the whole text, fenced code blocks, and finally the last
/// balanced `{...}` candidate found in the text.
pub fn extract_json_object(text: &str) -> Result<Value> {
    let trimmed = text.trim();
    if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(trimmed) {
        return Ok(value);
    }

    for caps in FENCED_JSON_RE.captures_iter(trimmed) {
        if let Some(body) = caps.get(1)
            && let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(body.as_str())
        {
            return Ok(value);
        }
    }

    for candidate in balanced_objects(trimmed).iter().rev() {
        if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(candidate) {
            return Ok(value);
        }
    }

    tracing::debug!("No JSON object in model output: {}", preview(trimmed, 200));
    Err(SurveyError::Validation {
        message: format!(
            "no JSON object found in model output: {}",
            preview(trimmed, 200)
        ),
    })
}

/// Top-level `{...}` spans of `text`, in order of appearance.
///
/// Quotes only open strings inside braces, so stray quotes in surrounding
/// prose are ignored. An opening brace that never closes is skipped and the
/// scan resumes right after it.
fn balanced_objects(text: &str) -> Vec<&str> {
    let mut spans = Vec::new();
    // (start byte, nesting depth) of the object being scanned
    let mut open: Option<(usize, u32)> = None;
    let mut in_string = false;
    let mut escaped = false;

    for (idx, ch) in text.char_indices() {
        let Some((start, depth)) = open.as_mut() else {
            if ch == '{' {
                open = Some((idx, 1));
            }
            continue;
        };

        if in_string {
            match (escaped, ch) {
                (true, _) => escaped = false,
                (false, '\\') => escaped = true,
                (false, '"') => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => *depth += 1,
            '}' => {
                *depth -= 1;
                if *depth == 0 {
                    let begin = *start;
                    spans.push(&text[begin..=idx]);
                    open = None;
                }
            }
            _ => {}
        }
    }

    if let Some((start, _)) = open {
        spans.extend(balanced_objects(&text[start + 1..]));
    }
    spans
}

/// At most `max` characters of `input`, marked when cut.
fn preview(input: &str, max: usize) -> String {
    match input.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &input[..cut]),
        None => input.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn flat_output() -> Value {
        json!({
            "average_sentiment_score": 0.2,
            "sentiment_trend_slope": -0.05,
            "final_sentiment_state": -0.4,
            "frequency_of_repeated_intent": 2,
            "negative_signal_word_frequency": 3,
            "question_density": 0.5,
            "question_answer_cosine_similarity": 0.81
        })
    }

    #[test]
    fn test_parse_metrics_from_flat_object() {
        let output = flat_output();
        let sentiment: SentimentMetrics = parse_metric(&output).unwrap();
        let effort: CustomerEffortMetrics = parse_metric(&output).unwrap();
        let cohesion: SemanticCohesionMetric = parse_metric(&output).unwrap();

        assert_eq!(sentiment.final_sentiment_state, -0.4);
        assert_eq!(effort.frequency_of_repeated_intent, 2);
        assert_eq!(effort.negative_signal_word_frequency, 3);
        assert_eq!(cohesion.question_answer_cosine_similarity, 0.81);
    }

    #[test]
    fn test_parse_metrics_prefers_nested_group() {
        let output = json!({
            "sentiment_metrics": {
                "average_sentiment_score": "0.6",
                "sentiment_trend_slope": 0.1,
                "final_sentiment_state": 0.9
            },
            "average_sentiment_score": -1.0
        });
        let sentiment: SentimentMetrics = parse_metric(&output).unwrap();
        assert_eq!(sentiment.average_sentiment_score, 0.6);
    }

    #[test]
    fn test_parse_metric_missing_field_is_validation_error() {
        let output = json!({"average_sentiment_score": 0.1});
        let res = parse_metric::<SentimentMetrics>(&output);
        match res {
            Err(SurveyError::Validation { message }) => {
                assert!(message.starts_with("sentiment_metrics"));
            }
            other => panic!("Expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_extract_json_object_plain() {
        let text = flat_output().to_string();
        assert_eq!(extract_json_object(&text).unwrap(), flat_output());
    }

    #[test]
    fn test_extract_json_object_fenced() {
        let text = "Here are the metrics:\n```json\n{\"question_answer_cosine_similarity\": 0.7}\n```\nThanks.";
        let value = extract_json_object(text).unwrap();
        assert_eq!(value["question_answer_cosine_similarity"], json!(0.7));
    }

    #[test]
    fn test_extract_json_object_prose_with_braces_in_strings() {
        let text = r#"Scores follow {"note": "a } inside", "question_density": 0.25} end"#;
        let value = extract_json_object(text).unwrap();
        assert_eq!(value["question_density"], json!(0.25));
        assert_eq!(value["note"], json!("a } inside"));
    }

    #[test]
    fn test_extract_json_object_ignores_stray_quote_in_prose() {
        let text = r#"The customer typed 5" twice. {"question_density": 0.5}"#;
        let value = extract_json_object(text).unwrap();
        assert_eq!(value["question_density"], json!(0.5));
    }

    #[test]
    fn test_extract_json_object_skips_unclosed_brace() {
        let text = r#"Scores { pending, final: {"question_density": 0.75}"#;
        let value = extract_json_object(text).unwrap();
        assert_eq!(value["question_density"], json!(0.75));
    }

    #[test]
    fn test_preview_cuts_on_char_boundary() {
        assert_eq!(preview("héllo", 2), "hé...");
        assert_eq!(preview("hi", 2), "hi");
    }

    #[test]
    fn test_extract_json_object_none() {
        assert!(matches!(
            extract_json_object("I cannot score this conversation."),
            Err(SurveyError::Validation { .. })
        ));
        // arrays are not accepted as the answer object
        assert!(extract_json_object("[1, 2]").is_err());
    }
}
