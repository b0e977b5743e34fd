//! Versioned instruction prompts for survey runs
//!
//! Each prompt carries an id, a declared set of inputs, and a lineage record
//! with a checksum of its template so a stored result can be traced back to
//! the exact instructions that produced it.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Result, SurveyError};

/// Id of the prompt used by [`crate::agent::SurveyAgent`] by default.
pub const SURVEY_PROMPT_ID: &str = "survey-metrics-v1";

/// Represents a prompt's evolution history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptLineage {
    /// Parent prompt ID if this is a refinement
    pub parent_id: Option<String>,
    /// Git-style SHA1 checksum of the prompt content
    pub checksum: String,
    /// When this version was created
    pub created_at: chrono::DateTime<chrono::Utc>,
    /// Who/what created this version
    pub created_by: String,
}

/// Core prompt definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prompt {
    /// Stable identifier (format: category-name-v1)
    pub id: String,
    /// Short one-liner description
    pub one_liner: String,
    /// Input placeholders with descriptions
    pub inputs: HashMap<String, String>,
    pub version: String,
    pub lineage: PromptLineage,
    /// Template text with `{{name}}` placeholders
    pub template: String,
}

impl Prompt {
    pub fn new(
        id: impl Into<String>,
        one_liner: impl Into<String>,
        template: impl Into<String>,
        inputs: HashMap<String, String>,
        parent_id: Option<String>,
    ) -> Self {
        let template = template.into();
        let checksum = sha1_checksum(&template);

        Self {
            id: id.into(),
            one_liner: one_liner.into(),
            inputs,
            version: "1.0.0".to_string(),
            lineage: PromptLineage {
                parent_id,
                checksum,
                created_at: chrono::Utc::now(),
                created_by: "satisfaction-survey".to_string(),
            },
            template,
        }
    }

    /// Substitute every declared input into the template.
    ///
    /// Fails when a declared input has no value. Values are inserted verbatim
    /// and are not re-scanned for placeholders.
    pub fn render(&self, vars: &HashMap<&str, String>) -> Result<String> {
        let mut names: Vec<&str> = self.inputs.keys().map(String::as_str).collect();
        names.sort_unstable();
        for name in &names {
            if !vars.contains_key(name) {
                return Err(SurveyError::Prompt {
                    message: format!("prompt '{}' is missing input '{}'", self.id, name),
                });
            }
        }

        let mut out = String::with_capacity(self.template.len());
        let mut rest = self.template.as_str();
        while let Some(open) = rest.find("{{") {
            let Some(close) = rest[open + 2..].find("}}") else {
                break;
            };
            let name = rest[open + 2..open + 2 + close].trim();
            out.push_str(&rest[..open]);
            match vars.get(name) {
                Some(value) if self.inputs.contains_key(name) => out.push_str(value),
                _ => out.push_str(&rest[open..open + 2 + close + 2]),
            }
            rest = &rest[open + 2 + close + 2..];
        }
        out.push_str(rest);
        Ok(out)
    }
}

/// Generate a SHA1 checksum of prompt content
fn sha1_checksum(content: &str) -> String {
    use sha1::{Digest, Sha1};
    let mut hasher = Sha1::new();
    hasher.update(content);
    format!("{:x}", hasher.finalize())
}

/// Registry of all known prompts with their metadata
#[derive(Debug, Default)]
pub struct PromptRegistry {
    prompts: HashMap<String, Arc<Prompt>>,
}

impl PromptRegistry {
    /// Create new registry with core prompts
    pub fn new() -> Self {
        let mut registry = Self::default();
        registry.register_core_prompts();
        registry
    }

    pub fn register(&mut self, prompt: Prompt) {
        self.prompts.insert(prompt.id.clone(), Arc::new(prompt));
    }

    pub fn get(&self, id: &str) -> Option<Arc<Prompt>> {
        self.prompts.get(id).cloned()
    }

    pub fn list(&self) -> Vec<Arc<Prompt>> {
        self.prompts.values().cloned().collect()
    }

    /// Like [`PromptRegistry::get`], failing with the known ids when `id` is absent.
    pub fn require(&self, id: &str) -> Result<Arc<Prompt>> {
        self.get(id).ok_or_else(|| {
            let mut known: Vec<String> = self.list().iter().map(|p| p.id.clone()).collect();
            known.sort_unstable();
            SurveyError::Prompt {
                message: format!("unknown prompt '{}' (known: {})", id, known.join(", ")),
            }
        })
    }

    fn register_core_prompts(&mut self) {
        self.register(survey_prompt());
    }
}

/// The built-in metrics prompt; its single input is `messages`.
pub fn survey_prompt() -> Prompt {
    Prompt::new(
        SURVEY_PROMPT_ID,
        "Score a support conversation for sentiment, effort and cohesion",
        SURVEY_TEMPLATE,
        [(
            "messages".into(),
            "Conversation transcript in role:/content form".into(),
        )]
        .into(),
        None,
    )
}

const SURVEY_TEMPLATE: &str = r#"You are a customer-satisfaction analyst. Read the conversation between a customer ("user") and a support agent ("assistant") and score it.

Return ONLY one JSON object with exactly these fields:
- "average_sentiment_score" (number, -1 to 1): mean sentiment over all of the customer's messages.
- "sentiment_trend_slope" (number): linear-regression slope of the customer's sentiment across the conversation; positive if it improved, negative if it worsened.
- "final_sentiment_state" (number, -1 to 1): mean sentiment of the customer's final few messages.
- "frequency_of_repeated_intent" (integer): how many times the customer had to repeat the same question or need.
- "negative_signal_word_frequency" (integer): count of words or phrases implying effort or frustration, such as "again", "still", "I already told you", "useless".
- "question_density" (number, 0 to 1): share of the customer's messages that are questions.
- "question_answer_cosine_similarity" (number, 0 to 1): how semantically relevant the agent's answers are to the customer's questions.

Conversation:
{{messages}}"#;

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(messages: &str) -> HashMap<&'static str, String> {
        [("messages", messages.to_string())].into()
    }

    #[test]
    fn test_registry_has_survey_prompt() {
        let registry = PromptRegistry::new();
        let prompt = registry.get(SURVEY_PROMPT_ID).expect("survey prompt registered");
        assert!(prompt.inputs.contains_key("messages"));
        assert_eq!(prompt.lineage.checksum.len(), 40);
        assert_eq!(registry.list().len(), 1);
    }

    #[test]
    fn test_require_unknown_prompt_lists_known_ids() {
        let registry = PromptRegistry::new();
        assert_eq!(registry.require(SURVEY_PROMPT_ID).unwrap().id, SURVEY_PROMPT_ID);
        match registry.require("nope-v1") {
            Err(SurveyError::Prompt { message }) => {
                assert!(message.contains("nope-v1"));
                assert!(message.contains(SURVEY_PROMPT_ID));
            }
            other => panic!("Expected prompt error, got {:?}", other),
        }
    }

    #[test]
    fn test_render_substitutes_declared_inputs() {
        let prompt = Prompt::new(
            "t-v1",
            "test",
            "A {{ name }} and {{name}} but not {{other}}",
            [("name".into(), "a name".into())].into(),
            None,
        );
        let out = prompt
            .render(&[("name", "x".to_string()), ("other", "y".to_string())].into())
            .unwrap();
        assert_eq!(out, "A x and x but not {{other}}");
    }

    #[test]
    fn test_render_does_not_rescan_values() {
        let prompt = PromptRegistry::new().get(SURVEY_PROMPT_ID).unwrap();
        let out = prompt.render(&vars("user:\n{{messages}}")).unwrap();
        assert!(out.ends_with("Conversation:\nuser:\n{{messages}}"));
    }

    #[test]
    fn test_render_missing_input_fails() {
        let prompt = PromptRegistry::new().get(SURVEY_PROMPT_ID).unwrap();
        let res = prompt.render(&HashMap::new());
        assert!(matches!(res, Err(SurveyError::Prompt { .. })));
    }

    #[test]
    fn test_checksum_tracks_template() {
        let a = Prompt::new("a", "", "same", HashMap::new(), None);
        let b = Prompt::new("b", "", "same", HashMap::new(), Some("a".into()));
        let c = Prompt::new("c", "", "different", HashMap::new(), None);
        assert_eq!(a.lineage.checksum, b.lineage.checksum);
        assert_ne!(a.lineage.checksum, c.lineage.checksum);
    }
}
