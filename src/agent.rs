//! Survey agent: renders the conversation into instructions, runs the model
//! once and validates its answer into the three metric groups.

use std::collections::HashMap;
use std::sync::Arc;

use crate::clients::openai::OpenAiResponsesClient;
use crate::clients::traits::{ModelRunner, ModelSettings};
use crate::config::Config;
use crate::error::Result;
use crate::message::Message;
use crate::metrics::{SurveyResult, extract_json_object, parse_metric};
use crate::prompts::{Prompt, PromptRegistry, survey_prompt};
use crate::render::{ConsolePanels, NoopPanels, PanelRenderer};

pub const PANEL_INSTRUCTIONS: &str = "LLM INSTRUCTIONS";
pub const PANEL_OUTPUT: &str = "LLM OUTPUT";
pub const PANEL_USAGE: &str = "LLM USAGE";

pub struct SurveyAgent<R: ModelRunner> {
    runner: R,
    prompt: Arc<Prompt>,
    settings: ModelSettings,
    renderer: Box<dyn PanelRenderer>,
    verbose: bool,
}

impl<R: ModelRunner> SurveyAgent<R> {
    pub fn new(runner: R) -> Self {
        Self {
            runner,
            prompt: Arc::new(survey_prompt()),
            settings: ModelSettings::default(),
            renderer: Box::new(NoopPanels),
            verbose: false,
        }
    }

    pub fn with_renderer(mut self, renderer: Box<dyn PanelRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_settings(mut self, settings: ModelSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Swap the instruction prompt. It must declare a `messages` input.
    pub fn with_prompt(mut self, prompt: Arc<Prompt>) -> Self {
        self.prompt = prompt;
        self
    }

    /// Use the registered prompt `id`.
    pub fn with_prompt_id(self, registry: &PromptRegistry, id: &str) -> Result<Self> {
        let prompt = registry.require(id)?;
        tracing::debug!(
            "Using prompt {} v{} (checksum {}, parent {:?}, created {} by {})",
            prompt.id,
            prompt.version,
            prompt.lineage.checksum,
            prompt.lineage.parent_id,
            prompt.lineage.created_at.to_rfc3339(),
            prompt.lineage.created_by
        );
        Ok(self.with_prompt(prompt))
    }

    pub fn prompt(&self) -> &Prompt {
        &self.prompt
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn settings(&self) -> &ModelSettings {
        &self.settings
    }

    pub fn render_instructions(&self, messages: &[Message]) -> Result<String> {
        let vars: HashMap<&str, String> = [("messages", Message::to_instructions(messages))].into();
        self.prompt.render(&vars)
    }

    #[tracing::instrument(
        name = "survey",
        skip_all,
        fields(
            model = %self.runner.model(),
            messages = messages.len(),
            prompt = %self.prompt.id,
            checksum = %self.prompt.lineage.checksum
        )
    )]
    pub async fn survey(&self, messages: Vec<Message>) -> Result<SurveyResult> {
        let instructions = self.render_instructions(&messages)?;
        if self.verbose {
            self.renderer.panel(PANEL_INSTRUCTIONS, &instructions, 0)?;
        }

        let output = self.runner.run(&instructions, &self.settings).await?;
        if self.verbose {
            self.renderer.panel(PANEL_OUTPUT, &output.final_output, 1)?;
            let usage = serde_json::to_string_pretty(&output.usage)?;
            self.renderer.panel(PANEL_USAGE, &usage, 2)?;
        }

        let answer = extract_json_object(&output.final_output)?;
        let result = SurveyResult {
            sentiment_metrics: parse_metric(&answer)?,
            customer_effort_metrics: parse_metric(&answer)?,
            semantic_cohesion_metric: parse_metric(&answer)?,
            messages,
            usage: output.usage,
        };

        tracing::info!(
            "Survey complete: prompt={} checksum={}, total_tokens={}, final_sentiment={:.3}",
            self.prompt.id,
            self.prompt.lineage.checksum,
            result.usage.total_tokens,
            result.sentiment_metrics.final_sentiment_state
        );
        Ok(result)
    }
}

impl SurveyAgent<OpenAiResponsesClient> {
    /// Agent over the Responses API with model, settings and panels from `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let runner = OpenAiResponsesClient::from_config(config)?;
        let settings = ModelSettings {
            temperature: Some(config.model.temperature),
            max_output_tokens: config.model.max_output_tokens,
        };
        let agent = Self::new(runner)
            .with_prompt_id(&PromptRegistry::new(), &config.survey.prompt_id)?
            .with_settings(settings)
            .with_verbose(config.survey.verbose);
        Ok(if config.survey.verbose {
            agent.with_renderer(Box::new(ConsolePanels::new(config.survey.panel_width)))
        } else {
            agent
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::traits::{AgentError, RunOutput};
    use crate::error::SurveyError;
    use crate::prompts::SURVEY_PROMPT_ID;
    use crate::usage::Usage;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FixedRunner {
        reply: String,
        seen: Mutex<Vec<String>>,
    }

    impl FixedRunner {
        fn new(reply: &str) -> Self {
            Self {
                reply: reply.to_string(),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ModelRunner for FixedRunner {
        fn model(&self) -> &str {
            "fixed"
        }

        async fn run(&self, input: &str, _settings: &ModelSettings) -> std::result::Result<RunOutput, AgentError> {
            self.seen.lock().unwrap().push(input.to_string());
            Ok(RunOutput {
                final_output: self.reply.clone(),
                usage: Usage {
                    requests: 1,
                    input_tokens: 40,
                    output_tokens: 10,
                    total_tokens: 50,
                    ..Usage::default()
                },
                response_id: None,
            })
        }
    }

    const ANSWER: &str = r#"{
        "average_sentiment_score": 0.1,
        "sentiment_trend_slope": 0.3,
        "final_sentiment_state": 0.7,
        "frequency_of_repeated_intent": 0,
        "negative_signal_word_frequency": 1,
        "question_density": 0.5,
        "question_answer_cosine_similarity": 0.9
    }"#;

    fn conversation() -> Vec<Message> {
        vec![
            Message::new("user", "What is the refund policy?"),
            Message::new("assistant", "30 days."),
        ]
    }

    #[test]
    fn test_render_instructions_embeds_transcript() {
        let agent = SurveyAgent::new(FixedRunner::new(ANSWER));
        let text = agent.render_instructions(&conversation()).unwrap();
        assert!(text.ends_with("user:\nWhat is the refund policy?\n\nassistant:\n30 days."));
    }

    #[tokio::test]
    async fn test_survey_parses_metrics() {
        let agent = SurveyAgent::new(FixedRunner::new(ANSWER));
        let result = agent.survey(conversation()).await.unwrap();

        assert_eq!(result.messages, conversation());
        assert_eq!(result.usage.total_tokens, 50);
        assert_eq!(result.sentiment_metrics.final_sentiment_state, 0.7);
        assert_eq!(result.customer_effort_metrics.negative_signal_word_frequency, 1);
        assert_eq!(result.semantic_cohesion_metric.question_answer_cosine_similarity, 0.9);

        let seen = agent.runner().seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].contains("30 days."));
    }

    fn config_with_key(key: Option<&str>) -> Config {
        let mut config = Config::default();
        config.runtime.openai_api_key = key.map(str::to_string);
        config
    }

    #[test]
    fn test_from_config_requires_api_key() {
        let res = SurveyAgent::from_config(&config_with_key(None));
        assert!(matches!(
            res,
            Err(SurveyError::Agent(AgentError::MissingApiKey))
        ));
    }

    #[test]
    fn test_from_config_uses_registered_prompt() {
        let mut config = config_with_key(Some("sk-test"));
        config.survey.verbose = true;
        config.model.temperature = 0.4;
        let agent = SurveyAgent::from_config(&config).unwrap();

        let registered = PromptRegistry::new().require(SURVEY_PROMPT_ID).unwrap();
        assert_eq!(agent.prompt().id, SURVEY_PROMPT_ID);
        assert_eq!(agent.prompt().lineage.checksum, registered.lineage.checksum);
        assert_eq!(agent.settings().temperature, Some(0.4));

        config.survey.prompt_id = "missing-v9".into();
        assert!(matches!(
            SurveyAgent::from_config(&config),
            Err(SurveyError::Prompt { .. })
        ));
    }

    #[tokio::test]
    async fn test_survey_rejects_non_json_answer() {
        let agent = SurveyAgent::new(FixedRunner::new("The customer seemed happy."));
        let res = agent.survey(conversation()).await;
        assert!(matches!(res, Err(SurveyError::Validation { .. })));
    }
}
