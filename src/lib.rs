//! Customer-satisfaction surveys over support conversations.
//!
//! Conversations arrive as structured records, response items or a flat
//! `role:` transcript and are normalized into [`Message`]s. A
//! [`SurveyAgent`] renders them into instructions, runs a hosted model once
//! and validates its answer into sentiment, effort and cohesion metrics.

pub mod agent;
pub mod clients;
pub mod config;
pub mod deserializers;
pub mod error;
pub mod message;
pub mod metrics;
pub mod prompts;
pub mod render;
pub mod response_item;
pub mod usage;

pub use agent::SurveyAgent;
pub use clients::{AgentError, ModelRunner, ModelSettings, OpenAiResponsesClient, RunOutput};
pub use config::Config;
pub use error::{Result, SurveyError};
pub use message::{Message, Role};
pub use metrics::{
    CustomerEffortMetrics, SemanticCohesionMetric, SentimentMetrics, SurveyResult,
};
pub use render::{ConsolePanels, NoopPanels, PanelRenderer};
pub use response_item::{ContentBlock, ItemContent, MessageItem, ResponseItem};
pub use usage::Usage;
