#![cfg(feature = "live_api")]

use satisfaction_survey::{Config, Message, SurveyAgent};

#[tokio::test]
async fn live_survey_against_responses_api() {
    dotenvy::dotenv().ok();
    if std::env::var("RUN_OPENAI_TESTS").ok().as_deref() != Some("1") {
        eprintln!("Skipping live survey test: RUN_OPENAI_TESTS != 1");
        return;
    }

    let config = match Config::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Skipping live survey test: failed to load config ({e})");
            return;
        }
    };
    if config.runtime.openai_api_key.is_none() {
        eprintln!("Skipping live survey test: OPENAI_API_KEY not set");
        return;
    }

    let agent = SurveyAgent::from_config(&config).expect("agent from config");
    let messages = vec![
        Message::new("user", "Hi, I was charged twice for my subscription."),
        Message::new("assistant", "I'm sorry about that. I've refunded the duplicate charge."),
        Message::new("user", "Great, thanks for the quick help!"),
    ];

    let result = agent.survey(messages).await.expect("live survey");
    assert_eq!(result.usage.requests, 1);
    assert!(result.usage.total_tokens > 0);
    assert!((-1.0..=1.0).contains(&result.sentiment_metrics.final_sentiment_state));
}
