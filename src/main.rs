use std::io::Read;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use satisfaction_survey::config::{Config, RuntimeConfig};
use satisfaction_survey::prompts::PromptRegistry;
use satisfaction_survey::{Message, ResponseItem, SurveyAgent};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum InputFormat {
    /// JSON array of items or messages, otherwise a flat transcript
    Auto,
    /// Flat `user:` / `assistant:` transcript
    Text,
    /// JSON array of {role, content} records
    Messages,
    /// JSON array of response items
    Items,
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Score a support conversation for customer satisfaction", long_about = None)]
struct Args {
    /// Conversation file, or '-' for stdin
    input: String,

    /// How to read the input
    #[arg(long, value_enum, default_value = "auto")]
    format: InputFormat,

    /// Model override (default from config / SURVEY_MODEL)
    #[arg(long)]
    model: Option<String>,

    /// Show instructions, output and usage panels on stderr
    #[arg(long)]
    verbose: bool,

    /// Panel width in columns
    #[arg(long)]
    width: Option<usize>,

    /// Print the rendered instructions and exit without calling the model
    #[arg(long)]
    dry_run: bool,

    /// Pretty-print the result JSON
    #[arg(long)]
    pretty: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let runtime = RuntimeConfig::load_from_env();
    let filter = EnvFilter::try_new(&runtime.log_level)
        .unwrap_or_else(|_| EnvFilter::new(RuntimeConfig::default().log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let raw = read_input(&args.input)?;
    let messages = parse_messages(&raw, args.format)?;
    tracing::debug!("Loaded {} messages from {}", messages.len(), args.input);

    let mut config = Config::load()?;

    if args.dry_run {
        let prompt = PromptRegistry::new().require(&config.survey.prompt_id)?;
        tracing::info!(
            "Dry run with prompt {} v{} checksum={}",
            prompt.id,
            prompt.version,
            prompt.lineage.checksum
        );
        let vars = [("messages", Message::to_instructions(&messages))].into();
        println!("{}", prompt.render(&vars)?);
        return Ok(());
    }

    if let Some(model) = args.model {
        config.model.name = model;
    }
    if let Some(width) = args.width {
        config.survey.panel_width = width;
    }
    config.survey.verbose |= args.verbose;
    config.validate();

    let agent = SurveyAgent::from_config(&config).context("Failed to set up survey agent")?;
    let result = agent.survey(messages).await?;

    let out = if args.pretty {
        serde_json::to_string_pretty(&result)?
    } else {
        serde_json::to_string(&result)?
    };
    println!("{}", out);
    Ok(())
}

fn read_input(path: &str) -> Result<String> {
    if path == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read conversation from stdin")?;
        Ok(buf)
    } else {
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path))
    }
}

fn parse_messages(raw: &str, format: InputFormat) -> Result<Vec<Message>> {
    let format = match format {
        InputFormat::Auto => detect_format(raw),
        other => other,
    };

    match format {
        InputFormat::Text | InputFormat::Auto => Ok(Message::from_text(raw)),
        InputFormat::Messages => {
            let values: Vec<Value> =
                serde_json::from_str(raw).context("Expected a JSON array of messages")?;
            values
                .into_iter()
                .map(|v| Message::from_value(v).map_err(anyhow::Error::from))
                .collect()
        }
        InputFormat::Items => {
            let items: Vec<ResponseItem> =
                serde_json::from_str(raw).context("Expected a JSON array of response items")?;
            Ok(Message::from_response_items(&items)?)
        }
    }
}

fn detect_format(raw: &str) -> InputFormat {
    match serde_json::from_str::<Value>(raw.trim()) {
        Ok(Value::Array(values)) if values.iter().any(|v| v.get("type").is_some()) => {
            InputFormat::Items
        }
        Ok(Value::Array(_)) => InputFormat::Messages,
        _ => InputFormat::Text,
    }
}
