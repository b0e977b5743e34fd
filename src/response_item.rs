//! Inbound response items as handed over by a model-interaction transcript.
//!
//! A response item is a tagged record; only items tagged `"message"` carry a
//! conversational turn. Message content is either a plain string or a list of
//! typed content blocks. Block tags outside the known vocabulary are kept as
//! [`ContentBlock::Unsupported`] so the flattening step can reject them with
//! the offending tag.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::{Result, SurveyError};

/// One item of a response-input list.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "serde_json::Value")]
pub enum ResponseItem {
    /// An item whose `type` is `"message"`.
    Message(MessageItem),
    /// Any other item (function calls, reasoning, untyped input...).
    Other { kind: Option<String> },
}

impl ResponseItem {
    pub fn kind(&self) -> Option<&str> {
        match self {
            ResponseItem::Message(_) => Some("message"),
            ResponseItem::Other { kind } => kind.as_deref(),
        }
    }
}

impl TryFrom<Value> for ResponseItem {
    type Error = SurveyError;

    fn try_from(value: Value) -> Result<Self> {
        let kind = value.get("type").and_then(Value::as_str).map(str::to_string);
        match kind.as_deref() {
            Some("message") => Ok(ResponseItem::Message(serde_json::from_value(value)?)),
            _ => Ok(ResponseItem::Other { kind }),
        }
    }
}

/// The payload of a `"message"` response item.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MessageItem {
    pub role: String,
    pub content: ItemContent,
}

/// Message content: a plain string or an ordered list of typed blocks.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ItemContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

impl ItemContent {
    /// Reduce the content to one string. Fails on the first unsupported block.
    pub fn flatten(&self) -> Result<String> {
        match self {
            ItemContent::Text(text) => Ok(text.clone()),
            ItemContent::Blocks(blocks) => {
                let mut out = String::new();
                for block in blocks {
                    out.push_str(block.flat_text()?);
                }
                Ok(out)
            }
        }
    }
}

/// One typed fragment of message content.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentBlock {
    InputText {
        text: String,
    },
    OutputText {
        text: String,
    },
    InputImage {
        image_url: Option<String>,
        file_id: Option<String>,
    },
    InputFile {
        filename: Option<String>,
        file_id: Option<String>,
    },
    Refusal {
        refusal: String,
    },
    /// A block whose tag is outside the known vocabulary.
    Unsupported {
        kind: String,
    },
}

impl ContentBlock {
    /// Text this block contributes to a flattened message.
    pub fn flat_text(&self) -> Result<&str> {
        match self {
            ContentBlock::InputText { text } | ContentBlock::OutputText { text } => Ok(text),
            ContentBlock::InputImage { .. } => Ok("[image]"),
            ContentBlock::InputFile { .. } => Ok("[file]"),
            ContentBlock::Refusal { .. } => Ok(""),
            ContentBlock::Unsupported { kind } => Err(SurveyError::UnsupportedContent {
                kind: kind.clone(),
            }),
        }
    }
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum KnownBlock {
    InputText {
        text: String,
    },
    OutputText {
        text: String,
    },
    InputImage {
        #[serde(default)]
        image_url: Option<String>,
        #[serde(default)]
        file_id: Option<String>,
    },
    InputFile {
        #[serde(default)]
        filename: Option<String>,
        #[serde(default)]
        file_id: Option<String>,
    },
    Refusal {
        #[serde(default)]
        refusal: String,
    },
}

impl From<KnownBlock> for ContentBlock {
    fn from(block: KnownBlock) -> Self {
        match block {
            KnownBlock::InputText { text } => ContentBlock::InputText { text },
            KnownBlock::OutputText { text } => ContentBlock::OutputText { text },
            KnownBlock::InputImage { image_url, file_id } => {
                ContentBlock::InputImage { image_url, file_id }
            }
            KnownBlock::InputFile { filename, file_id } => {
                ContentBlock::InputFile { filename, file_id }
            }
            KnownBlock::Refusal { refusal } => ContentBlock::Refusal { refusal },
        }
    }
}

// Known tags must match their shape exactly; unknown tags are accepted here and
// rejected when the block is flattened.
impl<'de> Deserialize<'de> for ContentBlock {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::Error;
        let value = Value::deserialize(deserializer)?;
        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| D::Error::custom("content block missing string 'type' field"))?
            .to_string();

        match kind.as_str() {
            "input_text" | "output_text" | "input_image" | "input_file" | "refusal" => {
                serde_json::from_value::<KnownBlock>(value)
                    .map(ContentBlock::from)
                    .map_err(|e| D::Error::custom(format!("invalid {kind} block: {e}")))
            }
            _ => Ok(ContentBlock::Unsupported { kind }),
        }
    }
}
