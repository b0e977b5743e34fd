//! Canonical conversation messages and their flat-text transcript form.
//!
//! A transcript renders each message as a `role:` line followed by its content
//! and a blank line. Parsing goes the other way but only recognises the
//! `user:` and `assistant:` markers; messages with other roles can be written
//! but are not recovered. Content containing a line that is exactly one of
//! those markers is split there on parse.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, SurveyError};
use crate::response_item::ResponseItem;

/// Role label of a message. Any caller-supplied string is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(String);

impl Role {
    pub const USER: &'static str = "user";
    pub const ASSISTANT: &'static str = "assistant";

    pub fn new(role: impl Into<String>) -> Self {
        Self(role.into())
    }

    pub fn user() -> Self {
        Self::new(Self::USER)
    }

    pub fn assistant() -> Self {
        Self::new(Self::ASSISTANT)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Map a trimmed transcript line to a role when it is one of the two
    /// recognised markers.
    fn from_marker(line: &str) -> Option<Self> {
        match line {
            "user:" => Some(Self::user()),
            "assistant:" => Some(Self::assistant()),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Role {
    fn from(role: &str) -> Self {
        Self::new(role)
    }
}

impl From<String> for Role {
    fn from(role: String) -> Self {
        Self(role)
    }
}

impl AsRef<str> for Role {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// One role-tagged conversational turn with flat string content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    role: Role,
    content: String,
}

impl Message {
    pub fn new(role: impl Into<Role>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    pub fn role(&self) -> &Role {
        &self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Validate any serializable record (struct or map) with `role` and
    /// `content` fields into a message. Extra fields are ignored.
    pub fn from_data<T: Serialize + ?Sized>(data: &T) -> Result<Self> {
        let value = serde_json::to_value(data).map_err(|e| SurveyError::Validation {
            message: format!("message record is not serializable: {e}"),
        })?;
        Self::from_value(value)
    }

    /// Validate a JSON value into a message.
    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| SurveyError::Validation {
            message: format!("invalid message record: {e}"),
        })
    }

    /// Flatten one response item. Items not tagged `"message"` yield `None`.
    pub fn from_response_item(item: &ResponseItem) -> Result<Option<Self>> {
        match item {
            ResponseItem::Message(message) => Ok(Some(Self::new(
                message.role.as_str(),
                message.content.flatten()?,
            ))),
            ResponseItem::Other { .. } => Ok(None),
        }
    }

    /// Flatten a list of response items, keeping order and dropping skips.
    pub fn from_response_items(items: &[ResponseItem]) -> Result<Vec<Self>> {
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            if let Some(message) = Self::from_response_item(item)? {
                out.push(message);
            }
        }
        Ok(out)
    }

    /// Render messages as a flat transcript.
    pub fn to_instructions(messages: &[Message]) -> String {
        let mut out = String::new();
        for message in messages {
            out.push_str(&format!("{}:\n{}\n\n", message.role, message.content));
        }
        out.trim().to_string()
    }

    /// Recover messages from a flat transcript.
    pub fn from_text(text: &str) -> Vec<Self> {
        let mut messages = Vec::new();
        let mut current_role: Option<Role> = None;
        let mut current_content: Vec<&str> = Vec::new();

        for line in text.trim().split('\n') {
            let line = line.trim();

            if let Some(role) = Role::from_marker(line) {
                if let Some(prev) = current_role.take() {
                    push_joined(&mut messages, prev, &current_content);
                }
                current_role = Some(role);
                current_content.clear();
            } else if current_role.is_some() {
                current_content.push(line);
            }
        }

        if let Some(role) = current_role {
            push_joined(&mut messages, role, &current_content);
        }

        messages
    }
}

fn push_joined(messages: &mut Vec<Message>, role: Role, lines: &[&str]) {
    let content = lines.join("\n");
    let content = content.trim();
    if !content.is_empty() {
        messages.push(Message::new(role, content));
    }
}
