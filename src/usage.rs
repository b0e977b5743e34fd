//! Token and request accounting for model runs.

use std::ops::AddAssign;

use serde::{Deserialize, Serialize};

use crate::deserializers::{de_count_or_zero, de_default_on_null};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputTokensDetails {
    #[serde(default, deserialize_with = "de_count_or_zero")]
    pub cached_tokens: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputTokensDetails {
    #[serde(default, deserialize_with = "de_count_or_zero")]
    pub reasoning_tokens: u64,
}

/// Additive usage counters. Absent or `null` counters read as zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default, deserialize_with = "de_count_or_zero")]
    pub requests: u64,
    #[serde(default, deserialize_with = "de_count_or_zero")]
    pub input_tokens: u64,
    #[serde(default, deserialize_with = "de_default_on_null")]
    pub input_tokens_details: InputTokensDetails,
    #[serde(default, deserialize_with = "de_count_or_zero")]
    pub output_tokens: u64,
    #[serde(default, deserialize_with = "de_default_on_null")]
    pub output_tokens_details: OutputTokensDetails,
    #[serde(default, deserialize_with = "de_count_or_zero")]
    pub total_tokens: u64,
}

impl Usage {
    /// Merge `other` into `self`, counter by counter.
    pub fn add(&mut self, other: &Usage) {
        self.requests = self.requests.saturating_add(other.requests);
        self.input_tokens = self.input_tokens.saturating_add(other.input_tokens);
        self.output_tokens = self.output_tokens.saturating_add(other.output_tokens);
        self.total_tokens = self.total_tokens.saturating_add(other.total_tokens);
        self.input_tokens_details.cached_tokens = self
            .input_tokens_details
            .cached_tokens
            .saturating_add(other.input_tokens_details.cached_tokens);
        self.output_tokens_details.reasoning_tokens = self
            .output_tokens_details
            .reasoning_tokens
            .saturating_add(other.output_tokens_details.reasoning_tokens);
    }
}

impl AddAssign<&Usage> for Usage {
    fn add_assign(&mut self, rhs: &Usage) {
        Usage::add(self, rhs);
    }
}
