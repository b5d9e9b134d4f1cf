//! Anthropic Messages API adapter.
//!
//! Authenticates with `x-api-key`, sends the system prompt as the top-level
//! `system` field and concatenates the text blocks of the reply.

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, instrument};

use super::{Completion, Provider, ProviderSettings, check_status};
use crate::core::record::TokenUsage;

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct AnthropicProvider {
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    client: reqwest::blocking::Client,
}

impl AnthropicProvider {
    pub fn new(api_key: String, model: String, settings: &ProviderSettings) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(settings.timeout)
            .build()
            .context("build http client")?;
        Ok(Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key,
            model,
            max_tokens: settings.max_tokens,
            client,
        })
    }

    fn request_body(&self, system_prompt: &str, instruction: &str) -> Value {
        json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "system": system_prompt,
            "messages": [
                {"role": "user", "content": instruction},
            ],
        })
    }
}

impl Provider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn model(&self) -> &str {
        &self.model
    }

    #[instrument(skip_all, fields(provider = "anthropic", model = %self.model))]
    fn complete(&self, system_prompt: &str, instruction: &str) -> Result<Completion> {
        let url = format!("{}/messages", self.base_url);
        debug!(%url, "sending messages request");
        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&self.request_body(system_prompt, instruction))
            .send()
            .context("send request to anthropic")?;
        let response = check_status("anthropic", response)?;
        let body: MessagesResponse = response.json().context("decode anthropic response body")?;
        Ok(completion_from(body))
    }
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: Option<MessagesUsage>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct MessagesUsage {
    input_tokens: Option<u64>,
    output_tokens: Option<u64>,
}

fn completion_from(body: MessagesResponse) -> Completion {
    let text: String = body
        .content
        .into_iter()
        .filter_map(|block| match block {
            ContentBlock::Text { text } => Some(text),
            ContentBlock::Other => None,
        })
        .collect();
    let usage = body.usage.map(|u| TokenUsage {
        input_tokens: u.input_tokens,
        output_tokens: u.output_tokens,
        total_tokens: match (u.input_tokens, u.output_tokens) {
            (Some(input), Some(output)) => Some(input + output),
            _ => None,
        },
    });
    Completion { text, usage }
}
