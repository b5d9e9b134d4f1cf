//! OpenAI chat completions adapter.
//!
//! Also serves Groq, whose endpoint is OpenAI-compatible. Both are asked for
//! `response_format: json_object`.

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, instrument};

use super::{Completion, Provider, ProviderSettings, check_status};
use crate::core::record::TokenUsage;

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";

pub struct OpenAiProvider {
    name: &'static str,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    client: reqwest::blocking::Client,
}

impl OpenAiProvider {
    pub fn new(
        name: &'static str,
        base_url: &str,
        api_key: String,
        model: String,
        settings: &ProviderSettings,
    ) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(settings.timeout)
            .build()
            .context("build http client")?;
        Ok(Self {
            name,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
            max_tokens: settings.max_tokens,
            client,
        })
    }

    pub fn openai(api_key: String, model: String, settings: &ProviderSettings) -> Result<Self> {
        Self::new("openai", OPENAI_BASE_URL, api_key, model, settings)
    }

    pub fn groq(api_key: String, model: String, settings: &ProviderSettings) -> Result<Self> {
        Self::new("groq", GROQ_BASE_URL, api_key, model, settings)
    }

    fn request_body(&self, system_prompt: &str, instruction: &str) -> Value {
        json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": instruction},
            ],
            "max_tokens": self.max_tokens,
            "response_format": {"type": "json_object"},
        })
    }
}

impl Provider for OpenAiProvider {
    fn name(&self) -> &str {
        self.name
    }

    fn model(&self) -> &str {
        &self.model
    }

    #[instrument(skip_all, fields(provider = self.name, model = %self.model))]
    fn complete(&self, system_prompt: &str, instruction: &str) -> Result<Completion> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!(%url, "sending chat completion request");
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(system_prompt, instruction))
            .send()
            .with_context(|| format!("send request to {}", self.name))?;
        let response = check_status(self.name, response)?;
        let body: ChatResponse = response
            .json()
            .with_context(|| format!("decode {} response body", self.name))?;
        completion_from(body)
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: Option<u64>,
    completion_tokens: Option<u64>,
    total_tokens: Option<u64>,
}

fn completion_from(body: ChatResponse) -> Result<Completion> {
    let choice = body
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("no choices in chat completion response"))?;
    let usage = body.usage.map(|u| TokenUsage {
        input_tokens: u.prompt_tokens,
        output_tokens: u.completion_tokens,
        total_tokens: u.total_tokens,
    });
    Ok(Completion {
        text: choice.message.content.unwrap_or_default(),
        usage,
    })
}
