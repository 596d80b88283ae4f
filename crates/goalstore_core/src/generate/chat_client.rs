//! Blocking client for OpenAI-compatible `/chat/completions` endpoints.

use crate::config::GeneratorConfig;
use crate::generate::{decomposition_prompt, GenerationError, TaskGenerator};
use log::debug;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

/// Generator backed by a hosted chat model.
pub struct ChatCompletionsGenerator {
    http: Client,
    config: GeneratorConfig,
}

impl ChatCompletionsGenerator {
    pub fn new(config: GeneratorConfig) -> Result<Self, GenerationError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| GenerationError::network(format!("client setup failed: {err}")))?;
        Ok(Self { http, config })
    }

    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url)
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }
}

impl TaskGenerator for ChatCompletionsGenerator {
    fn generate(&self, goal_text: &str) -> Result<String, GenerationError> {
        let prompt = decomposition_prompt(goal_text);
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![ChatMessage {
                role: "user",
                content: &prompt,
            }],
        };

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .map_err(|err| {
                if err.is_timeout() {
                    GenerationError::network(format!("request timeout: {err}"))
                } else {
                    GenerationError::network(format!("request failed: {err}"))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|err| GenerationError::network(format!("reading body failed: {err}")))?;
        if !status.is_success() {
            return Err(GenerationError::from_status(status.as_u16(), body));
        }

        let content = parse_completion(&body)?;
        debug!(
            "event=generate module=generate status=ok model={} chars={}",
            self.config.model,
            content.chars().count()
        );
        Ok(content)
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

/// Extracts the first choice's text from a completion body.
fn parse_completion(body: &str) -> Result<String, GenerationError> {
    let parsed: ChatResponse = serde_json::from_str(body)
        .map_err(|err| GenerationError::parse(format!("invalid completion body: {err}")))?;
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| GenerationError::parse("completion carried no message content"))
}
