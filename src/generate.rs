use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

const COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

const SYSTEM_PROMPT: &str = "\
You are an expert front-end developer. Create a COMPLETE, single-file HTML5 document.
Rules:
- Return ONLY raw HTML (no markdown fences).
- Include <head> with <meta charset> and <meta name=\"viewport\"> and a descriptive <title>.
- Include a <style> block with all CSS (no external frameworks).
- Make it responsive (use flexbox/grid).
- Use semantic HTML (header, main, section, footer).
- Add subtle hover effects and accessible contrast.
- If images are requested, use placeholder images with descriptive alt text.
";

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("prompt must not be empty")]
    EmptyPrompt,
    #[error("generation request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("generation failed ({status}): {body}")]
    Api { status: StatusCode, body: String },
}

#[derive(Clone)]
pub struct GenerationClient {
    client: Client,
    model: String,
}

impl GenerationClient {
    pub fn new(api_key: &str, model: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {api_key}"))
                .map_err(|err| anyhow!("invalid API key header: {err}"))?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("building generation client")?;

        Ok(Self {
            client,
            model: model.to_string(),
        })
    }

    /// Sends the prompt to the completion API and returns the raw document
    /// text. An empty completion is a legitimate empty document, not an
    /// error; callers must handle it.
    pub fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(GenerationError::EmptyPrompt);
        }

        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: 0.7,
            max_tokens: 2000,
        };

        let response = self.client.post(COMPLETIONS_URL).json(&request).send()?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(GenerationError::Api { status, body });
        }

        let completion: ChatResponse = response.json()?;
        Ok(extract_html(completion))
    }
}

fn extract_html(completion: ChatResponse) -> String {
    completion
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message)
        .map(|message| message.content)
        .unwrap_or_default()
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    #[serde(default)]
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: String,
}
