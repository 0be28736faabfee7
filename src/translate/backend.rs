//! The external translation service.
//!
//! The translate stage only needs one operation, expressed by the
//! [`Translator`] trait. [`ChatTranslator`] implements it against an
//! OpenAI-compatible chat-completions endpoint.
//!
//! The service is remote and rate limited, so every request has a timeout
//! and transient failures (timeouts, connection errors, HTTP 429 and 5xx)
//! are retried with exponential backoff a bounded number of times. Anything
//! else fails immediately.

use crate::config::TranslatorConfig;
use backon::{BlockingRetryable, ExponentialBuilder};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("API key not set: environment variable {0} is empty or missing")]
    MissingApiKey(String),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Translation service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Malformed response from translation service: {0}")]
    Malformed(String),
}

impl BackendError {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            BackendError::Http(e) => e.is_timeout() || e.is_connect(),
            BackendError::Status { status, .. } => *status == 429 || *status >= 500,
            BackendError::MissingApiKey(_) | BackendError::Malformed(_) => false,
        }
    }
}

/// Translates text between languages.
pub trait Translator {
    /// Translate `text` from `source` to `target`. With `preserve_markup`
    /// the text is markdown whose formatting must survive untouched.
    fn translate(
        &self,
        text: &str,
        source: &str,
        target: &str,
        preserve_markup: bool,
    ) -> Result<String, BackendError>;
}

/// Chat-completions translation client.
pub struct ChatTranslator {
    client: reqwest::blocking::Client,
    endpoint: String,
    model: String,
    api_key_env: String,
    api_key: Option<String>,
    max_retries: usize,
}

impl ChatTranslator {
    /// Build a client from config. The API key is read from the configured
    /// environment variable now, but its absence is only reported when a
    /// request is actually made, so single-language sites need no key.
    pub fn from_config(config: &TranslatorConfig) -> Result<Self, BackendError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty());
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key_env: config.api_key_env.clone(),
            api_key,
            max_retries: config.max_retries,
        })
    }

    fn request(
        &self,
        text: &str,
        source: &str,
        target: &str,
        preserve_markup: bool,
    ) -> Result<String, BackendError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| BackendError::MissingApiKey(self.api_key_env.clone()))?;

        let body = ChatRequest {
            model: &self.model,
            messages: prompt(text, source, target, preserve_markup),
        };
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&body)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Status {
                status: status.as_u16(),
                body: response.text().unwrap_or_default(),
            });
        }

        let reply: ChatResponse = response.json()?;
        let content = reply
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| BackendError::Malformed("no choices in response".into()))?;
        Ok(strip_language_header(&content, target))
    }
}

impl Translator for ChatTranslator {
    fn translate(
        &self,
        text: &str,
        source: &str,
        target: &str,
        preserve_markup: bool,
    ) -> Result<String, BackendError> {
        let backoff = ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(500))
            .with_max_delay(Duration::from_secs(30))
            .with_max_times(self.max_retries);

        (|| self.request(text, source, target, preserve_markup))
            .retry(backoff)
            .sleep(std::thread::sleep)
            .when(BackendError::is_transient)
            .notify(|err, delay| {
                log::warn!("Translation into {target} failed: {err}; retrying in {delay:?}");
            })
            .call()
    }
}

#[derive(Debug, serde::Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, serde::Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: String,
}

fn prompt(text: &str, source: &str, target: &str, preserve_markup: bool) -> Vec<ChatMessage> {
    let instructions = if preserve_markup {
        "You are a translation assistant. Translate the markdown document into the target \
         language. Keep all markdown formatting, links and code blocks exactly as they are. \
         Reply with the translated document only."
    } else {
        "You are a translation assistant. Translate the text into the target language. \
         Reply with the translation only."
    };
    vec![
        ChatMessage {
            role: "system",
            content: instructions.to_string(),
        },
        ChatMessage {
            role: "user",
            content: format!("lang: {source}\n---\n{text}\n"),
        },
        ChatMessage {
            role: "user",
            content: format!("lang: {target}\n---"),
        },
    ]
}

/// Models sometimes echo the `lang: xx` / `---` framing of the prompt.
fn strip_language_header(reply: &str, target: &str) -> String {
    let header = format!("lang: {target}");
    let trimmed = reply.trim_start();
    match trimmed.strip_prefix(&header) {
        Some(rest) => {
            let rest = rest.trim_start_matches([' ', '\r', '\n']);
            rest.strip_prefix("---")
                .unwrap_or(rest)
                .trim_start_matches(['\r', '\n'])
                .to_string()
        }
        None => reply.to_string(),
    }
}
