use crate::config::Settings;
use crate::llm::error::LlmDiagnosticsError;
use crate::llm::{ChatPrompt, Completion, LlmClient, Provider, TEMPERATURE};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.openai.com";
const DEFAULT_MODEL: &str = "gpt-4o";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiClient {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let api_key = settings.require_openai_api_key()?.to_string();
        let base_url =
            std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let model = std::env::var("OPENAI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        let timeout_secs = std::env::var("OPENAI_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build reqwest client")?;

        Ok(Self {
            http,
            api_key,
            base_url,
            model,
        })
    }

    fn request_body(&self, prompt: &ChatPrompt) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                Message {
                    role: "system",
                    content: prompt.system.clone(),
                },
                Message {
                    role: "user",
                    content: prompt.user.clone(),
                },
            ],
            temperature: TEMPERATURE,
        }
    }

    fn err(stage: &'static str, detail: impl Into<String>) -> LlmDiagnosticsError {
        LlmDiagnosticsError::new(Provider::OpenAI, stage, detail)
    }

    fn response_text(res: ChatCompletionResponse) -> Option<String> {
        res.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|s| !s.trim().is_empty())
    }
}

#[async_trait::async_trait]
impl LlmClient for OpenAiClient {
    fn provider(&self) -> Provider {
        Provider::OpenAI
    }

    async fn complete(&self, prompt: &ChatPrompt) -> Result<Completion, LlmDiagnosticsError> {
        let url = format!(
            "{}/v1/chat/completions",
            self.base_url.trim_end_matches('/')
        );

        let res = self
            .http
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(prompt))
            .send()
            .await
            .map_err(|e| Self::err("http", format!("OpenAI request failed: {e}")))?;

        let status = res.status();
        let text = res
            .text()
            .await
            .map_err(|e| Self::err("http", format!("failed to read OpenAI response body: {e}")))?;

        let raw_json = serde_json::from_str::<serde_json::Value>(&text).ok();
        if !status.is_success() {
            let mut err = Self::err("http", format!("status={status}")).with_raw_output(text);
            if let Some(raw) = raw_json {
                err = err.with_raw_response_json(raw);
            }
            return Err(err);
        }

        let Some(raw_json) = raw_json else {
            return Err(Self::err("decode", "OpenAI response is not valid JSON").with_raw_output(text));
        };
        let parsed = serde_json::from_value::<ChatCompletionResponse>(raw_json.clone()).map_err(|e| {
            Self::err("decode", format!("unexpected OpenAI response shape: {e}"))
                .with_raw_response_json(raw_json.clone())
        })?;

        match Self::response_text(parsed) {
            Some(content) => Ok(Completion::Text(content)),
            None => Err(Self::err("decode", "OpenAI response has no message content")
                .with_raw_response_json(raw_json)),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<Message>,
    temperature: f64,
}

#[derive(Debug, Clone, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Clone, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client() -> OpenAiClient {
        OpenAiClient {
            http: reqwest::Client::new(),
            api_key: "sk-test".to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    #[test]
    fn request_body_has_system_user_and_temperature() {
        let prompt = ChatPrompt {
            system: "sys".to_string(),
            user: "usr".to_string(),
        };
        let body = serde_json::to_value(client().request_body(&prompt)).unwrap();

        assert_eq!(
            body,
            json!({
                "model": "gpt-4o",
                "messages": [
                    {"role": "system", "content": "sys"},
                    {"role": "user", "content": "usr"}
                ],
                "temperature": 0.3
            })
        );
    }

    #[test]
    fn reads_first_choice_content() {
        let res: ChatCompletionResponse = serde_json::from_value(json!({
            "id": "chatcmpl-1",
            "choices": [
                {"index": 0, "message": {"role": "assistant", "content": "{\"a\":1}"}, "finish_reason": "stop"}
            ]
        }))
        .unwrap();

        assert_eq!(OpenAiClient::response_text(res).as_deref(), Some("{\"a\":1}"));
    }

    #[test]
    fn null_or_missing_content_is_none() {
        let res: ChatCompletionResponse = serde_json::from_value(json!({
            "choices": [{"message": {"role": "assistant", "content": null}}]
        }))
        .unwrap();
        assert!(OpenAiClient::response_text(res).is_none());

        let res: ChatCompletionResponse = serde_json::from_value(json!({"choices": []})).unwrap();
        assert!(OpenAiClient::response_text(res).is_none());
    }
}
