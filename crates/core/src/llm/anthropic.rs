use crate::config::Settings;
use crate::domain::contract::LlmRecommendation;
use crate::llm::error::LlmDiagnosticsError;
use crate::llm::{ChatPrompt, Completion, LlmClient, Provider, TEMPERATURE};
use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_MODEL: &str = "claude-3-5-sonnet-latest";
const DEFAULT_MAX_TOKENS: u32 = 1024;
const DEFAULT_TIMEOUT_SECS: u64 = 60;

const TOOL_NAME_EMIT_RECOMMENDATION: &str = "emit_recommendation";

#[derive(Debug, Clone)]
pub struct AnthropicClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
}

impl AnthropicClient {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let api_key = settings.require_anthropic_api_key()?.to_string();
        let base_url =
            std::env::var("ANTHROPIC_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let model = std::env::var("ANTHROPIC_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let max_tokens = std::env::var("ANTHROPIC_MAX_TOKENS")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(DEFAULT_MAX_TOKENS);

        let timeout_secs = std::env::var("ANTHROPIC_TIMEOUT_SECS")
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
            max_tokens,
        })
    }

    fn err(stage: &'static str, detail: impl Into<String>) -> LlmDiagnosticsError {
        LlmDiagnosticsError::new(Provider::Anthropic, stage, detail)
    }

    fn request_body(&self, prompt: &ChatPrompt) -> CreateMessageRequest {
        CreateMessageRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            temperature: TEMPERATURE,
            system: Some(prompt.system.clone()),
            messages: vec![Message {
                role: "user",
                content: prompt.user.clone(),
            }],
            tools: Some(Self::tools()),
            tool_choice: Some(Self::tool_choice()),
        }
    }

    fn tools() -> Vec<Tool> {
        vec![Tool {
            name: TOOL_NAME_EMIT_RECOMMENDATION,
            description: "Emit the final BUY/HOLD/SELL recommendation as structured JSON",
            input_schema: LlmRecommendation::json_schema(),
        }]
    }

    fn tool_choice() -> ToolChoice {
        ToolChoice::Tool {
            name: TOOL_NAME_EMIT_RECOMMENDATION,
        }
    }

    fn headers(&self) -> Result<HeaderMap, LlmDiagnosticsError> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(&self.api_key)
            .map_err(|_| Self::err("config", "ANTHROPIC_API_KEY is not a valid header value"))?;
        headers.insert("x-api-key", key);
        headers.insert(
            "anthropic-version",
            HeaderValue::from_static(ANTHROPIC_VERSION),
        );
        Ok(headers)
    }

    /// Prefers the forced tool call; falls back to concatenated text blocks.
    fn completion(res: CreateMessageResponse) -> Option<Completion> {
        let mut text = String::new();
        for block in res.content {
            match block {
                ContentBlock::ToolUse { name, input } if name == TOOL_NAME_EMIT_RECOMMENDATION => {
                    return Some(Completion::Structured(input));
                }
                ContentBlock::Text { text: t } => {
                    if !text.is_empty() {
                        text.push('\n');
                    }
                    text.push_str(&t);
                }
                _ => {}
            }
        }
        (!text.trim().is_empty()).then_some(Completion::Text(text))
    }
}

#[async_trait::async_trait]
impl LlmClient for AnthropicClient {
    fn provider(&self) -> Provider {
        Provider::Anthropic
    }

    async fn complete(&self, prompt: &ChatPrompt) -> Result<Completion, LlmDiagnosticsError> {
        let url = format!("{}/v1/messages", self.base_url.trim_end_matches('/'));
        let res = self
            .http
            .post(url)
            .headers(self.headers()?)
            .json(&self.request_body(prompt))
            .send()
            .await
            .map_err(|e| Self::err("http", format!("Anthropic request failed: {e}")))?;

        let status = res.status();
        let text = res
            .text()
            .await
            .map_err(|e| Self::err("http", format!("failed to read Anthropic response body: {e}")))?;

        let raw_json = serde_json::from_str::<serde_json::Value>(&text).ok();
        if !status.is_success() {
            let mut err = Self::err("http", format!("status={status}")).with_raw_output(text);
            if let Some(raw) = raw_json {
                err = err.with_raw_response_json(raw);
            }
            return Err(err);
        }

        let Some(raw_json) = raw_json else {
            return Err(Self::err("decode", "Anthropic response is not valid JSON").with_raw_output(text));
        };
        let parsed = serde_json::from_value::<CreateMessageResponse>(raw_json.clone()).map_err(|e| {
            Self::err("decode", format!("unexpected Anthropic response shape: {e}"))
                .with_raw_response_json(raw_json.clone())
        })?;

        if matches!(parsed.stop_reason.as_deref(), Some("max_tokens")) {
            tracing::warn!(
                max_tokens = self.max_tokens,
                "Anthropic stop_reason=max_tokens; output may be truncated"
            );
        }

        Self::completion(parsed).ok_or_else(|| {
            Self::err("decode", "Anthropic response has no tool call or text")
                .with_raw_response_json(raw_json)
        })
    }
}

#[derive(Debug, Clone, Serialize)]
struct CreateMessageRequest {
    model: String,
    max_tokens: u32,
    temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<Message>,

    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Tool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<ToolChoice>,
}

#[derive(Debug, Clone, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Debug, Clone, Deserialize)]
struct CreateMessageResponse {
    content: Vec<ContentBlock>,

    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
struct Tool {
    name: &'static str,
    description: &'static str,
    input_schema: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
enum ToolChoice {
    #[serde(rename = "tool")]
    Tool { name: &'static str },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },

    #[serde(rename = "tool_use")]
    ToolUse {
        #[serde(default)]
        name: String,
        #[serde(default)]
        input: serde_json::Value,
    },

    #[serde(other)]
    Unknown,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client() -> AnthropicClient {
        AnthropicClient {
            http: reqwest::Client::new(),
            api_key: "sk-ant-test".to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    #[test]
    fn request_forces_recommendation_tool() {
        let prompt = ChatPrompt {
            system: "sys".to_string(),
            user: "usr".to_string(),
        };
        let body = serde_json::to_value(client().request_body(&prompt)).unwrap();

        assert_eq!(body["temperature"], json!(0.3));
        assert_eq!(body["system"], "sys");
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(
            body["tool_choice"],
            json!({"type": "tool", "name": "emit_recommendation"})
        );
        assert_eq!(body["tools"][0]["input_schema"]["additionalProperties"], false);
    }

    #[test]
    fn prefers_tool_use_input() {
        let res: CreateMessageResponse = serde_json::from_value(json!({
            "content": [
                {"type": "text", "text": "Calling the tool."},
                {"type": "tool_use", "id": "toolu_1", "name": "emit_recommendation", "input": {"action": "HOLD"}}
            ],
            "stop_reason": "tool_use"
        }))
        .unwrap();

        match AnthropicClient::completion(res) {
            Some(Completion::Structured(v)) => assert_eq!(v["action"], "HOLD"),
            other => panic!("expected structured completion, got {other:?}"),
        }
    }

    #[test]
    fn falls_back_to_text_blocks() {
        let res: CreateMessageResponse = serde_json::from_value(json!({
            "content": [
                {"type": "thinking", "thinking": "hmm", "signature": "x"},
                {"type": "text", "text": "{\"action\":"},
                {"type": "text", "text": "\"SELL\"}"}
            ]
        }))
        .unwrap();

        match AnthropicClient::completion(res) {
            Some(Completion::Text(t)) => assert_eq!(t, "{\"action\":\n\"SELL\"}"),
            other => panic!("expected text completion, got {other:?}"),
        }
    }

    #[test]
    fn empty_content_is_none() {
        let res: CreateMessageResponse =
            serde_json::from_value(json!({"content": [], "stop_reason": "end_turn"})).unwrap();
        assert!(AnthropicClient::completion(res).is_none());
    }
}
