use crate::config::Settings;
use crate::domain::recommendation::{RecommendationRequest, RecommendationResult};
use crate::llm::error::LlmDiagnosticsError;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

pub mod anthropic;
pub mod error;
pub mod json;
pub mod openai;
pub mod prompt;

/// Low randomness: the same data should give the same call most of the time.
pub const TEMPERATURE: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Anthropic,
    OpenAI,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Anthropic => f.write_str("anthropic"),
            Provider::OpenAI => f.write_str("openai"),
        }
    }
}

impl FromStr for Provider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Provider::OpenAI),
            "anthropic" => Ok(Provider::Anthropic),
            other => anyhow::bail!("unsupported LLM_PROVIDER {other:?} (expected openai or anthropic)"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChatPrompt {
    pub system: String,
    pub user: String,
}

/// What a provider handed back: free text, or an already-structured object
/// when the provider supports forced tool output.
#[derive(Debug, Clone)]
pub enum Completion {
    Text(String),
    Structured(serde_json::Value),
}

#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    fn provider(&self) -> Provider;

    async fn complete(&self, prompt: &ChatPrompt) -> Result<Completion, LlmDiagnosticsError>;
}

pub fn client_from_settings(settings: &Settings) -> anyhow::Result<Box<dyn LlmClient>> {
    Ok(match settings.llm_provider {
        Provider::OpenAI => Box::new(openai::OpenAiClient::from_settings(settings)?),
        Provider::Anthropic => Box::new(anthropic::AnthropicClient::from_settings(settings)?),
    })
}

/// Turns a `RecommendationRequest` into exactly one model call and a validated
/// result. Every failure comes back as an `LlmDiagnosticsError`.
pub struct RecommendationRequester {
    client: Box<dyn LlmClient>,
}

impl RecommendationRequester {
    pub fn new(client: Box<dyn LlmClient>) -> Self {
        Self { client }
    }

    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        Ok(Self::new(client_from_settings(settings)?))
    }

    pub fn provider(&self) -> Provider {
        self.client.provider()
    }

    pub async fn request(
        &self,
        req: &RecommendationRequest,
    ) -> Result<RecommendationResult, LlmDiagnosticsError> {
        let provider = self.client.provider();
        let prompt = ChatPrompt {
            system: prompt::system_prompt(),
            user: prompt::user_prompt(req),
        };

        let t0 = std::time::Instant::now();
        let completion = self.client.complete(&prompt).await?;
        tracing::debug!(
            %provider,
            elapsed_ms = t0.elapsed().as_millis(),
            "model completion received"
        );

        match completion {
            Completion::Structured(value) => json::parse_value(value.clone()).map_err(|(stage, err)| {
                LlmDiagnosticsError::new(provider, stage.as_str(), format!("{err:#}"))
                    .with_raw_output(value.to_string())
            }),
            Completion::Text(text) => json::parse_recommendation(&text).map_err(|(stage, err)| {
                LlmDiagnosticsError::new(provider, stage.as_str(), format!("{err:#}"))
                    .with_raw_output(text)
            }),
        }
    }
}
