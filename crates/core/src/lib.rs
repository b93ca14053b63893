pub mod domain;
pub mod indicators;
pub mod ingest;
pub mod llm;
pub mod pipeline;
pub mod present;

pub mod config {
    use anyhow::Context;

    use crate::llm::Provider;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub llm_provider: Provider,
        pub openai_api_key: Option<String>,
        pub anthropic_api_key: Option<String>,
        pub sentry_dsn: Option<String>,
        pub market_data_base_url: Option<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            let llm_provider = match std::env::var("LLM_PROVIDER") {
                Ok(s) if !s.trim().is_empty() => s.parse::<Provider>()?,
                _ => Provider::OpenAI,
            };

            Ok(Self {
                llm_provider,
                openai_api_key: non_empty_var("OPENAI_API_KEY"),
                anthropic_api_key: non_empty_var("ANTHROPIC_API_KEY"),
                sentry_dsn: non_empty_var("SENTRY_DSN"),
                market_data_base_url: non_empty_var("MARKET_DATA_BASE_URL"),
            })
        }

        pub fn require_openai_api_key(&self) -> anyhow::Result<&str> {
            self.openai_api_key
                .as_deref()
                .context("OPENAI_API_KEY is required")
        }

        pub fn require_anthropic_api_key(&self) -> anyhow::Result<&str> {
            self.anthropic_api_key
                .as_deref()
                .context("ANTHROPIC_API_KEY is required")
        }
    }

    fn non_empty_var(key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|s| !s.trim().is_empty())
    }

}
