use anyhow::{Context, Result};
use dotenvy::dotenv;
use module_extraction::{ExtractionConfig, ModelCredentials, SecretString};
use std::env;
use std::str::FromStr;

/// CLI configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub credentials: ModelCredentials,
    pub firecrawl_api_key: Option<SecretString>,
    pub max_content_length: usize,
    pub temperature: f32,
    pub max_tokens: u32,
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        let api_key = setting("AZURE_OPENAI_API_KEY").context("AZURE_OPENAI_API_KEY must be set")?;
        let endpoint = setting("AZURE_OPENAI_ENDPOINT").context("AZURE_OPENAI_ENDPOINT must be set")?;
        let deployment = setting("AZURE_OPENAI_DEPLOYMENT").context("AZURE_OPENAI_DEPLOYMENT must be set")?;
        let api_version = setting("AZURE_OPENAI_API_VERSION")
            .unwrap_or_else(|| ModelCredentials::DEFAULT_API_VERSION.to_string());

        Ok(Self {
            credentials: ModelCredentials::new(api_key, endpoint, deployment).with_api_version(api_version),
            firecrawl_api_key: setting("FIRECRAWL_API_KEY").map(SecretString::from),
            max_content_length: parsed("MAX_CONTENT_LENGTH", 6000)?,
            temperature: parsed("AI_TEMPERATURE", 0.1)?,
            max_tokens: parsed("AI_MAX_TOKENS", 2000)?,
            log_level: setting("LOG_LEVEL").unwrap_or_else(|| "info".to_string()).to_lowercase(),
        })
    }

    /// Apply the model settings to a run config.
    pub fn apply(&self, config: ExtractionConfig) -> ExtractionConfig {
        config
            .with_max_content_chars(self.max_content_length)
            .with_temperature(self.temperature)
            .with_max_output_tokens(self.max_tokens)
    }
}

/// A non-empty variable that is not a `your_...` template placeholder.
fn setting(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty() && !v.starts_with("your_"))
}

fn parsed<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match setting(name) {
        Some(value) => value
            .parse()
            .with_context(|| format!("{} must be a valid number, got '{}'", name, value)),
        None => Ok(default),
    }
}
