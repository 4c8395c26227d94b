use anyhow::Result;
use serde::Deserialize;
use std::env;
use std::time::Duration;

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub llm: LLMConfig,
    pub assistant: AssistantConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub cors_allowed_origins: Vec<String>,
    pub max_upload_bytes: usize,
}

#[derive(Clone, Deserialize)]
pub struct LLMConfig {
    /// Optional at startup; handlers report its absence as a server error.
    pub openai_api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

// Keeps the key out of startup logs
impl std::fmt::Debug for LLMConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LLMConfig")
            .field("openai_api_key", &self.openai_api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssistantConfig {
    pub assistant_id: Option<String>,
    pub poll_interval_ms: u64,
    pub poll_max_attempts: u32,
}

impl AssistantConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            server: ServerConfig {
                port: env::var("PORT")
                    .unwrap_or_else(|_| "3000".to_string())
                    .parse()?,
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                cors_allowed_origins: env::var("ALLOWED_ORIGINS")
                    .unwrap_or_else(|_| "*".to_string())
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
                max_upload_bytes: env::var("MAX_UPLOAD_BYTES")
                    .unwrap_or_else(|_| (20 * 1024 * 1024).to_string())
                    .parse()?,
            },
            llm: LLMConfig {
                openai_api_key: non_empty_var("OPENAI_API_KEY"),
                base_url: env::var("OPENAI_BASE_URL")
                    .unwrap_or_else(|_| DEFAULT_OPENAI_BASE_URL.to_string()),
                model: env::var("OPENAI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
                timeout_secs: env::var("UPSTREAM_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "60".to_string())
                    .parse()?,
            },
            assistant: AssistantConfig {
                assistant_id: non_empty_var("OPENAI_ASSISTANT_ID"),
                poll_interval_ms: env::var("RUN_POLL_INTERVAL_MS")
                    .unwrap_or_else(|_| "2000".to_string())
                    .parse()?,
                poll_max_attempts: env::var("RUN_POLL_MAX_ATTEMPTS")
                    .unwrap_or_else(|_| "30".to_string())
                    .parse()?,
            },
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_api_key() {
        let llm = LLMConfig {
            openai_api_key: Some("sk-secret-123".to_string()),
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout_secs: 60,
        };

        let printed = format!("{:?}", llm);
        assert!(!printed.contains("sk-secret-123"));
        assert!(printed.contains("<redacted>"));
    }

    #[test]
    fn test_poll_interval() {
        let assistant = AssistantConfig {
            assistant_id: None,
            poll_interval_ms: 250,
            poll_max_attempts: 4,
        };
        assert_eq!(assistant.poll_interval(), Duration::from_millis(250));
    }
}
