use crate::error::{CompareError, Result};
use crate::models::Source;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::env;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct CompareConfig {
    pub upstream: UpstreamConfig,
    #[serde(default = "default_sources")]
    pub sources: Vec<SourceConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamConfig {
    pub endpoint: String,
    #[serde(default = "default_ask_path")]
    pub ask_path: String,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Sent verbatim with every request
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub id: String,
    pub label: String,
}

fn default_ask_path() -> String {
    "/api/ask".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    120
}

fn default_sources() -> Vec<SourceConfig> {
    [
        ("gemini-2.5-flash-lite", "Gemini 2.5 Flash Lite"),
        ("gemini-2.5-flash", "Gemini 2.5 Flash"),
        ("gemini-3-flash", "Gemini 3.0 Flash"),
        ("gpt-4o", "GPT-4o"),
        ("claude-sonnet-4-5-20250929", "Claude 4.5 Sonnet"),
        ("claude-opus-4-5-20251101", "Claude 4.5 Opus"),
    ]
    .into_iter()
    .map(|(id, label)| SourceConfig {
        id: id.to_string(),
        label: label.to_string(),
    })
    .collect()
}

impl CompareConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let endpoint =
            env::var("COMPARE_ENDPOINT").unwrap_or_else(|_| "http://127.0.0.1:5000".to_string());

        let connect_timeout_secs = env::var("COMPARE_TIMEOUT_SECS")
            .unwrap_or_else(|_| default_connect_timeout_secs().to_string())
            .parse::<u64>()
            .map_err(|e| CompareError::ConfigError(format!("Invalid timeout value: {}", e)))?;

        let mut config = CompareConfig {
            upstream: UpstreamConfig {
                endpoint,
                ask_path: default_ask_path(),
                connect_timeout_secs,
                headers: HashMap::new(),
            },
            sources: default_sources(),
        };
        config.apply_auth_token_override();

        Ok(config)
    }

    /// Load configuration from TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            CompareError::ConfigError(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        let mut config = Self::from_toml(&contents)?;

        // Allow environment variables to override file config
        config.apply_auth_token_override();

        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents)
            .map_err(|e| CompareError::ConfigError(format!("Failed to parse config: {}", e)))
    }

    fn apply_auth_token_override(&mut self) {
        if let Ok(token) = env::var("COMPARE_AUTH_TOKEN")
            && !token.is_empty()
        {
            self.upstream
                .headers
                .insert("Authorization".to_string(), format!("Bearer {}", token));
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.upstream.endpoint.is_empty() {
            return Err(CompareError::ConfigError("Endpoint is empty".to_string()));
        }

        if self.upstream.connect_timeout_secs == 0 {
            return Err(CompareError::ConfigError(
                "Connect timeout must be greater than 0".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for source in &self.sources {
            if source.id.trim().is_empty() {
                return Err(CompareError::ConfigError(
                    "Source id cannot be empty".to_string(),
                ));
            }
            if !seen.insert(source.id.as_str()) {
                return Err(CompareError::ConfigError(format!(
                    "Duplicate source id: {}",
                    source.id
                )));
            }
        }

        Ok(())
    }

    /// Resolve a source id against the catalog; unknown ids are passed through as-is
    pub fn source(&self, id: &str) -> Source {
        self.sources
            .iter()
            .find(|s| s.id == id)
            .map(|s| Source::new(&s.id, &s.label))
            .unwrap_or_else(|| Source::bare(id))
    }
}
