use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{ChatMessage, Result, ScaleBurnError, DEFAULT_PROFILE};

/// Endpoint settings for an OpenAI-compatible completion server.
#[derive(Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    pub model_name: String,
    #[serde(default)]
    pub info: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    600
}

// Keeps the API key out of logs.
impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("model_name", &self.model_name)
            .field("info", &self.info)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl ClientConfig {
    pub fn endpoint_url(&self) -> String {
        format!("http://{}:{}/v1", self.host, self.port)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        Ok(Self {
            host: required(&lookup, "CLIENT_HOST")?,
            port: parse(&lookup, "CLIENT_PORT")?
                .ok_or_else(|| missing("CLIENT_PORT"))?,
            api_key: lookup("CLIENT_API_KEY").filter(|k| !k.is_empty()),
            model_name: required(&lookup, "CLIENT_MODEL_NAME")?,
            info: lookup("CLIENT_INFO").unwrap_or_default(),
            timeout_secs: parse(&lookup, "CLIENT_TIMEOUT_SECS")?
                .unwrap_or_else(default_timeout_secs),
        })
    }
}

/// Prompt sent once before the first level to wake the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarmupConfig {
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for WarmupConfig {
    fn default() -> Self {
        Self {
            messages: vec![
                ChatMessage::system("You are helpful assistant. Answer on the request."),
                ChatMessage::user("Write a \"Hello World\" script in Python 3.12."),
            ],
            temperature: 1.0,
            max_tokens: 4096,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkConfig {
    pub requests_per_worker: u32,
    pub profile: Vec<u32>,
    #[serde(default)]
    pub info: String,
    #[serde(default)]
    pub warmup: WarmupConfig,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            requests_per_worker: 10,
            profile: DEFAULT_PROFILE.to_vec(),
            info: String::new(),
            warmup: WarmupConfig::default(),
        }
    }
}

impl BenchmarkConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let profile = match lookup("BENCHMARK_PROFILE") {
            Some(raw) => parse_profile(&raw)?,
            None => defaults.profile,
        };

        let config = Self {
            requests_per_worker: parse(&lookup, "BENCHMARK_REQUESTS_PER_WORKER")?
                .unwrap_or(defaults.requests_per_worker),
            profile,
            info: lookup("BENCHMARK_INFO").unwrap_or_default(),
            warmup: defaults.warmup,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.requests_per_worker == 0 {
            return Err(ScaleBurnError::Config(
                "requests_per_worker must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Parses a comma separated list of concurrency levels, e.g. `1,2,4,8`.
pub fn parse_profile(raw: &str) -> Result<Vec<u32>> {
    let levels = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<u32>().map_err(|e| {
                ScaleBurnError::Config(format!("Invalid concurrency level '{}': {}", s, e))
            })
        })
        .collect::<Result<Vec<_>>>()?;

    if levels.is_empty() {
        return Err(ScaleBurnError::Config("Concurrency profile is empty".to_string()));
    }
    if levels.contains(&0) {
        return Err(ScaleBurnError::Config(
            "Concurrency levels must be at least 1".to_string(),
        ));
    }
    Ok(levels)
}

fn missing(key: &str) -> ScaleBurnError {
    ScaleBurnError::Config(format!("{} is not set", key))
}

fn required(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<String> {
    lookup(key).filter(|v| !v.is_empty()).ok_or_else(|| missing(key))
}

fn parse<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| ScaleBurnError::Config(format!("Invalid {}: {}", key, e)))
        })
        .transpose()
}
