//! Configuration management

use std::path::PathBuf;
use thiserror::Error;

/// Default port for the health endpoint
pub const DEFAULT_PORT: u16 = 8000;

/// Default location of the resume document
pub const DEFAULT_RESUMES_PATH: &str = "resumes.json";

/// Default number of workflows allowed to run at once
pub const DEFAULT_MAX_CONCURRENT_JOBS: usize = 8;

/// Configuration errors (all fatal at startup)
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has invalid value {value:?}")]
    Invalid { name: &'static str, value: String },
    #[error("TELEGRAM_BOT_TOKEN appears invalid (expected format: 123456789:ABCdef...)")]
    MalformedToken,
}

/// Process configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Bearer token for the completion provider
    pub llm_api_key: String,

    /// Provider base URL, without trailing slash
    pub llm_api_url: String,

    /// Model identifier sent with every completion
    pub llm_model: String,

    /// Consume completions as an SSE stream
    pub llm_stream: bool,

    /// Telegram bot token
    pub telegram_bot_token: String,

    /// Health endpoint port
    pub port: u16,

    /// JSON document holding resumes
    pub resumes_path: PathBuf,

    /// Upper bound on concurrently running /setup and /generate workflows
    pub max_concurrent_jobs: usize,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| -> Result<String, ConfigError> {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::Missing(name))
        };

        let llm_api_key = required("LLM_API_KEY")?;
        let llm_api_url = required("LLM_API_URL")?.trim_end_matches('/').to_string();
        let llm_model = required("LLM_MODEL")?;
        let telegram_bot_token = required("TELEGRAM_BOT_TOKEN")?;

        // Telegram tokens are {bot_id}:{secret} with a numeric bot_id
        match telegram_bot_token.split_once(':') {
            Some((id, secret)) if id.parse::<u64>().is_ok() && !secret.is_empty() => {}
            _ => return Err(ConfigError::MalformedToken),
        }

        let port = match lookup("PORT")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
        {
            Some(v) => v.parse::<u16>().map_err(|_| ConfigError::Invalid { name: "PORT", value: v })?,
            None => DEFAULT_PORT,
        };

        let llm_stream = match lookup("LLM_STREAM").filter(|v| !v.is_empty()) {
            Some(v) => match v.to_lowercase().as_str() {
                "true" | "1" => true,
                "false" | "0" => false,
                _ => return Err(ConfigError::Invalid { name: "LLM_STREAM", value: v }),
            },
            None => true,
        };

        let max_concurrent_jobs = match lookup("MAX_CONCURRENT_JOBS").filter(|v| !v.is_empty()) {
            Some(v) => match v.parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => return Err(ConfigError::Invalid { name: "MAX_CONCURRENT_JOBS", value: v }),
            },
            None => DEFAULT_MAX_CONCURRENT_JOBS,
        };

        let resumes_path = lookup("RESUMES_PATH")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_RESUMES_PATH));

        Ok(Self {
            llm_api_key,
            llm_api_url,
            llm_model,
            llm_stream,
            telegram_bot_token,
            port,
            resumes_path,
            max_concurrent_jobs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn base() -> HashMap<String, String> {
        vars(&[
            ("LLM_API_KEY", "sk-test"),
            ("LLM_API_URL", "https://llm.example.com/v1/"),
            ("LLM_MODEL", "gpt-4o-mini"),
            ("TELEGRAM_BOT_TOKEN", "123456789:ABCdefGHIjkl"),
        ])
    }

    fn load(env: &HashMap<String, String>) -> Result<Config, ConfigError> {
        Config::from_lookup(|name| env.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&base()).unwrap();
        assert_eq!(config.port, 8000);
        assert!(config.llm_stream);
        assert_eq!(config.resumes_path, PathBuf::from("resumes.json"));
        assert_eq!(config.max_concurrent_jobs, DEFAULT_MAX_CONCURRENT_JOBS);
    }

    #[test]
    fn test_trailing_slash_stripped() {
        let config = load(&base()).unwrap();
        assert_eq!(config.llm_api_url, "https://llm.example.com/v1");
    }

    #[test]
    fn test_missing_required() {
        for name in ["LLM_API_KEY", "LLM_API_URL", "LLM_MODEL", "TELEGRAM_BOT_TOKEN"] {
            let mut env = base();
            env.remove(name);
            assert_eq!(load(&env).unwrap_err(), ConfigError::Missing(name));
        }
    }

    #[test]
    fn test_blank_required_counts_as_missing() {
        let mut env = base();
        env.insert("LLM_MODEL".into(), "   ".into());
        assert_eq!(load(&env).unwrap_err(), ConfigError::Missing("LLM_MODEL"));
    }

    #[test]
    fn test_malformed_tokens() {
        for token in ["no_colon", "abc:def", "123456789:"] {
            let mut env = base();
            env.insert("TELEGRAM_BOT_TOKEN".into(), token.into());
            assert_eq!(load(&env).unwrap_err(), ConfigError::MalformedToken);
        }
    }

    #[test]
    fn test_overrides() {
        let mut env = base();
        env.insert("PORT".into(), "9090".into());
        env.insert("LLM_STREAM".into(), "false".into());
        env.insert("RESUMES_PATH".into(), "/data/resumes.json".into());
        env.insert("MAX_CONCURRENT_JOBS".into(), "2".into());

        let config = load(&env).unwrap();
        assert_eq!(config.port, 9090);
        assert!(!config.llm_stream);
        assert_eq!(config.resumes_path, PathBuf::from("/data/resumes.json"));
        assert_eq!(config.max_concurrent_jobs, 2);
    }

    #[test]
    fn test_port_whitespace_trimmed() {
        let mut env = base();
        env.insert("PORT".into(), " 8080 \n".into());
        assert_eq!(load(&env).unwrap().port, 8080);
    }

    #[test]
    fn test_invalid_port() {
        let mut env = base();
        env.insert("PORT".into(), "eighty".into());
        assert!(matches!(load(&env), Err(ConfigError::Invalid { name: "PORT", .. })));
    }

    #[test]
    fn test_zero_jobs_rejected() {
        let mut env = base();
        env.insert("MAX_CONCURRENT_JOBS".into(), "0".into());
        assert!(matches!(
            load(&env),
            Err(ConfigError::Invalid { name: "MAX_CONCURRENT_JOBS", .. })
        ));
    }

    #[test]
    fn test_invalid_stream_flag() {
        let mut env = base();
        env.insert("LLM_STREAM".into(), "maybe".into());
        assert!(matches!(load(&env), Err(ConfigError::Invalid { name: "LLM_STREAM", .. })));
    }
}
