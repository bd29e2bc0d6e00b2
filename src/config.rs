use anyhow::{anyhow, Context, Result};
use std::net::SocketAddr;
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
pub const DEFAULT_TEMPERATURE: f32 = 0.2;
pub const DEFAULT_TIMEOUT_SECS: u64 = 90;
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_SESSION_TTL_SECS: u64 = 3600;

/// Settings for the analyst and the HTTP listener, read from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub model: String,
    pub api_base: String,
    pub temperature: f32,
    pub timeout: Duration,
    pub bind_addr: SocketAddr,
    /// How long a session may go without a state change before it is evicted.
    pub session_ttl: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_key = get("GEMINI_API_KEY")
            .ok_or_else(|| anyhow!("Gemini API key not configured (set GEMINI_API_KEY)"))?;

        let model = get("ANALYST_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let api_base = get("GEMINI_API_BASE")
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
            .trim_end_matches('/')
            .to_string();

        let temperature = match get("ANALYST_TEMPERATURE") {
            Some(raw) => raw
                .trim()
                .parse::<f32>()
                .with_context(|| format!("ANALYST_TEMPERATURE is not a number: {}", raw))?,
            None => DEFAULT_TEMPERATURE,
        };
        if !(0.0..=2.0).contains(&temperature) {
            return Err(anyhow!("ANALYST_TEMPERATURE must be within 0.0..=2.0, got {}", temperature));
        }

        let timeout_secs = match get("ANALYST_TIMEOUT_SECS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .with_context(|| format!("ANALYST_TIMEOUT_SECS is not a whole number: {}", raw))?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        let session_ttl_secs = match get("SESSION_TTL_SECS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .with_context(|| format!("SESSION_TTL_SECS is not a whole number: {}", raw))?,
            None => DEFAULT_SESSION_TTL_SECS,
        };

        let bind_raw = get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_raw
            .trim()
            .parse()
            .with_context(|| format!("BIND_ADDR is not a socket address: {}", bind_raw))?;

        Ok(Self {
            api_key,
            model,
            api_base,
            temperature,
            timeout: Duration::from_secs(timeout_secs),
            bind_addr,
            session_ttl: Duration::from_secs(session_ttl_secs),
        })
    }
}
