use std::env;
use std::time::Duration;

pub const API_KEY_VAR: &str = "GOOGLE_GENERATIVE_AI_API_KEY";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_ADDR: &str = "127.0.0.1:3000";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Runtime settings, read from the environment.
///
/// A missing API key is not an error here: the server still starts and every
/// extraction request answers with a configuration error until it is set.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: Option<String>,
    pub model: String,
    pub api_base: String,
    pub addr: String,
    pub max_upload_bytes: usize,
    pub timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            addr: DEFAULT_ADDR.to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from any key lookup; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Config::default();

        let max_upload_bytes = get("TABLESNAP_MAX_UPLOAD_BYTES")
            .and_then(|v| parse_or_warn("TABLESNAP_MAX_UPLOAD_BYTES", &v))
            .unwrap_or(defaults.max_upload_bytes);
        let timeout = get("TABLESNAP_TIMEOUT_SECS")
            .and_then(|v| parse_or_warn::<u64>("TABLESNAP_TIMEOUT_SECS", &v))
            .map(Duration::from_secs)
            .unwrap_or(defaults.timeout);

        Config {
            api_key: get(API_KEY_VAR),
            model: get("TABLESNAP_MODEL").unwrap_or(defaults.model),
            api_base: get("TABLESNAP_API_BASE")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_base),
            addr: get("TABLESNAP_ADDR").unwrap_or(defaults.addr),
            max_upload_bytes,
            timeout,
        }
    }
}

fn parse_or_warn<T: std::str::FromStr>(key: &str, value: &str) -> Option<T> {
    let parsed = value.parse().ok();
    if parsed.is_none() {
        log::warn!("ignoring {}={:?}: not a valid number", key, value);
    }
    parsed
}
