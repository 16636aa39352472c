use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a nutritionist creating simple, accurate 1-day fat loss meal plans.";

#[derive(Debug, Clone, Deserialize)]
pub struct CompletionConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: Option<f32>,
    /// Empty means the request carries only the user message.
    pub system_prompt: String,
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowStrategy {
    Fixed,
    Sliding,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// 0 disables the IP gate.
    pub ip_limit: u32,
    pub ip_window: Duration,
    pub ip_strategy: WindowStrategy,
    /// 0 disables the email gate.
    pub email_daily_limit: u32,
    pub sweep_interval: Duration,
    pub trust_forwarded_for: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub enum CorsPolicy {
    Disabled,
    AnyOrigin,
    AllowList(Vec<String>),
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub completion: CompletionConfig,
    pub frontend_api_key: Option<String>,
    pub cors: CorsPolicy,
    pub rate_limit: RateLimitConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup, so tests never touch the process env.
    pub fn from_lookup<F>(get: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let completion = CompletionConfig {
            api_key: get("OPENAI_API_KEY").context("OPENAI_API_KEY must be set")?,
            base_url: get("OPENAI_BASE_URL")
                .unwrap_or_else(|| "https://api.openai.com/v1".into())
                .trim_end_matches('/')
                .to_string(),
            model: get("OPENAI_MODEL").unwrap_or_else(|| "gpt-4o-mini".into()),
            max_tokens: parse_or(&get, "COMPLETION_MAX_TOKENS", 600)?,
            temperature: parse_opt(&get, "COMPLETION_TEMPERATURE")?,
            system_prompt: get("COMPLETION_SYSTEM_PROMPT")
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.into()),
            timeout: parse_opt::<u64, _>(&get, "UPSTREAM_TIMEOUT_SECS")?.map(Duration::from_secs),
        };

        let frontend_api_key = get("FRONTEND_API_KEY").filter(|k| !k.is_empty());

        let cors = match get("CORS_ALLOWED_ORIGINS").map(|v| v.trim().to_string()) {
            None => CorsPolicy::Disabled,
            Some(v) if v.is_empty() => CorsPolicy::Disabled,
            Some(v) if v == "*" => CorsPolicy::AnyOrigin,
            Some(v) => CorsPolicy::AllowList(
                v.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect(),
            ),
        };

        let ip_strategy = match get("IP_RATE_STRATEGY").as_deref().map(str::trim) {
            None | Some("sliding") => WindowStrategy::Sliding,
            Some("fixed") => WindowStrategy::Fixed,
            Some(other) => anyhow::bail!("IP_RATE_STRATEGY must be `fixed` or `sliding`, got `{other}`"),
        };

        let rate_limit = RateLimitConfig {
            ip_limit: parse_or(&get, "IP_RATE_LIMIT", 5)?,
            ip_window: Duration::from_secs(parse_or(&get, "IP_RATE_WINDOW_SECS", 60)?),
            ip_strategy,
            email_daily_limit: parse_or(&get, "EMAIL_DAILY_LIMIT", 20)?,
            sweep_interval: Duration::from_secs(parse_or(&get, "RATE_LIMIT_SWEEP_SECS", 300)?),
            trust_forwarded_for: parse_or(&get, "TRUST_FORWARDED_FOR", true)?,
        };

        Ok(Self {
            completion,
            frontend_api_key,
            cors,
            rate_limit,
        })
    }
}

fn parse_opt<T, F>(get: &F, key: &str) -> anyhow::Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .with_context(|| format!("invalid value for {key}: `{raw}`")),
        _ => Ok(None),
    }
}

fn parse_or<T, F>(get: &F, key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    Ok(parse_opt(get, key)?.unwrap_or(default))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> anyhow::Result<AppConfig> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|k| env.get(k).cloned())
    }

    #[test]
    fn defaults_match_the_reference_deployment() {
        let cfg = load(&[("OPENAI_API_KEY", "sk-test")]).unwrap();
        assert_eq!(cfg.completion.model, "gpt-4o-mini");
        assert_eq!(cfg.completion.max_tokens, 600);
        assert_eq!(cfg.completion.temperature, None);
        assert_eq!(cfg.completion.base_url, "https://api.openai.com/v1");
        assert_eq!(cfg.completion.system_prompt, DEFAULT_SYSTEM_PROMPT);
        assert!(cfg.frontend_api_key.is_none());
        assert!(matches!(cfg.cors, CorsPolicy::Disabled));
        assert_eq!(cfg.rate_limit.ip_limit, 5);
        assert_eq!(cfg.rate_limit.ip_window, Duration::from_secs(60));
        assert_eq!(cfg.rate_limit.ip_strategy, WindowStrategy::Sliding);
        assert_eq!(cfg.rate_limit.email_daily_limit, 20);
        assert!(cfg.rate_limit.trust_forwarded_for);
    }

    #[test]
    fn missing_provider_key_is_an_error() {
        let err = load(&[]).unwrap_err();
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }

    #[test]
    fn cors_origins_are_split_and_trimmed() {
        let cfg = load(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("CORS_ALLOWED_ORIGINS", "https://a.example, https://b.example ,"),
        ])
        .unwrap();
        match cfg.cors {
            CorsPolicy::AllowList(origins) => {
                assert_eq!(origins, vec!["https://a.example", "https://b.example"])
            }
            other => panic!("unexpected policy {other:?}"),
        }

        let cfg = load(&[("OPENAI_API_KEY", "sk-test"), ("CORS_ALLOWED_ORIGINS", "*")]).unwrap();
        assert!(matches!(cfg.cors, CorsPolicy::AnyOrigin));
    }

    #[test]
    fn overrides_are_parsed() {
        let cfg = load(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("OPENAI_BASE_URL", "http://localhost:9999/v1/"),
            ("COMPLETION_TEMPERATURE", "0.7"),
            ("COMPLETION_SYSTEM_PROMPT", ""),
            ("UPSTREAM_TIMEOUT_SECS", "30"),
            ("FRONTEND_API_KEY", "supersecret123"),
            ("IP_RATE_STRATEGY", "fixed"),
            ("IP_RATE_LIMIT", "0"),
            ("TRUST_FORWARDED_FOR", "false"),
        ])
        .unwrap();
        assert_eq!(cfg.completion.base_url, "http://localhost:9999/v1");
        assert_eq!(cfg.completion.temperature, Some(0.7));
        assert!(cfg.completion.system_prompt.is_empty());
        assert_eq!(cfg.completion.timeout, Some(Duration::from_secs(30)));
        assert_eq!(cfg.frontend_api_key.as_deref(), Some("supersecret123"));
        assert_eq!(cfg.rate_limit.ip_strategy, WindowStrategy::Fixed);
        assert_eq!(cfg.rate_limit.ip_limit, 0);
        assert!(!cfg.rate_limit.trust_forwarded_for);
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        let err = load(&[("OPENAI_API_KEY", "sk-test"), ("IP_RATE_LIMIT", "five")]).unwrap_err();
        assert!(err.to_string().contains("IP_RATE_LIMIT"));

        let err = load(&[("OPENAI_API_KEY", "sk-test"), ("IP_RATE_STRATEGY", "leaky")]).unwrap_err();
        assert!(err.to_string().contains("IP_RATE_STRATEGY"));
    }
}
