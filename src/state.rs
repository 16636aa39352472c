use crate::completion::{CompletionClient, OpenAiClient};
use crate::config::AppConfig;
use crate::ratelimit::{self, SharedLimiter};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub completion: Arc<dyn CompletionClient>,
    pub ip_limiter: Option<SharedLimiter>,
    pub email_limiter: Option<SharedLimiter>,
}

impl AppState {
    pub fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        let completion = Arc::new(OpenAiClient::new(&config.completion)?) as Arc<dyn CompletionClient>;
        Ok(Self::from_parts(config, completion))
    }

    pub fn from_parts(config: Arc<AppConfig>, completion: Arc<dyn CompletionClient>) -> Self {
        Self {
            ip_limiter: ratelimit::ip_limiter(&config.rate_limit),
            email_limiter: ratelimit::email_limiter(&config.rate_limit),
            config,
            completion,
        }
    }

    pub fn limiters(&self) -> Vec<SharedLimiter> {
        self.ip_limiter
            .iter()
            .chain(self.email_limiter.iter())
            .cloned()
            .collect()
    }
}

#[cfg(test)]
pub mod fake {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::AppState;
    use crate::completion::{
        CompletionClient, CompletionError, CompletionRequest, CompletionResult,
    };
    use crate::config::{
        AppConfig, CompletionConfig, CorsPolicy, RateLimitConfig, WindowStrategy,
        DEFAULT_SYSTEM_PROMPT,
    };

    /// Records every request and answers with a canned plan or failure.
    #[derive(Default)]
    pub struct FakeCompletion {
        pub calls: AtomicUsize,
        pub last: Mutex<Option<CompletionRequest>>,
        pub fail_with: Option<String>,
    }

    impl FakeCompletion {
        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CompletionClient for FakeCompletion {
        async fn complete(
            &self,
            req: CompletionRequest,
        ) -> Result<CompletionResult, CompletionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last.lock().unwrap() = Some(req);
            match &self.fail_with {
                Some(body) => Err(CompletionError::Rejected {
                    status: 503,
                    body: body.clone(),
                }),
                None => Ok(CompletionResult {
                    plan_text: "Breakfast: 3 eggs (210 kcal, 18g protein)".into(),
                }),
            }
        }
    }

    pub fn config() -> AppConfig {
        AppConfig {
            completion: CompletionConfig {
                api_key: "sk-test".into(),
                base_url: "http://127.0.0.1:9".into(),
                model: "gpt-4o-mini".into(),
                max_tokens: 600,
                temperature: None,
                system_prompt: DEFAULT_SYSTEM_PROMPT.into(),
                timeout: None,
            },
            frontend_api_key: None,
            cors: CorsPolicy::Disabled,
            rate_limit: RateLimitConfig {
                ip_limit: 0,
                ip_window: Duration::from_secs(60),
                ip_strategy: WindowStrategy::Sliding,
                email_daily_limit: 0,
                sweep_interval: Duration::from_secs(300),
                trust_forwarded_for: true,
            },
        }
    }

    pub fn state(config: AppConfig, completion: Arc<FakeCompletion>) -> AppState {
        AppState::from_parts(Arc::new(config), completion)
    }
}
