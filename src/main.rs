mod access;
mod app;
mod completion;
mod config;
mod error;
mod plans;
mod ratelimit;
mod state;

use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "mealplan=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let app_state = AppState::init()?;
    tracing::info!(
        model = %app_state.config.completion.model,
        api_key_required = app_state.config.frontend_api_key.is_some(),
        ip_limit = app_state.config.rate_limit.ip_limit,
        email_daily_limit = app_state.config.rate_limit.email_daily_limit,
        "configuration loaded"
    );

    ratelimit::spawn_sweeper(
        app_state.limiters(),
        app_state.config.rate_limit.sweep_interval,
    );

    app::serve(app::build_app(app_state)).await
}
