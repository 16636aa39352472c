use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{post, MethodRouter},
    Json,
};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use super::dto::{MealPlanRequest, MealPlanResponse};
use super::services::{build_prompt, validate};
use crate::{
    access::extractors::{ApiKeyGuard, ClientIp},
    completion::{CompletionRequest, Sampling},
    error::{AppError, LimitScope},
    state::AppState,
};

pub fn plan_route() -> MethodRouter<AppState> {
    post(create_plan).fallback(method_not_allowed)
}

/// POST /mealplan { calories, foods[], email? } -> { plan }
///
/// Gates run in order: api key, IP limit, payload, email cap. Counters are
/// taken before the upstream call and kept even if it fails.
#[instrument(skip_all, fields(request_id = %Uuid::new_v4(), client_ip = %ip))]
pub async fn create_plan(
    State(state): State<AppState>,
    _key: ApiKeyGuard,
    ClientIp(ip): ClientIp,
    payload: Result<Json<MealPlanRequest>, JsonRejection>,
) -> Result<Json<MealPlanResponse>, AppError> {
    if let Some(limiter) = &state.ip_limiter {
        if !limiter.admit(&ip).await {
            warn!("ip rate limit exceeded");
            return Err(AppError::RateLimited(LimitScope::Ip));
        }
    }

    let Json(raw) = payload.map_err(|e| {
        warn!(error = %e, "malformed body");
        AppError::MalformedBody(e.body_text())
    })?;
    let req = validate(raw).inspect_err(|e| warn!(reason = %e, "invalid payload"))?;

    if let (Some(limiter), Some(email)) = (&state.email_limiter, req.email.as_deref()) {
        if !limiter.admit(email).await {
            warn!(%email, "daily email limit exceeded");
            return Err(AppError::RateLimited(LimitScope::Email));
        }
    }

    let cfg = &state.config.completion;
    let prompt = build_prompt(req.calories, &req.foods);
    let completion = state
        .completion
        .complete(CompletionRequest::new(
            &cfg.system_prompt,
            prompt,
            Sampling::from(cfg),
        ))
        .await
        .map_err(|e| {
            error!(error = %e, "meal plan generation failed");
            AppError::from(e)
        })?;

    info!(
        calories = req.calories,
        foods = req.foods.len(),
        "meal plan generated"
    );
    Ok(Json(MealPlanResponse {
        plan: completion.plan_text,
    }))
}

pub async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}
