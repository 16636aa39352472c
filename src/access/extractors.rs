use std::net::SocketAddr;

use axum::{
    async_trait,
    extract::{ConnectInfo, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;

use super::services::{check_api_key, client_ip, API_KEY_HEADER};
use crate::{error::AppError, state::AppState};

/// Passes when no frontend key is configured or `x-api-key` matches it.
pub struct ApiKeyGuard;

#[async_trait]
impl FromRequestParts<AppState> for ApiKeyGuard {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(expected) = state.config.frontend_api_key.as_deref() else {
            return Ok(ApiKeyGuard);
        };

        let presented = parts
            .headers
            .get(API_KEY_HEADER)
            .and_then(|h| h.to_str().ok());

        check_api_key(expected, presented).map_err(|e| {
            warn!(present = presented.is_some(), "api key rejected");
            e
        })?;

        Ok(ApiKeyGuard)
    }
}

/// Caller address used as the IP rate-limit key.
pub struct ClientIp(pub String);

#[async_trait]
impl FromRequestParts<AppState> for ClientIp {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);

        Ok(ClientIp(client_ip(
            &parts.headers,
            peer,
            state.config.rate_limit.trust_forwarded_for,
        )))
    }
}
