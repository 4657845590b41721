use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};

use crate::api::error::ApiError;
use crate::app::AppState;

/// Shared-secret gate for the scheduled trigger endpoints.
///
/// Rejections carry no detail beyond the 401 itself.
pub struct CronAuth;

#[axum::async_trait]
impl FromRequestParts<AppState> for CronAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| ApiError::Unauthorized)?;

        if bearer.token() == state.cfg.auth.cron_secret {
            Ok(CronAuth)
        } else {
            Err(ApiError::Unauthorized)
        }
    }
}
