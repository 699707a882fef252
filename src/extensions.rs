use std::str::FromStr;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::Extension;
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::Authorization;
use axum_extra::TypedHeader;
use log::{debug, error};
use tap::TapFallible;
use uuid::Uuid;

use types::domain::Session;

use crate::routes::Api;

/// The caller's session, resolved from `Authorization: Bearer <token>`.
#[derive(Debug, Clone)]
pub struct ExtractSession {
    pub token: Uuid,
    pub session: Session,
}

impl<S> FromRequestParts<S> for ExtractSession
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(req: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(req, state)
                .await
                .tap_err(|e| error!("Failed to extract Authorization header: {}", e))
                .map_err(|_| StatusCode::UNAUTHORIZED)?;

        let token = Uuid::from_str(bearer.token())
            .tap_err(|e| error!("Failed to parse token: {}", e))
            .map_err(|_| StatusCode::UNAUTHORIZED)?;
        let Extension(api) = Extension::<Api>::from_request_parts(req, state)
            .await
            .tap_err(|e| error!("Failed to extract API: {}", e))
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

        let session = api.get_session_by_token(token).ok_or_else(|| {
            error!("No session for token");
            StatusCode::UNAUTHORIZED
        })?;
        debug!("request from {}", session.email);
        Ok(ExtractSession { token, session })
    }
}
