use axum::{
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap, StatusCode},
};
use axum_extra::extract::cookie::CookieJar;

use crate::routes::auth::claims::Claims;
use crate::state::AppState;
use crate::utils::jwt::decode_jwt;

#[derive(Debug, PartialEq)]
pub struct AuthSession(pub Claims);

/// Resolves the session carried on the `auth_token` cookie, if any. Shared by
/// the extractor below and the request gate.
pub fn session_from_headers(headers: &HeaderMap, state: &AppState) -> Option<Claims> {
    let jar = CookieJar::from_headers(headers);
    let token = jar.get("auth_token")?;

    decode_jwt(
        token.value(),
        &state.jwt_keys,
        &state.config.jwt_issuer,
        &state.config.jwt_audience,
    )
    .ok()
    .map(|data| data.claims)
}

impl FromRequestParts<AppState> for AuthSession {
    type Rejection = StatusCode;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        session_from_headers(&parts.headers, state)
            .map(AuthSession)
            .ok_or(StatusCode::UNAUTHORIZED)
    }
}
