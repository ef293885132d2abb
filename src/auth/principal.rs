use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use tracing::warn;

use crate::{
    auth::tokens::{TokenKeys, ADMIN_COOKIE_NAME},
    error::AppError,
    state::AppState,
    users::repo::User,
};

/// The authenticated caller, attached to the request for its duration.
///
/// Resolution order (first match wins, mutually exclusive):
/// 1. `adminToken` cookie → verified against the admin secret. A cookie
///    that fails verification rejects the request outright; it never
///    falls through to the bearer path.
/// 2. `Authorization: Bearer <token>` → verified against the user secret.
/// 3. Neither present → 401.
#[derive(Debug, Clone)]
pub struct Principal(pub User);

#[async_trait]
impl FromRequestParts<AppState> for Principal {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let keys = TokenKeys::from_ref(state);

        if let Some(cookie_token) = cookie_value(&parts.headers, ADMIN_COOKIE_NAME) {
            let claims = keys.verify_admin(&cookie_token).map_err(|e| {
                warn!(error = %e, "admin token verification failed");
                AppError::auth("Not authorized, token failed")
            })?;
            let user = User::find_by_id(&state.db, claims.sub)
                .await?
                .ok_or_else(|| AppError::auth("Not authorized, token failed"))?;
            return Ok(Principal(user));
        }

        if let Some(bearer) = bearer_token(&parts.headers) {
            let claims = keys.verify_user(&bearer).map_err(|e| {
                warn!(error = %e, "user token verification failed");
                AppError::auth("Not authorized, token failed")
            })?;
            let user = User::find_by_id(&state.db, claims.sub)
                .await?
                .ok_or_else(|| AppError::auth("Not authorized, token failed"))?;
            return Ok(Principal(user));
        }

        Err(AppError::auth("Not authorized, no token"))
    }
}

/// Second gate for admin-only routes: resolves the principal, then
/// requires the `is_admin` flag on the loaded record.
#[derive(Debug, Clone)]
pub struct AdminPrincipal(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AdminPrincipal {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Principal(user) = Principal::from_request_parts(parts, state).await?;
        if !user.is_admin {
            return Err(AppError::forbidden("Not authorized as an admin"));
        }
        Ok(AdminPrincipal(user))
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))
        .map(|t| t.trim().to_string())
}

fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let header = headers.get(axum::http::header::COOKIE)?;
    let value = header.to_str().ok()?;
    for pair in value.split(';') {
        let mut parts = pair.trim().splitn(2, '=');
        let key = parts.next()?.trim();
        let val = parts.next()?.trim();
        if key == name {
            return Some(val.to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(name: axum::http::HeaderName, value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(name, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn extracts_bearer_token() {
        let headers = headers_with(AUTHORIZATION, "Bearer abc.def.ghi");
        assert_eq!(bearer_token(&headers).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn rejects_non_bearer_scheme() {
        let headers = headers_with(AUTHORIZATION, "Basic dXNlcjpwYXNz");
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn extracts_named_cookie_among_many() {
        let headers = headers_with(
            axum::http::header::COOKIE,
            "theme=dark; adminToken=tok123; lang=tr",
        );
        assert_eq!(
            cookie_value(&headers, ADMIN_COOKIE_NAME).as_deref(),
            Some("tok123")
        );
        assert_eq!(cookie_value(&headers, "missing"), None);
    }

    #[test]
    fn no_headers_means_no_token() {
        let headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);
        assert_eq!(cookie_value(&headers, ADMIN_COOKIE_NAME), None);
    }
}
