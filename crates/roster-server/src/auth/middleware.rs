use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use roster_shared::Role;

use crate::{error::AppError, routes::AppState};

use super::jwt::verify_access_token;
use super::session::SESSION_COOKIE;

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: i64,
    pub username: String,
    /// Role as stored in the directory at request time, not as issued in the token.
    pub role: Role,
}

/// Bearer header first, then the browser session cookie.
fn session_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::to_string);

    bearer.or_else(|| {
        CookieJar::from_headers(headers)
            .get(SESSION_COOKIE)
            .map(|c| c.value().to_string())
    })
}

async fn resolve_session(state: &AppState, headers: &HeaderMap) -> Result<AuthUser, AppError> {
    let token = session_token(headers).ok_or(AppError::Unauthorized)?;
    let claims = verify_access_token(&token, &state.config.jwt_secret)?;

    let row: Option<(i64, String, Role, bool)> = sqlx::query_as(
        r#"
        SELECT u.id, u.username, u.role,
               EXISTS (
                   SELECT 1 FROM user_bans b
                   WHERE b.user_id = u.id AND (b.expires_at IS NULL OR b.expires_at > NOW())
               )
        FROM users u
        WHERE u.id = $1
        "#,
    )
    .bind(claims.sub)
    .fetch_optional(&state.db)
    .await?;

    let (id, username, role, banned) = row.ok_or(AppError::Unauthorized)?;
    if banned {
        return Err(AppError::Banned);
    }

    Ok(AuthUser { id, username, role })
}

pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_user = resolve_session(&state, request.headers()).await?;

    request.extensions_mut().insert(auth_user);

    Ok(next.run(request).await)
}

/// JSON surfaces: 401 without a session, 403 for non-admins.
pub async fn admin_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_user = resolve_session(&state, request.headers()).await?;
    if !auth_user.role.is_admin() {
        tracing::warn!(user_id = auth_user.id, "Non-admin tried to reach admin API");
        return Err(AppError::Forbidden);
    }

    request.extensions_mut().insert(auth_user);

    Ok(next.run(request).await)
}

/// Browser surfaces: redirect to the login page or the access-denied page.
pub async fn admin_page_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    match resolve_session(&state, request.headers()).await {
        Ok(user) if user.role.is_admin() => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Ok(user) => {
            tracing::warn!(user_id = user.id, "Non-admin tried to open admin page");
            Redirect::to(ACCESS_DENIED_PATH).into_response()
        }
        Err(AppError::Unauthorized) => Redirect::to(LOGIN_PATH).into_response(),
        Err(AppError::Banned) => Redirect::to(ACCESS_DENIED_PATH).into_response(),
        Err(e) => e.into_response(),
    }
}

pub const LOGIN_PATH: &str = "/login";
pub const ACCESS_DENIED_PATH: &str = "/access-denied";

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_header_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert("Authorization", HeaderValue::from_static("Bearer abc"));
        headers.insert("Cookie", HeaderValue::from_static("roster_session=def"));
        assert_eq!(session_token(&headers).as_deref(), Some("abc"));
    }

    #[test]
    fn cookie_is_used_without_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "Cookie",
            HeaderValue::from_static("theme=dark; roster_session=def"),
        );
        assert_eq!(session_token(&headers).as_deref(), Some("def"));
    }

    #[test]
    fn no_credentials_no_token() {
        let mut headers = HeaderMap::new();
        headers.insert("Authorization", HeaderValue::from_static("Basic Zm9v"));
        assert_eq!(session_token(&headers), None);
    }
}
