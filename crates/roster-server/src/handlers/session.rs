//! Browser sign-in: login form, logout, access denied and login-link redemption.

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Path, Query, State},
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use axum_extra::extract::cookie::CookieJar;
use roster_shared::api::LoginForm;
use serde::Deserialize;

use super::auth::{check_credentials, ensure_not_banned, record_login};
use crate::auth::{create_access_token, with_session, without_session, LOGIN_PATH};
use crate::error::AppError;
use crate::routes::AppState;
use crate::views::{render_access_denied, render_login, ADMIN_USER_PATH};

#[derive(Debug, Default, Deserialize)]
pub struct LoginPageQuery {
    pub error: Option<String>,
}

fn login_error_redirect(message: &str) -> Redirect {
    Redirect::to(&format!(
        "{}?error={}",
        LOGIN_PATH,
        urlencoding::encode(message)
    ))
}

fn sign_in_message(err: &AppError) -> &'static str {
    match err {
        AppError::Unauthorized => "Invalid username or password",
        AppError::Banned => "This account is banned",
        AppError::Validation(_) => "Username and password are required",
        _ => "Sign-in failed, please try again",
    }
}

/// Browser sessions live as long as refresh tokens do.
fn session_jar(
    state: &AppState,
    jar: CookieJar,
    user_id: i64,
    username: &str,
) -> Result<CookieJar, AppError> {
    let token = create_access_token(
        user_id,
        username,
        &state.config.jwt_secret,
        state.config.refresh_token_expires_in,
    )?;
    Ok(with_session(jar, token, &state.config))
}

/// GET /login
pub async fn login_page(Query(query): Query<LoginPageQuery>) -> Html<String> {
    Html(render_login(query.error.as_deref()).into_string())
}

/// POST /login
pub async fn login_submit(
    State(state): State<AppState>,
    peer: Option<ConnectInfo<SocketAddr>>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Response {
    let result: Result<CookieJar, AppError> = async {
        if form.username.trim().is_empty() || form.password.is_empty() {
            return Err(AppError::Validation(String::new()));
        }
        let (user_id, username) = check_credentials(&state, &form.username, &form.password).await?;
        ensure_not_banned(&state, user_id, peer.map(|ConnectInfo(addr)| addr.ip())).await?;
        record_login(&state, user_id).await?;
        tracing::info!(user_id, "Browser session started");
        session_jar(&state, jar, user_id, &username)
    }
    .await;

    match result {
        Ok(jar) => (jar, Redirect::to(ADMIN_USER_PATH)).into_response(),
        Err(e) => login_error_redirect(sign_in_message(&e)).into_response(),
    }
}

/// POST /logout
pub async fn logout(jar: CookieJar) -> (CookieJar, Redirect) {
    (without_session(jar), Redirect::to(LOGIN_PATH))
}

/// GET /access-denied
pub async fn access_denied() -> Html<String> {
    Html(render_access_denied().into_string())
}

/// GET /login/link/:token
pub async fn redeem_login_link(
    State(state): State<AppState>,
    peer: Option<ConnectInfo<SocketAddr>>,
    jar: CookieJar,
    Path(token): Path<String>,
) -> Response {
    let result: Result<CookieJar, AppError> = async {
        // Consuming the link and reading it happen in one statement so a link works once.
        let row: Option<(i64, String)> = sqlx::query_as(
            r#"
            UPDATE login_links l
            SET used_at = NOW()
            FROM users u
            WHERE l.token = $1
              AND l.user_id = u.id
              AND l.used_at IS NULL
              AND l.expires_at > NOW()
            RETURNING u.id, u.username
            "#,
        )
        .bind(&token)
        .fetch_optional(&state.db)
        .await?;

        let (user_id, username) = row.ok_or(AppError::Unauthorized)?;
        ensure_not_banned(&state, user_id, peer.map(|ConnectInfo(addr)| addr.ip())).await?;
        record_login(&state, user_id).await?;
        tracing::info!(user_id, "Login link redeemed");
        session_jar(&state, jar, user_id, &username)
    }
    .await;

    match result {
        Ok(jar) => (jar, Redirect::to("/")).into_response(),
        Err(AppError::Unauthorized) => {
            login_error_redirect("This login link is invalid or has expired").into_response()
        }
        Err(e) => login_error_redirect(sign_in_message(&e)).into_response(),
    }
}

/// GET /
pub async fn home() -> Redirect {
    Redirect::to(ADMIN_USER_PATH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_in_messages_do_not_leak_internals() {
        assert_eq!(
            sign_in_message(&AppError::Database(sqlx::Error::RowNotFound)),
            "Sign-in failed, please try again"
        );
        assert_eq!(sign_in_message(&AppError::Banned), "This account is banned");
    }
}
