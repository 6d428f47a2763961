use std::net::{IpAddr, SocketAddr};

use axum::{
    extract::{ConnectInfo, State},
    Extension, Json,
};
use chrono::Utc;
use roster_shared::api::{AuthResponse, LoginRequest, RefreshRequest};
use roster_shared::Account;

use crate::auth::{create_access_token, create_refresh_token, hash_password, verify_password, AuthUser};
use crate::error::AppError;
use crate::routes::AppState;

/// Refuses sign-in for a user with an active ban or from a banned address.
pub(crate) async fn ensure_not_banned(
    state: &AppState,
    user_id: i64,
    ip: Option<IpAddr>,
) -> Result<(), AppError> {
    let (user_banned, ip_banned): (bool, bool) = sqlx::query_as(
        r#"
        SELECT
            EXISTS (
                SELECT 1 FROM user_bans
                WHERE user_id = $1 AND (expires_at IS NULL OR expires_at > NOW())
            ),
            EXISTS (
                SELECT 1 FROM ip_bans
                WHERE ip = $2 AND (expires_at IS NULL OR expires_at > NOW())
            )
        "#,
    )
    .bind(user_id)
    .bind(ip.map(|ip| ip.to_string()))
    .fetch_one(&state.db)
    .await?;

    if user_banned || ip_banned {
        tracing::warn!(user_id, ?ip, user_banned, ip_banned, "Sign-in refused");
        return Err(AppError::Banned);
    }
    Ok(())
}

/// Checks a username/password pair and returns the user's id and canonical name.
pub(crate) async fn check_credentials(
    state: &AppState,
    username: &str,
    password: &str,
) -> Result<(i64, String), AppError> {
    let row: Option<(i64, String, String)> =
        sqlx::query_as("SELECT id, username, password_hash FROM users WHERE username = $1")
            .bind(username.trim())
            .fetch_optional(&state.db)
            .await?;

    let (user_id, username, password_hash) = row.ok_or(AppError::Unauthorized)?;

    if !verify_password(password, &password_hash)? {
        return Err(AppError::Unauthorized);
    }

    Ok((user_id, username))
}

pub(crate) async fn record_login(state: &AppState, user_id: i64) -> Result<(), AppError> {
    sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = $1")
        .bind(user_id)
        .execute(&state.db)
        .await?;
    Ok(())
}

/// Issues an access/refresh pair and stores the refresh token hash.
async fn issue_tokens(
    state: &AppState,
    user_id: i64,
    username: &str,
) -> Result<AuthResponse, AppError> {
    let access_token = create_access_token(
        user_id,
        username,
        &state.config.jwt_secret,
        state.config.jwt_expires_in,
    )?;

    let refresh_token = create_refresh_token(
        user_id,
        username,
        &state.config.jwt_secret,
        state.config.refresh_token_expires_in,
    )?;

    let token_hash = hash_password(&refresh_token)?;
    let expires_at = Utc::now() + chrono::Duration::seconds(state.config.refresh_token_expires_in);

    sqlx::query(
        r#"
        INSERT INTO refresh_tokens (user_id, token_hash, expires_at)
        VALUES ($1, $2, $3)
        "#,
    )
    .bind(user_id)
    .bind(&token_hash)
    .bind(expires_at)
    .execute(&state.db)
    .await?;

    Ok(AuthResponse {
        access_token,
        refresh_token,
        user_id,
    })
}

pub async fn login(
    State(state): State<AppState>,
    peer: Option<ConnectInfo<SocketAddr>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    if req.username.trim().is_empty() || req.password.is_empty() {
        return Err(AppError::Validation(
            "Username and password are required".to_string(),
        ));
    }

    let (user_id, username) = check_credentials(&state, &req.username, &req.password).await?;
    ensure_not_banned(&state, user_id, peer.map(|ConnectInfo(addr)| addr.ip())).await?;
    record_login(&state, user_id).await?;

    tracing::info!(user_id, "User signed in");

    Ok(Json(issue_tokens(&state, user_id, &username).await?))
}

pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let claims = crate::auth::verify_access_token(&req.refresh_token, &state.config.jwt_secret)?;

    let candidates: Vec<(i64, String, String)> = sqlx::query_as(
        r#"
        SELECT rt.id, rt.token_hash, u.username
        FROM refresh_tokens rt
        JOIN users u ON u.id = rt.user_id
        WHERE rt.user_id = $1
          AND rt.revoked_at IS NULL
          AND rt.expires_at > NOW()
        ORDER BY rt.created_at DESC
        "#,
    )
    .bind(claims.sub)
    .fetch_all(&state.db)
    .await?;

    let mut matched = None;
    for (token_id, token_hash, username) in candidates {
        if verify_password(&req.refresh_token, &token_hash)? {
            matched = Some((token_id, username));
            break;
        }
    }
    let (token_id, username) = matched.ok_or(AppError::Unauthorized)?;

    ensure_not_banned(&state, claims.sub, None).await?;

    // Rotate
    sqlx::query("UPDATE refresh_tokens SET revoked_at = NOW() WHERE id = $1")
        .bind(token_id)
        .execute(&state.db)
        .await?;

    Ok(Json(issue_tokens(&state, claims.sub, &username).await?))
}

pub async fn logout(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<(), AppError> {
    sqlx::query(
        "UPDATE refresh_tokens SET revoked_at = NOW() WHERE user_id = $1 AND revoked_at IS NULL",
    )
    .bind(user.id)
    .execute(&state.db)
    .await?;

    Ok(())
}

pub async fn me(Extension(user): Extension<AuthUser>) -> Json<Account> {
    Json(Account {
        id: user.id,
        username: user.username,
        role: user.role,
    })
}
