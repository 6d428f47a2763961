use axum::{extract::State, Extension, Json};
use chrono::{DateTime, Duration, Utc};
use rand::{distributions::Alphanumeric, Rng};
use roster_shared::api::{LoginLinkRequest, LoginLinkResponse};

use crate::auth::AuthUser;
use crate::error::AppError;
use crate::routes::AppState;

const TOKEN_LEN: usize = 48;

fn new_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LEN)
        .map(char::from)
        .collect()
}

pub(crate) fn link_url(base_url: &str, token: &str) -> String {
    format!("{}/login/link/{}", base_url.trim_end_matches('/'), token)
}

/// Creates a single-use sign-in link for `user_id`.
pub(crate) async fn create_login_link(
    state: &AppState,
    created_by: i64,
    user_id: i64,
) -> Result<(String, DateTime<Utc>), AppError> {
    let exists: Option<(i64,)> = sqlx::query_as("SELECT id FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(&state.db)
        .await?;
    if exists.is_none() {
        return Err(AppError::NotFound);
    }

    let token = new_token();
    let expires_at = Utc::now() + Duration::seconds(state.config.login_link_expires_in);

    sqlx::query("INSERT INTO login_links (token, user_id, expires_at) VALUES ($1, $2, $3)")
        .bind(&token)
        .bind(user_id)
        .bind(expires_at)
        .execute(&state.db)
        .await?;

    tracing::info!(user_id, created_by, %expires_at, "Login link created");

    Ok((link_url(&state.config.public_base_url, &token), expires_at))
}

/// POST /api/admin/user/login-link
pub async fn create_link(
    State(state): State<AppState>,
    Extension(admin): Extension<AuthUser>,
    Json(req): Json<LoginLinkRequest>,
) -> Result<Json<LoginLinkResponse>, AppError> {
    let (url, expires_at) = create_login_link(&state, admin.id, req.user_id).await?;
    Ok(Json(LoginLinkResponse { url, expires_at }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_long_and_distinct() {
        let a = new_token();
        let b = new_token();
        assert_eq!(a.len(), TOKEN_LEN);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }

    #[test]
    fn link_url_joins_without_double_slash() {
        assert_eq!(
            link_url("https://school.example/", "abc"),
            "https://school.example/login/link/abc"
        );
    }
}
