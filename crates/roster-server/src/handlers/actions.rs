//! Form-posted admin actions. Every action answers with a 303 back to the
//! page it came from, carrying `notice=` or `error=`.

use std::net::IpAddr;

use axum::{
    extract::State,
    response::{Html, IntoResponse, Redirect, Response},
    Extension, Form,
};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use roster_shared::api::{
    non_empty, BanIpForm, BanUserForm, CreateUserForm, UnbanIpForm, UnbanUserForm,
    UpdatePasswordForm, UpdateRoleForm, UserIdForm,
};
use roster_shared::{is_known_class, Role};

use super::login_links::create_login_link;
use crate::auth::{hash_password, validate_password, validate_username, AuthUser};
use crate::error::AppError;
use crate::routes::AppState;
use crate::views::{render_login_link, ADMIN_USER_PATH};

/// Keeps only same-site absolute paths.
pub(crate) fn sanitize_return_to(raw: Option<&str>) -> String {
    match raw.map(str::trim) {
        Some(path)
            if path.starts_with('/')
                && !path.starts_with("//")
                && !path.starts_with("/\\")
                && !path.chars().any(|c| c.is_control()) =>
        {
            path.to_string()
        }
        _ => ADMIN_USER_PATH.to_string(),
    }
}

/// Appends a flash parameter, replacing any earlier notice or error.
fn with_flash(target: &str, key: &str, message: &str) -> String {
    let target = target.split('#').next().unwrap_or(target);
    let (path, query) = target.split_once('?').unwrap_or((target, ""));

    let flash = format!("{}={}", key, urlencoding::encode(message));
    let mut params: Vec<&str> = query
        .split('&')
        .filter(|p| !p.is_empty() && !p.starts_with("notice=") && !p.starts_with("error="))
        .collect();
    params.push(&flash);

    format!("{}?{}", path, params.join("&"))
}

fn action_error_message(err: &AppError) -> String {
    match err {
        AppError::NotFound => "User not found".to_string(),
        other => other.status_and_message().1,
    }
}

fn finish(return_to: Option<&str>, action: &str, outcome: Result<String, AppError>) -> Redirect {
    let target = sanitize_return_to(return_to);
    match outcome {
        Ok(notice) => {
            tracing::info!(action, %notice, "Admin action completed");
            Redirect::to(&with_flash(&target, "notice", &notice))
        }
        Err(e) => {
            tracing::warn!(action, error = %e, "Admin action failed");
            Redirect::to(&with_flash(&target, "error", &action_error_message(&e)))
        }
    }
}

fn parse_role(raw: &str) -> Result<Role, AppError> {
    raw.parse()
        .map_err(|_| AppError::Validation("Invalid role".to_string()))
}

fn parse_user_id(raw: &str) -> Result<i64, AppError> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| AppError::Validation("Invalid user ID".to_string()))
}

fn parse_ip(raw: &str) -> Result<IpAddr, AppError> {
    raw.trim()
        .parse()
        .map_err(|_| AppError::Validation("Invalid IP address".to_string()))
}

/// Accepts the `datetime-local` format (read as UTC) or RFC 3339.
pub(crate) fn parse_expiry(
    raw: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Option<DateTime<Utc>>, AppError> {
    let Some(raw) = non_empty(raw) else {
        return Ok(None);
    };

    let at = DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M").map(|n| Utc.from_utc_datetime(&n)))
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S").map(|n| Utc.from_utc_datetime(&n)))
        .map_err(|_| AppError::Validation("Invalid expiry date".to_string()))?;

    if at <= now {
        return Err(AppError::Validation(
            "Expiry must be in the future".to_string(),
        ));
    }
    Ok(Some(at))
}

async fn ensure_user_exists(state: &AppState, id: i64) -> Result<String, AppError> {
    let row: Option<(String,)> = sqlx::query_as("SELECT username FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await?;
    row.map(|(name,)| name).ok_or(AppError::NotFound)
}

async fn revoke_sessions(state: &AppState, user_id: i64) -> Result<(), AppError> {
    sqlx::query(
        "UPDATE refresh_tokens SET revoked_at = NOW() WHERE user_id = $1 AND revoked_at IS NULL",
    )
    .bind(user_id)
    .execute(&state.db)
    .await?;
    Ok(())
}

/// POST /admin/actions/create-user
pub async fn create_user(
    State(state): State<AppState>,
    Form(form): Form<CreateUserForm>,
) -> Redirect {
    let outcome: Result<String, AppError> = async {
        let username = form.username.trim();
        validate_username(username)?;
        validate_password(&form.password)?;
        let role = parse_role(&form.role)?;

        let class = non_empty(form.class.as_deref());
        if let Some(class) = class {
            if !is_known_class(class) {
                return Err(AppError::Validation(format!("Unknown class: {}", class)));
            }
        }

        // The unique index decides; a concurrent insert of the same name returns no row.
        let password_hash = hash_password(&form.password)?;
        let created: Option<(i64,)> = sqlx::query_as(
            r#"
            INSERT INTO users (username, password_hash, role, class)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (username) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(username)
        .bind(&password_hash)
        .bind(role)
        .bind(class)
        .fetch_optional(&state.db)
        .await?;
        let Some((id,)) = created else {
            return Err(AppError::Conflict("Username already taken".to_string()));
        };

        tracing::info!(user_id = id, username, %role, "User created");
        Ok(format!("User {} created", username))
    }
    .await;

    finish(form.return_to.as_deref(), "create-user", outcome)
}

/// POST /admin/actions/update-role
pub async fn update_role(
    State(state): State<AppState>,
    Extension(admin): Extension<AuthUser>,
    Form(form): Form<UpdateRoleForm>,
) -> Redirect {
    let outcome: Result<String, AppError> = async {
        let role = parse_role(&form.role)?;
        if form.id == admin.id && role != Role::Admin {
            return Err(AppError::Validation(
                "You cannot remove your own admin role".to_string(),
            ));
        }

        let result = sqlx::query("UPDATE users SET role = $2, updated_at = NOW() WHERE id = $1")
            .bind(form.id)
            .bind(role)
            .execute(&state.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound);
        }

        Ok(format!("Role changed to {}", role))
    }
    .await;

    finish(form.return_to.as_deref(), "update-role", outcome)
}

/// POST /admin/actions/update-password
pub async fn update_password(
    State(state): State<AppState>,
    Form(form): Form<UpdatePasswordForm>,
) -> Redirect {
    let outcome: Result<String, AppError> = async {
        validate_password(&form.password)?;
        let password_hash = hash_password(&form.password)?;

        let result =
            sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
                .bind(form.id)
                .bind(&password_hash)
                .execute(&state.db)
                .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound);
        }
        revoke_sessions(&state, form.id).await?;

        Ok("Password updated".to_string())
    }
    .await;

    finish(form.return_to.as_deref(), "update-password", outcome)
}

/// POST /admin/actions/delete-user
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(admin): Extension<AuthUser>,
    Form(form): Form<UserIdForm>,
) -> Redirect {
    let outcome: Result<String, AppError> = async {
        if form.id == admin.id {
            return Err(AppError::Validation(
                "You cannot delete your own account".to_string(),
            ));
        }

        let row: Option<(String,)> =
            sqlx::query_as("DELETE FROM users WHERE id = $1 RETURNING username")
                .bind(form.id)
                .fetch_optional(&state.db)
                .await?;
        let (username,) = row.ok_or(AppError::NotFound)?;

        Ok(format!("User {} deleted", username))
    }
    .await;

    finish(form.return_to.as_deref(), "delete-user", outcome)
}

/// POST /admin/actions/reset-poll
pub async fn reset_poll(
    State(state): State<AppState>,
    Form(form): Form<UserIdForm>,
) -> Redirect {
    let outcome: Result<String, AppError> = async {
        let username = ensure_user_exists(&state, form.id).await?;
        let result = sqlx::query("DELETE FROM poll_submissions WHERE user_id = $1")
            .bind(form.id)
            .execute(&state.db)
            .await?;

        Ok(format!(
            "Poll reset for {} ({} submissions removed)",
            username,
            result.rows_affected()
        ))
    }
    .await;

    finish(form.return_to.as_deref(), "reset-poll", outcome)
}

/// POST /admin/actions/ban-user
pub async fn ban_user(
    State(state): State<AppState>,
    Extension(admin): Extension<AuthUser>,
    Form(form): Form<BanUserForm>,
) -> Redirect {
    let outcome: Result<String, AppError> = async {
        let user_id = parse_user_id(&form.user_id)?;
        if user_id == admin.id {
            return Err(AppError::Validation("You cannot ban yourself".to_string()));
        }
        let expires_at = parse_expiry(form.expires_at.as_deref(), Utc::now())?;
        let reason = non_empty(form.reason.as_deref());
        let username = ensure_user_exists(&state, user_id).await?;

        sqlx::query(
            r#"
            INSERT INTO user_bans (user_id, reason, expires_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id) DO UPDATE
            SET reason = EXCLUDED.reason, expires_at = EXCLUDED.expires_at, created_at = NOW()
            "#,
        )
        .bind(user_id)
        .bind(reason)
        .bind(expires_at)
        .execute(&state.db)
        .await?;
        revoke_sessions(&state, user_id).await?;

        Ok(format!("User {} banned", username))
    }
    .await;

    finish(form.return_to.as_deref(), "ban-user", outcome)
}

/// POST /admin/actions/unban-user
pub async fn unban_user(
    State(state): State<AppState>,
    Form(form): Form<UnbanUserForm>,
) -> Redirect {
    let outcome: Result<String, AppError> = async {
        let user_id = parse_user_id(&form.user_id)?;
        let result = sqlx::query("DELETE FROM user_bans WHERE user_id = $1")
            .bind(user_id)
            .execute(&state.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::Validation(format!(
                "User #{} is not banned",
                user_id
            )));
        }

        Ok(format!("User #{} unbanned", user_id))
    }
    .await;

    finish(form.return_to.as_deref(), "unban-user", outcome)
}

/// POST /admin/actions/ban-ip
pub async fn ban_ip(State(state): State<AppState>, Form(form): Form<BanIpForm>) -> Redirect {
    let outcome: Result<String, AppError> = async {
        let ip = parse_ip(&form.ip)?.to_string();
        let expires_at = parse_expiry(form.expires_at.as_deref(), Utc::now())?;
        let reason = non_empty(form.reason.as_deref());

        sqlx::query(
            r#"
            INSERT INTO ip_bans (ip, reason, expires_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (ip) DO UPDATE
            SET reason = EXCLUDED.reason, expires_at = EXCLUDED.expires_at, created_at = NOW()
            "#,
        )
        .bind(&ip)
        .bind(reason)
        .bind(expires_at)
        .execute(&state.db)
        .await?;

        Ok(format!("IP {} banned", ip))
    }
    .await;

    finish(form.return_to.as_deref(), "ban-ip", outcome)
}

/// POST /admin/actions/unban-ip
pub async fn unban_ip(State(state): State<AppState>, Form(form): Form<UnbanIpForm>) -> Redirect {
    let outcome: Result<String, AppError> = async {
        let ip = parse_ip(&form.ip)?.to_string();
        let result = sqlx::query("DELETE FROM ip_bans WHERE ip = $1")
            .bind(&ip)
            .execute(&state.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::Validation(format!("IP {} is not banned", ip)));
        }

        Ok(format!("IP {} unbanned", ip))
    }
    .await;

    finish(form.return_to.as_deref(), "unban-ip", outcome)
}

/// POST /admin/actions/login-link
///
/// Shows the new link on its own page; failures go back with `error=`.
pub async fn login_link(
    State(state): State<AppState>,
    Extension(admin): Extension<AuthUser>,
    Form(form): Form<UserIdForm>,
) -> Response {
    match create_login_link(&state, admin.id, form.id).await {
        Ok((url, expires_at)) => {
            let back = sanitize_return_to(form.return_to.as_deref());
            Html(render_login_link(&url, expires_at, &back).into_string()).into_response()
        }
        Err(e) => finish(form.return_to.as_deref(), "login-link", Err(e)).into_response(),
    }
}
