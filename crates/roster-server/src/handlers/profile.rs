use axum::{
    extract::{Query, State},
    Json,
};
use roster_shared::api::{ProfileUpdateRequest, PublicProfileQuery, PublicProfileResponse};
use roster_shared::{FollowStats, PublicUser, BIO_MAX_CHARS};
use serde_json::{json, Value};

use crate::error::AppError;
use crate::routes::AppState;

const URL_MAX_CHARS: usize = 2048;

pub(crate) async fn load_public_profile(
    state: &AppState,
    user_id: i64,
) -> Result<PublicProfileResponse, AppError> {
    let row: Option<(i64, String, Option<String>, Option<String>, Option<String>, Option<String>, i64, i64)> =
        sqlx::query_as(
            r#"
            SELECT u.id, u.username, u.class, u.bio, u.avatar_url, u.banner_url,
                   (SELECT COUNT(*) FROM follows f WHERE f.following_id = u.id),
                   (SELECT COUNT(*) FROM follows f WHERE f.follower_id = u.id)
            FROM users u
            WHERE u.id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&state.db)
        .await?;

    let (id, username, class, bio, avatar_url, banner_url, follower_count, following_count) =
        row.ok_or(AppError::NotFound)?;

    Ok(PublicProfileResponse {
        user: PublicUser {
            id,
            username,
            class,
            bio,
            avatar_url,
            banner_url,
        },
        stats: Some(FollowStats {
            follower_count,
            following_count,
        }),
    })
}

/// GET /api/users/public?userId=
pub async fn get_public_profile(
    State(state): State<AppState>,
    Query(query): Query<PublicProfileQuery>,
) -> Result<Json<PublicProfileResponse>, AppError> {
    Ok(Json(load_public_profile(&state, query.user_id).await?))
}

fn validate_update(req: &ProfileUpdateRequest) -> Result<(), AppError> {
    if let Some(Some(bio)) = &req.bio {
        if bio.chars().count() > BIO_MAX_CHARS {
            return Err(AppError::Validation(format!(
                "Bio must be at most {} characters",
                BIO_MAX_CHARS
            )));
        }
    }

    for url in [&req.avatar_url, &req.banner_url]
        .into_iter()
        .filter_map(|u| u.as_ref().and_then(|u| u.as_deref()))
    {
        if url.chars().count() > URL_MAX_CHARS {
            return Err(AppError::Validation("Image URL is too long".to_string()));
        }
    }

    Ok(())
}

/// Blank strings clear a column like `null` does.
fn normalize(value: &Option<Option<String>>) -> Option<Option<&str>> {
    value
        .as_ref()
        .map(|v| v.as_deref().map(str::trim).filter(|v| !v.is_empty()))
}

/// POST /api/admin/user/profile
///
/// Only keys present in the body are written.
pub async fn update_profile(
    State(state): State<AppState>,
    Json(req): Json<ProfileUpdateRequest>,
) -> Result<Json<Value>, AppError> {
    validate_update(&req)?;

    let exists: Option<(i64,)> = sqlx::query_as("SELECT id FROM users WHERE id = $1")
        .bind(req.user_id)
        .fetch_optional(&state.db)
        .await?;
    if exists.is_none() {
        return Err(AppError::NotFound);
    }

    if req.is_empty() {
        return Ok(Json(json!({})));
    }

    let avatar = normalize(&req.avatar_url);
    let banner = normalize(&req.banner_url);

    // A flag per column keeps absent keys untouched in a single statement.
    sqlx::query(
        r#"
        UPDATE users SET
            bio = CASE WHEN $2 THEN $3 ELSE bio END,
            avatar_url = CASE WHEN $4 THEN $5 ELSE avatar_url END,
            banner_url = CASE WHEN $6 THEN $7 ELSE banner_url END,
            updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(req.user_id)
    .bind(req.bio.is_some())
    .bind(req.bio.as_ref().and_then(|bio| bio.as_deref()))
    .bind(avatar.is_some())
    .bind(avatar.flatten())
    .bind(banner.is_some())
    .bind(banner.flatten())
    .execute(&state.db)
    .await?;

    tracing::info!(
        user_id = req.user_id,
        bio = req.bio.is_some(),
        avatar = avatar.is_some(),
        banner = banner.is_some(),
        "Profile updated"
    );

    Ok(Json(json!({})))
}
