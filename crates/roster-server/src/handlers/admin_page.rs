//! The admin user page and its JSON twin.

use axum::{
    extract::{Query, State},
    response::Html,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use roster_shared::api::{UserListParams, UserPageResponse};
use roster_shared::paging::{clamp_page, page_offset, total_pages, ClassFilter, PAGE_SIZE};
use roster_shared::{ClassGroup, IpBan, Role, RoleStats, UserBan, UserSummary};

use super::profile::load_public_profile;
use crate::auth::AuthUser;
use crate::db::UserFilter;
use crate::error::AppError;
use crate::routes::AppState;
use crate::views::{render_admin_page, AdminPageView, ExpandedProfile, ListLocation};

type UserRow = (i64, String, Role, Option<String>, Option<String>, bool);

fn row_to_summary(row: UserRow) -> UserSummary {
    UserSummary {
        id: row.0,
        username: row.1,
        role: row.2,
        class: row.3,
        avatar_url: row.4,
        has_voted: row.5,
    }
}

pub(crate) async fn load_user_page(
    state: &AppState,
    params: &UserListParams,
) -> Result<UserPageResponse, AppError> {
    state.schema.ensure(&state.db).await?;

    let q = params.q.as_deref().unwrap_or("").trim().to_string();
    let class = ClassFilter::parse(params.class.as_deref());
    let page = clamp_page(params.page.as_deref());
    let filter = UserFilter::new(&q, &class);
    let where_sql = filter.where_sql();

    // Count
    let count_sql = format!("SELECT COUNT(*) FROM users u {}", where_sql);
    let (total,): (i64,) = filter
        .bind_to(sqlx::query_as(&count_sql))
        .fetch_one(&state.db)
        .await?;

    // Page
    let limit_idx = filter.next_param();
    let list_sql = format!(
        r#"
        SELECT u.id, u.username, u.role, u.class, u.avatar_url,
               EXISTS (SELECT 1 FROM poll_submissions ps WHERE ps.user_id = u.id)
        FROM users u
        {}
        ORDER BY u.id DESC
        LIMIT ${} OFFSET ${}
        "#,
        where_sql,
        limit_idx,
        limit_idx + 1
    );
    let rows: Vec<UserRow> = filter
        .bind_to(sqlx::query_as(&list_sql))
        .bind(PAGE_SIZE)
        .bind(page_offset(page))
        .fetch_all(&state.db)
        .await?;

    // Statistics ignore the filter
    let role_counts: Vec<(Role, i64)> =
        sqlx::query_as("SELECT role, COUNT(*) FROM users GROUP BY role")
            .fetch_all(&state.db)
            .await?;
    let class_counts: Vec<(Option<String>, i64)> =
        sqlx::query_as("SELECT class, COUNT(*) FROM users GROUP BY class")
            .fetch_all(&state.db)
            .await?;

    let user_bans: Vec<(i64, Option<String>, Option<String>, Option<DateTime<Utc>>, DateTime<Utc>)> =
        sqlx::query_as(
            r#"
            SELECT b.user_id, u.username, b.reason, b.expires_at, b.created_at
            FROM user_bans b
            LEFT JOIN users u ON u.id = b.user_id
            WHERE b.expires_at IS NULL OR b.expires_at > NOW()
            ORDER BY b.created_at DESC
            "#,
        )
        .fetch_all(&state.db)
        .await?;
    let ip_bans: Vec<(String, Option<String>, Option<DateTime<Utc>>, DateTime<Utc>)> =
        sqlx::query_as(
            r#"
            SELECT ip, reason, expires_at, created_at
            FROM ip_bans
            WHERE expires_at IS NULL OR expires_at > NOW()
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&state.db)
        .await?;

    Ok(UserPageResponse {
        users: rows.into_iter().map(row_to_summary).collect(),
        total,
        page,
        total_pages: total_pages(total),
        q,
        class: class.as_query_value().to_string(),
        stats: RoleStats::from_counts(role_counts),
        groups: ClassGroup::tally(class_counts),
        user_bans: user_bans
            .into_iter()
            .map(|(user_id, username, reason, expires_at, created_at)| UserBan {
                user_id,
                username,
                reason,
                expires_at,
                created_at,
            })
            .collect(),
        ip_bans: ip_bans
            .into_iter()
            .map(|(ip, reason, expires_at, created_at)| IpBan {
                ip,
                reason,
                expires_at,
                created_at,
            })
            .collect(),
    })
}

fn location_for(params: &UserListParams, data: &UserPageResponse) -> ListLocation {
    ListLocation {
        q: data.q.clone(),
        class: data.class.clone(),
        page: data.page,
        expanded: params
            .expanded
            .as_deref()
            .and_then(|id| id.trim().parse().ok()),
        compact: params.view.as_deref() == Some("compact"),
    }
}

/// GET /admin/user
pub async fn admin_user_page(
    State(state): State<AppState>,
    Extension(admin): Extension<AuthUser>,
    Query(params): Query<UserListParams>,
) -> Result<Html<String>, AppError> {
    let data = load_user_page(&state, &params).await?;
    let location = location_for(&params, &data);

    let expanded = match location.expanded {
        Some(id) if !location.compact && data.users.iter().any(|u| u.id == id) => {
            match load_public_profile(&state, id).await {
                Ok(profile) => Some(ExpandedProfile {
                    user: profile.user,
                    stats: profile.stats.unwrap_or_default(),
                }),
                Err(AppError::NotFound) => None,
                Err(e) => return Err(e),
            }
        }
        _ => None,
    };

    let non_blank = |v: &Option<String>| v.as_deref().map(str::trim).filter(|v| !v.is_empty()).map(str::to_string);
    let notice = non_blank(&params.notice);
    let error = non_blank(&params.error);

    Ok(Html(render_admin_page(&AdminPageView {
        data: &data,
        location: &location,
        expanded: expanded.as_ref(),
        admin_username: &admin.username,
        notice: notice.as_deref(),
        error: error.as_deref(),
        now: Utc::now(),
    })
    .into_string()))
}

/// GET /api/admin/users
pub async fn list_users(
    State(state): State<AppState>,
    Query(params): Query<UserListParams>,
) -> Result<Json<UserPageResponse>, AppError> {
    Ok(Json(load_user_page(&state, &params).await?))
}
