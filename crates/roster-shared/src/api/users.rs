use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::patch::double_option;
use crate::models::{ClassGroup, FollowStats, IpBan, PublicUser, RoleStats, UserBan, UserSummary};

#[derive(Debug, Serialize, Deserialize)]
pub struct PublicProfileQuery {
    #[serde(rename = "userId")]
    pub user_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicProfileResponse {
    pub user: PublicUser,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<FollowStats>,
}

/// Profile update. A missing key leaves the column alone; `null` clears it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileUpdateRequest {
    #[serde(rename = "userId")]
    pub user_id: i64,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub bio: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub avatar_url: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub banner_url: Option<Option<String>>,
}

impl ProfileUpdateRequest {
    pub fn is_empty(&self) -> bool {
        self.bio.is_none() && self.avatar_url.is_none() && self.banner_url.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginLinkRequest {
    #[serde(rename = "userId")]
    pub user_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginLinkResponse {
    pub url: String,
    pub expires_at: DateTime<Utc>,
}

/// Query string of the admin user page. Everything arrives as text so a bad
/// `page` value clamps instead of rejecting the request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserListParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expanded: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPageResponse {
    pub users: Vec<UserSummary>,
    /// Rows matching the filter, across all pages.
    pub total: i64,
    pub page: u32,
    pub total_pages: i64,
    pub q: String,
    pub class: String,
    pub stats: RoleStats,
    pub groups: Vec<ClassGroup>,
    pub user_bans: Vec<UserBan>,
    pub ip_bans: Vec<IpBan>,
}
