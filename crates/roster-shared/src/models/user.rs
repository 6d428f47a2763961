use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Maximum bio length, counted in characters.
pub const BIO_MAX_CHARS: usize = 2000;

/// The fixed set of class labels a user can be assigned to.
pub const CLASSES: &[&str] = &[
    "5a", "5b", "5c", "6a", "6b", "6c", "7a", "7b", "7c", "8a", "8b", "8c", "9a", "9b", "9c",
    "10a", "10b", "10c", "11", "12",
];

pub fn is_known_class(label: &str) -> bool {
    CLASSES.contains(&label)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "user_role", rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Moderator,
    Admin,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::User, Role::Moderator, Role::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Moderator => "moderator",
            Self::Admin => "admin",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }

    /// Next role in `ALL`, wrapping around.
    pub fn next(&self) -> Role {
        match self {
            Self::User => Self::Moderator,
            Self::Moderator => Self::Admin,
            Self::Admin => Self::User,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown role: {0}")]
pub struct ParseRoleError(pub String);

impl FromStr for Role {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "user" => Ok(Self::User),
            "moderator" => Ok(Self::Moderator),
            "admin" => Ok(Self::Admin),
            other => Err(ParseRoleError(other.to_string())),
        }
    }
}

/// One row of the admin user list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: i64,
    pub username: String,
    pub role: Role,
    pub class: Option<String>,
    pub avatar_url: Option<String>,
    pub has_voted: bool,
}

/// Publicly visible part of a user's profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicUser {
    pub id: i64,
    pub username: String,
    pub class: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub banner_url: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowStats {
    pub follower_count: i64,
    pub following_count: i64,
}

/// The account behind the current session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub username: String,
    pub role: Role,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parses_form_values() {
        assert_eq!("admin".parse::<Role>(), Ok(Role::Admin));
        assert_eq!(" moderator ".parse::<Role>(), Ok(Role::Moderator));
        assert!("root".parse::<Role>().is_err());
    }

    #[test]
    fn role_cycle_visits_every_role() {
        let mut role = Role::User;
        for expected in [Role::Moderator, Role::Admin, Role::User] {
            role = role.next();
            assert_eq!(role, expected);
        }
    }

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Moderator).unwrap(), "\"moderator\"");
    }

    #[test]
    fn class_membership() {
        assert!(is_known_class("7b"));
        assert!(!is_known_class("7B"));
        assert!(!is_known_class(""));
    }
}
