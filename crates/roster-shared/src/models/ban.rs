use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A ban without expiry never lapses; one whose expiry has passed is treated as lifted.
pub fn is_ban_active(expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    match expires_at {
        Some(at) => at > now,
        None => true,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserBan {
    pub user_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl UserBan {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        is_ban_active(self.expires_at, now)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpBan {
    pub ip: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl IpBan {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        is_ban_active(self.expires_at, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn expired_ban_is_inactive() {
        let now = Utc::now();
        assert!(!is_ban_active(Some(now - Duration::minutes(1)), now));
        assert!(!is_ban_active(Some(now), now));
        assert!(is_ban_active(Some(now + Duration::minutes(1)), now));
        assert!(is_ban_active(None, now));
    }

    #[test]
    fn ip_ban_uses_same_rule() {
        let now = Utc::now();
        let ban = IpBan {
            ip: "10.0.0.1".to_string(),
            reason: None,
            expires_at: Some(now - Duration::days(1)),
            created_at: now - Duration::days(2),
        };
        assert!(!ban.is_active(now));
    }
}
