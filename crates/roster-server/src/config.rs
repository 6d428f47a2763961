use std::env;
use std::path::PathBuf;

use anyhow::Context;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expires_in: i64,
    pub refresh_token_expires_in: i64,
    pub port: u16,
    pub media_root: PathBuf,
    pub media_url_prefix: String,
    pub public_base_url: String,
    pub login_link_expires_in: i64,
    pub cookie_secure: bool,
    pub bootstrap_admin: Option<(String, String)>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let bootstrap_admin = match (
            env::var("BOOTSTRAP_ADMIN_USERNAME"),
            env::var("BOOTSTRAP_ADMIN_PASSWORD"),
        ) {
            (Ok(username), Ok(password)) if !username.is_empty() && !password.is_empty() => {
                Some((username, password))
            }
            _ => None,
        };

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            jwt_expires_in: env::var("JWT_EXPIRES_IN")
                .unwrap_or_else(|_| "900".to_string()) // 15 minutes
                .parse()
                .context("JWT_EXPIRES_IN must be a number of seconds")?,
            refresh_token_expires_in: env::var("REFRESH_TOKEN_EXPIRES_IN")
                .unwrap_or_else(|_| "604800".to_string()) // 7 days
                .parse()
                .context("REFRESH_TOKEN_EXPIRES_IN must be a number of seconds")?,
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .context("PORT must be a port number")?,
            media_root: env::var("MEDIA_ROOT")
                .unwrap_or_else(|_| "./media".to_string())
                .into(),
            media_url_prefix: env::var("MEDIA_URL_PREFIX")
                .unwrap_or_else(|_| "/media".to_string())
                .trim_end_matches('/')
                .to_string(),
            public_base_url: env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string())
                .trim_end_matches('/')
                .to_string(),
            login_link_expires_in: env::var("LOGIN_LINK_EXPIRES_IN")
                .unwrap_or_else(|_| "604800".to_string()) // 7 days
                .parse()
                .context("LOGIN_LINK_EXPIRES_IN must be a number of seconds")?,
            cookie_secure: env::var("COOKIE_SECURE")
                .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
            bootstrap_admin,
        })
    }

    /// Settings for tests and local tooling; no environment involved.
    pub fn for_tests(media_root: PathBuf) -> Self {
        Self {
            database_url: "postgres://localhost/roster_test".to_string(),
            jwt_secret: "test-secret".to_string(),
            jwt_expires_in: 900,
            refresh_token_expires_in: 604800,
            port: 0,
            media_root,
            media_url_prefix: "/media".to_string(),
            public_base_url: "http://localhost:3000".to_string(),
            login_link_expires_in: 604800,
            cookie_secure: false,
            bootstrap_admin: None,
        }
    }
}
