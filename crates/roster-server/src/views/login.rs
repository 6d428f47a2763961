use chrono::{DateTime, Utc};
use maud::{html, Markup};

use super::{layout, ADMIN_USER_PATH};

const NARROW_CARD: &str = "max-width:24rem;margin:4rem auto";

pub fn render_login(error: Option<&str>) -> Markup {
    let body = html! {
        main {
            section.card style=(NARROW_CARD) {
                h1 { "Sign in" }
                @if let Some(error) = error {
                    p.error { (error) }
                }
                form method="post" action="/login" {
                    input name="username" placeholder="Username" autocomplete="username" required;
                    br;
                    input type="password" name="password" placeholder="Password"
                        autocomplete="current-password" required;
                    br;
                    button { "Sign in" }
                }
            }
        }
    };

    layout("Sign in", body)
}

pub fn render_access_denied() -> Markup {
    let body = html! {
        main {
            section.card style=(NARROW_CARD) {
                h1 { "Access denied" }
                p { "This page is only available to administrators." }
                form method="post" action="/logout" {
                    button { "Sign in with another account" }
                }
            }
        }
    };

    layout("Access denied", body)
}

/// Result page of the login-link form action.
pub fn render_login_link(url: &str, expires_at: DateTime<Utc>, return_to: &str) -> Markup {
    let back = if return_to.is_empty() {
        ADMIN_USER_PATH
    } else {
        return_to
    };

    let body = html! {
        main {
            section.card {
                h1 { "Login link" }
                p {
                    "Share this link with the user. It works once and expires "
                    (expires_at.format("%Y-%m-%d %H:%M UTC").to_string()) "."
                }
                p { input readonly style="width:100%" value=(url) onclick="this.select()"; }
                p { a href=(back) { "Back to user management" } }
            }
        }
    };

    layout("Login link", body)
}
