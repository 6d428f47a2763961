//! Server-rendered HTML for the admin surface.

use maud::{html, Markup, PreEscaped, DOCTYPE};

mod images;
mod login;
mod page;
mod user_list;

pub use images::{avatar_image, banner_image};
pub use login::{render_access_denied, render_login, render_login_link};
pub use page::{render_admin_page, AdminPageView};
pub use user_list::{render_user_list, ExpandedProfile, ListMode, UserListView};

pub const ADMIN_USER_PATH: &str = "/admin/user";

/// Location of the admin user list for a given filter state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListLocation {
    pub q: String,
    pub class: String,
    pub page: u32,
    pub expanded: Option<i64>,
    pub compact: bool,
}

impl ListLocation {
    pub fn href(&self) -> String {
        let mut params: Vec<String> = Vec::new();
        if self.page > 1 {
            params.push(format!("page={}", self.page));
        }
        if !self.q.is_empty() {
            params.push(format!("q={}", urlencoding::encode(&self.q)));
        }
        if !self.class.is_empty() {
            params.push(format!("class={}", urlencoding::encode(&self.class)));
        }
        if let Some(id) = self.expanded {
            params.push(format!("expanded={}", id));
        }
        if self.compact {
            params.push("view=compact".to_string());
        }

        if params.is_empty() {
            ADMIN_USER_PATH.to_string()
        } else {
            format!("{}?{}", ADMIN_USER_PATH, params.join("&"))
        }
    }

    pub fn with_page(&self, page: u32) -> Self {
        Self {
            page,
            expanded: None,
            ..self.clone()
        }
    }

    /// Opening a row replaces any other open row; opening the open row closes it.
    pub fn toggling(&self, id: i64) -> Self {
        Self {
            expanded: if self.expanded == Some(id) { None } else { Some(id) },
            ..self.clone()
        }
    }
}

pub fn layout(title: &str, body: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { (title) }
                style { (PreEscaped(STYLE)) }
            }
            body { (body) }
        }
    }
}

const STYLE: &str = "body{font-family:system-ui,sans-serif;background:#1a1714;color:#f5f1ed;margin:0}\
main{max-width:80rem;margin:0 auto;padding:2rem 1rem}\
.card{background:#2a2520;border:1px solid #e89a7a33;border-radius:1rem;padding:1rem;margin-bottom:1.5rem}\
.stats{display:grid;grid-template-columns:repeat(auto-fit,minmax(10rem,1fr));gap:1rem}\
.columns{display:flex;flex-wrap:wrap;gap:1.5rem}.main-col{flex:2 1 30rem;min-width:0}.side-col{flex:1 1 18rem}\
.badge{display:inline-block;padding:0 .5rem;border-radius:1rem;font-size:.75rem;background:#e89a7a1a;color:#e89a7a}\
.badge.class{background:#8faf9d1a;color:#8faf9d}.badge.voted{color:#8faf9d}.badge.not-voted{color:#d97757}\
.row{border:1px solid #e89a7a26;border-radius:.75rem;margin-bottom:.5rem}\
.row>a{display:flex;gap:.5rem;align-items:center;padding:.5rem;color:inherit;text-decoration:none}\
.row .details{padding:.75rem;border-top:1px solid #e89a7a1a}\
.avatar{width:1.5rem;height:1.5rem;border-radius:50%;object-fit:cover}\
.avatar-fallback{align-items:center;justify-content:center;background:#d97757;color:#fff;font-size:.75rem}\
.banner{width:100%;height:6rem;object-fit:cover;border-radius:.75rem}\
.notice{color:#8faf9d}.error{color:#d97757}.muted{color:#b8aea5}\
@media (max-width:64rem){.lg-only{display:none}}@media (max-width:80rem){.xl-only{display:none}}\
input,select,textarea,button{font:inherit;margin:.15rem 0}a{color:#e89a7a}";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_escapes_title_and_keeps_body_markup() {
        let page = layout("<Users>", html! { p.notice { "ok" } }).into_string();
        assert!(page.starts_with("<!DOCTYPE html>"));
        assert!(page.contains("<title>&lt;Users&gt;</title>"));
        assert!(page.contains("<body><p class=\"notice\">ok</p></body>"));
    }

    #[test]
    fn default_location_is_bare_path() {
        assert_eq!(ListLocation::default().href(), "/admin/user");
    }

    #[test]
    fn location_keeps_filters_and_encodes_them() {
        let loc = ListLocation {
            q: "anna b".to_string(),
            class: "none".to_string(),
            page: 2,
            expanded: Some(7),
            compact: false,
        };
        assert_eq!(loc.href(), "/admin/user?page=2&q=anna%20b&class=none&expanded=7");
        assert_eq!(loc.with_page(3).href(), "/admin/user?page=3&q=anna%20b&class=none");
    }

    #[test]
    fn only_one_row_is_open() {
        let loc = ListLocation::default().toggling(4);
        assert_eq!(loc.expanded, Some(4));
        assert_eq!(loc.toggling(5).expanded, Some(5));
        assert_eq!(loc.toggling(4).expanded, None);
    }
}
