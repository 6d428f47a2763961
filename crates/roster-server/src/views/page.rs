use chrono::{DateTime, Utc};
use maud::{html, Markup};
use roster_shared::api::UserPageResponse;
use roster_shared::{Role, CLASSES, NO_CLASS_VALUE};

use super::{layout, render_user_list, ExpandedProfile, ListLocation, ListMode, UserListView};

pub struct AdminPageView<'a> {
    pub data: &'a UserPageResponse,
    pub location: &'a ListLocation,
    pub expanded: Option<&'a ExpandedProfile>,
    pub admin_username: &'a str,
    pub notice: Option<&'a str>,
    pub error: Option<&'a str>,
    pub now: DateTime<Utc>,
}

pub fn render_admin_page(view: &AdminPageView<'_>) -> Markup {
    let mode = if view.location.compact {
        ListMode::Compact
    } else {
        ListMode::Full
    };

    let body = html! {
        main {
            header style="display:flex;justify-content:space-between;align-items:center" {
                h1 { "User management" }
                form method="post" action="/logout" {
                    span.muted { (view.admin_username) }
                    " " button { "Log out" }
                }
            }
            @if let Some(notice) = view.notice {
                p.card.notice { (notice) }
            }
            @if let Some(error) = view.error {
                p.card.error { (error) }
            }

            (stats(view))

            div.columns {
                div.main-col {
                    (filters(view))
                    section.card {
                        (render_user_list(&UserListView {
                            users: &view.data.users,
                            mode,
                            location: view.location,
                            expanded: view.expanded,
                        }))
                        (pagination(view))
                    }
                }
                aside.side-col {
                    (class_sidebar(view))
                    (create_user(view))
                    (ban_forms(view))
                    (active_bans(view))
                }
            }
        }
    };

    layout("User management", body)
}

fn stats(view: &AdminPageView<'_>) -> Markup {
    let stats = &view.data.stats;
    let cards = [
        ("Total users", stats.total),
        ("Admins", stats.admins),
        ("Moderators", stats.moderators),
        ("Users", stats.users),
    ];

    html! {
        section.stats {
            @for (label, value) in cards {
                div.card {
                    div.muted { (label) }
                    strong { (value) }
                }
            }
        }
    }
}

fn filters(view: &AdminPageView<'_>) -> Markup {
    let loc = view.location;
    let toggled = ListLocation {
        compact: !loc.compact,
        expanded: None,
        ..loc.clone()
    };

    html! {
        form.card method="get" action="/admin/user" {
            input type="search" name="q" value=(loc.q) placeholder="Search username";
            " "
            select name="class" {
                option value="" { "All classes" }
                option value=(NO_CLASS_VALUE) selected[loc.class == NO_CLASS_VALUE] { "No class" }
                @for &class in CLASSES {
                    option value=(class) selected[loc.class == class] { (class) }
                }
            }
            @if loc.compact {
                input type="hidden" name="view" value="compact";
            }
            " " button { "Filter" }
            " " a href="/admin/user" { "Reset" }
            " " a href=(toggled.href()) {
                @if loc.compact { "Full view" } @else { "Compact view" }
            }
        }
    }
}

fn pagination(view: &AdminPageView<'_>) -> Markup {
    let data = view.data;

    html! {
        @if data.total_pages > 1 {
            nav.pagination {
                @if data.page > 1 {
                    a href=(view.location.with_page(data.page - 1).href()) { "← Previous" }
                    " "
                }
                span.muted {
                    "Page " (data.page) " of " (data.total_pages) " (" (data.total) " users)"
                }
                @if i64::from(data.page) < data.total_pages {
                    " "
                    a href=(view.location.with_page(data.page + 1).href()) { "Next →" }
                }
            }
        }
    }
}

fn class_sidebar(view: &AdminPageView<'_>) -> Markup {
    html! {
        section.card {
            h3 { "Classes" }
            ul {
                @for group in &view.data.groups {
                    @let active = view.location.class == group.value;
                    li {
                        a href={ "/admin/user?class=" (urlencoding::encode(&group.value).into_owned()) }
                            style=[active.then_some("font-weight:bold")] {
                            (group.label)
                        }
                        " " span.badge { (group.count) }
                    }
                }
            }
        }
    }
}

fn return_to_input(return_to: &str) -> Markup {
    html! { input type="hidden" name="return_to" value=(return_to); }
}

fn create_user(view: &AdminPageView<'_>) -> Markup {
    let return_to = view.location.href();

    html! {
        section.card {
            h3 { "Create user" }
            form method="post" action="/admin/actions/create-user" {
                (return_to_input(&return_to))
                input name="username" placeholder="Username" required;
                br;
                input type="password" name="password" placeholder="Password"
                    autocomplete="new-password" required;
                br;
                select name="role" {
                    @for role in Role::ALL {
                        option value=(role.to_string()) { (role.to_string()) }
                    }
                }
                " "
                select name="class" {
                    option value="" { "No class" }
                    @for &class in CLASSES {
                        option value=(class) { (class) }
                    }
                }
                br;
                button { "Create" }
            }
        }
    }
}

fn ban_forms(view: &AdminPageView<'_>) -> Markup {
    let return_to = view.location.href();

    html! {
        section.card {
            h3 { "Bans" }
            form method="post" action="/admin/actions/ban-user" {
                (return_to_input(&return_to))
                input name="user_id" placeholder="User ID" required;
                " " input name="reason" placeholder="Reason (optional)";
                " " input type="datetime-local" name="expires_at";
                " " button { "Ban user" }
            }
            form method="post" action="/admin/actions/unban-user" {
                (return_to_input(&return_to))
                input name="user_id" placeholder="User ID" required;
                " " button { "Unban user" }
            }
            form method="post" action="/admin/actions/ban-ip" {
                (return_to_input(&return_to))
                input name="ip" placeholder="IP address" required;
                " " input name="reason" placeholder="Reason (optional)";
                " " input type="datetime-local" name="expires_at";
                " " button { "Ban IP" }
            }
            form method="post" action="/admin/actions/unban-ip" {
                (return_to_input(&return_to))
                input name="ip" placeholder="IP address" required;
                " " button { "Unban IP" }
            }
            p.muted { "Expiry is in UTC. Leave it empty for a permanent ban." }
        }
    }
}

fn expiry_label(expires_at: Option<DateTime<Utc>>) -> String {
    match expires_at {
        Some(at) => format!("until {}", at.format("%Y-%m-%d %H:%M UTC")),
        None => "permanent".to_string(),
    }
}

fn active_bans(view: &AdminPageView<'_>) -> Markup {
    let user_bans: Vec<_> = view
        .data
        .user_bans
        .iter()
        .filter(|b| b.is_active(view.now))
        .collect();
    let ip_bans: Vec<_> = view
        .data
        .ip_bans
        .iter()
        .filter(|b| b.is_active(view.now))
        .collect();

    html! {
        section.card {
            h3 { "Active bans" }
            @if user_bans.is_empty() && ip_bans.is_empty() {
                p.muted { "No active bans." }
            } @else {
                ul {
                    @for ban in &user_bans {
                        li {
                            "User #" (ban.user_id) " " (ban.username.as_deref().unwrap_or(""))
                            " · " (expiry_label(ban.expires_at))
                            @if let Some(reason) = &ban.reason { " · " (reason) }
                        }
                    }
                    @for ban in &ip_bans {
                        li {
                            "IP " (ban.ip) " · " (expiry_label(ban.expires_at))
                            @if let Some(reason) = &ban.reason { " · " (reason) }
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use roster_shared::{ClassGroup, IpBan, RoleStats, UserBan, UserSummary};

    fn page_data(total: i64, page: u32) -> UserPageResponse {
        UserPageResponse {
            users: vec![UserSummary {
                id: 9,
                username: "mira".to_string(),
                role: Role::Moderator,
                class: None,
                avatar_url: None,
                has_voted: false,
            }],
            total,
            page,
            total_pages: roster_shared::paging::total_pages(total),
            q: "mi".to_string(),
            class: "7a".to_string(),
            stats: RoleStats {
                total: 200,
                admins: 2,
                moderators: 8,
                users: 190,
            },
            groups: ClassGroup::tally(vec![(None, 4), (Some("7a".to_string()), 12)]),
            user_bans: Vec::new(),
            ip_bans: Vec::new(),
        }
    }

    fn render(data: &UserPageResponse, location: &ListLocation) -> String {
        render_admin_page(&AdminPageView {
            data,
            location,
            expanded: None,
            admin_username: "root",
            notice: None,
            error: Some("<bad>"),
            now: Utc::now(),
        })
        .into_string()
    }

    #[test]
    fn pagination_keeps_filters() {
        let data = page_data(120, 2);
        let location = ListLocation {
            q: "mi".to_string(),
            class: "7a".to_string(),
            page: 2,
            expanded: Some(9),
            compact: false,
        };
        let html = render(&data, &location);

        assert!(html.contains("Page 2 of 3 (120 users)"));
        assert!(html.contains("href=\"/admin/user?q=mi&amp;class=7a\""));
        assert!(html.contains("href=\"/admin/user?page=3&amp;q=mi&amp;class=7a\""));
    }

    #[test]
    fn single_page_has_no_pagination() {
        let data = page_data(10, 1);
        let html = render(&data, &ListLocation::default());
        assert!(!html.contains("Page 1 of"));
    }

    #[test]
    fn stats_and_sidebar_are_rendered() {
        let data = page_data(10, 1);
        let location = ListLocation {
            class: "7a".to_string(),
            page: 1,
            ..Default::default()
        };
        let html = render(&data, &location);

        assert!(html.contains("<strong>200</strong>"));
        assert!(html.contains("href=\"/admin/user?class=none\""));
        assert!(html.contains("href=\"/admin/user?class=7a\" style=\"font-weight:bold\""));
        assert!(html.contains("&lt;bad&gt;"));
    }

    #[test]
    fn expired_bans_are_not_listed() {
        let now = Utc::now();
        let mut data = page_data(1, 1);
        data.user_bans.push(UserBan {
            user_id: 3,
            username: Some("old".to_string()),
            reason: None,
            expires_at: Some(now - Duration::hours(1)),
            created_at: now - Duration::days(1),
        });
        data.ip_bans.push(IpBan {
            ip: "10.1.2.3".to_string(),
            reason: Some("spam".to_string()),
            expires_at: None,
            created_at: now,
        });
        let html = render(&data, &ListLocation::default());

        assert!(!html.contains("User #3"));
        assert!(html.contains("IP 10.1.2.3 · permanent · spam"));
    }
}
