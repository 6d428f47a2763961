use maud::{html, Markup};
use roster_shared::{FollowStats, PublicUser, Role, UserSummary, BIO_MAX_CHARS};

use super::{avatar_image, banner_image, ListLocation};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListMode {
    Compact,
    Full,
}

/// Profile shown inside the expanded row.
#[derive(Debug, Clone)]
pub struct ExpandedProfile {
    pub user: PublicUser,
    pub stats: FollowStats,
}

pub struct UserListView<'a> {
    pub users: &'a [UserSummary],
    pub mode: ListMode,
    pub location: &'a ListLocation,
    pub expanded: Option<&'a ExpandedProfile>,
}

pub fn render_user_list(view: &UserListView<'_>) -> Markup {
    html! {
        @if view.users.is_empty() {
            p.muted { "No users found. Adjust your filters." }
        } @else {
            div.user-list {
                @for user in view.users {
                    @match view.mode {
                        ListMode::Compact => { (compact_row(user)) }
                        ListMode::Full => { (full_row(user, view)) }
                    }
                }
            }
        }
    }
}

fn compact_row(user: &UserSummary) -> Markup {
    html! {
        div.row.compact {
            (avatar_image(user.avatar_url.as_deref(), &user.username))
            " " span { (user.username) }
            " " span.muted { "#" (user.id) }
        }
    }
}

fn vote_badge(has_voted: bool, long: bool) -> Markup {
    let (class, text) = match (has_voted, long) {
        (true, false) => ("voted", "✓ voted"),
        (false, false) => ("not-voted", "○ not voted"),
        (true, true) => ("voted", "Has voted"),
        (false, true) => ("not-voted", "Has not voted"),
    };
    html! { span class={ "badge " (class) } { (text) } }
}

fn full_row(user: &UserSummary, view: &UserListView<'_>) -> Markup {
    let is_expanded = view.location.expanded == Some(user.id);
    let toggle = format!("{}#user-{}", view.location.toggling(user.id).href(), user.id);

    html! {
        div.row id={ "user-" (user.id) } {
            a href=(toggle) {
                (avatar_image(user.avatar_url.as_deref(), &user.username))
                " " strong { (user.username) }
                " " span.badge { (user.role.to_string()) }
                @if let Some(class) = &user.class {
                    " " span.badge.class.lg-only { (class) }
                }
                " " span.xl-only { (vote_badge(user.has_voted, false)) }
                " " span.muted { "#" (user.id) }
                " " span { @if is_expanded { "▴" } @else { "▾" } }
            }
            @if is_expanded {
                (details(user, view))
            }
        }
    }
}

/// Hidden inputs every row form carries.
fn row_target(id: i64, return_to: &str) -> Markup {
    html! {
        input type="hidden" name="id" value=(id);
        input type="hidden" name="return_to" value=(return_to);
    }
}

fn details(user: &UserSummary, view: &UserListView<'_>) -> Markup {
    let return_to = view.location.href();
    let id = user.id;
    let confirm_name = user
        .username
        .replace(|c: char| matches!(c, '\'' | '"' | '\\'), "");

    html! {
        div.details {
            form method="post" action="/admin/actions/update-role" {
                (row_target(id, &return_to))
                select name="role" {
                    @for role in Role::ALL {
                        option value=(role.to_string()) selected[role == user.role] { (role.to_string()) }
                    }
                }
                " " button { "Change role" }
            }
            form method="post" action="/admin/actions/delete-user"
                onsubmit=(format!("return confirm('Delete {}?');", confirm_name)) {
                (row_target(id, &return_to))
                button { "Delete" }
            }
            form method="post" action="/admin/actions/update-password" {
                (row_target(id, &return_to))
                input type="password" name="password" placeholder="New password" autocomplete="new-password";
                " " button { "Change password" }
            }

            section.profile {
                h4 { "Profile" }
                @match view.expanded {
                    Some(profile) if profile.user.id == id => { (profile_summary(profile)) }
                    _ => { p.muted { "Profile unavailable." } }
                }
            }

            section {
                h4 { "Login link" }
                form method="post" action="/admin/actions/login-link" {
                    (row_target(id, &return_to))
                    button { "Create login link" }
                }
            }

            section {
                h4 { "Poll status" }
                (vote_badge(user.has_voted, true))
                " "
                form method="post" action="/admin/actions/reset-poll" style="display:inline" {
                    (row_target(id, &return_to))
                    button disabled[!user.has_voted] { "Reset poll" }
                }
            }
        }
    }
}

fn profile_summary(profile: &ExpandedProfile) -> Markup {
    let p = &profile.user;
    let bio = p.bio.as_deref().unwrap_or("");

    html! {
        (banner_image(p.banner_url.as_deref(), "Banner"))
        p {
            (avatar_image(p.avatar_url.as_deref(), &p.username))
            " " strong { (p.username) }
            @if let Some(class) = &p.class {
                " · Class " (class)
            }
            " · " (profile.stats.follower_count) " followers · "
            (profile.stats.following_count) " following"
        }
        p style="white-space:pre-wrap" {
            @if bio.is_empty() { em { "No bio" } } @else { (bio) }
        }
        p.muted {
            (bio.chars().count()) "/" (BIO_MAX_CHARS)
            " characters. Bio and images are edited in the admin console."
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: i64, name: &str) -> UserSummary {
        UserSummary {
            id,
            username: name.to_string(),
            role: Role::User,
            class: Some("7a".to_string()),
            avatar_url: None,
            has_voted: id % 2 == 0,
        }
    }

    #[test]
    fn empty_list_shows_notice() {
        let location = ListLocation::default();
        let html = render_user_list(&UserListView {
            users: &[],
            mode: ListMode::Full,
            location: &location,
            expanded: None,
        })
        .into_string();
        assert!(html.contains("No users found"));
    }

    #[test]
    fn collapsed_rows_have_no_forms() {
        let location = ListLocation::default();
        let users = vec![user(1, "ana"), user(2, "ben")];
        let html = render_user_list(&UserListView {
            users: &users,
            mode: ListMode::Full,
            location: &location,
            expanded: None,
        })
        .into_string();
        assert!(!html.contains("<form"));
        assert!(html.contains("href=\"/admin/user?expanded=1#user-1\""));
    }

    #[test]
    fn expanded_row_carries_return_to_on_every_form() {
        let location = ListLocation {
            q: "an".to_string(),
            expanded: Some(1),
            ..Default::default()
        };
        let users = vec![user(1, "ana"), user(2, "ben")];
        let html = render_user_list(&UserListView {
            users: &users,
            mode: ListMode::Full,
            location: &location,
            expanded: None,
        })
        .into_string();

        let forms = html.matches("<form").count();
        let return_tos = html
            .matches("name=\"return_to\" value=\"/admin/user?q=an&amp;expanded=1\"")
            .count();
        assert_eq!(forms, 5);
        assert_eq!(return_tos, forms);
        // Clicking the open row closes it.
        assert!(html.contains("href=\"/admin/user?q=an#user-1\""));
    }

    #[test]
    fn compact_mode_lists_names_and_ids_only() {
        let location = ListLocation::default();
        let users = vec![user(3, "cleo")];
        let html = render_user_list(&UserListView {
            users: &users,
            mode: ListMode::Compact,
            location: &location,
            expanded: None,
        })
        .into_string();
        assert!(html.contains("cleo"));
        assert!(html.contains("#3"));
        assert!(!html.contains("badge"));
    }

    #[test]
    fn usernames_are_escaped() {
        let location = ListLocation::default();
        let users = vec![user(4, "<script>")];
        let html = render_user_list(&UserListView {
            users: &users,
            mode: ListMode::Full,
            location: &location,
            expanded: None,
        })
        .into_string();
        assert!(!html.contains("<script>"));
    }
}
