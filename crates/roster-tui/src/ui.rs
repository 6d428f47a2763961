use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
    Frame,
};
use roster_shared::{Role, UserSummary};

use crate::app::{App, InputField, Prompt, View, VimMode};
use crate::profile::{LoadState, MediaField, Pending, ProfileEditor};

/// Returns (label, color) for a role badge
fn role_badge(role: Role) -> (&'static str, Color) {
    match role {
        Role::Admin => ("ADMIN", Color::Red),
        Role::Moderator => ("MOD", Color::Yellow),
        Role::User => ("USER", Color::Blue),
    }
}

fn initial(username: &str) -> String {
    username
        .chars()
        .next()
        .map(|c| c.to_uppercase().to_string())
        .unwrap_or_else(|| "?".to_string())
}

pub fn draw(f: &mut Frame, app: &App) {
    match app.view {
        View::Login => draw_login(f, app),
        View::VerifyingAuth => draw_loading(f, "Verifying authentication..."),
        View::Users => draw_users(f, app),
    }

    // Draw error overlay if present
    if let Some(ref error) = app.error_message {
        draw_error_popup(f, error);
    }

    // Draw loading overlay if loading
    if app.loading {
        draw_loading_overlay(f, &app.loading_message);
    }
}

fn draw_login(f: &mut Frame, app: &App) {
    let area = f.area();

    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(25),
            Constraint::Length(12),
            Constraint::Percentage(25),
        ])
        .split(area);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(25),
            Constraint::Percentage(50),
            Constraint::Percentage(25),
        ])
        .split(vertical[1]);

    let form_area = horizontal[1];

    let form_block = Block::default()
        .title(format!(" Roster Admin Login ({}) ", app.api.base_url()))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let inner = form_block.inner(form_area);
    f.render_widget(form_block, form_area);

    let form_chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3), // Username
            Constraint::Length(3), // Password
            Constraint::Length(2), // Submit hint
            Constraint::Min(0),    // Spacer
        ])
        .split(inner);

    let field_style = |field: InputField| {
        if app.login_field == field {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default().fg(Color::Gray)
        }
    };

    let username_text = Paragraph::new(app.login_username.as_str()).block(
        Block::default()
            .title(" Username ")
            .borders(Borders::ALL)
            .border_style(field_style(InputField::Username)),
    );
    f.render_widget(username_text, form_chunks[0]);

    let password_display = "*".repeat(app.login_password.chars().count());
    let password_text = Paragraph::new(password_display.as_str()).block(
        Block::default()
            .title(" Password ")
            .borders(Borders::ALL)
            .border_style(field_style(InputField::Password)),
    );
    f.render_widget(password_text, form_chunks[1]);

    let mode_text = match app.vim_mode {
        VimMode::Normal => "'i' edit | Tab switch | Enter submit | 'q' quit",
        VimMode::Insert => "Type to enter | Esc normal | Enter submit",
    };
    let hint = Paragraph::new(mode_text)
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Center);
    f.render_widget(hint, form_chunks[2]);

    // Set cursor position in insert mode
    if app.vim_mode == VimMode::Insert {
        let (chunk, len) = match app.login_field {
            InputField::Username => (form_chunks[0], app.login_username.chars().count()),
            InputField::Password => (form_chunks[1], app.login_password.chars().count()),
        };
        f.set_cursor_position((chunk.x + 1 + len as u16, chunk.y + 1));
    }
}

fn draw_users(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Main content
            Constraint::Length(1), // Notice
            Constraint::Length(1), // Status bar
        ])
        .split(f.area());

    draw_header(f, chunks[0], app);

    let show_panel = app.list.expanded_id.is_some();
    let main = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(if show_panel {
            [Constraint::Percentage(45), Constraint::Percentage(55)]
        } else {
            [Constraint::Percentage(100), Constraint::Percentage(0)]
        })
        .split(chunks[1]);

    draw_user_list(f, main[0], app);
    if show_panel {
        draw_expanded_panel(f, main[1], app);
    }

    let notice = Paragraph::new(app.notice.as_deref().unwrap_or(""))
        .style(Style::default().fg(Color::Green));
    f.render_widget(notice, chunks[2]);

    draw_status_bar(f, chunks[3], app);

    if let Some(ref prompt) = app.prompt {
        draw_prompt(f, app, prompt);
    }
    if app.bio_editor.is_some() {
        draw_bio_editor(f, app);
    }
}

fn draw_header(f: &mut Frame, area: Rect, app: &App) {
    let admin = app
        .account
        .as_ref()
        .map(|a| a.username.as_str())
        .unwrap_or("");

    let mut spans = vec![
        Span::styled(
            "ROSTER",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::raw(" | "),
        Span::styled(admin, Style::default().fg(Color::Yellow)),
    ];

    if let Some(data) = app.list.data.as_ref() {
        let stats = data.stats;
        spans.push(Span::raw(" | "));
        spans.push(Span::raw(format!(
            "{} users · {} admins · {} moderators · {} members",
            stats.total, stats.admins, stats.moderators, stats.users
        )));
    }

    spans.push(Span::raw(" | "));
    spans.push(Span::styled(
        format!("class: {}", app.list.class_label()),
        Style::default().fg(Color::Magenta),
    ));
    if !app.list.query.is_empty() {
        spans.push(Span::raw(" | "));
        spans.push(Span::styled(
            format!("search: {}", app.list.query),
            Style::default().fg(Color::Magenta),
        ));
    }

    let header = Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::BOTTOM));
    f.render_widget(header, area);
}

fn user_row(user: &UserSummary, compact: bool, expanded: bool) -> Line<'_> {
    if compact {
        return Line::from(vec![
            Span::styled(
                format!("[{}] ", initial(&user.username)),
                Style::default().fg(Color::Cyan),
            ),
            Span::raw(user.username.as_str()),
            Span::styled(format!(" #{}", user.id), Style::default().fg(Color::DarkGray)),
        ]);
    }

    let (role, role_color) = role_badge(user.role);
    let marker = if expanded { "▾ " } else { "▸ " };
    let mut spans = vec![
        Span::raw(marker),
        Span::styled(
            user.username.as_str(),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!(" #{} ", user.id), Style::default().fg(Color::DarkGray)),
        Span::styled(format!(" {} ", role), Style::default().bg(role_color).fg(Color::White)),
        Span::raw(" "),
    ];

    match user.class.as_deref() {
        Some(class) => spans.push(Span::styled(
            format!("[{}]", class),
            Style::default().fg(Color::Magenta),
        )),
        None => spans.push(Span::styled("[no class]", Style::default().fg(Color::DarkGray))),
    }

    spans.push(Span::raw(" "));
    if user.has_voted {
        spans.push(Span::styled("✓ voted", Style::default().fg(Color::Green)));
    } else {
        spans.push(Span::styled("not voted", Style::default().fg(Color::DarkGray)));
    }

    Line::from(spans)
}

fn draw_user_list(f: &mut Frame, area: Rect, app: &App) {
    let list = &app.list;
    let title = match list.data.as_ref() {
        Some(data) if data.total_pages > 0 => format!(
            " Users · page {} of {} ({} users) ",
            data.page, data.total_pages, data.total
        ),
        _ => " Users ".to_string(),
    };

    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    if list.users().is_empty() {
        let empty = Paragraph::new("No users found.")
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center)
            .block(block);
        f.render_widget(empty, area);
        return;
    }

    let items: Vec<ListItem> = list
        .users()
        .iter()
        .enumerate()
        .map(|(i, user)| {
            let line = user_row(user, list.compact, list.expanded_id == Some(user.id));
            let style = if i == list.selected {
                Style::default().bg(Color::DarkGray)
            } else {
                Style::default()
            };
            ListItem::new(line).style(style)
        })
        .collect();

    f.render_widget(List::new(items).block(block), area);
}

fn media_line(editor: &ProfileEditor, field: MediaField) -> Line<'static> {
    let value = editor
        .media(field)
        .map(str::to_string)
        .unwrap_or_else(|| "none".to_string());
    Line::from(vec![
        Span::styled(
            format!("{:<8}", field.label()),
            Style::default().fg(Color::Gray),
        ),
        Span::raw(value),
    ])
}

fn draw_expanded_panel(f: &mut Frame, area: Rect, app: &App) {
    let Some(user) = app.list.expanded_user() else {
        return;
    };

    let block = Block::default()
        .title(format!(" {} #{} ", user.username, user.id))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),    // Profile
            Constraint::Length(1), // Editor status
            Constraint::Length(4), // Actions
        ])
        .split(inner);

    let mut lines = Vec::new();
    match app.editor.as_ref() {
        None => lines.push(Line::from("Loading profile...")),
        Some(editor) => match &editor.load {
            LoadState::Loading => lines.push(Line::from("Loading profile...")),
            LoadState::Failed(msg) => lines.push(Line::from(Span::styled(
                msg.clone(),
                Style::default().fg(Color::Red),
            ))),
            LoadState::Ready => {
                if let Some(stats) = editor.stats {
                    lines.push(Line::from(format!(
                        "{} followers · {} following",
                        stats.follower_count, stats.following_count
                    )));
                }
                lines.push(media_line(editor, MediaField::Avatar));
                lines.push(media_line(editor, MediaField::Banner));
                lines.push(Line::from(""));
                lines.push(Line::from(Span::styled(
                    if editor.is_dirty() { "Bio (unsaved)" } else { "Bio" },
                    Style::default().fg(Color::Gray),
                )));
                if editor.bio.is_empty() {
                    lines.push(Line::from(Span::styled(
                        "No bio",
                        Style::default().fg(Color::DarkGray),
                    )));
                } else {
                    lines.extend(editor.bio.lines().map(|l| Line::from(l.to_string())));
                }
            }
        },
    }
    let profile = Paragraph::new(lines).wrap(Wrap { trim: false });
    f.render_widget(profile, chunks[0]);

    if let Some(editor) = app.editor.as_ref() {
        let status = match editor.pending() {
            Some(Pending::Save) => "Saving...".to_string(),
            Some(Pending::Upload(field)) => format!("Uploading {}...", field.label().to_lowercase()),
            Some(Pending::Remove(field)) => format!("Removing {}...", field.label().to_lowercase()),
            None => editor.status.clone().unwrap_or_default(),
        };
        let status = Paragraph::new(status).style(Style::default().fg(Color::Cyan));
        f.render_widget(status, chunks[1]);
    }

    let actions = Paragraph::new(vec![
        Line::from("e: edit bio | a/b: upload avatar/banner | x/X: remove | s: save"),
        Line::from("R: next role | P: password | V: reset poll | G: login link"),
        Line::from("B: ban | U: unban | D: delete"),
    ])
    .style(Style::default().fg(Color::DarkGray))
    .block(Block::default().borders(Borders::TOP));
    f.render_widget(actions, chunks[2]);
}

fn draw_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let (mode, mode_color) = if app.bio_editor.is_some() {
        ("BIO", Color::Green)
    } else if matches!(app.prompt, Some(Prompt::ConfirmDelete)) {
        ("DELETE", Color::Red)
    } else if app.prompt.is_some() {
        ("INPUT", Color::Green)
    } else {
        ("NORMAL", Color::Blue)
    };

    let hints = if app.bio_editor.is_some() {
        "Ctrl+S: apply | Ctrl+E: $EDITOR | Esc: cancel"
    } else if matches!(app.prompt, Some(Prompt::ConfirmDelete)) {
        "y: confirm | n/Esc: cancel"
    } else if app.prompt.is_some() {
        "Enter: submit | Esc: cancel"
    } else {
        "Enter: expand | /: search | c: class | n/p: page | v: compact | N: new user | r: reload | L: logout | q: quit"
    };

    let status = Paragraph::new(Line::from(vec![
        Span::styled(
            format!(" {} ", mode),
            Style::default().bg(mode_color).fg(Color::White),
        ),
        Span::raw(" "),
        Span::styled(hints, Style::default().fg(Color::DarkGray)),
    ]));

    f.render_widget(status, area);
}

fn draw_input_popup(f: &mut Frame, title: &str, value: &str, masked: bool) {
    let area = centered_rect(60, 20, f.area());
    f.render_widget(Clear, area);

    let shown = if masked {
        "*".repeat(value.chars().count())
    } else {
        value.to_string()
    };
    let block = Block::default()
        .title(format!(" {} ", title))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    let inner = block.inner(area);
    f.render_widget(Paragraph::new(shown.as_str()).block(block), area);
    f.set_cursor_position((inner.x + shown.chars().count() as u16, inner.y));
}

fn draw_prompt(f: &mut Frame, app: &App, prompt: &Prompt) {
    match prompt {
        Prompt::Search(input) => draw_input_popup(f, "Search username", input, false),
        Prompt::Password(input) => draw_input_popup(f, "New password", input, true),
        Prompt::BanReason(input) => draw_input_popup(f, "Ban reason (optional)", input, false),
        Prompt::UploadPath(field, input) => {
            let title = format!("{} image path (JPG/PNG/WEBP/GIF)", field.label());
            draw_input_popup(f, &title, input, false)
        }
        Prompt::CreateUser {
            username,
            password,
            field,
        } => draw_create_user_popup(f, username, password, *field),
        Prompt::ConfirmDelete => draw_delete_confirm_popup(f, app),
    }
}

fn draw_create_user_popup(f: &mut Frame, username: &str, password: &str, field: InputField) {
    let area = centered_rect(50, 30, f.area());
    f.render_widget(Clear, area);

    let block = Block::default()
        .title(" New User ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3), // Username
            Constraint::Length(3), // Password
            Constraint::Length(1), // Hint
            Constraint::Min(0),
        ])
        .split(inner);

    let style = |which: InputField| {
        if which == field {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default().fg(Color::Gray)
        }
    };

    f.render_widget(
        Paragraph::new(username).block(
            Block::default()
                .title(" Username ")
                .borders(Borders::ALL)
                .border_style(style(InputField::Username)),
        ),
        chunks[0],
    );
    f.render_widget(
        Paragraph::new("*".repeat(password.chars().count())).block(
            Block::default()
                .title(" Password ")
                .borders(Borders::ALL)
                .border_style(style(InputField::Password)),
        ),
        chunks[1],
    );
    f.render_widget(
        Paragraph::new("Tab: switch field | Enter: create | Esc: cancel")
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center),
        chunks[2],
    );
}

fn draw_delete_confirm_popup(f: &mut Frame, app: &App) {
    let area = centered_rect(50, 20, f.area());

    f.render_widget(Clear, area);

    let username = app
        .list
        .expanded_user()
        .map(|u| u.username.as_str())
        .unwrap_or("Unknown");

    let block = Block::default()
        .title(" Confirm Delete ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red));

    let inner = block.inner(area);
    f.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(2), // Message
            Constraint::Length(2), // Hint
            Constraint::Min(0),    // Spacer
        ])
        .split(inner);

    let message = Paragraph::new(vec![
        Line::from(Span::raw("Delete user:")),
        Line::from(Span::styled(
            format!("\"{}\"", username),
            Style::default().fg(Color::Yellow),
        )),
    ])
    .alignment(Alignment::Center);
    f.render_widget(message, chunks[0]);

    let hint = Paragraph::new("y: yes, delete | n: no, cancel")
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Center);
    f.render_widget(hint, chunks[1]);
}

fn draw_bio_editor(f: &mut Frame, app: &App) {
    let Some(textarea) = app.bio_editor.as_ref() else {
        return;
    };

    let area = centered_rect(70, 60, f.area());
    f.render_widget(Clear, area);

    let chars = textarea.lines().iter().map(|l| l.chars().count()).sum::<usize>()
        + textarea.lines().len().saturating_sub(1);
    let block = Block::default()
        .title(format!(" Bio ({}/{}) ", chars, roster_shared::BIO_MAX_CHARS))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Green));
    let inner = block.inner(area);
    f.render_widget(block, area);
    f.render_widget(textarea, inner);
}

fn draw_loading(f: &mut Frame, message: &str) {
    let area = f.area();

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    f.render_widget(block, area);

    let text = Paragraph::new(message)
        .style(Style::default().fg(Color::Yellow))
        .alignment(Alignment::Center);

    let center = centered_rect(50, 20, area);
    f.render_widget(text, center);
}

fn draw_loading_overlay(f: &mut Frame, message: &str) {
    let area = centered_rect(40, 10, f.area());

    f.render_widget(Clear, area);

    let block = Block::default()
        .title(" Loading ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));

    let text = Paragraph::new(message)
        .style(Style::default().fg(Color::Yellow))
        .alignment(Alignment::Center)
        .block(block);

    f.render_widget(text, area);
}

fn draw_error_popup(f: &mut Frame, error: &str) {
    let area = centered_rect(60, 20, f.area());

    f.render_widget(Clear, area);

    let block = Block::default()
        .title(" Error ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red));

    let text = Paragraph::new(error)
        .style(Style::default().fg(Color::Red))
        .wrap(Wrap { trim: true })
        .block(block);

    f.render_widget(text, area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_is_uppercased() {
        assert_eq!(initial("mia"), "M");
        assert_eq!(initial(""), "?");
    }

    #[test]
    fn centered_rect_stays_inside() {
        let outer = Rect::new(0, 0, 100, 50);
        let inner = centered_rect(60, 20, outer);
        assert!(inner.x >= outer.x && inner.right() <= outer.right());
        assert!(inner.y >= outer.y && inner.bottom() <= outer.bottom());
        assert_eq!(inner.width, 60);
    }
}
