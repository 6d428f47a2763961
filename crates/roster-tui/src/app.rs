use std::path::PathBuf;

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use roster_shared::{
    api::{BanUserForm, CreateUserForm, UnbanUserForm},
    Account, Role,
};
use tokio::sync::mpsc;
use tui_textarea::TextArea;

use crate::api::{ApiClient, ApiError};
use crate::editor;
use crate::list::UserListState;
use crate::profile::{MediaField, ProfileEditor};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    Login,
    VerifyingAuth,
    Users,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VimMode {
    Normal,
    Insert,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputField {
    Username,
    Password,
}

/// Single-line popup currently asking for input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prompt {
    Search(String),
    Password(String),
    ConfirmDelete,
    BanReason(String),
    UploadPath(MediaField, String),
    CreateUser {
        username: String,
        password: String,
        field: InputField,
    },
}

#[derive(Debug)]
pub enum AppEvent {
    Key(KeyEvent),
    Tick,
    VerifyAuth,
    AuthSuccess,
    AuthFailed(String),
}

pub struct App {
    pub api: ApiClient,
    pub view: View,
    pub vim_mode: VimMode,

    // Loading state
    pub loading: bool,
    pub loading_message: String,
    pub error_message: Option<String>,
    /// Last action notice, shown in the status bar.
    pub notice: Option<String>,
    pub needs_terminal_clear: bool,

    // Current account
    pub account: Option<Account>,

    // Login form
    pub login_username: String,
    pub login_password: String,
    pub login_field: InputField,

    // User list
    pub list: UserListState,
    pub editor: Option<ProfileEditor>,
    pub prompt: Option<Prompt>,
    pub bio_editor: Option<TextArea<'static>>,
}

/// Text of an editor failure: what the server said, if anything.
fn editor_failure(err: &ApiError) -> Option<String> {
    err.server_message().map(str::to_string)
}

/// Expands a leading `~/` to the home directory.
fn expand_path(input: &str) -> PathBuf {
    let input = input.trim();
    if let Some(rest) = input.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(input)
}

impl App {
    pub fn new(api: ApiClient, has_tokens: bool) -> Self {
        let view = if has_tokens {
            View::VerifyingAuth
        } else {
            View::Login
        };

        Self {
            api,
            view,
            vim_mode: VimMode::Normal,
            loading: false,
            loading_message: String::new(),
            error_message: None,
            notice: None,
            needs_terminal_clear: false,
            account: None,
            login_username: String::new(),
            login_password: String::new(),
            login_field: InputField::Username,
            list: UserListState::new(),
            editor: None,
            prompt: None,
            bio_editor: None,
        }
    }

    pub fn set_loading(&mut self, loading: bool, message: &str) {
        self.loading = loading;
        self.loading_message = message.to_string();
    }

    pub fn set_error(&mut self, message: String) {
        self.error_message = Some(message);
    }

    pub fn clear_error(&mut self) {
        self.error_message = None;
    }

    /// Reports a failed request. A rejected session sends the user back to login.
    async fn report(&mut self, context: &str, err: ApiError) {
        tracing::warn!(context, error = %err, "Request failed");
        match err {
            ApiError::Unauthorized => {
                self.do_logout().await;
                self.set_error("Your session has expired. Please log in again.".to_string());
            }
            ApiError::Forbidden(_) => {
                self.set_error(format!("{}: admin access required", context));
            }
            other => {
                let message = other
                    .server_message()
                    .map(str::to_string)
                    .unwrap_or_else(|| other.to_string());
                self.set_error(format!("{}: {}", context, message));
            }
        }
    }

    /// Handle key events, returns true if app should quit
    pub async fn handle_key(&mut self, key: KeyEvent, tx: mpsc::Sender<AppEvent>) -> Result<bool> {
        // Clear error on any key press
        if self.error_message.is_some() && key.code != KeyCode::Esc {
            self.clear_error();
        }

        // Global quit with Ctrl+C
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Ok(true);
        }

        match self.view {
            View::Login => self.handle_login_key(key, tx).await,
            View::VerifyingAuth => Ok(false), // No input during verification
            View::Users => self.handle_users_key(key).await,
        }
    }

    async fn handle_login_key(&mut self, key: KeyEvent, tx: mpsc::Sender<AppEvent>) -> Result<bool> {
        if self.loading {
            return Ok(false);
        }

        match key.code {
            KeyCode::Char('q') if self.vim_mode == VimMode::Normal => return Ok(true),
            KeyCode::Esc => {
                if self.vim_mode == VimMode::Insert {
                    self.vim_mode = VimMode::Normal;
                }
            }
            KeyCode::Char('i') if self.vim_mode == VimMode::Normal => {
                self.vim_mode = VimMode::Insert;
            }
            KeyCode::Tab | KeyCode::BackTab => {
                self.login_field = match self.login_field {
                    InputField::Username => InputField::Password,
                    InputField::Password => InputField::Username,
                };
            }
            KeyCode::Char('j') | KeyCode::Down if self.vim_mode == VimMode::Normal => {
                self.login_field = InputField::Password;
            }
            KeyCode::Char('k') | KeyCode::Up if self.vim_mode == VimMode::Normal => {
                self.login_field = InputField::Username;
            }
            KeyCode::Enter => {
                if !self.login_username.is_empty() && !self.login_password.is_empty() {
                    self.do_login(tx).await;
                }
            }
            KeyCode::Char(c) if self.vim_mode == VimMode::Insert => match self.login_field {
                InputField::Username => self.login_username.push(c),
                InputField::Password => self.login_password.push(c),
            },
            KeyCode::Backspace if self.vim_mode == VimMode::Insert => match self.login_field {
                InputField::Username => {
                    self.login_username.pop();
                }
                InputField::Password => {
                    self.login_password.pop();
                }
            },
            _ => {}
        }

        Ok(false)
    }

    async fn do_login(&mut self, tx: mpsc::Sender<AppEvent>) {
        self.set_loading(true, "Logging in...");

        let username = self.login_username.clone();
        let password = self.login_password.clone();

        match self.api.login(&username, &password).await {
            Ok(account) => {
                self.account = Some(account);
                let _ = tx.send(AppEvent::AuthSuccess).await;
            }
            Err(e) => {
                let message = e
                    .server_message()
                    .map(str::to_string)
                    .unwrap_or_else(|| e.to_string());
                let _ = tx.send(AppEvent::AuthFailed(message)).await;
            }
        }

        self.set_loading(false, "");
    }

    async fn do_logout(&mut self) {
        let _ = self.api.logout().await;
        self.account = None;
        self.list = UserListState::new();
        self.editor = None;
        self.prompt = None;
        self.bio_editor = None;
        self.notice = None;
        self.view = View::Login;
    }

    pub async fn verify_auth(&mut self) {
        self.set_loading(true, "Verifying authentication...");

        match self.api.me().await {
            Ok(account) => {
                self.account = Some(account);
                self.enter_users().await;
            }
            Err(_) => {
                // Token invalid, go to login
                let _ = self.api.logout().await;
                self.view = View::Login;
            }
        }

        self.set_loading(false, "");
    }

    pub async fn on_auth_success(&mut self) {
        self.login_password.clear();
        self.vim_mode = VimMode::Normal;
        self.enter_users().await;
    }

    pub fn on_auth_failed(&mut self, msg: String) {
        self.set_error(format!("Login failed: {}", msg));
        self.login_password.clear();
    }

    async fn enter_users(&mut self) {
        let is_admin = self.account.as_ref().is_some_and(|a| a.role.is_admin());
        if !is_admin {
            self.do_logout().await;
            self.set_error("This account does not have admin access.".to_string());
            return;
        }
        self.view = View::Users;
        self.load_users().await;
    }

    async fn load_users(&mut self) {
        self.set_loading(true, "Loading users...");

        let params = self.list.params();
        match self.api.list_users(&params).await {
            Ok(data) => {
                self.list.on_loaded(data);
                if self.list.expanded_id.is_none() {
                    self.editor = None;
                }
            }
            Err(e) => self.report("Failed to load users", e).await,
        }

        self.set_loading(false, "");
    }

    async fn load_profile(&mut self, user_id: i64) {
        let mut editor = ProfileEditor::new(user_id);
        match self.api.public_profile(user_id).await {
            Ok(profile) => editor.on_loaded(profile),
            Err(e) => editor.on_load_failed(
                editor_failure(&e).unwrap_or_else(|| "Could not load profile".to_string()),
            ),
        }
        self.editor = Some(editor);
    }

    // ============ User list ============

    async fn handle_users_key(&mut self, key: KeyEvent) -> Result<bool> {
        if self.loading {
            return Ok(false);
        }
        if self.bio_editor.is_some() {
            self.handle_bio_editor_key(key).await;
            return Ok(false);
        }
        if self.prompt.is_some() {
            self.handle_prompt_key(key).await;
            return Ok(false);
        }

        match key.code {
            KeyCode::Char('q') => return Ok(true),
            KeyCode::Char('L') => self.do_logout().await,
            KeyCode::Char('j') | KeyCode::Down => self.list.move_down(),
            KeyCode::Char('k') | KeyCode::Up => self.list.move_up(),
            KeyCode::Enter => match self.list.toggle_expanded() {
                Some(id) => self.load_profile(id).await,
                None => self.editor = None,
            },
            KeyCode::Char('/') => {
                self.prompt = Some(Prompt::Search(self.list.query.clone()));
            }
            KeyCode::Char('c') => {
                self.list.cycle_class();
                self.load_users().await;
            }
            KeyCode::Char('n') | KeyCode::Right => {
                if self.list.next_page() {
                    self.load_users().await;
                }
            }
            KeyCode::Char('p') | KeyCode::Left => {
                if self.list.prev_page() {
                    self.load_users().await;
                }
            }
            KeyCode::Char('v') => {
                self.list.toggle_compact();
                if self.list.expanded_id.is_none() {
                    self.editor = None;
                }
            }
            KeyCode::Char('r') => self.load_users().await,
            KeyCode::Char('N') => {
                self.prompt = Some(Prompt::CreateUser {
                    username: String::new(),
                    password: String::new(),
                    field: InputField::Username,
                });
            }
            _ => self.handle_row_key(key).await,
        }

        Ok(false)
    }

    /// Keys that act on the open row.
    async fn handle_row_key(&mut self, key: KeyEvent) {
        let Some(user) = self.list.expanded_user().cloned() else {
            return;
        };

        match key.code {
            KeyCode::Char('R') => {
                let role = user.role.next();
                let result = self.api.update_role(user.id, role).await;
                self.finish_action("Role change failed", result).await;
            }
            KeyCode::Char('P') => self.prompt = Some(Prompt::Password(String::new())),
            KeyCode::Char('D') => self.prompt = Some(Prompt::ConfirmDelete),
            KeyCode::Char('V') => {
                let result = self.api.reset_poll(user.id).await;
                self.finish_action("Poll reset failed", result).await;
            }
            KeyCode::Char('G') => match self.api.create_login_link(user.id).await {
                Ok(link) => {
                    self.notice = Some(format!(
                        "Login link for {} (expires {}): {}",
                        user.username,
                        link.expires_at.format("%Y-%m-%d %H:%M UTC"),
                        link.url
                    ));
                }
                Err(e) => self.report("Could not create login link", e).await,
            },
            KeyCode::Char('B') => self.prompt = Some(Prompt::BanReason(String::new())),
            KeyCode::Char('U') => {
                let form = UnbanUserForm {
                    user_id: user.id.to_string(),
                    return_to: None,
                };
                let result = self.api.unban_user(&form).await;
                self.finish_action("Unban failed", result).await;
            }
            KeyCode::Char('e') => {
                if let Some(editor) = self.editor.as_ref().filter(|e| e.is_ready()) {
                    self.bio_editor = Some(editor::create_textarea(&editor.bio));
                }
            }
            KeyCode::Char('a') => {
                self.prompt = Some(Prompt::UploadPath(MediaField::Avatar, String::new()));
            }
            KeyCode::Char('b') => {
                self.prompt = Some(Prompt::UploadPath(MediaField::Banner, String::new()));
            }
            KeyCode::Char('x') => self.remove_media(MediaField::Avatar).await,
            KeyCode::Char('X') => self.remove_media(MediaField::Banner).await,
            KeyCode::Char('s') => self.save_profile().await,
            _ => {}
        }
    }

    /// Shows the outcome of a form action and refreshes the list on success.
    async fn finish_action(&mut self, context: &str, result: Result<String, ApiError>) {
        match result {
            Ok(notice) => {
                self.notice = Some(notice);
                self.load_users().await;
            }
            Err(e) => self.report(context, e).await,
        }
    }

    async fn handle_prompt_key(&mut self, key: KeyEvent) {
        let Some(mut prompt) = self.prompt.take() else {
            return;
        };

        if key.code == KeyCode::Esc {
            return;
        }

        if prompt == Prompt::ConfirmDelete {
            if key.code == KeyCode::Char('y') {
                self.delete_expanded().await;
            }
            return;
        }

        if key.code == KeyCode::Enter {
            self.submit_prompt(prompt).await;
            return;
        }

        match &mut prompt {
            Prompt::Search(input)
            | Prompt::Password(input)
            | Prompt::BanReason(input)
            | Prompt::UploadPath(_, input) => match key.code {
                KeyCode::Char(c) => input.push(c),
                KeyCode::Backspace => {
                    input.pop();
                }
                _ => {}
            },
            Prompt::CreateUser {
                username,
                password,
                field,
            } => match key.code {
                KeyCode::Tab | KeyCode::BackTab => {
                    *field = match *field {
                        InputField::Username => InputField::Password,
                        InputField::Password => InputField::Username,
                    };
                }
                KeyCode::Char(c) => match *field {
                    InputField::Username => username.push(c),
                    InputField::Password => password.push(c),
                },
                KeyCode::Backspace => {
                    match *field {
                        InputField::Username => username.pop(),
                        InputField::Password => password.pop(),
                    };
                }
                _ => {}
            },
            Prompt::ConfirmDelete => {}
        }

        self.prompt = Some(prompt);
    }

    async fn submit_prompt(&mut self, prompt: Prompt) {
        let expanded_id = self.list.expanded_id;

        match prompt {
            Prompt::Search(query) => {
                self.list.set_query(&query);
                self.editor = None;
                self.load_users().await;
            }
            Prompt::Password(password) => {
                let Some(id) = expanded_id else { return };
                let result = self.api.update_password(id, &password).await;
                self.finish_action("Password change failed", result).await;
            }
            Prompt::BanReason(reason) => {
                let Some(id) = expanded_id else { return };
                let reason = reason.trim().to_string();
                let form = BanUserForm {
                    user_id: id.to_string(),
                    reason: (!reason.is_empty()).then_some(reason),
                    expires_at: None,
                    return_to: None,
                };
                let result = self.api.ban_user(&form).await;
                self.finish_action("Ban failed", result).await;
            }
            Prompt::UploadPath(field, path) => self.upload_media(field, &path).await,
            Prompt::CreateUser {
                username, password, ..
            } => {
                let form = CreateUserForm {
                    username,
                    password,
                    role: Role::User.to_string(),
                    class: None,
                    return_to: None,
                };
                let result = self.api.create_user(&form).await;
                self.finish_action("Could not create user", result).await;
            }
            Prompt::ConfirmDelete => {}
        }
    }

    async fn delete_expanded(&mut self) {
        let Some(id) = self.list.expanded_id else {
            return;
        };
        let result = self.api.delete_user(id).await;
        if result.is_ok() {
            self.list.expanded_id = None;
            self.editor = None;
        }
        self.finish_action("Delete failed", result).await;
    }

    // ============ Profile editor ============

    async fn save_profile(&mut self) {
        let Some(req) = self.editor.as_mut().and_then(|e| e.save_request()) else {
            return;
        };
        let result = self
            .api
            .save_profile(&req)
            .await
            .map_err(|e| editor_failure(&e));
        if let Some(editor) = self.editor.as_mut() {
            editor.finish_save(result);
        }
    }

    async fn upload_media(&mut self, field: MediaField, path: &str) {
        let Some(editor) = self.editor.as_mut() else {
            return;
        };
        let user_id = editor.user_id;
        if !editor.begin_upload(field) {
            return;
        }

        let file = expand_path(path);
        let result = match field {
            MediaField::Avatar => self.api.upload_avatar(user_id, &file).await,
            MediaField::Banner => self.api.upload_banner(user_id, &file).await,
        };
        let result = result.map_err(|e| match e {
            ApiError::Other(err) => Some(err.to_string()),
            other => editor_failure(&other),
        });

        if let Some(editor) = self.editor.as_mut() {
            editor.finish_upload(field, result);
        }
    }

    async fn remove_media(&mut self, field: MediaField) {
        let Some(req) = self.editor.as_mut().and_then(|e| e.remove_request(field)) else {
            return;
        };
        let result = self
            .api
            .save_profile(&req)
            .await
            .map_err(|e| editor_failure(&e));
        if let Some(editor) = self.editor.as_mut() {
            editor.finish_remove(field, result);
        }
    }

    async fn handle_bio_editor_key(&mut self, key: KeyEvent) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Esc => self.bio_editor = None,
            KeyCode::Char('s') if ctrl => {
                if let Some(textarea) = self.bio_editor.take() {
                    let bio = editor::textarea_content(&textarea);
                    if let Some(editor) = self.editor.as_mut() {
                        editor.set_bio(bio);
                    }
                }
            }
            KeyCode::Char('e') if ctrl => {
                let Some(textarea) = self.bio_editor.as_ref() else {
                    return;
                };
                let content = editor::textarea_content(textarea);
                match editor::launch_external_editor(&content) {
                    Ok(edited) => self.bio_editor = Some(editor::create_textarea(&edited)),
                    Err(e) => self.set_error(format!("External editor failed: {}", e)),
                }
                self.needs_terminal_clear = true;
            }
            _ => {
                if let Some(textarea) = self.bio_editor.as_mut() {
                    textarea.input(key);
                }
            }
        }
    }
}
