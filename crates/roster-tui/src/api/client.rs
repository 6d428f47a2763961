use std::path::Path;

use anyhow::Context;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use reqwest::{header::LOCATION, multipart, redirect, Client, StatusCode};
use roster_shared::{
    api::{
        AuthResponse, BanUserForm, CreateUserForm, ErrorResponse, LoginLinkRequest,
        LoginLinkResponse, LoginRequest, ProfileUpdateRequest, PublicProfileResponse,
        RefreshRequest, UnbanUserForm, UpdatePasswordForm, UpdateRoleForm,
        UploadResponse, UserIdForm, UserListParams, UserPageResponse,
    },
    Account, Role,
};
use serde::{de::DeserializeOwned, Serialize};

use super::auth::AuthTokens;

/// JWT payload claims we need for expiry checking
#[derive(serde::Deserialize)]
struct JwtClaims {
    exp: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Not authenticated")]
    Unauthorized,
    #[error("Access forbidden: {0}")]
    Forbidden(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("{0}")]
    Rejected(String),
    #[error("Server error: {0}")]
    Server(String),
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl ApiError {
    /// Message written by the server for this failure, if there was one.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Forbidden(msg) | Self::NotFound(msg) | Self::Rejected(msg)
                if !msg.is_empty() =>
            {
                Some(msg)
            }
            _ => None,
        }
    }
}

/// Extracts `error` from a JSON error body, falling back to the raw text.
fn error_text(body: &str) -> String {
    serde_json::from_str::<ErrorResponse>(body)
        .map(|e| e.error)
        .unwrap_or_else(|_| body.trim().to_string())
}

/// Outcome of a form action, read from the redirect it answers with.
fn action_outcome(location: &str) -> Result<String, ApiError> {
    let path = location.split('?').next().unwrap_or("");
    match path {
        "/login" => return Err(ApiError::Unauthorized),
        "/access-denied" => return Err(ApiError::Forbidden(String::new())),
        _ => {}
    }

    let query = location.split_once('?').map(|(_, q)| q).unwrap_or("");
    let mut notice = None;
    for pair in query.split('&') {
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };
        let value = urlencoding::decode(&value.replace('+', " "))
            .map(|v| v.into_owned())
            .unwrap_or_else(|_| value.to_string());
        match key {
            "error" => return Err(ApiError::Rejected(value)),
            "notice" => notice = Some(value),
            _ => {}
        }
    }

    Ok(notice.unwrap_or_else(|| "Done".to_string()))
}

fn image_content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "application/octet-stream",
    }
}

pub struct ApiClient {
    client: Client,
    base_url: String,
    tokens: Option<AuthTokens>,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        // Form actions answer with redirects that carry their result.
        let client = Client::builder()
            .redirect(redirect::Policy::none())
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            tokens: None,
        }
    }

    /// Load tokens from disk
    pub fn load_tokens(&mut self) -> anyhow::Result<bool> {
        self.tokens = AuthTokens::load()?;
        Ok(self.tokens.is_some())
    }

    /// Check if authenticated
    pub fn is_authenticated(&self) -> bool {
        self.tokens.is_some()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build URL for endpoint
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn auth_header(&self) -> Option<String> {
        self.tokens
            .as_ref()
            .map(|t| format!("Bearer {}", t.access_token))
    }

    /// Decode JWT payload and extract expiration time
    fn decode_token_exp(token: &str) -> Option<i64> {
        let parts: Vec<&str> = token.split('.').collect();
        if parts.len() != 3 {
            return None;
        }

        let payload = URL_SAFE_NO_PAD.decode(parts[1]).ok()?;
        let claims: JwtClaims = serde_json::from_slice(&payload).ok()?;

        Some(claims.exp)
    }

    /// Check if the access token is expiring soon (within 60 seconds)
    fn is_token_expiring_soon(&self) -> bool {
        let Some(tokens) = &self.tokens else {
            return true;
        };

        let Some(exp) = Self::decode_token_exp(&tokens.access_token) else {
            return false;
        };

        let now = chrono::Utc::now().timestamp();
        exp < now + 60
    }

    /// Ensure we have a valid token, refreshing if needed, and return the header value.
    async fn valid_auth_header(&mut self) -> Result<String, ApiError> {
        if !self.is_authenticated() {
            return Err(ApiError::Unauthorized);
        }

        if self.is_token_expiring_soon() && self.refresh().await.is_err() {
            return Err(ApiError::Unauthorized);
        }

        self.auth_header().ok_or(ApiError::Unauthorized)
    }

    // ============ Authenticated Request Helpers ============

    async fn authed_get<Q: Serialize + ?Sized>(
        &mut self,
        path: &str,
        query: &Q,
    ) -> Result<reqwest::Response, ApiError> {
        let auth = self.valid_auth_header().await?;
        self.client
            .get(self.url(path))
            .header("Authorization", auth)
            .query(query)
            .send()
            .await
            .map_err(ApiError::Network)
    }

    async fn authed_post<T: Serialize>(
        &mut self,
        path: &str,
        body: &T,
    ) -> Result<reqwest::Response, ApiError> {
        let auth = self.valid_auth_header().await?;
        self.client
            .post(self.url(path))
            .header("Authorization", auth)
            .json(body)
            .send()
            .await
            .map_err(ApiError::Network)
    }

    async fn authed_multipart(
        &mut self,
        path: &str,
        form: multipart::Form,
    ) -> Result<reqwest::Response, ApiError> {
        let auth = self.valid_auth_header().await?;
        self.client
            .post(self.url(path))
            .header("Authorization", auth)
            .multipart(form)
            .send()
            .await
            .map_err(ApiError::Network)
    }

    /// Posts a form action and reads its redirect.
    async fn submit_action<T: Serialize>(
        &mut self,
        action: &str,
        form: &T,
    ) -> Result<String, ApiError> {
        let auth = self.valid_auth_header().await?;
        let response = self
            .client
            .post(self.url(&format!("/admin/actions/{}", action)))
            .header("Authorization", auth)
            .form(form)
            .send()
            .await?;

        if response.status().is_redirection() {
            let location = response
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("");
            tracing::debug!(action, location, "Form action answered");
            return action_outcome(location);
        }

        self.handle_empty_response(response).await?;
        Ok("Done".to_string())
    }

    async fn failure(response: reqwest::Response) -> ApiError {
        let status = response.status();
        let text = error_text(&response.text().await.unwrap_or_default());

        match status {
            StatusCode::UNAUTHORIZED => ApiError::Unauthorized,
            StatusCode::FORBIDDEN => ApiError::Forbidden(text),
            StatusCode::NOT_FOUND => ApiError::NotFound(text),
            s if s.is_client_error() => ApiError::Rejected(text),
            _ => ApiError::Server(format!("{}: {}", status, text)),
        }
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        if response.status().is_success() {
            response.json().await.map_err(ApiError::Network)
        } else {
            Err(Self::failure(response).await)
        }
    }

    async fn handle_empty_response(&self, response: reqwest::Response) -> Result<(), ApiError> {
        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::failure(response).await)
        }
    }

    fn store_tokens(&mut self, auth: AuthResponse) -> Result<(), ApiError> {
        let tokens = AuthTokens {
            access_token: auth.access_token,
            refresh_token: auth.refresh_token,
            user_id: auth.user_id,
        };
        tokens.save().map_err(ApiError::Other)?;
        self.tokens = Some(tokens);
        Ok(())
    }

    // ============ Auth ============

    pub async fn login(&mut self, username: &str, password: &str) -> Result<Account, ApiError> {
        let req = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };

        let response = self
            .client
            .post(self.url("/api/v1/auth/login"))
            .json(&req)
            .send()
            .await?;

        let auth: AuthResponse = self.handle_response(response).await?;
        self.store_tokens(auth)?;

        self.me().await
    }

    pub async fn logout(&mut self) -> Result<(), ApiError> {
        if let Some(ref auth) = self.auth_header() {
            let _ = self
                .client
                .post(self.url("/api/v1/auth/logout"))
                .header("Authorization", auth)
                .send()
                .await;
        }

        self.tokens = None;
        AuthTokens::delete().map_err(ApiError::Other)?;
        Ok(())
    }

    pub async fn refresh(&mut self) -> Result<(), ApiError> {
        let refresh_token = self
            .tokens
            .as_ref()
            .map(|t| t.refresh_token.clone())
            .ok_or(ApiError::Unauthorized)?;

        let req = RefreshRequest { refresh_token };

        let response = self
            .client
            .post(self.url("/api/v1/auth/refresh"))
            .json(&req)
            .send()
            .await?;

        let auth: AuthResponse = self.handle_response(response).await?;
        self.store_tokens(auth)
    }

    pub async fn me(&mut self) -> Result<Account, ApiError> {
        let response = self.authed_get("/api/v1/auth/me", &()).await?;
        self.handle_response(response).await
    }

    // ============ Users ============

    pub async fn list_users(
        &mut self,
        params: &UserListParams,
    ) -> Result<UserPageResponse, ApiError> {
        let response = self.authed_get("/api/admin/users", params).await?;
        self.handle_response(response).await
    }

    pub async fn public_profile(&self, user_id: i64) -> Result<PublicProfileResponse, ApiError> {
        let response = self
            .client
            .get(self.url("/api/users/public"))
            .query(&[("userId", user_id)])
            .send()
            .await?;
        self.handle_response(response).await
    }

    pub async fn save_profile(&mut self, req: &ProfileUpdateRequest) -> Result<(), ApiError> {
        let response = self.authed_post("/api/admin/user/profile", req).await?;
        self.handle_empty_response(response).await
    }

    async fn upload_image(
        &mut self,
        path: &str,
        user_id: i64,
        file: &Path,
    ) -> Result<String, ApiError> {
        let bytes = tokio::fs::read(file)
            .await
            .with_context(|| format!("Could not read {}", file.display()))?;
        let file_name = file
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("image")
            .to_string();

        let part = multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(image_content_type(file))?;
        let form = multipart::Form::new()
            .text("userId", user_id.to_string())
            .part("file", part);

        let response = self.authed_multipart(path, form).await?;
        let uploaded: UploadResponse = self.handle_response(response).await?;
        Ok(uploaded.url)
    }

    pub async fn upload_avatar(&mut self, user_id: i64, file: &Path) -> Result<String, ApiError> {
        self.upload_image("/api/admin/user/upload", user_id, file).await
    }

    pub async fn upload_banner(&mut self, user_id: i64, file: &Path) -> Result<String, ApiError> {
        self.upload_image("/api/admin/user/banner", user_id, file).await
    }

    pub async fn create_login_link(&mut self, user_id: i64) -> Result<LoginLinkResponse, ApiError> {
        let req = LoginLinkRequest { user_id };
        let response = self.authed_post("/api/admin/user/login-link", &req).await?;
        self.handle_response(response).await
    }

    // ============ Form actions ============

    pub async fn create_user(&mut self, form: &CreateUserForm) -> Result<String, ApiError> {
        self.submit_action("create-user", form).await
    }

    pub async fn update_role(&mut self, id: i64, role: Role) -> Result<String, ApiError> {
        let form = UpdateRoleForm {
            id,
            role: role.to_string(),
            return_to: None,
        };
        self.submit_action("update-role", &form).await
    }

    pub async fn update_password(&mut self, id: i64, password: &str) -> Result<String, ApiError> {
        let form = UpdatePasswordForm {
            id,
            password: password.to_string(),
            return_to: None,
        };
        self.submit_action("update-password", &form).await
    }

    pub async fn delete_user(&mut self, id: i64) -> Result<String, ApiError> {
        let form = UserIdForm { id, return_to: None };
        self.submit_action("delete-user", &form).await
    }

    pub async fn reset_poll(&mut self, id: i64) -> Result<String, ApiError> {
        let form = UserIdForm { id, return_to: None };
        self.submit_action("reset-poll", &form).await
    }

    pub async fn ban_user(&mut self, form: &BanUserForm) -> Result<String, ApiError> {
        self.submit_action("ban-user", form).await
    }

    pub async fn unban_user(&mut self, form: &UnbanUserForm) -> Result<String, ApiError> {
        self.submit_action("unban-user", form).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_body_is_unwrapped() {
        assert_eq!(
            error_text(r#"{"error":"File is too large (max 5 MB)"}"#),
            "File is too large (max 5 MB)"
        );
        assert_eq!(error_text("  plain failure \n"), "plain failure");
    }

    #[test]
    fn action_redirect_carries_result() {
        assert_eq!(
            action_outcome("/admin/user?page=2&notice=Role%20changed%20to%20admin").unwrap(),
            "Role changed to admin"
        );

        let err = action_outcome("/admin/user?error=You+cannot+ban+yourself").unwrap_err();
        assert_eq!(err.server_message(), Some("You cannot ban yourself"));

        assert!(matches!(action_outcome("/login"), Err(ApiError::Unauthorized)));
        assert!(matches!(
            action_outcome("/access-denied"),
            Err(ApiError::Forbidden(_))
        ));
    }

    #[test]
    fn content_type_follows_extension() {
        assert_eq!(image_content_type(Path::new("/tmp/a.JPG")), "image/jpeg");
        assert_eq!(image_content_type(Path::new("b.webp")), "image/webp");
        assert_eq!(
            image_content_type(Path::new("notes.txt")),
            "application/octet-stream"
        );
    }

    #[test]
    fn token_expiry_is_read_from_payload() {
        let payload = URL_SAFE_NO_PAD.encode(r#"{"sub":1,"exp":1700000000}"#);
        let token = format!("h.{}.s", payload);
        assert_eq!(ApiClient::decode_token_exp(&token), Some(1700000000));
        assert_eq!(ApiClient::decode_token_exp("nope"), None);
    }
}
