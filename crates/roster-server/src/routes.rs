use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, services::ServeDir, trace::TraceLayer,
};

use crate::auth::{admin_middleware, admin_page_middleware, auth_middleware};
use crate::db::SchemaGuard;
use crate::handlers::{
    actions, admin_page, auth as auth_handlers, login_links, profile, session, uploads,
};
use crate::media::MediaStore;
use crate::{Config, DbPool};

/// Room for the multipart framing around the largest image.
pub const UPLOAD_BODY_LIMIT: usize = 11 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: Config,
    pub media: MediaStore,
    pub schema: SchemaGuard,
}

pub fn create_router(db: DbPool, config: Config) -> Router {
    let media = MediaStore::new(config.media_root.clone(), &config.media_url_prefix);
    let media_prefix = media.url_prefix().to_string();
    let serve_media = ServeDir::new(media.root());
    let state = AppState {
        db,
        config,
        media,
        schema: SchemaGuard::default(),
    };

    // Public auth routes (no middleware)
    let public_auth_routes = Router::new()
        .route("/login", post(auth_handlers::login))
        .route("/refresh", post(auth_handlers::refresh));

    // Protected auth routes (need auth)
    let protected_auth_routes = Router::new()
        .route("/logout", post(auth_handlers::logout))
        .route("/me", get(auth_handlers::me))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let auth_routes = Router::new()
        .merge(public_auth_routes)
        .merge(protected_auth_routes);

    // Admin JSON API
    let upload_routes = Router::new()
        .route("/user/upload", post(uploads::upload_avatar))
        .route("/user/banner", post(uploads::upload_banner))
        .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT));

    let admin_api_routes = Router::new()
        .route("/users", get(admin_page::list_users))
        .route("/user/profile", post(profile::update_profile))
        .route("/user/login-link", post(login_links::create_link))
        .merge(upload_routes)
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            admin_middleware,
        ));

    // Admin page and its form actions
    let admin_page_routes = Router::new()
        .route("/admin/user", get(admin_page::admin_user_page))
        .route("/admin/actions/create-user", post(actions::create_user))
        .route("/admin/actions/update-role", post(actions::update_role))
        .route("/admin/actions/update-password", post(actions::update_password))
        .route("/admin/actions/delete-user", post(actions::delete_user))
        .route("/admin/actions/reset-poll", post(actions::reset_poll))
        .route("/admin/actions/ban-user", post(actions::ban_user))
        .route("/admin/actions/unban-user", post(actions::unban_user))
        .route("/admin/actions/ban-ip", post(actions::ban_ip))
        .route("/admin/actions/unban-ip", post(actions::unban_ip))
        .route("/admin/actions/login-link", post(actions::login_link))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            admin_page_middleware,
        ));

    // Browser sign-in
    let session_routes = Router::new()
        .route("/", get(session::home))
        .route("/login", get(session::login_page).post(session::login_submit))
        .route("/logout", post(session::logout))
        .route("/access-denied", get(session::access_denied))
        .route("/login/link/:token", get(session::redeem_login_link));

    Router::new()
        .route("/health", get(health_check))
        .route("/api/users/public", get(profile::get_public_profile))
        .nest("/api/v1/auth", auth_routes)
        .nest("/api/admin", admin_api_routes)
        .merge(admin_page_routes)
        .merge(session_routes)
        .nest_service(&media_prefix, serve_media)
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
