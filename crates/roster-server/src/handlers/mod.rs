pub mod actions;
pub mod admin_page;
pub mod auth;
pub mod login_links;
pub mod profile;
pub mod session;
pub mod uploads;
