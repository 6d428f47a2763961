pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod media;
pub mod routes;
pub mod views;

pub use config::Config;
pub use db::DbPool;
