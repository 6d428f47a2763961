pub mod api;
pub mod models;
pub mod paging;

pub use models::*;
