mod actions;
mod auth;
mod patch;
mod users;

pub use actions::*;
pub use auth::*;
pub use users::*;
