mod ban;
mod stats;
mod user;

pub use ban::*;
pub use stats::*;
pub use user::*;
