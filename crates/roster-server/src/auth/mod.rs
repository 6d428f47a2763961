mod jwt;
mod middleware;
mod password;
mod session;

pub use jwt::{create_access_token, create_refresh_token, verify_access_token};
pub use middleware::{
    admin_middleware, admin_page_middleware, auth_middleware, AuthUser, ACCESS_DENIED_PATH,
    LOGIN_PATH,
};
pub use password::{
    hash_password, validate_password, validate_username, verify_password, MIN_PASSWORD_LEN,
};
pub use session::{with_session, without_session, SESSION_COOKIE};
