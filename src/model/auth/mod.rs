mod session;
mod throttle;
mod token;

pub use session::Session;
pub use throttle::LoginThrottle;
pub use token::{AuthToken, AUTH_TOKEN_COOKIE};
