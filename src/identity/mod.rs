//! Stateless session authentication for the waypoint API.
//! Keep the public surface thin and split implementation across sub-modules.

mod principal;
mod session;
mod cookie;
mod middleware;

pub use principal::Subject;
pub use session::{AuthError, SessionAuthenticator, SESSION_LIFETIME_SECS, MIN_SECRET_LEN};
pub use cookie::{SESSION_COOKIE, parse_cookie};
pub use middleware::require_session;
