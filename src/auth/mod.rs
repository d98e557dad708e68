//! Password verification, signed-cookie sessions and route guards.

pub mod guard;
pub mod middleware;
pub mod password;
pub mod session;

pub use guard::{Guard, GuardOutcome};
pub use middleware::{load_session, AppState};
pub use password::{hash_password, verify_password};
pub use session::Session;
