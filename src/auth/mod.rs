//! Bearer-token authentication and role-based route guards.
//!
//! - `token` issues and verifies signed tokens carrying identity and role
//! - `guard` turns a request into verified claims and checks allowed roles
//! - `password` hashes and verifies stored credentials

pub mod guard;
pub mod password;
pub mod token;

pub use guard::{authenticate, authorize, COMPANY_ONLY, STAFF_ROLES, STUDENT_ONLY};
pub use token::{Claims, TokenError, TokenService};
