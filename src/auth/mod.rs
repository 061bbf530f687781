//! Credential handling: argon2 password hashing, HS256 bearer tokens, the
//! capability table and the extractor that resolves a request to its caller.

pub mod extract;
pub mod password;
pub mod rbac;
pub mod token;

pub use extract::CurrentUser;
pub use rbac::Action;
