//! Authentication
//!
//! Handles:
//! - Identity token issuance and validation
//! - Per-route access policy
//! - Authentication middleware and extractors
//! - Password hashing

mod middleware;
pub mod password;
mod policy;
pub mod token;

pub use middleware::{CurrentUser, MaybeUser, authenticate};
pub use policy::{AccessDecision, AccessPolicy, Identity};
pub use token::{Claims, TokenService};
