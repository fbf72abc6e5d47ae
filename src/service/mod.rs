//! Service layer
//!
//! Contains business logic separated from HTTP handlers.
//! Services orchestrate database and token operations.

mod account;
mod profile;

pub use account::{AccountService, AccountUpdate, Credentials, Registration, is_valid_email};
pub use profile::{ProfileService, ProfileView};
