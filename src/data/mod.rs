//! Data layer module
//!
//! Handles all data persistence:
//! - Accounts (credential store)
//! - Follow edges (relationship store)

mod database;
mod models;

pub use database::Database;
pub use models::*;
