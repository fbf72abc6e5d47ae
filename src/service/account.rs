//! Account service
//!
//! Registration, login and self-service updates of account records.

use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;

use crate::auth::TokenService;
use crate::auth::password::{hash_password, verify_password};
use crate::data::{Account, AccountPatch, Database};
use crate::error::{AppError, FieldErrors};

lazy_static! {
    static ref EMAIL_PATTERN: Regex =
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles");
}

/// Used to spend a bcrypt verification when the email is unknown.
static DUMMY_PASSWORD_HASH: tokio::sync::OnceCell<String> = tokio::sync::OnceCell::const_new();

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_PATTERN.is_match(email)
}

const REQUIRED: &str = "is required";
const INVALID_EMAIL: &str = "is not a valid email address";

/// Registration input; missing fields arrive as empty strings
#[derive(Debug, Clone, Default)]
pub struct Registration {
    pub email: String,
    pub username: String,
    pub password: String,
}

impl Registration {
    /// Collect every field error, not just the first
    pub fn validate(&self) -> Result<(), AppError> {
        let mut errors = FieldErrors::new();
        if self.email.trim().is_empty() {
            errors.insert("email".to_string(), REQUIRED.to_string());
        } else if !is_valid_email(self.email.trim()) {
            errors.insert("email".to_string(), INVALID_EMAIL.to_string());
        }
        if self.username.trim().is_empty() {
            errors.insert("username".to_string(), REQUIRED.to_string());
        }
        if self.password.is_empty() {
            errors.insert("password".to_string(), REQUIRED.to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(errors))
        }
    }
}

/// Login input
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn validate(&self) -> Result<(), AppError> {
        let mut errors = FieldErrors::new();
        if self.email.trim().is_empty() {
            errors.insert("email".to_string(), REQUIRED.to_string());
        }
        if self.password.is_empty() {
            errors.insert("password".to_string(), REQUIRED.to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(errors))
        }
    }
}

/// Sparse self-service update; `None` leaves the field as is
#[derive(Debug, Clone, Default)]
pub struct AccountUpdate {
    pub email: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub bio: Option<String>,
    pub image: Option<String>,
}

impl AccountUpdate {
    pub fn is_empty(&self) -> bool {
        self.email.is_none()
            && self.username.is_none()
            && self.password.is_none()
            && self.bio.is_none()
            && self.image.is_none()
    }

    /// Validate the fields that are present
    ///
    /// bio and image may be set to empty strings to clear them.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.is_empty() {
            return Err(AppError::Unprocessable(
                "At least one field must be provided".to_string(),
            ));
        }

        let mut errors = FieldErrors::new();
        if let Some(email) = &self.email {
            if email.trim().is_empty() {
                errors.insert("email".to_string(), REQUIRED.to_string());
            } else if !is_valid_email(email.trim()) {
                errors.insert("email".to_string(), INVALID_EMAIL.to_string());
            }
        }
        if matches!(&self.username, Some(username) if username.trim().is_empty()) {
            errors.insert("username".to_string(), REQUIRED.to_string());
        }
        if matches!(&self.password, Some(password) if password.is_empty()) {
            errors.insert("password".to_string(), REQUIRED.to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(errors))
        }
    }
}

/// Account service
pub struct AccountService {
    db: Arc<Database>,
    tokens: Arc<TokenService>,
    password_hash_cost: u32,
}

impl AccountService {
    /// Create new account service
    pub fn new(db: Arc<Database>, tokens: Arc<TokenService>, password_hash_cost: u32) -> Self {
        Self {
            db,
            tokens,
            password_hash_cost,
        }
    }

    /// Register a new account and issue its first token
    ///
    /// # Errors
    /// - `Validation` for malformed input
    /// - `Conflict` if the email or username is taken
    pub async fn register(
        &self,
        registration: Registration,
    ) -> Result<(Account, String), AppError> {
        registration.validate()?;

        let password_hash =
            hash_password(registration.password, self.password_hash_cost).await?;
        let account = Account::new(
            registration.email.trim().to_string(),
            registration.username.trim().to_string(),
            password_hash,
        );
        self.db.insert_account(&account).await?;

        let token = self.tokens.issue(&account.id)?;

        crate::metrics::ACCOUNTS_REGISTERED_TOTAL.inc();
        tracing::info!(
            account_id = %account.id,
            username = %account.username,
            "Account registered"
        );

        Ok((account, token))
    }

    /// Log in with email and password
    ///
    /// Unknown email and wrong password both return `InvalidCredentials`
    /// after the same amount of hashing work.
    pub async fn login(&self, credentials: Credentials) -> Result<(Account, String), AppError> {
        credentials.validate()?;

        let account = self.db.get_account_by_email(credentials.email.trim()).await?;
        let Some(account) = account else {
            let dummy_hash = DUMMY_PASSWORD_HASH
                .get_or_try_init(|| {
                    hash_password("dummy-password".to_string(), self.password_hash_cost)
                })
                .await?;
            verify_password(credentials.password, dummy_hash.clone()).await?;

            crate::metrics::LOGINS_TOTAL
                .with_label_values(&["failure"])
                .inc();
            tracing::debug!("Login failed: unknown email");
            return Err(AppError::InvalidCredentials);
        };

        if !verify_password(credentials.password, account.password_hash.clone()).await? {
            crate::metrics::LOGINS_TOTAL
                .with_label_values(&["failure"])
                .inc();
            tracing::debug!(account_id = %account.id, "Login failed: wrong password");
            return Err(AppError::InvalidCredentials);
        }

        let token = self.tokens.issue(&account.id)?;
        crate::metrics::LOGINS_TOTAL
            .with_label_values(&["success"])
            .inc();

        Ok((account, token))
    }

    /// Get the account behind a validated identity
    pub async fn current(&self, account_id: &str) -> Result<Account, AppError> {
        self.db
            .get_account_by_id(account_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    /// Apply a sparse update and return the re-fetched account
    ///
    /// The password is re-hashed only when provided. Tokens are not reissued.
    pub async fn update(
        &self,
        account_id: &str,
        update: AccountUpdate,
    ) -> Result<Account, AppError> {
        update.validate()?;

        let password_hash = match update.password {
            Some(password) => Some(hash_password(password, self.password_hash_cost).await?),
            None => None,
        };
        let patch = AccountPatch {
            email: update.email.map(|email| email.trim().to_string()),
            username: update.username.map(|username| username.trim().to_string()),
            password_hash,
            bio: update.bio,
            image: update.image,
        };

        let updated = self
            .db
            .patch_account(account_id, &patch, chrono::Utc::now())
            .await?;
        if !updated {
            return Err(AppError::NotFound("User not found".to_string()));
        }

        tracing::info!(account_id = %account_id, "Account updated");
        self.current(account_id).await
    }
}
