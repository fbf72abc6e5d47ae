//! API request and response DTOs
//!
//! Every body is wrapped in a single-key envelope: `{"user": ...}` or
//! `{"profile": ...}`.

use axum::extract::FromRequest;
use serde::{Deserialize, Serialize};

use crate::data::Account;
use crate::error::AppError;
use crate::service::{AccountUpdate, Credentials, ProfileView, Registration};

/// JSON body extractor whose rejection renders as a 422 field error
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// User as seen by its owner, with the token for this session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub email: String,
    pub username: String,
    pub token: String,
    pub bio: String,
    pub image: String,
}

impl UserResponse {
    pub fn new(account: Account, token: String) -> Self {
        Self {
            email: account.email,
            username: account.username,
            token,
            bio: account.bio,
            image: account.image,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserEnvelope {
    pub user: UserResponse,
}

impl From<UserResponse> for UserEnvelope {
    fn from(user: UserResponse) -> Self {
        Self { user }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileEnvelope {
    pub profile: ProfileView,
}

impl From<ProfileView> for ProfileEnvelope {
    fn from(profile: ProfileView) -> Self {
        Self { profile }
    }
}

/// `{"user": {...}}` request wrapper; a missing `user` key reads as an empty object
#[derive(Debug, Deserialize)]
pub struct RequestEnvelope<T: Default> {
    #[serde(default)]
    pub user: T,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub password: String,
}

impl From<RegisterRequest> for Registration {
    fn from(req: RegisterRequest) -> Self {
        Registration {
            email: req.email,
            username: req.username,
            password: req.password,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl From<LoginRequest> for Credentials {
    fn from(req: LoginRequest) -> Self {
        Credentials {
            email: req.email,
            password: req.password,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub bio: Option<String>,
    pub image: Option<String>,
}

impl From<UpdateUserRequest> for AccountUpdate {
    fn from(req: UpdateUserRequest) -> Self {
        AccountUpdate {
            email: req.email,
            username: req.username,
            password: req.password,
            bio: req.bio,
            image: req.image,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_deserialize_as_empty() {
        let req: RequestEnvelope<RegisterRequest> =
            serde_json::from_str(r#"{"user":{"email":"a@x.com"}}"#).unwrap();
        assert_eq!(req.user.email, "a@x.com");
        assert_eq!(req.user.username, "");

        let req: RequestEnvelope<LoginRequest> = serde_json::from_str("{}").unwrap();
        assert_eq!(req.user.email, "");
    }

    #[test]
    fn update_distinguishes_absent_from_empty() {
        let req: RequestEnvelope<UpdateUserRequest> =
            serde_json::from_str(r#"{"user":{"bio":""}}"#).unwrap();
        assert_eq!(req.user.bio.as_deref(), Some(""));
        assert!(req.user.image.is_none());
    }

    #[test]
    fn user_response_never_carries_password_hash() {
        let account = Account::new(
            "a@x.com".to_string(),
            "alice".to_string(),
            "$2b$hash".to_string(),
        );
        let json = serde_json::to_value(UserEnvelope::from(UserResponse::new(
            account,
            "tok".to_string(),
        )))
        .unwrap();
        let user = json["user"].as_object().unwrap();
        assert_eq!(user.len(), 5);
        assert_eq!(user["token"], "tok");
        assert!(!json.to_string().contains("$2b$hash"));
    }
}
