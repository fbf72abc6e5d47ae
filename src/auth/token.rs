//! Identity tokens
//!
//! Stateless HS256 JWTs carrying exactly `sub`, `iat` and `exp`.
//! No server-side storage or revocation list.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::AppError;

type HmacSha256 = Hmac<Sha256>;

/// `{"alg":"HS256","typ":"JWT"}`
const HEADER: &str = r#"{"alg":"HS256","typ":"JWT"}"#;

#[derive(Debug, Deserialize)]
struct Header {
    alg: String,
}

/// Token payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Account id
    pub sub: String,
    /// Issued at (unix seconds)
    pub iat: i64,
    /// Expires at (unix seconds)
    pub exp: i64,
}

/// Issues and validates identity tokens with a process-wide secret
#[derive(Clone)]
pub struct TokenService {
    secret: Vec<u8>,
    ttl: Duration,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    pub fn new(secret: impl Into<Vec<u8>>, ttl: Duration) -> Self {
        Self {
            secret: secret.into(),
            ttl,
        }
    }

    pub fn from_config(config: &crate::config::AuthConfig) -> Self {
        Self::new(
            config.token_secret.as_bytes(),
            Duration::seconds(config.token_ttl_seconds),
        )
    }

    fn mac(&self) -> Result<HmacSha256, AppError> {
        HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("invalid token secret: {e}")))
    }

    /// Issue a token for `account_id`, valid from now for the configured TTL
    pub fn issue(&self, account_id: &str) -> Result<String, AppError> {
        self.issue_at(account_id, Utc::now())
    }

    /// Issue a token as if the current time were `now`
    ///
    /// Token format: base64(header).base64(claims).base64(hmac_sha256)
    pub fn issue_at(&self, account_id: &str, now: DateTime<Utc>) -> Result<String, AppError> {
        let claims = Claims {
            sub: account_id.to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        let claims_json =
            serde_json::to_vec(&claims).map_err(|e| AppError::Internal(e.into()))?;
        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(HEADER),
            URL_SAFE_NO_PAD.encode(claims_json)
        );

        let mut mac = self.mac()?;
        mac.update(signing_input.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        Ok(format!("{signing_input}.{signature}"))
    }

    /// Validate a token and return its subject
    ///
    /// Malformed, badly signed and expired tokens all yield `None`.
    pub fn validate(&self, token: &str) -> Option<String> {
        self.validate_at(token, Utc::now())
    }

    pub fn validate_at(&self, token: &str, now: DateTime<Utc>) -> Option<String> {
        self.decode(token, now).map(|claims| claims.sub)
    }

    fn decode(&self, token: &str, now: DateTime<Utc>) -> Option<Claims> {
        let mut parts = token.split('.');
        let (header_b64, claims_b64, signature_b64) =
            match (parts.next(), parts.next(), parts.next(), parts.next()) {
                (Some(header), Some(claims), Some(signature), None) => (header, claims, signature),
                _ => return None,
            };

        // Signature first; nothing in the payload is trusted before this.
        let signature = URL_SAFE_NO_PAD.decode(signature_b64).ok()?;
        let mut mac = self.mac().ok()?;
        mac.update(header_b64.as_bytes());
        mac.update(b".");
        mac.update(claims_b64.as_bytes());
        mac.verify_slice(&signature).ok()?;

        let header: Header =
            serde_json::from_slice(&URL_SAFE_NO_PAD.decode(header_b64).ok()?).ok()?;
        if header.alg != "HS256" {
            return None;
        }

        let claims: Claims =
            serde_json::from_slice(&URL_SAFE_NO_PAD.decode(claims_b64).ok()?).ok()?;
        if claims.sub.is_empty() || now.timestamp() >= claims.exp {
            return None;
        }

        Some(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new("test-secret-key-32-bytes-long!!!", Duration::hours(24))
    }

    #[test]
    fn issued_token_validates_to_subject() {
        let tokens = service();
        let token = tokens.issue("01ARZ3NDEKTSV4RRFFQ69G5FAV").unwrap();
        assert_eq!(
            tokens.validate(&token).as_deref(),
            Some("01ARZ3NDEKTSV4RRFFQ69G5FAV")
        );
    }

    #[test]
    fn token_has_three_claims_and_24h_window() {
        let tokens = service();
        let now = Utc::now();
        let token = tokens.issue_at("account-1", now).unwrap();

        let claims_b64 = token.split('.').nth(1).unwrap();
        let claims: serde_json::Value =
            serde_json::from_slice(&URL_SAFE_NO_PAD.decode(claims_b64).unwrap()).unwrap();
        let object = claims.as_object().unwrap();
        assert_eq!(object.len(), 3);
        assert_eq!(claims["sub"], "account-1");
        assert_eq!(claims["iat"], now.timestamp());
        assert_eq!(claims["exp"], now.timestamp() + 24 * 60 * 60);
    }

    #[test]
    fn token_expires_after_window() {
        let tokens = service();
        let issued = Utc::now() - Duration::hours(25);
        let token = tokens.issue_at("account-1", issued).unwrap();

        assert!(tokens.validate(&token).is_none());
        assert_eq!(
            tokens
                .validate_at(&token, issued + Duration::hours(23))
                .as_deref(),
            Some("account-1")
        );
        assert!(tokens.validate_at(&token, issued + Duration::hours(24)).is_none());
    }

    #[test]
    fn token_signed_with_other_secret_is_invalid() {
        let other = TokenService::new("another-secret-key-32-bytes-long", Duration::hours(24));
        let token = other.issue("account-1").unwrap();
        assert!(service().validate(&token).is_none());
    }

    #[test]
    fn tampered_claims_are_invalid() {
        let tokens = service();
        let token = tokens.issue("account-1").unwrap();
        let mut parts: Vec<&str> = token.split('.').collect();

        let forged = URL_SAFE_NO_PAD.encode(r#"{"sub":"account-2","iat":0,"exp":9999999999}"#);
        parts[1] = &forged;
        assert!(tokens.validate(&parts.join(".")).is_none());
    }

    #[test]
    fn malformed_tokens_are_invalid() {
        let tokens = service();
        for token in ["", "BadToken", "a.b", "a.b.c", "a.b.c.d", "...."] {
            assert!(tokens.validate(token).is_none(), "accepted {token:?}");
        }
    }

    #[test]
    fn non_hs256_header_is_invalid_even_with_valid_mac() {
        let tokens = service();
        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"none","typ":"JWT"}"#);
        let claims = URL_SAFE_NO_PAD.encode(r#"{"sub":"account-1","iat":0,"exp":9999999999}"#);
        let signing_input = format!("{header}.{claims}");

        let mut mac = tokens.mac().unwrap();
        mac.update(signing_input.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        assert!(tokens.validate(&format!("{signing_input}.{signature}")).is_none());
    }
}
