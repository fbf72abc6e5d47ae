//! Authentication middleware
//!
//! Runs the access policy on every routed request and exposes the
//! resulting viewer identity to handlers.

use axum::{
    async_trait,
    extract::{FromRequestParts, MatchedPath, Request, State},
    http::{HeaderMap, header, request::Parts},
    middleware::Next,
    response::Response,
};

use super::policy::{AccessDecision, Identity};
use crate::AppState;
use crate::error::AppError;

/// Read the credential from the `Authorization` header
///
/// Accepts a raw token or one prefixed with `Bearer ` or `Token `.
/// Returns `None` when no credential is supplied; a non-UTF-8 header is
/// passed on lossily so it fails validation instead of counting as absent.
fn extract_token_from_headers(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(header::AUTHORIZATION)?;
    let raw = String::from_utf8_lossy(raw.as_bytes());
    let raw = raw.trim_start();
    let token = raw
        .strip_prefix("Bearer ")
        .or_else(|| raw.strip_prefix("Token "))
        .unwrap_or(raw)
        .trim();

    if token.is_empty() {
        None
    } else {
        Some(token.to_owned())
    }
}

/// Middleware applying the access policy
///
/// Must be installed with `Router::route_layer` so the matched route
/// template is available. Adds `Identity` to request extensions when the
/// request carries a valid token.
///
/// # Usage
/// ```ignore
/// let routes = Router::new()
///     .route("/api/user", get(...))
///     .route_layer(middleware::from_fn_with_state(state, authenticate));
/// ```
pub async fn authenticate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_owned())
        .unwrap_or_else(|| request.uri().path().to_owned());
    let token = extract_token_from_headers(request.headers());

    let decision = state.access_policy.decide(
        &state.tokens,
        request.method(),
        &route,
        token.as_deref(),
    );

    match decision {
        AccessDecision::Rejected => {
            tracing::debug!(
                method = %request.method(),
                route = %route,
                token_supplied = token.is_some(),
                "Request rejected by access policy"
            );
            Err(AppError::Unauthorized)
        }
        AccessDecision::Anonymous => Ok(next.run(request).await),
        AccessDecision::Identified(identity) => {
            request.extensions_mut().insert(identity);
            Ok(next.run(request).await)
        }
    }
}

/// Extractor for the authenticated account
///
/// # Usage
/// ```ignore
/// async fn handler(CurrentUser(identity): CurrentUser) -> impl IntoResponse {
///     identity.account_id
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Identity);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .map(CurrentUser)
            .ok_or(AppError::Unauthorized)
    }
}

/// Optional viewer extractor
///
/// `None` for anonymous requests on allowlisted routes.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<Identity>);

#[async_trait]
impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(parts.extensions.get::<Identity>().cloned()))
    }
}
