//! Access policy
//!
//! Decides, per (method, route template, optional token), whether a request
//! is rejected, proceeds anonymously, or proceeds as an identified account.
//! Framework-agnostic; the axum glue lives in `middleware`.

use std::collections::HashSet;

use http::Method;

use super::token::TokenService;

/// Viewer identity resolved from a valid token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Account id (token subject)
    pub account_id: String,
    /// The raw token the request presented
    pub token: String,
}

/// Outcome of the access check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    /// Token absent on a protected route, or token present but invalid
    Rejected,
    /// No token, allowlisted route
    Anonymous,
    /// Valid token, on any route
    Identified(Identity),
}

/// Static allowlist of routes that may be called without a token
#[derive(Debug, Clone)]
pub struct AccessPolicy {
    anonymous_routes: HashSet<(Method, &'static str)>,
}

impl AccessPolicy {
    pub fn new(routes: impl IntoIterator<Item = (Method, &'static str)>) -> Self {
        Self {
            anonymous_routes: routes.into_iter().collect(),
        }
    }

    /// Routes of this API that allow anonymous access
    pub fn default_routes() -> Self {
        Self::new([
            (Method::GET, "/api"),
            (Method::GET, "/api/profiles/:username"),
            (Method::POST, "/api/users"),
            (Method::POST, "/api/users/login"),
            (Method::GET, "/metrics"),
        ])
    }

    pub fn allows_anonymous(&self, method: &Method, route: &str) -> bool {
        // Linear scan: a `&'static str` key can't be looked up with a borrowed route.
        self.anonymous_routes
            .iter()
            .any(|(allowed_method, allowed_route)| {
                allowed_method == method && *allowed_route == route
            })
    }

    /// Decide access for a request
    ///
    /// `route` is the matched route template (e.g. `/api/profiles/:username`),
    /// not the literal request path. A supplied token must validate; an
    /// invalid one is never downgraded to anonymous.
    pub fn decide(
        &self,
        tokens: &TokenService,
        method: &Method,
        route: &str,
        token: Option<&str>,
    ) -> AccessDecision {
        match token {
            Some(token) => match tokens.validate(token) {
                Some(account_id) => AccessDecision::Identified(Identity {
                    account_id,
                    token: token.to_string(),
                }),
                None => AccessDecision::Rejected,
            },
            None if self.allows_anonymous(method, route) => AccessDecision::Anonymous,
            None => AccessDecision::Rejected,
        }
    }
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self::default_routes()
    }
}
