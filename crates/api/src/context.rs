use serde_json::Value;

use nutri_accounts::Actor;
use nutri_auth::TokenClaims;
use nutri_core::UserId;

/// Verified identity of the caller.
///
/// Present in request extensions only when a valid access token was sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    claims: TokenClaims,
}

impl AuthContext {
    pub fn new(claims: TokenClaims) -> Self {
        Self { claims }
    }

    pub fn claims(&self) -> &TokenClaims {
        &self.claims
    }

    pub fn user_id(&self) -> UserId {
        self.claims.user_id()
    }

    pub fn email(&self) -> &str {
        &self.claims.payload.email
    }

    pub fn actor(&self) -> Actor {
        Actor::from(&self.claims)
    }
}

/// Request body parsed as JSON, captured before handlers consume it.
///
/// `None` for empty or non-JSON bodies.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestJson(pub Option<Value>);

impl RequestJson {
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.0.as_ref()?.get(key)?.as_str()
    }
}
