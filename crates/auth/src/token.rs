//! JWT issuance/verification and refresh-token hashing.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

use nutri_core::{TenantId, UserId};

use crate::Role;

/// Distinguishes access tokens from refresh tokens signed with the same key.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Identity carried by every token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPayload {
    pub sub: UserId,
    pub email: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<TenantId>,
}

/// Decoded, verified claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    #[serde(flatten)]
    pub payload: TokenPayload,
    pub iat: i64,
    pub exp: i64,
    /// Unique per token, so two tokens minted in the same second differ.
    pub jti: String,
    pub typ: TokenKind,
}

impl TokenClaims {
    pub fn user_id(&self) -> UserId {
        self.payload.sub
    }

    pub fn role(&self) -> Role {
        self.payload.role
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.payload.tenant_id
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("invalid token: {0}")]
    Invalid(String),
    #[error("wrong token kind")]
    WrongKind,
    #[error("signing failed: {0}")]
    Signing(String),
}

/// Token signing boundary.
pub trait TokenSigner: Send + Sync {
    fn sign(&self, payload: &TokenPayload, kind: TokenKind, ttl: Duration) -> Result<String, TokenError>;

    /// Verify signature and expiry, and that the token is of `kind`.
    fn verify(&self, token: &str, kind: TokenKind) -> Result<TokenClaims, TokenError>;
}

/// HMAC-SHA256 signer over a shared secret.
#[derive(Clone)]
pub struct Hs256TokenSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl Hs256TokenSigner {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }
}

impl core::fmt::Debug for Hs256TokenSigner {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("Hs256TokenSigner(..)")
    }
}

impl TokenSigner for Hs256TokenSigner {
    fn sign(&self, payload: &TokenPayload, kind: TokenKind, ttl: Duration) -> Result<String, TokenError> {
        let now = Utc::now().timestamp();
        let claims = TokenClaims {
            payload: payload.clone(),
            iat: now,
            exp: now + ttl.num_seconds(),
            jti: Uuid::now_v7().to_string(),
            typ: kind,
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    fn verify(&self, token: &str, kind: TokenKind) -> Result<TokenClaims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let claims = jsonwebtoken::decode::<TokenClaims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid(e.to_string()),
            })?;

        if claims.typ != kind {
            return Err(TokenError::WrongKind);
        }
        Ok(claims)
    }
}

/// SHA-256 of a refresh token, hex-encoded. This is what gets persisted.
pub fn hash_refresh_token(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    hex::encode(hasher.finalize())
}

/// Compare two digests without short-circuiting on the first difference.
pub fn digests_match(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> TokenPayload {
        TokenPayload {
            sub: UserId::new(),
            email: "ana@clinic.test".into(),
            role: Role::NutricionistaAdmin,
            tenant_id: Some(TenantId::new()),
        }
    }

    #[test]
    fn sign_then_verify() {
        let signer = Hs256TokenSigner::new(b"secret");
        let p = payload();
        let token = signer.sign(&p, TokenKind::Access, Duration::minutes(5)).unwrap();
        let claims = signer.verify(&token, TokenKind::Access).unwrap();

        assert_eq!(claims.payload, p);
        assert_eq!(claims.exp - claims.iat, 300);
    }

    #[test]
    fn claims_use_camel_case_tenant_and_omit_it_when_absent() {
        let signer = Hs256TokenSigner::new(b"secret");
        let mut p = payload();
        let token = signer.sign(&p, TokenKind::Access, Duration::minutes(5)).unwrap();
        let json = serde_json::to_value(signer.verify(&token, TokenKind::Access).unwrap()).unwrap();
        assert!(json.get("tenantId").is_some());
        assert_eq!(json["role"], "nutricionista_admin");

        p.tenant_id = None;
        p.role = Role::SuperAdmin;
        let token = signer.sign(&p, TokenKind::Access, Duration::minutes(5)).unwrap();
        let json = serde_json::to_value(signer.verify(&token, TokenKind::Access).unwrap()).unwrap();
        assert!(json.get("tenantId").is_none());
    }

    #[test]
    fn jti_is_unique() {
        let signer = Hs256TokenSigner::new(b"secret");
        let p = payload();
        let a = signer.sign(&p, TokenKind::Access, Duration::minutes(5)).unwrap();
        let b = signer.sign(&p, TokenKind::Access, Duration::minutes(5)).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn expired_token_is_rejected() {
        let signer = Hs256TokenSigner::new(b"secret");
        let token = signer.sign(&payload(), TokenKind::Access, Duration::seconds(-10)).unwrap();
        assert_eq!(signer.verify(&token, TokenKind::Access), Err(TokenError::Expired));
    }

    #[test]
    fn other_secret_is_rejected() {
        let token = Hs256TokenSigner::new(b"one")
            .sign(&payload(), TokenKind::Access, Duration::minutes(5))
            .unwrap();
        let err = Hs256TokenSigner::new(b"two").verify(&token, TokenKind::Access);
        assert!(matches!(err, Err(TokenError::Invalid(_))));
    }

    #[test]
    fn refresh_token_is_not_an_access_token() {
        let signer = Hs256TokenSigner::new(b"secret");
        let token = signer.sign(&payload(), TokenKind::Refresh, Duration::days(7)).unwrap();
        assert_eq!(signer.verify(&token, TokenKind::Access), Err(TokenError::WrongKind));
        assert!(signer.verify(&token, TokenKind::Refresh).is_ok());
    }

    #[test]
    fn refresh_token_hash_is_deterministic_hex() {
        let a = hash_refresh_token("tok");
        assert_eq!(a, hash_refresh_token("tok"));
        assert_eq!(a.len(), 64);
        assert_ne!(a, hash_refresh_token("tok2"));
        assert!(digests_match(&a, &hash_refresh_token("tok")));
        assert!(!digests_match(&a, &hash_refresh_token("tok2")));
        assert!(!digests_match(&a, "short"));
    }
}
