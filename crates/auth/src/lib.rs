//! `nutri-auth` — authentication and authorization for the clinic platform.
//!
//! This crate is decoupled from HTTP: it owns the role/permission model, the
//! per-request guard, and the engine that validates credentials and issues,
//! refreshes and revokes tokens. Persistence is reached through the
//! [`CredentialStore`] and [`TenantStore`] traits.

pub mod authorize;
pub mod config;
pub mod error;
pub mod password;
pub mod permissions;
pub mod registration;
pub mod roles;
pub mod service;
pub mod store;
pub mod tenant;
pub mod token;
pub mod user;

pub use authorize::{AuthzError, RouteRequirements, authorize};
pub use config::AuthConfig;
pub use error::AuthError;
pub use password::{BcryptHasher, PasswordHasher};
pub use permissions::{Permission, has_permission, permissions_for};
pub use registration::Registration;
pub use roles::Role;
pub use service::{AccessToken, AuthService, AuthSession};
pub use store::{CredentialStore, InMemoryCredentialStore, InMemoryTenantStore, StoreError, TenantStore};
pub use tenant::{NewTenant, Tenant, TenantUpdate};
pub use token::{Hs256TokenSigner, TokenClaims, TokenKind, TokenPayload, TokenSigner};
pub use user::{NewUser, User, UserFilter, UserSummary, UserUpdate};
