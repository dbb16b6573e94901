//! User account records as persisted by a [`crate::CredentialStore`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use nutri_core::{TenantId, UserId};

use crate::Role;

/// A persisted user account.
///
/// The password and refresh-token hashes never leave the process: they are
/// skipped on serialization, and handlers return [`UserSummary`] or the
/// record itself (which serializes without them).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub name: String,
    pub role: Role,
    pub tenant_id: Option<TenantId>,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    #[serde(skip_serializing, default)]
    pub refresh_token_hash: Option<String>,
    pub nutricionista_id: Option<UserId>,
    pub crn: Option<String>,
    pub especialidade: Option<String>,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            email: self.email.clone(),
            name: self.name.clone(),
            role: self.role,
            tenant_id: self.tenant_id,
        }
    }

    /// Whether this account belongs to `tenant_id`.
    pub fn in_tenant(&self, tenant_id: TenantId) -> bool {
        self.tenant_id == Some(tenant_id)
    }

    /// Copy with the password hash blanked out.
    pub fn without_secrets(mut self) -> Self {
        self.password_hash.clear();
        self.refresh_token_hash = None;
        self
    }
}

/// Public subset returned alongside issued tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub tenant_id: Option<TenantId>,
}

/// Input for [`crate::CredentialStore::create`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub role: Role,
    pub tenant_id: Option<TenantId>,
    pub nutricionista_id: Option<UserId>,
    pub crn: Option<String>,
    pub especialidade: Option<String>,
    pub metadata: serde_json::Value,
}

impl NewUser {
    /// Materialize a record with a fresh id and timestamps.
    pub fn into_user(self, now: DateTime<Utc>) -> User {
        User {
            id: UserId::new(),
            email: self.email,
            password_hash: self.password_hash,
            name: self.name,
            role: self.role,
            tenant_id: self.tenant_id,
            is_active: true,
            last_login: None,
            refresh_token_hash: None,
            nutricionista_id: self.nutricionista_id,
            crn: self.crn,
            especialidade: self.especialidade,
            metadata: self.metadata,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update for [`crate::CredentialStore::update_fields`].
///
/// `None` leaves a field untouched; for nullable columns `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserUpdate {
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub name: Option<String>,
    pub role: Option<Role>,
    pub tenant_id: Option<Option<TenantId>>,
    pub is_active: Option<bool>,
    pub last_login: Option<DateTime<Utc>>,
    pub refresh_token_hash: Option<Option<String>>,
    pub nutricionista_id: Option<Option<UserId>>,
    pub crn: Option<Option<String>>,
    pub especialidade: Option<Option<String>>,
    pub metadata: Option<serde_json::Value>,
}

impl UserUpdate {
    pub fn last_login(at: DateTime<Utc>) -> Self {
        Self {
            last_login: Some(at),
            ..Self::default()
        }
    }

    pub fn refresh_token(hash: Option<String>) -> Self {
        Self {
            refresh_token_hash: Some(hash),
            ..Self::default()
        }
    }

    pub fn active(is_active: bool) -> Self {
        Self {
            is_active: Some(is_active),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply the update in place, bumping `updated_at`.
    pub fn apply(self, user: &mut User, now: DateTime<Utc>) {
        if let Some(v) = self.email {
            user.email = v;
        }
        if let Some(v) = self.password_hash {
            user.password_hash = v;
        }
        if let Some(v) = self.name {
            user.name = v;
        }
        if let Some(v) = self.role {
            user.role = v;
        }
        if let Some(v) = self.tenant_id {
            user.tenant_id = v;
        }
        if let Some(v) = self.is_active {
            user.is_active = v;
        }
        if let Some(v) = self.last_login {
            user.last_login = Some(v);
        }
        if let Some(v) = self.refresh_token_hash {
            user.refresh_token_hash = v;
        }
        if let Some(v) = self.nutricionista_id {
            user.nutricionista_id = v;
        }
        if let Some(v) = self.crn {
            user.crn = v;
        }
        if let Some(v) = self.especialidade {
            user.especialidade = v;
        }
        if let Some(v) = self.metadata {
            user.metadata = v;
        }
        user.updated_at = now;
    }
}

/// Listing criteria for [`crate::CredentialStore::list`].
///
/// Empty `roles` matches any role.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserFilter {
    pub tenant_id: Option<TenantId>,
    pub roles: Vec<Role>,
    pub nutricionista_id: Option<UserId>,
    pub active_only: bool,
}

impl UserFilter {
    pub fn active() -> Self {
        Self {
            active_only: true,
            ..Self::default()
        }
    }

    pub fn in_tenant(mut self, tenant_id: TenantId) -> Self {
        self.tenant_id = Some(tenant_id);
        self
    }

    pub fn with_roles(mut self, roles: &[Role]) -> Self {
        self.roles = roles.to_vec();
        self
    }

    pub fn of_nutricionista(mut self, nutricionista_id: UserId) -> Self {
        self.nutricionista_id = Some(nutricionista_id);
        self
    }

    pub fn matches(&self, user: &User) -> bool {
        if self.active_only && !user.is_active {
            return false;
        }
        if let Some(t) = self.tenant_id {
            if user.tenant_id != Some(t) {
                return false;
            }
        }
        if let Some(n) = self.nutricionista_id {
            if user.nutricionista_id != Some(n) {
                return false;
            }
        }
        self.roles.is_empty() || self.roles.contains(&user.role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patient(tenant: TenantId, nutricionista: UserId) -> User {
        NewUser {
            email: "p@clinic.test".into(),
            password_hash: "$2b$hash".into(),
            name: "Patient".into(),
            role: Role::Paciente,
            tenant_id: Some(tenant),
            nutricionista_id: Some(nutricionista),
            crn: None,
            especialidade: None,
            metadata: serde_json::Value::Null,
        }
        .into_user(Utc::now())
    }

    #[test]
    fn secrets_are_not_serialized() {
        let mut user = patient(TenantId::new(), UserId::new());
        user.refresh_token_hash = Some("abc".into());
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert!(json.get("refreshTokenHash").is_none());
        assert_eq!(json["role"], "paciente");
        assert!(json.get("tenantId").is_some());
    }

    #[test]
    fn update_clears_nullable_fields() {
        let mut user = patient(TenantId::new(), UserId::new());
        user.refresh_token_hash = Some("abc".into());
        UserUpdate::refresh_token(None).apply(&mut user, Utc::now());
        assert_eq!(user.refresh_token_hash, None);
        assert_eq!(user.role, Role::Paciente);
    }

    #[test]
    fn filter_combines_criteria() {
        let tenant = TenantId::new();
        let nutri = UserId::new();
        let mut user = patient(tenant, nutri);

        assert!(UserFilter::active().in_tenant(tenant).matches(&user));
        assert!(UserFilter::active().of_nutricionista(nutri).matches(&user));
        assert!(!UserFilter::active().with_roles(&[Role::SuperAdmin]).matches(&user));
        assert!(!UserFilter::active().in_tenant(TenantId::new()).matches(&user));

        user.is_active = false;
        assert!(!UserFilter::active().matches(&user));
        assert!(UserFilter::default().matches(&user));
    }
}
