//! Tenant (clinic) records as persisted by a [`crate::TenantStore`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use nutri_core::{TenantId, UserId};

/// A clinic. Inactive tenants block login and registration of their members.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    pub id: TenantId,
    pub name: String,
    pub subdomain: String,
    pub description: Option<String>,
    pub is_active: bool,
    /// Absent only between auto-creation and the owner back-fill.
    pub owner_id: Option<UserId>,
    /// Free-form settings blob (`maxPatients`, `allowedFeatures`,
    /// `customBranding`, ...).
    pub settings: Value,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<Value>,
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewTenant {
    pub name: String,
    pub subdomain: String,
    pub description: Option<String>,
    pub owner_id: Option<UserId>,
    pub settings: Value,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<Value>,
}

impl NewTenant {
    pub fn into_tenant(self, now: DateTime<Utc>) -> Tenant {
        Tenant {
            id: TenantId::new(),
            name: self.name,
            subdomain: self.subdomain,
            description: self.description,
            is_active: true,
            owner_id: self.owner_id,
            settings: self.settings,
            email: self.email,
            phone: self.phone,
            address: self.address,
            metadata: Value::Object(Map::new()),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update for [`crate::TenantStore::update`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TenantUpdate {
    pub name: Option<String>,
    pub subdomain: Option<String>,
    pub description: Option<Option<String>>,
    pub is_active: Option<bool>,
    pub owner_id: Option<UserId>,
    pub settings: Option<Value>,
    pub email: Option<Option<String>>,
    pub phone: Option<Option<String>>,
    pub address: Option<Option<Value>>,
    pub metadata: Option<Value>,
}

impl TenantUpdate {
    pub fn owner(owner_id: UserId) -> Self {
        Self {
            owner_id: Some(owner_id),
            ..Self::default()
        }
    }

    pub fn active(is_active: bool) -> Self {
        Self {
            is_active: Some(is_active),
            ..Self::default()
        }
    }

    pub fn settings(settings: Value) -> Self {
        Self {
            settings: Some(settings),
            ..Self::default()
        }
    }

    pub fn apply(self, tenant: &mut Tenant, now: DateTime<Utc>) {
        if let Some(v) = self.name {
            tenant.name = v;
        }
        if let Some(v) = self.subdomain {
            tenant.subdomain = v;
        }
        if let Some(v) = self.description {
            tenant.description = v;
        }
        if let Some(v) = self.is_active {
            tenant.is_active = v;
        }
        if let Some(v) = self.owner_id {
            tenant.owner_id = Some(v);
        }
        if let Some(v) = self.settings {
            tenant.settings = v;
        }
        if let Some(v) = self.email {
            tenant.email = v;
        }
        if let Some(v) = self.phone {
            tenant.phone = v;
        }
        if let Some(v) = self.address {
            tenant.address = v;
        }
        if let Some(v) = self.metadata {
            tenant.metadata = v;
        }
        tenant.updated_at = now;
    }
}

/// Shallow merge of `patch` into `base`: top-level keys of `patch` win.
///
/// A non-object `base` is replaced by `patch`.
pub fn merge_settings(base: &Value, patch: Value) -> Value {
    match (base, patch) {
        (Value::Object(base), Value::Object(patch)) => {
            let mut merged = base.clone();
            merged.extend(patch);
            Value::Object(merged)
        }
        (_, patch) => patch,
    }
}

/// Subdomain derived from an email's local part: lower-cased, alphanumerics only.
pub fn derive_subdomain(email: &str) -> String {
    email
        .split('@')
        .next()
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn derive_subdomain_strips_and_lowercases() {
        assert_eq!(derive_subdomain("Dr.Ana-Maria_01@clinic.com"), "dranamaria01");
        assert_eq!(derive_subdomain("@nothing"), "");
    }

    #[test]
    fn merge_settings_overrides_top_level_keys() {
        let base = json!({ "maxPatients": 10, "allowedFeatures": ["a"] });
        let merged = merge_settings(&base, json!({ "maxPatients": 50 }));
        assert_eq!(merged, json!({ "maxPatients": 50, "allowedFeatures": ["a"] }));
    }

    #[test]
    fn merge_settings_replaces_non_object_base() {
        assert_eq!(merge_settings(&Value::Null, json!({ "a": 1 })), json!({ "a": 1 }));
    }
}
