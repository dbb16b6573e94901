use serde::Deserialize;

use nutri_accounts::RoleChange;
use nutri_auth::{Registration, Role};
use nutri_core::{TenantId, UserId};

use crate::app::errors;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub tenant_subdomain: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    pub role: Role,
    #[serde(default)]
    pub tenant_id: Option<String>,
    #[serde(default)]
    pub nutricionista_id: Option<String>,
    #[serde(default)]
    pub crn: Option<String>,
    #[serde(default)]
    pub especialidade: Option<String>,
    #[serde(default)]
    pub tenant_name: Option<String>,
    #[serde(default)]
    pub tenant_subdomain: Option<String>,
    #[serde(default)]
    pub tenant_description: Option<String>,
}

impl RegisterRequest {
    pub fn into_registration(self) -> Result<Registration, axum::response::Response> {
        let tenant_id = errors::parse_opt_id::<TenantId>(self.tenant_id.as_deref(), "tenantId")?;
        let nutricionista_id = errors::parse_opt_id::<UserId>(self.nutricionista_id.as_deref(), "nutricionistaId")?;

        let mut registration = Registration::new(self.email, self.password, self.name, self.role);
        registration.tenant_id = tenant_id;
        registration.nutricionista_id = nutricionista_id;
        registration.crn = self.crn;
        registration.especialidade = self.especialidade;
        registration.tenant_name = self.tenant_name;
        registration.tenant_subdomain = self.tenant_subdomain;
        registration.tenant_description = self.tenant_description;
        Ok(registration)
    }
}

/// Refresh token sent in the body; the bearer header is accepted too.
#[derive(Debug, Default, Deserialize)]
pub struct RefreshRequest {
    #[serde(default, alias = "refreshToken")]
    pub refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNutricionistaRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    #[serde(default)]
    pub crn: Option<String>,
    #[serde(default)]
    pub especialidade: Option<String>,
    #[serde(default)]
    pub tenant_name: Option<String>,
    #[serde(default)]
    pub tenant_subdomain: Option<String>,
    #[serde(default)]
    pub tenant_description: Option<String>,
}

impl CreateNutricionistaRequest {
    /// The role is settled later from whether a tenant was named.
    pub fn into_registration(self) -> Registration {
        let mut registration = Registration::new(self.email, self.password, self.name, Role::NutricionistaAdmin);
        registration.crn = self.crn;
        registration.especialidade = self.especialidade;
        registration.tenant_name = self.tenant_name;
        registration.tenant_subdomain = self.tenant_subdomain;
        registration.tenant_description = self.tenant_description;
        registration
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateSuperAdminRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

/// Role change requested by a clinic admin.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleUpdateRequest {
    pub role: Role,
    #[serde(default)]
    pub nutricionista_id: Option<String>,
}

impl RoleUpdateRequest {
    pub fn into_change(self) -> Result<RoleChange, axum::response::Response> {
        let mut change = RoleChange::to(self.role);
        change.nutricionista_id = errors::parse_opt_id(self.nutricionista_id.as_deref(), "nutricionistaId")?;
        Ok(change)
    }
}

/// Role change by the platform admin, optionally moving the user.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalRoleUpdateRequest {
    pub new_role: Role,
    #[serde(default)]
    pub tenant_id: Option<String>,
    #[serde(default)]
    pub nutricionista_id: Option<String>,
}

impl GlobalRoleUpdateRequest {
    pub fn into_change(self) -> Result<RoleChange, axum::response::Response> {
        let mut change = RoleChange::to(self.new_role);
        change.tenant_id = errors::parse_opt_id(self.tenant_id.as_deref(), "tenantId")?;
        change.nutricionista_id = errors::parse_opt_id(self.nutricionista_id.as_deref(), "nutricionistaId")?;
        Ok(change)
    }
}

// -------------------------
// Query strings
// -------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantQuery {
    #[serde(default)]
    pub tenant_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LimitQuery {
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListTenantsQuery {
    #[serde(default)]
    pub include_inactive: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn register_request_parses_ids() {
        let tenant_id = TenantId::new();
        let body: RegisterRequest = serde_json::from_value(json!({
            "email": "p@clinic.com",
            "password": "secret123",
            "name": "Pat",
            "role": "paciente",
            "tenantId": tenant_id.to_string(),
            "nutricionistaId": "not-an-id",
        }))
        .unwrap();

        let res = body.into_registration().unwrap_err();
        assert_eq!(res.status(), axum::http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn refresh_token_accepts_both_spellings() {
        let a: RefreshRequest = serde_json::from_value(json!({ "refresh_token": "x" })).unwrap();
        let b: RefreshRequest = serde_json::from_value(json!({ "refreshToken": "y" })).unwrap();
        assert_eq!(a.refresh_token.as_deref(), Some("x"));
        assert_eq!(b.refresh_token.as_deref(), Some("y"));
    }

    #[test]
    fn global_role_update_moves_tenant() {
        let tenant_id = TenantId::new();
        let body: GlobalRoleUpdateRequest = serde_json::from_value(json!({
            "newRole": "nutricionista_funcionario",
            "tenantId": tenant_id.to_string(),
        }))
        .unwrap();

        let change = body.into_change().unwrap();
        assert_eq!(change.new_role, Role::NutricionistaFuncionario);
        assert_eq!(change.tenant_id, Some(tenant_id));
        assert_eq!(change.nutricionista_id, None);
    }
}
