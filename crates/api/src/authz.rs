//! Route guard.
//!
//! Every route's requirements are declared once in [`ROUTE_TABLE`]; the guard
//! middleware looks up the matched route and runs [`nutri_auth::authorize`]
//! before the handler. Routes missing from the table need an authenticated
//! caller of any role.

use std::collections::HashMap;

use axum::{
    extract::{MatchedPath, Query, RawPathParams, Request},
    middleware::Next,
    response::Response,
};

use nutri_auth::Permission::*;
use nutri_auth::roles::{
    AUTHENTICATED, NUTRICIONISTA_ADMIN_ONLY, NUTRICIONISTA_OR_ADMIN, SUPER_ADMIN_ONLY, TENANT_ADMIN_ONLY,
};
use nutri_auth::{RouteRequirements, authorize};

use crate::app::errors;
use crate::context::{AuthContext, RequestJson};

/// Prefix all API routes are nested under.
pub const API_PREFIX: &str = "/api";

/// Request field naming the tenant a request is about.
pub const TENANT_FIELD: &str = "tenantId";

const ANY_ROLE: RouteRequirements = RouteRequirements::roles(AUTHENTICATED);
const SUPER_ADMIN: RouteRequirements = RouteRequirements::roles(SUPER_ADMIN_ONLY);
const STAFF: RouteRequirements = RouteRequirements::roles(NUTRICIONISTA_OR_ADMIN);
const TENANT_ADMIN: RouteRequirements = RouteRequirements::roles(TENANT_ADMIN_ONLY);
const CLINIC_ADMIN: RouteRequirements = RouteRequirements::roles(NUTRICIONISTA_ADMIN_ONLY);

/// `(method, route relative to /api, requirements)`.
pub const ROUTE_TABLE: &[(&str, &str, RouteRequirements)] = &[
    // auth
    ("POST", "/auth/login", RouteRequirements::PUBLIC),
    ("POST", "/auth/register", RouteRequirements::PUBLIC),
    ("POST", "/auth/register/super-admin", SUPER_ADMIN.permissions(&[CreateUser])),
    ("POST", "/auth/refresh", RouteRequirements::PUBLIC),
    ("POST", "/auth/logout", ANY_ROLE),
    ("GET", "/auth/profile", ANY_ROLE),
    // users
    ("GET", "/users", SUPER_ADMIN.permissions(&[ReadUser])),
    ("POST", "/users", STAFF),
    ("GET", "/users/by-tenant/:tenantId", STAFF),
    ("GET", "/users/patients/my", STAFF.permissions(&[ReadPatient])),
    ("GET", "/users/profile", ANY_ROLE),
    ("GET", "/users/:id", STAFF),
    ("POST", "/users/nutricionista", SUPER_ADMIN.permissions(&[CreateUser])),
    ("PATCH", "/users/:id/role", TENANT_ADMIN.permissions(&[ManageNutricionistaRoles])),
    ("PATCH", "/users/:id/deactivate", STAFF),
    ("GET", "/users/tenant/:tenantId/nutricionistas", TENANT_ADMIN),
    ("POST", "/users/invite-nutricionista", CLINIC_ADMIN.permissions(&[InviteNutricionista])),
    // tenant admin
    ("GET", "/tenant-admin/users", TENANT_ADMIN),
    ("GET", "/tenant-admin/nutricionistas", TENANT_ADMIN),
    ("GET", "/tenant-admin/patients", TENANT_ADMIN.permissions(&[ReadPatient])),
    ("POST", "/tenant-admin/invite-nutricionista", CLINIC_ADMIN.permissions(&[InviteNutricionista])),
    ("PATCH", "/tenant-admin/users/:id/role", TENANT_ADMIN.permissions(&[ManageNutricionistaRoles])),
    ("PATCH", "/tenant-admin/users/:id", TENANT_ADMIN),
    ("DELETE", "/tenant-admin/users/:id", TENANT_ADMIN),
    ("GET", "/tenant-admin/tenant/info", TENANT_ADMIN.permissions(&[ReadTenant])),
    ("GET", "/tenant-admin/tenant/stats", TENANT_ADMIN.permissions(&[ReadTenant])),
    ("PATCH", "/tenant-admin/tenant/settings", CLINIC_ADMIN.permissions(&[ManageTenantSettings])),
    ("GET", "/tenant-admin/reports/overview", TENANT_ADMIN.permissions(&[ReadTenantReports])),
    ("GET", "/tenant-admin/reports/patients-distribution", TENANT_ADMIN.permissions(&[ReadTenantReports])),
    // platform admin
    ("GET", "/admin/users", SUPER_ADMIN.permissions(&[ReadUser])),
    ("GET", "/admin/users/super-admins", SUPER_ADMIN.permissions(&[ReadUser])),
    ("POST", "/admin/users/create-super-admin", SUPER_ADMIN.permissions(&[CreateUser])),
    ("PATCH", "/admin/users/:id/role", SUPER_ADMIN.permissions(&[UpdateUser])),
    ("DELETE", "/admin/users/:id", SUPER_ADMIN.permissions(&[DeleteUser])),
    ("GET", "/admin/tenants", SUPER_ADMIN.permissions(&[ReadTenant])),
    ("GET", "/admin/tenants/:id/stats", SUPER_ADMIN.permissions(&[ReadTenant])),
    ("PATCH", "/admin/tenants/:id/settings", SUPER_ADMIN.permissions(&[ManageTenantSettings])),
    ("DELETE", "/admin/tenants/:id", SUPER_ADMIN.permissions(&[DeleteTenant])),
    ("PATCH", "/admin/tenants/:id/activate", SUPER_ADMIN.permissions(&[UpdateTenant])),
    ("GET", "/admin/reports/system-overview", SUPER_ADMIN),
    ("GET", "/admin/reports/tenant/:id/details", SUPER_ADMIN.permissions(&[ReadTenantReports])),
    // access logs
    ("GET", "/logs/my-access", ANY_ROLE),
    ("GET", "/logs/stats", SUPER_ADMIN),
    ("GET", "/logs/failed-logins", SUPER_ADMIN),
    ("GET", "/logs/tenant", TENANT_ADMIN),
];

/// Requirements of a matched route (with or without the `/api` prefix).
pub fn requirements_for(method: &str, route: &str) -> RouteRequirements {
    let route = route.strip_prefix(API_PREFIX).unwrap_or(route).trim_end_matches('/');
    ROUTE_TABLE
        .iter()
        .find(|(m, r, _)| *m == method && *r == route)
        .map(|(_, _, required)| *required)
        .unwrap_or(ANY_ROLE)
}

/// Tenant the request names, looked up in the path, then the body, then
/// the query string.
pub fn referenced_tenant(
    path: &[(&str, &str)],
    body: Option<&RequestJson>,
    query: &HashMap<String, String>,
) -> Option<String> {
    path.iter()
        .find(|(k, _)| *k == TENANT_FIELD)
        .map(|(_, v)| v.to_string())
        .or_else(|| body.and_then(|b| b.str_field(TENANT_FIELD)).map(str::to_string))
        .or_else(|| query.get(TENANT_FIELD).cloned())
}

/// Guard middleware; installed with `route_layer` so the matched route is known.
pub async fn guard(
    matched: Option<MatchedPath>,
    params: Option<RawPathParams>,
    query: Option<Query<HashMap<String, String>>>,
    req: Request,
    next: Next,
) -> Response {
    let route = matched
        .as_ref()
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());
    let required = requirements_for(req.method().as_str(), &route);

    let path: Vec<(&str, &str)> = params.as_ref().map(|p| p.iter().collect()).unwrap_or_default();
    let query = query.map(|Query(q)| q).unwrap_or_default();
    let referenced = referenced_tenant(&path, req.extensions().get::<RequestJson>(), &query);

    let claims = req.extensions().get::<AuthContext>().map(AuthContext::claims);
    if let Err(e) = authorize(claims, &required, referenced.as_deref()) {
        return errors::authz_error_to_response(e);
    }

    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use nutri_auth::{Role, permissions_for};
    use serde_json::json;

    #[test]
    fn table_entries_are_unique() {
        for (i, (m, r, _)) in ROUTE_TABLE.iter().enumerate() {
            assert!(
                !ROUTE_TABLE[i + 1..].iter().any(|(m2, r2, _)| m2 == m && r2 == r),
                "duplicate route {m} {r}"
            );
        }
    }

    #[test]
    fn every_required_permission_is_held_by_some_allowed_role() {
        for (m, r, req) in ROUTE_TABLE {
            for p in req.permissions {
                assert!(
                    req.roles.iter().any(|role| permissions_for(*role).contains(p)),
                    "{m} {r} can never be satisfied"
                );
            }
        }
    }

    #[test]
    fn lookup_strips_prefix_and_defaults_to_authenticated() {
        assert!(requirements_for("POST", "/api/auth/login").is_public());
        assert_eq!(requirements_for("GET", "/api/logs/stats").roles, &[Role::SuperAdmin]);
        assert_eq!(requirements_for("GET", "/users/:id").roles, NUTRICIONISTA_OR_ADMIN);
        assert_eq!(requirements_for("POST", "/api/users/").roles, NUTRICIONISTA_OR_ADMIN);

        let unknown = requirements_for("GET", "/api/nowhere");
        assert!(!unknown.is_public());
        assert_eq!(unknown.roles, AUTHENTICATED);
    }

    #[test]
    fn tenant_reference_precedence() {
        let body = RequestJson(Some(json!({ "tenantId": "from-body" })));
        let mut query = HashMap::new();
        query.insert("tenantId".to_string(), "from-query".to_string());

        assert_eq!(
            referenced_tenant(&[("tenantId", "from-path")], Some(&body), &query).as_deref(),
            Some("from-path")
        );
        assert_eq!(referenced_tenant(&[("id", "x")], Some(&body), &query).as_deref(), Some("from-body"));
        assert_eq!(referenced_tenant(&[], None, &query).as_deref(), Some("from-query"));
        assert_eq!(referenced_tenant(&[], None, &HashMap::new()), None);
    }
}
