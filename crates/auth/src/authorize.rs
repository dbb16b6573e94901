//! Per-request authorization guard.
//!
//! - No IO
//! - No panics
//! - Pure policy check over verified claims and the route's declared needs

use thiserror::Error;

use crate::token::TokenClaims;
use crate::{Permission, Role, permissions_for};

/// What a route declares it needs.
///
/// Empty `roles` means any authenticated role; a route with no roles and no
/// permissions is public.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RouteRequirements {
    pub roles: &'static [Role],
    pub permissions: &'static [Permission],
}

impl RouteRequirements {
    pub const PUBLIC: RouteRequirements = RouteRequirements {
        roles: &[],
        permissions: &[],
    };

    pub const fn roles(roles: &'static [Role]) -> Self {
        Self {
            roles,
            permissions: &[],
        }
    }

    pub const fn permissions(mut self, permissions: &'static [Permission]) -> Self {
        self.permissions = permissions;
        self
    }

    pub fn is_public(&self) -> bool {
        self.roles.is_empty() && self.permissions.is_empty()
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("not authenticated")]
    NotAuthenticated,

    #[error("forbidden: {0}")]
    Forbidden(String),
}

/// Authorize a request.
///
/// `referenced_tenant` is the `tenantId` the request itself names (path,
/// then body, then query), compared verbatim against the caller's tenant.
/// Super admins are exempt from that check.
pub fn authorize(
    claims: Option<&TokenClaims>,
    required: &RouteRequirements,
    referenced_tenant: Option<&str>,
) -> Result<(), AuthzError> {
    if required.is_public() {
        return Ok(());
    }

    let claims = claims.ok_or(AuthzError::NotAuthenticated)?;
    let role = claims.role();

    if !required.roles.is_empty() && !required.roles.contains(&role) {
        return Err(AuthzError::Forbidden(format!("role '{role}' may not access this resource")));
    }

    let granted = permissions_for(role);
    if let Some(missing) = required.permissions.iter().find(|p| !granted.contains(p)) {
        return Err(AuthzError::Forbidden(format!("missing permission '{missing}'")));
    }

    if !role.is_super_admin() {
        if let Some(referenced) = referenced_tenant {
            let own = claims.tenant_id().map(|t| t.to_string());
            if own.as_deref() != Some(referenced) {
                return Err(AuthzError::Forbidden("access to another tenant is not allowed".to_string()));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roles::{NUTRICIONISTA_OR_ADMIN, SUPER_ADMIN_ONLY, TENANT_ADMIN_ONLY};
    use crate::token::{TokenKind, TokenPayload};
    use nutri_core::{TenantId, UserId};
    use proptest::prelude::*;

    fn claims(role: Role, tenant_id: Option<TenantId>) -> TokenClaims {
        TokenClaims {
            payload: TokenPayload {
                sub: UserId::new(),
                email: "x@y.z".into(),
                role,
                tenant_id,
            },
            iat: 0,
            exp: i64::MAX,
            jti: "j".into(),
            typ: TokenKind::Access,
        }
    }

    #[test]
    fn public_routes_allow_anonymous() {
        assert_eq!(authorize(None, &RouteRequirements::PUBLIC, Some("anything")), Ok(()));
    }

    #[test]
    fn anonymous_is_rejected_on_protected_routes() {
        let req = RouteRequirements::roles(SUPER_ADMIN_ONLY);
        assert_eq!(authorize(None, &req, None), Err(AuthzError::NotAuthenticated));
    }

    #[test]
    fn wrong_role_is_forbidden() {
        let req = RouteRequirements::roles(TENANT_ADMIN_ONLY);
        let c = claims(Role::NutricionistaFuncionario, Some(TenantId::new()));
        assert!(matches!(authorize(Some(&c), &req, None), Err(AuthzError::Forbidden(_))));
    }

    #[test]
    fn missing_permission_is_forbidden() {
        let req = RouteRequirements::roles(NUTRICIONISTA_OR_ADMIN)
            .permissions(&[Permission::DeletePatient]);
        let c = claims(Role::NutricionistaFuncionario, Some(TenantId::new()));
        let err = authorize(Some(&c), &req, None).unwrap_err();
        assert_eq!(err, AuthzError::Forbidden("missing permission 'delete_patient'".into()));
    }

    #[test]
    fn foreign_tenant_is_forbidden_for_clinic_roles() {
        let req = RouteRequirements::roles(NUTRICIONISTA_OR_ADMIN);
        let own = TenantId::new();
        let c = claims(Role::NutricionistaAdmin, Some(own));

        assert_eq!(authorize(Some(&c), &req, Some(&own.to_string())), Ok(()));
        assert!(authorize(Some(&c), &req, Some(&TenantId::new().to_string())).is_err());
    }

    #[test]
    fn super_admin_crosses_tenants() {
        let req = RouteRequirements::roles(NUTRICIONISTA_OR_ADMIN);
        let c = claims(Role::SuperAdmin, None);
        assert_eq!(authorize(Some(&c), &req, Some(&TenantId::new().to_string())), Ok(()));
    }

    fn any_role() -> impl Strategy<Value = Role> {
        prop::sample::select(Role::ALL.to_vec())
    }

    static ALL_PERMISSIONS: [Permission; 23] = Permission::ALL;

    proptest! {
        #![proptest_config(ProptestConfig { cases: 256, ..ProptestConfig::default() })]

        /// Property: a permission-only requirement is granted exactly when the
        /// role's static mapping contains it.
        #[test]
        fn permission_check_matches_mapping(role in any_role(), idx in 0..ALL_PERMISSIONS.len()) {
            let p = ALL_PERMISSIONS[idx];
            let req = RouteRequirements::roles(&[]).permissions(std::slice::from_ref(&ALL_PERMISSIONS[idx]));
            let tenant = if role.is_super_admin() { None } else { Some(TenantId::new()) };
            let c = claims(role, tenant);
            prop_assert_eq!(
                authorize(Some(&c), &req, None).is_ok(),
                permissions_for(role).contains(&p)
            );
        }

        /// Property: clinic roles never reach a tenant other than their own.
        #[test]
        fn clinic_roles_are_tenant_isolated(role in any_role()) {
            prop_assume!(!role.is_super_admin());
            let c = claims(role, Some(TenantId::new()));
            let req = RouteRequirements::roles(crate::roles::AUTHENTICATED);
            prop_assert!(authorize(Some(&c), &req, Some(&TenantId::new().to_string())).is_err());
        }
    }
}
