//! Registration input and the role invariants it must satisfy.

use nutri_core::{DomainError, TenantId, UserId};

use crate::config::MIN_PASSWORD_LEN;
use crate::{AuthError, Role};

/// Everything needed to create an account.
///
/// `tenant_*` fields only matter for a clinic admin registering without a
/// tenant: they name the clinic that gets created alongside the account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub name: String,
    pub role: Role,
    pub tenant_id: Option<TenantId>,
    pub nutricionista_id: Option<UserId>,
    pub crn: Option<String>,
    pub especialidade: Option<String>,
    pub tenant_name: Option<String>,
    pub tenant_subdomain: Option<String>,
    pub tenant_description: Option<String>,
}

impl Registration {
    pub fn new(email: impl Into<String>, password: impl Into<String>, name: impl Into<String>, role: Role) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            name: name.into(),
            role,
            tenant_id: None,
            nutricionista_id: None,
            crn: None,
            especialidade: None,
            tenant_name: None,
            tenant_subdomain: None,
            tenant_description: None,
        }
    }

    pub fn in_tenant(mut self, tenant_id: TenantId) -> Self {
        self.tenant_id = Some(tenant_id);
        self
    }

    pub fn with_nutricionista(mut self, nutricionista_id: UserId) -> Self {
        self.nutricionista_id = Some(nutricionista_id);
        self
    }

    /// Trim free-text fields and check their shape.
    pub fn normalized(mut self) -> Result<Self, DomainError> {
        self.email = self.email.trim().to_string();
        self.name = self.name.trim().to_string();

        match self.email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {}
            _ => return Err(DomainError::validation("invalid email format")),
        }
        if self.name.is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(DomainError::validation(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }

        self.tenant_subdomain = self
            .tenant_subdomain
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        self.tenant_name = self
            .tenant_name
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        // Fields that do not apply to the role are dropped, not rejected.
        if self.role != Role::Paciente {
            self.nutricionista_id = None;
        }
        if !self.role.is_nutritionist() {
            self.crn = None;
            self.especialidade = None;
        }
        Ok(self)
    }
}

/// Presence rules per role, checked before any store lookup.
pub fn check_role_invariants(role: Role, has_tenant: bool, has_nutricionista: bool) -> Result<(), AuthError> {
    match role {
        Role::SuperAdmin if has_tenant => Err(AuthError::TenantNotAllowed),
        Role::NutricionistaFuncionario | Role::Paciente if !has_tenant => Err(AuthError::TenantRequired),
        Role::Paciente if !has_nutricionista => Err(AuthError::NutricionistaRequired),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn normalized_trims_and_drops_irrelevant_fields() {
        let mut reg = Registration::new("  ana@clinic.test ", "secret1", " Ana ", Role::SuperAdmin)
            .with_nutricionista(UserId::new());
        reg.crn = Some("123".into());

        let reg = reg.normalized().unwrap();
        assert_eq!(reg.email, "ana@clinic.test");
        assert_eq!(reg.name, "Ana");
        assert_eq!(reg.nutricionista_id, None);
        assert_eq!(reg.crn, None);
    }

    #[test]
    fn email_case_is_preserved() {
        let reg = Registration::new("Ana@Clinic.test", "secret1", "Ana", Role::SuperAdmin)
            .normalized()
            .unwrap();
        assert_eq!(reg.email, "Ana@Clinic.test");
    }

    #[test]
    fn short_password_is_rejected() {
        let err = Registration::new("a@b.c", "12345", "A", Role::SuperAdmin)
            .normalized()
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn bad_email_is_rejected() {
        for email in ["", "plain", "@domain", "local@"] {
            assert!(
                Registration::new(email, "secret1", "A", Role::SuperAdmin)
                    .normalized()
                    .is_err(),
                "{email}"
            );
        }
    }

    fn any_role() -> impl Strategy<Value = Role> {
        prop::sample::select(Role::ALL.to_vec())
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 256, ..ProptestConfig::default() })]

        /// Property: the presence rules accept exactly the combinations the
        /// data model allows.
        #[test]
        fn role_invariants(role in any_role(), has_tenant in any::<bool>(), has_nutri in any::<bool>()) {
            let ok = check_role_invariants(role, has_tenant, has_nutri).is_ok();
            let expected = match role {
                Role::SuperAdmin => !has_tenant,
                Role::NutricionistaAdmin => true,
                Role::NutricionistaFuncionario => has_tenant,
                Role::Paciente => has_tenant && has_nutri,
            };
            prop_assert_eq!(ok, expected);
        }

        /// Property: a patient missing both references is told about the tenant first.
        #[test]
        fn tenant_is_reported_before_nutricionista(has_nutri in any::<bool>()) {
            prop_assert_eq!(
                check_role_invariants(Role::Paciente, false, has_nutri),
                Err(AuthError::TenantRequired)
            );
        }
    }
}
