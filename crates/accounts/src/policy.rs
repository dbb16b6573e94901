//! Account hierarchy rules.
//!
//! Pure checks, no IO. Every function answers "may `actor` do this to that
//! account" and reports a [`DomainError::Forbidden`] otherwise.

use nutri_auth::{Role, User};
use nutri_core::{DomainError, TenantId};

use crate::Actor;

/// Clinic roles only reach their own tenant; the platform operator reaches all.
pub fn ensure_same_tenant(actor: &Actor, tenant_id: Option<TenantId>) -> Result<(), DomainError> {
    if actor.role.is_super_admin() {
        return Ok(());
    }
    match (actor.tenant_id, tenant_id) {
        (Some(own), Some(other)) if own == other => Ok(()),
        _ => Err(DomainError::forbidden("access to another tenant is not allowed")),
    }
}

pub fn can_view_user(actor: &Actor, target: &User) -> Result<(), DomainError> {
    match actor.role {
        Role::SuperAdmin => Ok(()),
        Role::NutricionistaAdmin | Role::NutricionistaFuncionario => {
            ensure_same_tenant(actor, target.tenant_id)
        }
        Role::Paciente if target.id == actor.id => Ok(()),
        Role::Paciente => Err(DomainError::forbidden("patients only see their own account")),
    }
}

/// Who may create an account of `role` inside `tenant_id`.
///
/// Staff create patients, clinic admins create staff and patients, both only
/// in their own clinic. The platform operator creates anything.
pub fn can_create_user(actor: &Actor, role: Role, tenant_id: Option<TenantId>) -> Result<(), DomainError> {
    match actor.role {
        Role::SuperAdmin => Ok(()),
        Role::NutricionistaFuncionario => {
            ensure_same_tenant(actor, tenant_id)?;
            if role != Role::Paciente {
                return Err(DomainError::forbidden("staff can only create patients"));
            }
            Ok(())
        }
        Role::NutricionistaAdmin => {
            ensure_same_tenant(actor, tenant_id)?;
            if !matches!(role, Role::NutricionistaFuncionario | Role::Paciente) {
                return Err(DomainError::forbidden("clinic admins can only create staff and patients"));
            }
            Ok(())
        }
        Role::Paciente => Err(DomainError::forbidden("patients cannot create accounts")),
    }
}

/// Who may deactivate `target`. Nobody deactivates their own account here.
pub fn can_deactivate(actor: &Actor, target: &User) -> Result<(), DomainError> {
    if target.id == actor.id {
        return Err(DomainError::forbidden("cannot deactivate your own account"));
    }
    match actor.role {
        Role::SuperAdmin => Ok(()),
        Role::NutricionistaFuncionario => {
            ensure_same_tenant(actor, target.tenant_id)?;
            if target.role != Role::Paciente {
                return Err(DomainError::forbidden("staff can only deactivate patients"));
            }
            Ok(())
        }
        Role::NutricionistaAdmin => {
            ensure_same_tenant(actor, target.tenant_id)?;
            if target.role == Role::NutricionistaAdmin {
                return Err(DomainError::forbidden("cannot deactivate another admin"));
            }
            Ok(())
        }
        Role::Paciente => Err(DomainError::forbidden("patients cannot deactivate accounts")),
    }
}

/// Who may move `target` to `new_role`.
///
/// No one changes their own role. Clinic admins only move non-admin members
/// of their clinic between staff and patient.
pub fn can_change_role(actor: &Actor, target: &User, new_role: Role) -> Result<(), DomainError> {
    if target.id == actor.id {
        return Err(DomainError::forbidden("cannot change your own role"));
    }
    match actor.role {
        Role::SuperAdmin => Ok(()),
        Role::NutricionistaAdmin => {
            ensure_same_tenant(actor, target.tenant_id)?;
            if target.role == Role::NutricionistaAdmin {
                return Err(DomainError::forbidden("cannot change the role of another admin"));
            }
            if !matches!(new_role, Role::NutricionistaFuncionario | Role::Paciente) {
                return Err(DomainError::forbidden("role not allowed"));
            }
            Ok(())
        }
        _ => Err(DomainError::forbidden("only admins can change roles")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use nutri_auth::NewUser;
    use nutri_core::UserId;
    use proptest::prelude::*;
    use serde_json::json;

    fn user(role: Role, tenant_id: Option<TenantId>) -> User {
        NewUser {
            email: format!("{}@x.io", UserId::new()),
            password_hash: String::new(),
            name: "u".into(),
            role,
            tenant_id,
            nutricionista_id: None,
            crn: None,
            especialidade: None,
            metadata: json!({}),
        }
        .into_user(Utc::now())
    }

    fn actor_of(u: &User) -> Actor {
        Actor::new(u.id, u.role, u.tenant_id)
    }

    #[test]
    fn staff_creates_only_patients_in_own_tenant() {
        let t = TenantId::new();
        let staff = actor_of(&user(Role::NutricionistaFuncionario, Some(t)));

        assert!(can_create_user(&staff, Role::Paciente, Some(t)).is_ok());
        assert!(can_create_user(&staff, Role::NutricionistaFuncionario, Some(t)).is_err());
        assert!(can_create_user(&staff, Role::Paciente, Some(TenantId::new())).is_err());
        assert!(can_create_user(&staff, Role::Paciente, None).is_err());
    }

    #[test]
    fn admin_creates_staff_and_patients_only() {
        let t = TenantId::new();
        let admin = actor_of(&user(Role::NutricionistaAdmin, Some(t)));

        assert!(can_create_user(&admin, Role::NutricionistaFuncionario, Some(t)).is_ok());
        assert!(can_create_user(&admin, Role::Paciente, Some(t)).is_ok());
        assert!(can_create_user(&admin, Role::NutricionistaAdmin, Some(t)).is_err());
        assert!(can_create_user(&admin, Role::SuperAdmin, None).is_err());
    }

    #[test]
    fn admin_cannot_deactivate_another_admin() {
        let t = TenantId::new();
        let admin = actor_of(&user(Role::NutricionistaAdmin, Some(t)));

        assert!(can_deactivate(&admin, &user(Role::NutricionistaAdmin, Some(t))).is_err());
        assert!(can_deactivate(&admin, &user(Role::NutricionistaFuncionario, Some(t))).is_ok());
        assert!(can_deactivate(&admin, &user(Role::Paciente, Some(TenantId::new()))).is_err());
    }

    #[test]
    fn staff_deactivates_only_patients() {
        let t = TenantId::new();
        let staff = actor_of(&user(Role::NutricionistaFuncionario, Some(t)));

        assert!(can_deactivate(&staff, &user(Role::Paciente, Some(t))).is_ok());
        assert!(can_deactivate(&staff, &user(Role::NutricionistaFuncionario, Some(t))).is_err());
    }

    #[test]
    fn nobody_deactivates_themselves() {
        let root = user(Role::SuperAdmin, None);
        assert!(can_deactivate(&actor_of(&root), &root).is_err());
    }

    #[test]
    fn admin_role_changes_are_limited() {
        let t = TenantId::new();
        let admin = actor_of(&user(Role::NutricionistaAdmin, Some(t)));
        let staff = user(Role::NutricionistaFuncionario, Some(t));

        assert!(can_change_role(&admin, &staff, Role::Paciente).is_ok());
        assert!(can_change_role(&admin, &staff, Role::NutricionistaAdmin).is_err());
        assert!(can_change_role(&admin, &user(Role::NutricionistaAdmin, Some(t)), Role::Paciente).is_err());
        assert!(can_change_role(&admin, &user(Role::Paciente, Some(TenantId::new())), Role::NutricionistaFuncionario).is_err());
    }

    #[test]
    fn patients_see_only_themselves() {
        let t = TenantId::new();
        let me = user(Role::Paciente, Some(t));
        let actor = actor_of(&me);

        assert!(can_view_user(&actor, &me).is_ok());
        assert!(can_view_user(&actor, &user(Role::Paciente, Some(t))).is_err());
    }

    fn any_role() -> impl Strategy<Value = Role> {
        prop::sample::select(Role::ALL.to_vec())
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 256, ..ProptestConfig::default() })]

        /// Property: nobody may change their own role.
        #[test]
        fn no_self_role_change(role in any_role(), new_role in any_role()) {
            let tenant = if role.is_super_admin() { None } else { Some(TenantId::new()) };
            let me = user(role, tenant);
            prop_assert!(can_change_role(&actor_of(&me), &me, new_role).is_err());
        }

        /// Property: a clinic role never acts on an account of another clinic.
        #[test]
        fn clinic_roles_stay_in_their_tenant(role in any_role(), target_role in any_role(), new_role in any_role()) {
            prop_assume!(!role.is_super_admin());
            let actor = actor_of(&user(role, Some(TenantId::new())));
            let target = user(target_role, Some(TenantId::new()));

            prop_assert!(can_view_user(&actor, &target).is_err());
            prop_assert!(can_deactivate(&actor, &target).is_err());
            prop_assert!(can_change_role(&actor, &target, new_role).is_err());
            prop_assert!(can_create_user(&actor, new_role, target.tenant_id).is_err());
        }
    }
}
