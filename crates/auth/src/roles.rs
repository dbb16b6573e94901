use core::str::FromStr;

use serde::{Deserialize, Serialize};

use nutri_core::DomainError;

/// Role of a user account.
///
/// The set is closed: every account holds exactly one of these, and the
/// permissions each role grants are fixed (see [`crate::permissions_for`]).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Platform operator. Never bound to a tenant.
    SuperAdmin,
    /// Clinic owner/administrator.
    NutricionistaAdmin,
    /// Clinic employee.
    NutricionistaFuncionario,
    /// Patient attached to a nutritionist.
    Paciente,
}

impl Role {
    pub const ALL: [Role; 4] = [
        Role::SuperAdmin,
        Role::NutricionistaAdmin,
        Role::NutricionistaFuncionario,
        Role::Paciente,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "super_admin",
            Role::NutricionistaAdmin => "nutricionista_admin",
            Role::NutricionistaFuncionario => "nutricionista_funcionario",
            Role::Paciente => "paciente",
        }
    }

    /// Both clinic roles (admin and employee).
    pub fn is_nutritionist(&self) -> bool {
        matches!(self, Role::NutricionistaAdmin | Role::NutricionistaFuncionario)
    }

    /// Roles that administer a tenant (the clinic admin, and the platform operator).
    pub fn is_tenant_admin(&self) -> bool {
        matches!(self, Role::NutricionistaAdmin | Role::SuperAdmin)
    }

    pub fn is_super_admin(&self) -> bool {
        matches!(self, Role::SuperAdmin)
    }

    /// Whether accounts with this role must belong to a tenant.
    pub fn requires_tenant(&self) -> bool {
        !self.is_super_admin()
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| DomainError::validation(format!("unknown role '{s}'")))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Role groups (used by route requirements)
// ─────────────────────────────────────────────────────────────────────────────

pub const SUPER_ADMIN_ONLY: &[Role] = &[Role::SuperAdmin];

pub const NUTRICIONISTA_ADMIN_ONLY: &[Role] = &[Role::NutricionistaAdmin];

pub const NUTRICIONISTA_ONLY: &[Role] = &[Role::NutricionistaAdmin, Role::NutricionistaFuncionario];

pub const PACIENTE_ONLY: &[Role] = &[Role::Paciente];

/// Clinic staff plus the platform operator.
pub const NUTRICIONISTA_OR_ADMIN: &[Role] = &[
    Role::NutricionistaAdmin,
    Role::NutricionistaFuncionario,
    Role::SuperAdmin,
];

pub const TENANT_ADMIN_ONLY: &[Role] = &[Role::NutricionistaAdmin, Role::SuperAdmin];

pub const AUTHENTICATED: &[Role] = &Role::ALL;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names_match_serde() {
        for role in Role::ALL {
            let json = serde_json::to_string(&role).unwrap();
            assert_eq!(json, format!("\"{}\"", role.as_str()));
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
    }

    #[test]
    fn unknown_role_is_rejected() {
        assert!("nutricionista".parse::<Role>().is_err());
    }

    #[test]
    fn classification() {
        assert!(Role::NutricionistaFuncionario.is_nutritionist());
        assert!(!Role::SuperAdmin.is_nutritionist());
        assert!(Role::SuperAdmin.is_tenant_admin());
        assert!(!Role::NutricionistaFuncionario.is_tenant_admin());
        assert!(!Role::SuperAdmin.requires_tenant());
        assert!(Role::Paciente.requires_tenant());
    }
}
