use serde::{Deserialize, Serialize};

use crate::Role;

/// Permission identifier.
///
/// Serialized with its snake_case wire name (e.g. `"read_patient"`).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    CreateUser,
    ReadUser,
    UpdateUser,
    DeleteUser,

    CreateTenant,
    ReadTenant,
    UpdateTenant,
    DeleteTenant,
    ManageTenantSettings,

    CreatePatient,
    ReadPatient,
    UpdatePatient,
    DeletePatient,

    ReadOwnData,
    UpdateOwnData,

    ManageNutricionistaRoles,
    InviteNutricionista,
    RemoveNutricionista,
    ReadTenantReports,

    CreateConsultation,
    ReadConsultation,
    UpdateConsultation,
    DeleteConsultation,
}

use Permission::*;

impl Permission {
    pub const ALL: [Permission; 23] = [
        CreateUser,
        ReadUser,
        UpdateUser,
        DeleteUser,
        CreateTenant,
        ReadTenant,
        UpdateTenant,
        DeleteTenant,
        ManageTenantSettings,
        CreatePatient,
        ReadPatient,
        UpdatePatient,
        DeletePatient,
        ReadOwnData,
        UpdateOwnData,
        ManageNutricionistaRoles,
        InviteNutricionista,
        RemoveNutricionista,
        ReadTenantReports,
        CreateConsultation,
        ReadConsultation,
        UpdateConsultation,
        DeleteConsultation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CreateUser => "create_user",
            ReadUser => "read_user",
            UpdateUser => "update_user",
            DeleteUser => "delete_user",
            CreateTenant => "create_tenant",
            ReadTenant => "read_tenant",
            UpdateTenant => "update_tenant",
            DeleteTenant => "delete_tenant",
            ManageTenantSettings => "manage_tenant_settings",
            CreatePatient => "create_patient",
            ReadPatient => "read_patient",
            UpdatePatient => "update_patient",
            DeletePatient => "delete_patient",
            ReadOwnData => "read_own_data",
            UpdateOwnData => "update_own_data",
            ManageNutricionistaRoles => "manage_nutricionista_roles",
            InviteNutricionista => "invite_nutricionista",
            RemoveNutricionista => "remove_nutricionista",
            ReadTenantReports => "read_tenant_reports",
            CreateConsultation => "create_consultation",
            ReadConsultation => "read_consultation",
            UpdateConsultation => "update_consultation",
            DeleteConsultation => "delete_consultation",
        }
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

const SUPER_ADMIN: &[Permission] = &[
    CreateUser,
    ReadUser,
    UpdateUser,
    DeleteUser,
    CreateTenant,
    ReadTenant,
    UpdateTenant,
    DeleteTenant,
    ManageTenantSettings,
    CreatePatient,
    ReadPatient,
    UpdatePatient,
    DeletePatient,
    ManageNutricionistaRoles,
    InviteNutricionista,
    RemoveNutricionista,
    ReadTenantReports,
    CreateConsultation,
    ReadConsultation,
    UpdateConsultation,
    DeleteConsultation,
];

const NUTRICIONISTA_ADMIN: &[Permission] = &[
    CreatePatient,
    ReadPatient,
    UpdatePatient,
    DeletePatient,
    ReadOwnData,
    UpdateOwnData,
    ReadTenant,
    UpdateTenant,
    ManageTenantSettings,
    ManageNutricionistaRoles,
    InviteNutricionista,
    RemoveNutricionista,
    ReadTenantReports,
    CreateConsultation,
    ReadConsultation,
    UpdateConsultation,
    DeleteConsultation,
];

const NUTRICIONISTA_FUNCIONARIO: &[Permission] = &[
    CreatePatient,
    ReadPatient,
    UpdatePatient,
    ReadOwnData,
    UpdateOwnData,
    CreateConsultation,
    ReadConsultation,
    UpdateConsultation,
];

const PACIENTE: &[Permission] = &[ReadOwnData, UpdateOwnData];

/// Static role → permission mapping.
pub fn permissions_for(role: Role) -> &'static [Permission] {
    match role {
        Role::SuperAdmin => SUPER_ADMIN,
        Role::NutricionistaAdmin => NUTRICIONISTA_ADMIN,
        Role::NutricionistaFuncionario => NUTRICIONISTA_FUNCIONARIO,
        Role::Paciente => PACIENTE,
    }
}

pub fn has_permission(role: Role, permission: Permission) -> bool {
    permissions_for(role).contains(&permission)
}
