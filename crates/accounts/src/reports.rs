//! Read-only reports for clinic admins and the platform operator.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use nutri_auth::{CredentialStore, PasswordHasher, Role, TenantStore, TokenSigner, User, UserFilter};
use nutri_core::{TenantId, UserId};

use crate::{AccountService, AccountsError, Actor, TenantStats};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NutricionistaDetail {
    pub id: UserId,
    pub name: String,
    pub role: Role,
    pub crn: Option<String>,
    pub especialidade: Option<String>,
    pub patients_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantOverview {
    pub total_users: usize,
    pub total_nutricionistas: usize,
    pub total_pacientes: usize,
    pub active_users: usize,
    pub nutricionista_details: Vec<NutricionistaDetail>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientBrief {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// One nutritionist and the patients assigned to them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientDistribution {
    pub nutricionista_id: UserId,
    pub nutricionista_name: String,
    pub patients_count: usize,
    pub patients: Vec<PatientBrief>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemHealth {
    pub active_users: usize,
    pub inactive_users: usize,
    pub tenants_with_users: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemOverview {
    pub total_users: usize,
    pub total_tenants: usize,
    pub active_tenants: usize,
    pub users_by_role: BTreeMap<Role, usize>,
    pub system_health: SystemHealth,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientsPerNutricionista {
    pub nutricionista_id: UserId,
    pub nutricionista_name: String,
    pub patients_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantDetails {
    #[serde(flatten)]
    pub stats: TenantStats,
    pub users: Vec<User>,
    pub nutricionistas: Vec<User>,
    pub patients_per_nutricionista: Vec<PatientsPerNutricionista>,
}

fn patients_of<'a>(patients: &'a [User], nutricionista_id: UserId) -> impl Iterator<Item = &'a User> + 'a {
    patients
        .iter()
        .filter(move |p| p.nutricionista_id == Some(nutricionista_id))
}

/// Split active members into (nutritionists, patients).
fn split_members(members: Vec<User>) -> (Vec<User>, Vec<User>) {
    let (nutricionistas, rest): (Vec<User>, Vec<User>) =
        members.into_iter().partition(|u| u.role.is_nutritionist());
    let pacientes = rest.into_iter().filter(|u| u.role == Role::Paciente).collect();
    (nutricionistas, pacientes)
}

impl<C, T, H, S> AccountService<C, T, H, S>
where
    C: CredentialStore,
    T: TenantStore,
    H: PasswordHasher,
    S: TokenSigner,
{
    pub async fn tenant_overview(&self, actor: &Actor, tenant_id: TenantId) -> Result<TenantOverview, AccountsError> {
        let members = self.users_in_tenant(actor, tenant_id).await?;
        let total_users = members.len();
        let active_users = members.iter().filter(|u| u.is_active).count();
        let (nutricionistas, pacientes) = split_members(members);

        let nutricionista_details = nutricionistas
            .iter()
            .map(|n| NutricionistaDetail {
                id: n.id,
                name: n.name.clone(),
                role: n.role,
                crn: n.crn.clone(),
                especialidade: n.especialidade.clone(),
                patients_count: patients_of(&pacientes, n.id).count(),
            })
            .collect();

        Ok(TenantOverview {
            total_users,
            total_nutricionistas: nutricionistas.len(),
            total_pacientes: pacientes.len(),
            active_users,
            nutricionista_details,
        })
    }

    pub async fn patients_distribution(
        &self,
        actor: &Actor,
        tenant_id: TenantId,
    ) -> Result<Vec<PatientDistribution>, AccountsError> {
        let members = self.users_in_tenant(actor, tenant_id).await?;
        let (nutricionistas, pacientes) = split_members(members);

        Ok(nutricionistas
            .into_iter()
            .map(|n| {
                let patients: Vec<PatientBrief> = patients_of(&pacientes, n.id)
                    .map(|p| PatientBrief {
                        id: p.id,
                        name: p.name.clone(),
                        email: p.email.clone(),
                        is_active: p.is_active,
                        created_at: p.created_at,
                    })
                    .collect();
                PatientDistribution {
                    nutricionista_id: n.id,
                    nutricionista_name: n.name,
                    patients_count: patients.len(),
                    patients,
                }
            })
            .collect())
    }

    /// Platform-wide counts. Every account is counted, active or not.
    pub async fn system_overview(&self) -> Result<SystemOverview, AccountsError> {
        let users = self.users().list(&UserFilter::default()).await?;
        let tenants = self.tenants().list(false).await?;

        let mut users_by_role = BTreeMap::new();
        for user in &users {
            *users_by_role.entry(user.role).or_insert(0) += 1;
        }

        let active_users = users.iter().filter(|u| u.is_active).count();
        let tenants_with_users = tenants
            .iter()
            .filter(|t| users.iter().any(|u| u.in_tenant(t.id)))
            .count();

        Ok(SystemOverview {
            total_users: users.len(),
            total_tenants: tenants.len(),
            active_tenants: tenants.iter().filter(|t| t.is_active).count(),
            users_by_role,
            system_health: SystemHealth {
                active_users,
                inactive_users: users.len() - active_users,
                tenants_with_users,
            },
        })
    }

    pub async fn tenant_details(&self, actor: &Actor, tenant_id: TenantId) -> Result<TenantDetails, AccountsError> {
        let stats = self.tenant_stats(actor, tenant_id).await?;
        let users = self.users_in_tenant(actor, tenant_id).await?;
        let nutricionistas = self.nutritionists_in_tenant(actor, tenant_id).await?;

        let patients_per_nutricionista = nutricionistas
            .iter()
            .map(|n| PatientsPerNutricionista {
                nutricionista_id: n.id,
                nutricionista_name: n.name.clone(),
                patients_count: patients_of(&users, n.id).count(),
            })
            .collect();

        Ok(TenantDetails {
            stats,
            users,
            nutricionistas,
            patients_per_nutricionista,
        })
    }
}
