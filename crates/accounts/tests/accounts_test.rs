use std::sync::Arc;

use serde_json::json;

use nutri_accounts::{AccountService, AccountsError, Actor, Invitation, RoleChange, UserChanges};
use nutri_auth::{
    AuthConfig, AuthError, AuthService, BcryptHasher, CredentialStore, Hs256TokenSigner,
    InMemoryCredentialStore, InMemoryTenantStore, Registration, Role, User,
};
use nutri_core::TenantId;

type Accounts = AccountService<InMemoryCredentialStore, InMemoryTenantStore>;

const PASSWORD: &str = "secret123";

fn accounts() -> Accounts {
    let auth = AuthService::new(
        InMemoryCredentialStore::new(),
        InMemoryTenantStore::new(),
        BcryptHasher::new(4),
        Hs256TokenSigner::new(b"test-secret"),
        AuthConfig::default().with_bcrypt_cost(4),
    );
    AccountService::new(Arc::new(auth))
}

fn actor(user: &User) -> Actor {
    Actor::new(user.id, user.role, user.tenant_id)
}

struct Clinic {
    root: User,
    admin: User,
    staff: User,
    patient: User,
    tenant_id: TenantId,
}

async fn clinic(svc: &Accounts, subdomain: &str) -> Clinic {
    let root = svc
        .auth()
        .create_account(Registration::new(format!("root@{subdomain}.test"), PASSWORD, "Root", Role::SuperAdmin))
        .await
        .unwrap();

    let mut reg = Registration::new(format!("admin@{subdomain}.test"), PASSWORD, "Admin", Role::NutricionistaAdmin);
    reg.tenant_subdomain = Some(subdomain.to_string());
    reg.tenant_name = Some(format!("Clinic {subdomain}"));
    let admin = svc.auth().create_account(reg).await.unwrap();
    let tenant_id = admin.tenant_id.unwrap();

    let staff = svc
        .invite_nutricionista(
            &actor(&admin),
            Invitation {
                email: format!("staff@{subdomain}.test"),
                name: "Staff".into(),
                crn: Some("12345".into()),
                especialidade: None,
                temp_password: Some(PASSWORD.into()),
            },
        )
        .await
        .unwrap();

    let patient = svc
        .create_user(
            &actor(&staff),
            Registration::new(format!("patient@{subdomain}.test"), PASSWORD, "Patient", Role::Paciente)
                .in_tenant(tenant_id),
        )
        .await
        .unwrap();

    Clinic {
        root,
        admin,
        staff,
        patient,
        tenant_id,
    }
}

#[tokio::test]
async fn patient_created_by_staff_is_assigned_to_them() {
    let svc = accounts();
    let c = clinic(&svc, "acme").await;

    assert_eq!(c.patient.nutricionista_id, Some(c.staff.id));
    assert_eq!(c.patient.tenant_id, Some(c.tenant_id));

    let mine = svc.my_patients(&actor(&c.staff)).await.unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].id, c.patient.id);
    assert!(svc.my_patients(&actor(&c.admin)).await.unwrap().is_empty());
}

#[tokio::test]
async fn invited_staff_uses_default_password_when_none_given() {
    let svc = accounts();
    let c = clinic(&svc, "acme").await;

    let invited = svc
        .invite_nutricionista(
            &actor(&c.admin),
            Invitation {
                email: "new@acme.test".into(),
                name: "New".into(),
                crn: None,
                especialidade: None,
                temp_password: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(invited.role, Role::NutricionistaFuncionario);

    let session = svc
        .auth()
        .login("new@acme.test", "tempPassword123!", Some("acme"))
        .await
        .unwrap();
    assert_eq!(session.user.id, invited.id);
}

#[tokio::test]
async fn staff_cannot_create_staff() {
    let svc = accounts();
    let c = clinic(&svc, "acme").await;

    let err = svc
        .create_user(
            &actor(&c.staff),
            Registration::new("x@acme.test", PASSWORD, "X", Role::NutricionistaFuncionario).in_tenant(c.tenant_id),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AccountsError::Forbidden(_)));
}

#[tokio::test]
async fn nutricionista_creation_picks_role_from_tenant_presence() {
    let svc = accounts();
    let c = clinic(&svc, "acme").await;
    let root = actor(&c.root);

    let staff = svc
        .create_nutricionista(&root, Registration::new("s2@acme.test", PASSWORD, "S2", Role::Paciente), Some(c.tenant_id))
        .await
        .unwrap();
    assert_eq!(staff.role, Role::NutricionistaFuncionario);

    let mut reg = Registration::new("owner@beta.test", PASSWORD, "Owner", Role::Paciente);
    reg.tenant_subdomain = Some("beta".into());
    let owner = svc.create_nutricionista(&root, reg, None).await.unwrap();
    assert_eq!(owner.role, Role::NutricionistaAdmin);
    assert_ne!(owner.tenant_id, Some(c.tenant_id));
}

#[tokio::test]
async fn other_clinics_are_out_of_reach() {
    let svc = accounts();
    let a = clinic(&svc, "acme").await;
    let b = clinic(&svc, "beta").await;

    let admin = actor(&a.admin);
    assert!(matches!(
        svc.get_user(&admin, b.patient.id).await.unwrap_err(),
        AccountsError::Forbidden(_)
    ));
    assert!(svc.users_in_tenant(&admin, b.tenant_id).await.is_err());
    assert!(svc.deactivate(&admin, b.staff.id).await.is_err());
    assert!(svc.tenant_stats(&admin, b.tenant_id).await.is_err());

    assert!(svc.get_user(&actor(&a.root), b.patient.id).await.is_ok());
}

#[tokio::test]
async fn deactivated_accounts_lose_login_and_refresh() {
    let svc = accounts();
    let c = clinic(&svc, "acme").await;
    let session = svc
        .auth()
        .login("patient@acme.test", PASSWORD, Some("acme"))
        .await
        .unwrap();

    let user = svc.deactivate(&actor(&c.staff), c.patient.id).await.unwrap();
    assert!(!user.is_active);

    assert_eq!(
        svc.auth().refresh_token(&session.refresh_token).await.unwrap_err(),
        AuthError::InvalidRefreshToken
    );
    assert_eq!(
        svc.auth().login("patient@acme.test", PASSWORD, Some("acme")).await.unwrap_err(),
        AuthError::InvalidCredentials
    );
}

#[tokio::test]
async fn admin_cannot_deactivate_itself_or_another_admin() {
    let svc = accounts();
    let c = clinic(&svc, "acme").await;
    let admin = actor(&c.admin);

    assert!(svc.deactivate(&admin, c.admin.id).await.is_err());

    let other = svc
        .create_user(
            &actor(&c.root),
            Registration::new("admin2@acme.test", PASSWORD, "Admin 2", Role::NutricionistaAdmin).in_tenant(c.tenant_id),
        )
        .await
        .unwrap();
    assert!(svc.deactivate(&admin, other.id).await.is_err());
    assert!(svc.deactivate(&admin, c.staff.id).await.is_ok());
}

#[tokio::test]
async fn demoting_staff_to_patient_assigns_the_acting_admin() {
    let svc = accounts();
    let c = clinic(&svc, "acme").await;

    let changed = svc
        .change_role(&actor(&c.admin), c.staff.id, RoleChange::to(Role::Paciente))
        .await
        .unwrap();
    assert_eq!(changed.role, Role::Paciente);
    assert_eq!(changed.nutricionista_id, Some(c.admin.id));
    assert_eq!(changed.crn, None);
}

#[tokio::test]
async fn promoting_a_patient_clears_its_nutricionista() {
    let svc = accounts();
    let c = clinic(&svc, "acme").await;

    let changed = svc
        .change_role(&actor(&c.admin), c.patient.id, RoleChange::to(Role::NutricionistaFuncionario))
        .await
        .unwrap();
    assert_eq!(changed.nutricionista_id, None);
    assert_eq!(changed.tenant_id, Some(c.tenant_id));
}

#[tokio::test]
async fn promotion_to_super_admin_drops_the_tenant() {
    let svc = accounts();
    let c = clinic(&svc, "acme").await;

    let admin_try = svc
        .change_role(&actor(&c.admin), c.staff.id, RoleChange::to(Role::SuperAdmin))
        .await;
    assert!(matches!(admin_try, Err(AccountsError::Forbidden(_))));

    let changed = svc
        .change_role(&actor(&c.root), c.staff.id, RoleChange::to(Role::SuperAdmin))
        .await
        .unwrap();
    assert_eq!(changed.tenant_id, None);

    let session = svc.auth().login("staff@acme.test", PASSWORD, None).await.unwrap();
    assert_eq!(session.user.role, Role::SuperAdmin);
}

#[tokio::test]
async fn nobody_changes_their_own_role() {
    let svc = accounts();
    let c = clinic(&svc, "acme").await;

    let result = svc
        .change_role(&actor(&c.root), c.root.id, RoleChange::to(Role::Paciente))
        .await;
    assert!(matches!(result, Err(AccountsError::Forbidden(_))));
}

#[tokio::test]
async fn update_user_edits_profile_fields() {
    let svc = accounts();
    let c = clinic(&svc, "acme").await;

    let changes = UserChanges {
        name: Some("  Dr. Staff ".into()),
        especialidade: Some("Sports".into()),
        ..UserChanges::default()
    };
    let updated = svc.update_user(&actor(&c.admin), c.staff.id, changes).await.unwrap();
    assert_eq!(updated.name, "Dr. Staff");
    assert_eq!(updated.especialidade.as_deref(), Some("Sports"));
    assert_eq!(updated.crn.as_deref(), Some("12345"));

    let taken = UserChanges {
        email: Some("admin@acme.test".into()),
        ..UserChanges::default()
    };
    assert_eq!(
        svc.update_user(&actor(&c.admin), c.staff.id, taken).await.unwrap_err(),
        AccountsError::Auth(AuthError::EmailInUse)
    );

    let crn_on_patient = UserChanges {
        crn: Some("1".into()),
        ..UserChanges::default()
    };
    assert!(matches!(
        svc.update_user(&actor(&c.admin), c.patient.id, crn_on_patient).await,
        Err(AccountsError::Invalid(_))
    ));
}

#[tokio::test]
async fn tenant_settings_merge_or_replace() {
    let svc = accounts();
    let c = clinic(&svc, "acme").await;
    let admin = actor(&c.admin);

    svc.update_settings(&admin, c.tenant_id, json!({"maxPatients": 10, "allowedFeatures": ["reports"]}), true)
        .await
        .unwrap();
    let merged = svc
        .update_settings(&admin, c.tenant_id, json!({"maxPatients": 20}), true)
        .await
        .unwrap();
    assert_eq!(merged.settings, json!({"maxPatients": 20, "allowedFeatures": ["reports"]}));

    let replaced = svc
        .update_settings(&actor(&c.root), c.tenant_id, json!({"customBranding": {"logo": "x"}}), false)
        .await
        .unwrap();
    assert_eq!(replaced.settings, json!({"customBranding": {"logo": "x"}}));

    assert!(matches!(
        svc.update_settings(&admin, c.tenant_id, json!([1, 2]), true).await,
        Err(AccountsError::Invalid(_))
    ));
}

#[tokio::test]
async fn deactivated_tenant_blocks_member_login() {
    let svc = accounts();
    let c = clinic(&svc, "acme").await;

    assert!(svc.set_tenant_active(&actor(&c.admin), c.tenant_id, false).await.is_err());
    let tenant = svc.set_tenant_active(&actor(&c.root), c.tenant_id, false).await.unwrap();
    assert!(!tenant.is_active);

    assert_eq!(
        svc.auth().login("admin@acme.test", PASSWORD, Some("acme")).await.unwrap_err(),
        AuthError::InvalidTenant
    );
    assert!(svc.list_tenants(false).await.unwrap().is_empty());
    assert_eq!(svc.list_tenants(true).await.unwrap().len(), 1);
}

#[tokio::test]
async fn reports_count_members_per_nutricionista() {
    let svc = accounts();
    let c = clinic(&svc, "acme").await;
    let admin = actor(&c.admin);

    svc.create_user(
        &admin,
        Registration::new("p2@acme.test", PASSWORD, "P2", Role::Paciente).in_tenant(c.tenant_id),
    )
    .await
    .unwrap();

    let stats = svc.tenant_stats(&admin, c.tenant_id).await.unwrap();
    assert_eq!((stats.total_users, stats.nutricionistas, stats.pacientes), (4, 2, 2));
    assert_eq!(stats.name, "Clinic acme");

    let overview = svc.tenant_overview(&admin, c.tenant_id).await.unwrap();
    assert_eq!(overview.total_pacientes, 2);
    assert!(overview.nutricionista_details.iter().all(|d| d.patients_count == 1));

    let distribution = svc.patients_distribution(&admin, c.tenant_id).await.unwrap();
    assert_eq!(distribution.len(), 2);
    let staff_row = distribution.iter().find(|d| d.nutricionista_id == c.staff.id).unwrap();
    assert_eq!(staff_row.patients[0].id, c.patient.id);

    let details = svc.tenant_details(&actor(&c.root), c.tenant_id).await.unwrap();
    assert_eq!(details.users.len(), 4);
    assert_eq!(details.patients_per_nutricionista.len(), 2);
    let json = serde_json::to_value(&details).unwrap();
    assert_eq!(json["subdomain"], "acme");
    assert!(json["users"][0].get("passwordHash").is_none());
}

#[tokio::test]
async fn system_overview_counts_everything() {
    let svc = accounts();
    let a = clinic(&svc, "acme").await;
    clinic(&svc, "beta").await;
    svc.deactivate(&actor(&a.root), a.patient.id).await.unwrap();

    let overview = svc.system_overview().await.unwrap();
    assert_eq!(overview.total_users, 8);
    assert_eq!(overview.total_tenants, 2);
    assert_eq!(overview.users_by_role[&Role::SuperAdmin], 2);
    assert_eq!(overview.system_health.inactive_users, 1);
    assert_eq!(overview.system_health.tenants_with_users, 2);

    let json = serde_json::to_value(&overview).unwrap();
    assert_eq!(json["usersByRole"]["paciente"], 2);
    assert_eq!(svc.list_super_admins().await.unwrap().len(), 2);
}

#[tokio::test]
async fn profile_returns_the_callers_record_without_secrets() {
    let svc = accounts();
    let c = clinic(&svc, "acme").await;
    let me = svc.profile(&actor(&c.patient)).await.unwrap();
    assert_eq!(me.email, "patient@acme.test");
    assert!(me.password_hash.is_empty());

    let stored = svc.auth().users().find_by_id(c.patient.id).await.unwrap().unwrap();
    assert!(!stored.password_hash.is_empty());
}
