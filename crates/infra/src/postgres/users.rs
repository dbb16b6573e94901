use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, Row};
use tracing::instrument;

use nutri_auth::{CredentialStore, NewUser, Role, StoreError, User, UserFilter, UserUpdate};
use nutri_core::{TenantId, UserId};

use super::{decode_error, map_sqlx_error};

const USER_COLUMNS: &str = "id, email, password_hash, name, role, tenant_id, is_active, last_login, \
     refresh_token_hash, nutricionista_id, crn, especialidade, metadata, created_at, updated_at";

/// Postgres-backed credential store over the `users` table.
#[derive(Debug, Clone)]
pub struct PgCredentialStore {
    pool: Arc<PgPool>,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }
}

#[async_trait::async_trait]
impl CredentialStore for PgCredentialStore {
    #[instrument(skip(self, email), err)]
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1 AND is_active"
        ))
        .bind(email)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_by_email", e))?;

        row.map(|r| UserRow::from_row(&r).map(User::from))
            .transpose()
            .map_err(|e| map_sqlx_error("find_by_email", e))
    }

    #[instrument(skip(self), fields(user_id = %id), err)]
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_by_id", e))?;

        row.map(|r| UserRow::from_row(&r).map(User::from))
            .transpose()
            .map_err(|e| map_sqlx_error("find_by_id", e))
    }

    #[instrument(skip(self, user), fields(role = %user.role), err)]
    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        let user = user.into_user(Utc::now());

        sqlx::query(
            r#"
            INSERT INTO users (
                id, email, password_hash, name, role, tenant_id, is_active, last_login,
                refresh_token_hash, nutricionista_id, crn, especialidade, metadata,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.name)
        .bind(user.role.as_str())
        .bind(user.tenant_id.map(uuid::Uuid::from))
        .bind(user.is_active)
        .bind(user.last_login)
        .bind(&user.refresh_token_hash)
        .bind(user.nutricionista_id.map(uuid::Uuid::from))
        .bind(&user.crn)
        .bind(&user.especialidade)
        .bind(&user.metadata)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_user", e))?;

        Ok(user)
    }

    /// Read-modify-write under a row lock, so concurrent partial updates of
    /// the same account do not lose each other's fields.
    #[instrument(skip(self, update), fields(user_id = %id), err)]
    async fn update_fields(&self, id: UserId, update: UserUpdate) -> Result<User, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("update_fields", e))?;

        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1 FOR UPDATE"))
            .bind(id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("update_fields", e))?
            .ok_or(StoreError::NotFound)?;
        let mut user = User::from(UserRow::from_row(&row).map_err(|e| map_sqlx_error("update_fields", e))?);

        update.apply(&mut user, Utc::now());

        sqlx::query(
            r#"
            UPDATE users SET
                email = $2, password_hash = $3, name = $4, role = $5, tenant_id = $6,
                is_active = $7, last_login = $8, refresh_token_hash = $9,
                nutricionista_id = $10, crn = $11, especialidade = $12, metadata = $13,
                updated_at = $14
            WHERE id = $1
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.name)
        .bind(user.role.as_str())
        .bind(user.tenant_id.map(uuid::Uuid::from))
        .bind(user.is_active)
        .bind(user.last_login)
        .bind(&user.refresh_token_hash)
        .bind(user.nutricionista_id.map(uuid::Uuid::from))
        .bind(&user.crn)
        .bind(&user.especialidade)
        .bind(&user.metadata)
        .bind(user.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update_fields", e))?;

        tx.commit().await.map_err(|e| map_sqlx_error("update_fields", e))?;
        Ok(user)
    }

    #[instrument(skip(self), err)]
    async fn list(&self, filter: &UserFilter) -> Result<Vec<User>, StoreError> {
        let mut query: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {USER_COLUMNS} FROM users WHERE TRUE"));

        if filter.active_only {
            query.push(" AND is_active");
        }
        if let Some(tenant_id) = filter.tenant_id {
            query.push(" AND tenant_id = ").push_bind(*tenant_id.as_uuid());
        }
        if let Some(nutricionista_id) = filter.nutricionista_id {
            query.push(" AND nutricionista_id = ").push_bind(*nutricionista_id.as_uuid());
        }
        if !filter.roles.is_empty() {
            let roles: Vec<&'static str> = filter.roles.iter().map(Role::as_str).collect();
            query.push(" AND role = ANY(").push_bind(roles).push(")");
        }
        query.push(" ORDER BY created_at, id");

        let rows = query
            .build()
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_users", e))?;

        rows.iter()
            .map(|r| UserRow::from_row(r).map(User::from))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| map_sqlx_error("list_users", e))
    }
}

// SQLx row types

#[derive(Debug)]
struct UserRow {
    id: uuid::Uuid,
    email: String,
    password_hash: String,
    name: String,
    role: Role,
    tenant_id: Option<uuid::Uuid>,
    is_active: bool,
    last_login: Option<DateTime<Utc>>,
    refresh_token_hash: Option<String>,
    nutricionista_id: Option<uuid::Uuid>,
    crn: Option<String>,
    especialidade: Option<String>,
    metadata: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for UserRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let role: String = row.try_get("role")?;
        Ok(UserRow {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            password_hash: row.try_get("password_hash")?,
            name: row.try_get("name")?,
            role: role.parse().map_err(|e| decode_error("role", e))?,
            tenant_id: row.try_get("tenant_id")?,
            is_active: row.try_get("is_active")?,
            last_login: row.try_get("last_login")?,
            refresh_token_hash: row.try_get("refresh_token_hash")?,
            nutricionista_id: row.try_get("nutricionista_id")?,
            crn: row.try_get("crn")?,
            especialidade: row.try_get("especialidade")?,
            metadata: row.try_get("metadata")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: UserId::from_uuid(row.id),
            email: row.email,
            password_hash: row.password_hash,
            name: row.name,
            role: row.role,
            tenant_id: row.tenant_id.map(TenantId::from_uuid),
            is_active: row.is_active,
            last_login: row.last_login,
            refresh_token_hash: row.refresh_token_hash,
            nutricionista_id: row.nutricionista_id.map(UserId::from_uuid),
            crn: row.crn,
            especialidade: row.especialidade,
            metadata: row.metadata,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
