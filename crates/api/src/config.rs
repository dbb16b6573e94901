//! Server configuration.
//!
//! Parsed once at startup from flags and environment variables:
//!
//! | Flag | Variable | Default |
//! |------|----------|---------|
//! | `--bind` | `BIND_ADDR` | `0.0.0.0:3000` |
//! | `--jwt-secret` | `JWT_SECRET` | insecure dev secret (warns) |
//! | `--jwt-expiration` | `JWT_EXPIRATION` | `24h` |
//! | `--bcrypt-cost` | `BCRYPT_COST` | `12`, also the minimum |
//! | `--database-url` | `DATABASE_URL` | unset: in-memory stores |
//! | `--database-max-connections` | `DATABASE_MAX_CONNECTIONS` | `10` |
//! | `--access-log-limit` | `ACCESS_LOG_LIMIT` | `10000` |
//! | `--super-admin-email` | `SUPER_ADMIN_EMAIL` | unset |
//! | `--super-admin-password` | `SUPER_ADMIN_PASSWORD` | unset |
//! | `--super-admin-name` | `SUPER_ADMIN_NAME` | `Super Admin` |
//! | `--log-format` | `LOG_FORMAT` | `json` |

use std::net::SocketAddr;

use chrono::Duration;
use clap::{Parser, Subcommand};
use tracing::warn;

use nutri_auth::AuthConfig;
use nutri_auth::config::parse_ttl;
use nutri_auth::password::DEFAULT_BCRYPT_COST;
use nutri_infra::access_log::memory::DEFAULT_CAPACITY;
use nutri_observability::LogFormat;

pub const DEV_JWT_SECRET: &str = "nutri-dev-secret-change-me";

#[derive(Debug, Clone, Parser)]
#[command(name = "nutri-api")]
#[command(about = "Multi-tenant nutrition clinic API server")]
pub struct ServerArgs {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Address to listen on.
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:3000")]
    pub bind: SocketAddr,

    /// HS256 signing secret for access and refresh tokens.
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: Option<String>,

    /// Access token lifetime (`90s`, `15m`, `24h`, `7d`).
    #[arg(long, env = "JWT_EXPIRATION", default_value = "24h", value_parser = parse_ttl)]
    pub jwt_expiration: Duration,

    /// bcrypt work factor, 12 to 31.
    #[arg(
        long,
        env = "BCRYPT_COST",
        default_value_t = DEFAULT_BCRYPT_COST,
        value_parser = clap::value_parser!(u32).range(i64::from(DEFAULT_BCRYPT_COST)..=31)
    )]
    pub bcrypt_cost: u32,

    /// Postgres connection string. In-memory stores are used when absent.
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: Option<String>,

    #[arg(long, env = "DATABASE_MAX_CONNECTIONS", default_value_t = 10)]
    pub database_max_connections: u32,

    /// Entries kept by the in-memory access log; oldest are dropped first.
    #[arg(long, env = "ACCESS_LOG_LIMIT", default_value_t = DEFAULT_CAPACITY)]
    pub access_log_limit: usize,

    #[arg(long, env = "SUPER_ADMIN_EMAIL")]
    pub super_admin_email: Option<String>,

    #[arg(long, env = "SUPER_ADMIN_PASSWORD", hide_env_values = true)]
    pub super_admin_password: Option<String>,

    #[arg(long, env = "SUPER_ADMIN_NAME", default_value = "Super Admin")]
    pub super_admin_name: String,

    /// `json` or `pretty`.
    #[arg(long, env = "LOG_FORMAT", default_value = "json")]
    pub log_format: LogFormat,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Run the HTTP server (default).
    Serve,
    /// Create the bootstrap super admin if it does not exist yet, then exit.
    CreateSuperAdmin,
}

/// Bootstrap super admin credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuperAdminSeed {
    pub email: String,
    pub password: String,
    pub name: String,
}

impl ServerArgs {
    pub fn command(&self) -> Command {
        self.command.unwrap_or(Command::Serve)
    }

    pub fn jwt_secret(&self) -> String {
        match &self.jwt_secret {
            Some(secret) if !secret.is_empty() => secret.clone(),
            _ => {
                warn!("JWT_SECRET not set; using insecure dev default");
                DEV_JWT_SECRET.to_string()
            }
        }
    }

    pub fn auth_config(&self) -> AuthConfig {
        AuthConfig::default()
            .with_access_ttl(self.jwt_expiration)
            .with_bcrypt_cost(self.bcrypt_cost)
    }

    /// Seed credentials, when both email and password are configured.
    pub fn super_admin_seed(&self) -> Option<SuperAdminSeed> {
        match (&self.super_admin_email, &self.super_admin_password) {
            (Some(email), Some(password)) => Some(SuperAdminSeed {
                email: email.clone(),
                password: password.clone(),
                name: self.super_admin_name.clone(),
            }),
            _ => None,
        }
    }
}
