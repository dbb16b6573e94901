use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::Parser;

use nutri_api::app::{AppServices, build_app};
use nutri_api::config::{Command, ServerArgs};
use nutri_observability::LogSettings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = ServerArgs::parse();
    nutri_observability::tracing::init(&LogSettings {
        format: args.log_format,
        ..LogSettings::default()
    });

    let services = Arc::new(
        AppServices::from_args(&args)
            .await
            .context("failed to initialize stores")?,
    );

    match args.command() {
        Command::CreateSuperAdmin => create_super_admin(&args, &services).await,
        Command::Serve => serve(&args, services).await,
    }
}

async fn serve(args: &ServerArgs, services: Arc<AppServices>) -> anyhow::Result<()> {
    // In-memory runs start empty; seed the operator account when configured.
    if let Some(seed) = args.super_admin_seed() {
        services
            .ensure_super_admin(&seed)
            .await
            .context("failed to create bootstrap super admin")?;
    }

    let app = build_app(services);
    let listener = tokio::net::TcpListener::bind(args.bind)
        .await
        .with_context(|| format!("failed to bind {}", args.bind))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .await
        .context("server error")?;
    Ok(())
}

async fn create_super_admin(args: &ServerArgs, services: &AppServices) -> anyhow::Result<()> {
    let Some(seed) = args.super_admin_seed() else {
        bail!("SUPER_ADMIN_EMAIL and SUPER_ADMIN_PASSWORD must be set");
    };

    match services.ensure_super_admin(&seed).await? {
        Some(user) => tracing::info!(user_id = %user.id, email = %user.email, "super admin created"),
        None => tracing::info!(email = %seed.email, "super admin already exists"),
    }
    Ok(())
}
