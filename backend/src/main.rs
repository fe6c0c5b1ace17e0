//! Backend entry-point: loads settings, wires adapters and serves the REST API.

mod server;

use std::sync::Arc;

use actix_web::web;
use color_eyre::eyre::{Context, Result, eyre};
use mockable::DefaultClock;
use ortho_config::OrthoConfig;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use server::{AppSettings, Secret, ServerConfig, create_server};
use tracker_backend::domain::{PasswordHasher, Repositories, ServiceDeps, Services, TokenSigner};
use tracker_backend::inbound::http::health::{HealthState, StorageBackend};
use tracker_backend::outbound::mail::TracingMailer;
use tracker_backend::outbound::memory::MemoryStore;
use tracker_backend::outbound::persistence::{self, DbPool, PoolConfig, run_migrations};

/// Application bootstrap.
#[actix_web::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = AppSettings::load_from_iter(std::env::args_os())
        .map_err(|err| eyre!("failed to load settings: {err}"))?;
    let bind_addr = settings.bind_addr()?;
    let service_config = settings.service_config()?;
    let secret = load_secret(&settings)?;
    let (repos, storage) = build_repositories(&settings).await?;

    let services = Services::new(
        ServiceDeps {
            repos,
            mailer: Arc::new(TracingMailer::new()),
            clock: Arc::new(DefaultClock),
            hasher: PasswordHasher::default(),
            signer: TokenSigner::new(secret.bytes().to_vec()),
        },
        service_config,
    );

    let config = ServerConfig::new(secret.key().clone(), bind_addr, services)
        .with_cookie_secure(settings.cookie_secure);
    let health_state = web::Data::new(HealthState::new(storage));
    info!(%bind_addr, "starting server");
    create_server(health_state, config)
        .wrap_err("failed to start HTTP server")?
        .await
        .wrap_err("HTTP server stopped unexpectedly")
}

fn load_secret(settings: &AppSettings) -> Result<Secret> {
    let path = settings.secret_key_file();
    match Secret::load(&path) {
        Ok(secret) => Ok(secret),
        Err(err) if cfg!(debug_assertions) => {
            warn!(path = %path.display(), error = %err, "using temporary secret key (dev only)");
            Ok(Secret::ephemeral())
        }
        Err(err) => Err(err.into()),
    }
}

async fn build_repositories(settings: &AppSettings) -> Result<(Repositories, StorageBackend)> {
    let Some(database_url) = settings.database_url.as_deref() else {
        warn!("no database configured; data lives in memory only");
        return Ok((
            MemoryStore::repositories(&MemoryStore::new()),
            StorageBackend::Memory,
        ));
    };
    run_migrations(database_url)
        .await
        .wrap_err("failed to migrate the database")?;
    let mut pool_config = PoolConfig::new(database_url);
    if let Some(max_size) = settings.database_max_connections {
        pool_config = pool_config.with_max_size(max_size);
    }
    let pool = DbPool::new(pool_config)
        .await
        .wrap_err("failed to build the connection pool")?;
    Ok((persistence::repositories(pool), StorageBackend::Postgres))
}
