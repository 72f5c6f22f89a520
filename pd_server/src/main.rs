//! Tournament desk REST server.
//!
//! Wires configuration, storage, the auth/tournament/registration managers
//! and the HTTP router, then serves until Ctrl-C.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Error};
use pd_server::{
    api::{self, AppState},
    config::{CliOverrides, ServerConfig},
    logging, metrics,
};
use pico_args::Arguments;
use pokerdesk::{
    auth::AuthManager,
    db::{Database, InMemoryRepository, PgTournamentRepository, SharedRepository},
    registration::RegistrationManager,
    tournament::{TournamentLocks, TournamentManager},
};
use tracing::{info, warn};

const HELP: &str = "\
Run the poker tournament desk server

USAGE:
  pd_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:6969]
  --db-url     URL         Database connection string  [default: env DATABASE_URL or postgres://postgres@localhost/pokerdesk]

FLAGS:
  --in-memory              Keep all data in process memory (no PostgreSQL)
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND                    Server bind address (e.g., 0.0.0.0:8080)
  DATABASE_URL                   PostgreSQL connection string
  JWT_SECRET                     JWT signing secret (required, 32+ chars)
  PASSWORD_PEPPER                Password hashing pepper (required, 16+ chars)
  ACCESS_TOKEN_MINUTES           Access token lifetime [default: 720]
  MANUAL_REGISTRATION_PASSWORD   Initial password for walk-in accounts
  METRICS_BIND                   Prometheus listener address (disabled when unset)
  STAFF_EMAIL, STAFF_PASSWORD    Staff account created at startup
  STAFF_NAME                     Display name of that account
  RUST_LOG                       Log filter [default: info,sqlx=warn,hyper=warn]
";

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let overrides = CliOverrides {
        bind: pargs
            .opt_value_from_str::<_, SocketAddr>("--bind")
            .context("Invalid --bind address")?,
        database_url: pargs
            .opt_value_from_str("--db-url")
            .context("Invalid --db-url")?,
        in_memory: pargs.contains("--in-memory"),
    };

    logging::init();

    let config = ServerConfig::from_env(overrides)?;
    config.validate()?;

    let (repo, database): (SharedRepository, Option<Database>) = if config.in_memory {
        warn!("Running with in-memory storage; data is lost on exit");
        (Arc::new(InMemoryRepository::new()), None)
    } else {
        info!("Connecting to database");
        let db = Database::new(&config.database)
            .await
            .context("Failed to connect to database")?;
        db.run_migrations()
            .await
            .context("Failed to apply migrations")?;
        info!("Database connected successfully");

        let pool = Arc::new(db.pool().clone());
        (Arc::new(PgTournamentRepository::new(pool)), Some(db))
    };

    let auth_manager = AuthManager::new(
        repo.clone(),
        config.security.password_pepper.clone(),
        config.security.jwt_secret.clone(),
    )
    .with_access_token_duration(chrono::Duration::minutes(
        config.security.access_token_minutes,
    ));

    if let Some(staff) = &config.staff {
        let user = auth_manager
            .ensure_staff_account(&staff.email, &staff.name, &staff.password)
            .await
            .context("Failed to create staff account")?;
        info!("Staff account ready: {}", user.email);
    }

    // Both managers serialize on the same per-tournament locks
    let locks = TournamentLocks::new();
    let tournament_manager =
        TournamentManager::new(repo.clone(), auth_manager.clone(), locks.clone());
    let registration_manager = RegistrationManager::new(
        repo,
        auth_manager.clone(),
        locks,
        config.manual_registration_password.clone(),
    );

    if let Some(addr) = config.metrics_bind {
        metrics::init_metrics(addr).map_err(anyhow::Error::msg)?;
        info!("Prometheus metrics on http://{}/metrics", addr);
    }

    let state = AppState {
        auth_manager: Arc::new(auth_manager),
        tournament_manager: Arc::new(tournament_manager),
        registration_manager: Arc::new(registration_manager),
        database: database.clone(),
    };
    let app = api::create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;
    info!("Tournament desk listening on http://{}", config.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(db) = database {
        db.close().await;
    }
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        // Without a signal handler, serve until the process is killed
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
