//! # Souk Server
//!
//! Main binary. `souk serve` runs everything in one process:
//! - REST API (HTTP)
//! - WebSocket gateway (push notifications, presence)
//! - Email worker (delayed notification emails)
//!
//! `souk migrate` applies migrations and exits; `souk create-admin` seeds an
//! admin account, since admins cannot self-register.

use std::net::SocketAddr;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::sync::{broadcast, watch};

use souk_api::{build_router, AppState};
use souk_common::config::{self, AppConfig};
use souk_common::gateway_event::GatewayEvent;
use souk_common::ids::generate_id;
use souk_common::models::user::UserRole;
use souk_db::presence::PresenceStore;
use souk_db::repository::users;
use souk_db::Database;
use souk_gateway::GatewayState;
use souk_notify::{mailer, EmailQueue, EmailWorker, Notifier, RoutingConfig};

#[derive(Parser)]
#[command(name = "souk")]
#[command(author, version, about = "Souk marketplace backend")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the API, the gateway and the email worker (default)
    Serve,
    /// Apply database migrations and exit
    Migrate,
    /// Create an admin account
    CreateAdmin {
        #[arg(short, long)]
        email: String,

        #[arg(long, default_value = "Souk")]
        first_name: String,

        #[arg(long, default_value = "Admin")]
        last_name: String,

        #[arg(short, long, env = "SOUK_ADMIN_PASSWORD", hide_env_values = true)]
        password: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = config::init()?;
    init_tracing();

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Migrate => {
            let db = Database::connect(config).await?;
            db.migrate().await?;
            tracing::info!("Migrations applied");
            Ok(())
        }
        Command::CreateAdmin {
            email,
            first_name,
            last_name,
            password,
        } => create_admin(config, &email, &first_name, &last_name, &password).await,
    }
}

/// `RUST_LOG` overrides the default filter; `SOUK_LOG_JSON=1` switches to JSON lines.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "souk=debug,tower_http=debug".into());
    let json = std::env::var("SOUK_LOG_JSON").is_ok_and(|v| v == "1" || v == "true");

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn serve(config: &'static AppConfig) -> anyhow::Result<()> {
    tracing::info!("Starting Souk v{}", env!("CARGO_PKG_VERSION"));

    let db = Database::connect(config).await?;
    db.migrate().await?;

    // API mutations and the notifier publish here; the gateway forwards each
    // event to the sessions of the user it is addressed to.
    let (gateway_tx, _) = broadcast::channel::<GatewayEvent>(10_000);

    let presence = PresenceStore::from_database(&db, config.notifications.presence_ttl_secs);

    // === Notifications ===
    let queue = Arc::new(EmailQueue::new());
    let notifier = Notifier::new(
        db.pool.clone(),
        presence.clone(),
        gateway_tx.clone(),
        queue.clone(),
        RoutingConfig::from(&config.notifications),
    );
    let mailer = mailer::from_config(&config.email)?;
    EmailWorker::new(
        db.pool.clone(),
        queue,
        mailer,
        config.email.from_address.clone(),
        config.email.max_attempts,
        config.email.retry_base_secs,
    )
    .start();
    let recovered = notifier.recover_pending().await?;
    tracing::info!(provider = %config.email.provider, recovered, "Email worker ready");

    // === REST API ===
    let api_router = build_router(AppState {
        db: db.clone(),
        gateway_tx: gateway_tx.clone(),
        notifier,
        presence: presence.clone(),
    });
    let api_addr = SocketAddr::new(config.server.host.parse()?, config.server.port);

    // === WebSocket Gateway ===
    let gateway_router = souk_gateway::build_router(GatewayState::new(
        db,
        presence,
        gateway_tx,
        config.notifications.presence_ttl_secs,
    ));
    let gateway_addr = SocketAddr::new(config.server.host.parse()?, config.server.gateway_port);

    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = stop_tx.send(true);
    });

    tracing::info!("REST API listening on http://{api_addr}");
    tracing::info!("Gateway listening on ws://{gateway_addr}");

    tokio::try_join!(
        async {
            let listener = tokio::net::TcpListener::bind(api_addr).await?;
            axum::serve(listener, api_router)
                .with_graceful_shutdown(stopped(stop_rx.clone()))
                .await?;
            Ok::<_, anyhow::Error>(())
        },
        async {
            let listener = tokio::net::TcpListener::bind(gateway_addr).await?;
            axum::serve(listener, gateway_router)
                .with_graceful_shutdown(stopped(stop_rx.clone()))
                .await?;
            Ok::<_, anyhow::Error>(())
        },
    )?;

    tracing::info!("Souk stopped");
    Ok(())
}

async fn create_admin(
    config: &'static AppConfig,
    email: &str,
    first_name: &str,
    last_name: &str,
    password: &str,
) -> anyhow::Result<()> {
    let db = Database::connect(config).await?;
    db.migrate().await?;

    let email = email.trim();
    if users::find_by_email(&db.pool, email).await?.is_some() {
        anyhow::bail!("a user with email {email} already exists");
    }
    let password_hash =
        souk_api::auth::hash_password(password).map_err(|e| anyhow::anyhow!("{e}"))?;

    let user = users::create_user(
        &db.pool,
        &users::NewUser {
            id: generate_id(),
            email,
            phone: None,
            first_name,
            last_name,
            password_hash: &password_hash,
            role: UserRole::Admin,
        },
    )
    .await?;
    tracing::info!(user_id = %user.id, email = %user.email, "Admin account created");
    Ok(())
}

async fn stopped(mut rx: watch::Receiver<bool>) {
    let _ = rx.wait_for(|stop| *stop).await;
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining connections");
}
