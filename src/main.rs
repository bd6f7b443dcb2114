use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use casedesk::config::Config;
use casedesk::db::{self, AppState};
use casedesk::handlers;
use casedesk::jwt;
use casedesk::storage::SupabaseStorage;

#[derive(Parser, Debug)]
#[command(name = "casedesk", about = "Tenant provisioning and access API")]
struct Cli {
    /// Bind address, overrides HOST from the environment
    #[arg(long)]
    host: Option<String>,

    /// Bind port, overrides PORT from the environment
    #[arg(long)]
    port: Option<u16>,

    /// SQLite database path, overrides DATABASE_PATH
    #[arg(long)]
    database: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "casedesk=info,tower_http=info".into()),
        )
        .init();

    let mut config = Config::from_env();
    if let Some(host) = cli.host {
        config.host = host;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(database) = cli.database {
        config.database_path = database;
    }

    // jwt-simple rejects HS256 keys shorter than 12 bytes at sign/verify
    // time; catch a weak secret at startup instead of per request.
    if config.session_secret.len() < 12 {
        anyhow::bail!("SESSION_SECRET must be set and at least 12 bytes");
    }
    if config.webhook_secret.is_empty() && !config.dev_mode {
        anyhow::bail!("IDENTITY_WEBHOOK_SECRET must be set");
    }

    let pool = db::open_pool(&config.database_path, 8)
        .context("failed to open database pool")?;
    {
        let conn = pool.get().context("failed to check out connection")?;
        db::init_db(&conn).context("failed to initialize schema")?;
    }

    let state = AppState {
        db: pool,
        session_key: jwt::session_key(&config.session_secret),
        webhook_secret: config.webhook_secret.clone(),
        storage: Arc::new(SupabaseStorage::new(
            &config.storage_url,
            &config.storage_service_key,
        )),
    };

    let app = handlers::router(state);

    let addr = config.addr();
    tracing::info!(%addr, database = %config.database_path, "starting server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}
