//! ADMS Push Server
//!
//! HTTP server that attendance terminals push to and operators manage.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use adms_core::ProtocolConfig;
use adms_core::tracing_init::{DEFAULT_FILTER, LogFormat, init_tracing};
use clap::Parser;
use tracing::{info, warn};

use adms_server::storage::AdmsDatabase;
use adms_server::{AppState, build_router};

#[derive(Parser, Debug)]
#[command(name = "adms-server")]
#[command(version, about = "ADMS push server - attendance terminal gateway")]
struct Args {
    /// Address to listen on.
    #[arg(long, env = "ADMS_LISTEN_ADDR", default_value = "0.0.0.0:3000")]
    addr: SocketAddr,

    /// Path to SQLite database file.
    #[arg(long, env = "ADMS_DB_PATH")]
    db_path: Option<PathBuf>,

    /// Key required in the `x-api-key` header of admin requests.
    #[arg(long, env = "ADMIN_API_KEY", hide_env_values = true)]
    admin_api_key: Option<String>,

    /// Hours by which clock and timezone are lagged for unverified terminals.
    #[arg(long, env = "VERIFIED_OFFSET_HOURS", default_value_t = 5)]
    unverified_offset_hours: i64,

    /// Timezone recorded for new terminals.
    #[arg(long, env = "ADMS_DEFAULT_TIMEZONE", default_value = "+07:00")]
    default_timezone: String,

    /// Seconds of silence after which a terminal is marked offline.
    #[arg(long, default_value_t = 300)]
    offline_after: i64,

    /// Seconds between offline sweeps.
    #[arg(long, default_value_t = 60)]
    sweep_interval: u64,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(DEFAULT_FILTER, LogFormat::from_json_flag(args.log_json));

    info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %args.addr,
        "Starting adms-server"
    );

    let config = ProtocolConfig {
        default_timezone: args.default_timezone,
        unverified_offset_hours: args.unverified_offset_hours,
        offline_after_secs: args.offline_after,
        ..ProtocolConfig::default()
    };
    config.validate()?;

    let db_path = match args.db_path {
        Some(path) => path,
        None => default_db_path()?,
    };
    info!(path = %db_path.display(), "Opening ADMS database");
    let db = AdmsDatabase::open(&db_path).await?;

    if args.admin_api_key.as_deref().is_none_or(str::is_empty) {
        warn!("ADMIN_API_KEY not set; admin API will refuse every request");
    }

    let state = AppState::new(db, config, args.admin_api_key);

    // Mark silent terminals offline
    let sweep_registry = state.registry.clone();
    let sweep_every = Duration::from_secs(args.sweep_interval.max(1));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(sweep_every);
        interval.tick().await; // Skip first immediate tick
        loop {
            interval.tick().await;
            if let Err(e) = sweep_registry.sweep_offline().await {
                warn!(error = %e, "Offline sweep failed");
            }
        }
    });

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(args.addr).await?;
    info!(addr = %args.addr, "ADMS server listening");

    tokio::select! {
        result = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        ) => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
    }

    info!("ADMS server stopped");
    Ok(())
}

fn default_db_path() -> anyhow::Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Cannot determine home directory"))?;
    Ok(home.join(".adms").join("adms.db"))
}
