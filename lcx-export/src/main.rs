//! lcx-export - License and copyright export lists
//!
//! `serve` (the default) runs the HTTP service; `list` writes one export to
//! stdout without a row limit.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use lcx_common::config::{
    database_path, default_config_path, resolve_root_folder, TomlConfig, ROOT_FOLDER_ENV,
};
use lcx_common::db::init_database;
use lcx_export::export::copyright::CopyrightType;
use lcx_export::export::{ExportContext, ExportOutcome, ExportRequest};
use lcx_export::{build_router, AppState};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for lcx-export
#[derive(Parser, Debug)]
#[command(name = "lcx-export")]
#[command(about = "License and copyright export lists")]
#[command(version)]
struct Cli {
    /// Configuration file (default: <config dir>/lcx/config.toml)
    #[arg(short, long, env = "LCX_CONFIG")]
    config: Option<PathBuf>,

    /// Folder holding lcx.db
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP service
    Serve {
        /// Address to listen on (overrides bind_address)
        #[arg(short, long, env = "LCX_BIND_ADDRESS")]
        bind: Option<String>,
    },
    /// Print the export list of one upload item
    List {
        #[arg(long)]
        upload: i64,

        #[arg(long)]
        item: i64,

        /// License agent to include (repeatable)
        #[arg(long = "agent")]
        agents: Vec<String>,

        /// List copyright statements instead of licenses
        #[arg(long)]
        copyright: bool,

        /// Copyright files to list: `all` or `nolic`
        #[arg(long, default_value = "all")]
        copyright_type: String,

        /// Only the item and its direct children
        #[arg(long)]
        no_subfolders: bool,

        /// List folders and containers without results
        #[arg(long)]
        show_containers: bool,

        #[arg(long, default_value = "")]
        exclude: String,

        /// Write CSV instead of text
        #[arg(long)]
        csv: bool,

        /// Group used for the permission check (default: default_group_id)
        #[arg(long)]
        group: Option<i64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().or_else(default_config_path);
    let config_found = config_path.as_ref().is_some_and(|path| path.exists());
    let config = TomlConfig::load_or_default(config_path.as_deref())
        .context("Failed to load configuration")?;

    // Logs go to stderr so `list` output stays clean
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "lcx_export={level},lcx_common={level},tower_http={level}",
                    level = config.log_level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting lcx-export v{}", env!("CARGO_PKG_VERSION"));
    match (&config_path, config_found) {
        (Some(path), true) => info!("Config file: {}", path.display()),
        (Some(path), false) => warn!("Config file not found: {} (using defaults)", path.display()),
        (None, _) => warn!("Could not determine config directory, using defaults"),
    }

    let root_folder = resolve_root_folder(cli.root_folder.as_deref(), ROOT_FOLDER_ENV, &config);
    let db_path = database_path(&root_folder);
    info!("Database path: {}", db_path.display());

    let pool = init_database(&db_path)
        .await
        .context("Failed to initialize database")?;

    match cli.command.unwrap_or(Command::Serve { bind: None }) {
        Command::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| config.bind_address.clone());
            let state = AppState::new(pool, config.export.clone());
            serve(state, &bind).await
        }
        Command::List {
            upload,
            item,
            agents,
            copyright,
            copyright_type,
            no_subfolders,
            show_containers,
            exclude,
            csv,
            group,
        } => {
            let request = ExportRequest {
                upload_id: Some(upload),
                item_id: Some(item),
                agents,
                export_copyright: copyright,
                copyright_type: CopyrightType::from_param(Some(copyright_type.as_str())),
                include_subfolders: !no_subfolders,
                show_containers,
                exclude,
                download: csv,
            };
            let context = ExportContext {
                group_id: group.unwrap_or(config.export.default_group_id),
                row_limit: None,
                today: Local::now().date_naive(),
            };
            let state = AppState::new(pool, config.export.clone());
            list(&state, &request, context).await
        }
    }
}

async fn serve(state: AppState, bind: &str) -> Result<()> {
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind to {}", bind))?;
    info!("lcx-export listening on http://{}", bind);
    info!("Health check: http://{}/health", bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

async fn list(state: &AppState, request: &ExportRequest, context: ExportContext) -> Result<()> {
    let outcome = state
        .service
        .run(request, context)
        .await
        .context("Export failed")?;

    let mut stdout = std::io::stdout().lock();
    match outcome {
        ExportOutcome::NoContent => {
            bail!("Item {:?} is not part of upload {:?}", request.item_id, request.upload_id)
        }
        ExportOutcome::PermissionDenied => bail!("Permission Denied"),
        ExportOutcome::Display {
            warnings,
            list_output,
            ..
        } => {
            for warning in warnings {
                warn!("{}", warning);
            }
            stdout.write_all(list_output.as_bytes())?;
        }
        ExportOutcome::Download { warnings, csv, .. } => {
            for warning in warnings {
                warn!("{}", warning);
            }
            stdout.write_all(&csv)?;
        }
    }
    stdout.flush()?;
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
