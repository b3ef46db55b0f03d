//! herakles-process-control - version 0.1.0
//!
//! Process metrics endpoint with a durable, reconciled kill list.
//! This is the main entry point that initializes the server and handles subcommands.

mod cli;
mod commands;
mod config;
mod handlers;
mod state;
mod telemetry;

use axum::{routing::get, Router};
use axum_server::tls_rustls::RustlsConfig;
use clap::Parser;
use herakles_process_control::{KillListStore, ReconciliationEngine};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::{net::TcpListener, signal};
use tracing::{debug, error, info, warn, Level};

use cli::{Args, Commands, LogLevel};
use commands::{command_check, command_config, command_kill_list, command_reconcile};
use config::{
    resolve_config, show_config, validate_effective_config, Config, DEFAULT_BIND_ADDR, DEFAULT_PORT,
};
use handlers::{
    health_handler, html_dashboard_handler, metrics_handler, root_handler, sysinfo_get_handler,
    sysinfo_post_handler,
};
use state::{AppState, SharedState};

/// Initializes tracing logging subsystem with configured log level.
fn setup_logging(level: LogLevel) {
    let log_level = match level {
        LogLevel::Off => Level::ERROR,
        LogLevel::Error => Level::ERROR,
        LogLevel::Warn => Level::WARN,
        LogLevel::Info => Level::INFO,
        LogLevel::Debug => Level::DEBUG,
        LogLevel::Trace => Level::TRACE,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");

    info!("Logging initialized with level: {:?}", level);
}

/// Helper function to load and validate configuration.
/// Exits the process with error code 1 if validation fails.
fn load_validated_config(args: &Args) -> Result<(Config, LogLevel), Box<dyn std::error::Error>> {
    let config = resolve_config(args)?;
    if let Err(e) = validate_effective_config(&config) {
        eprintln!("❌ Configuration invalid: {}", e);
        std::process::exit(1);
    }
    let level = config.log_level()?;
    Ok((config, level))
}

/// Runs a reconciliation pass on a fixed period.
///
/// Each pass is an independent unit of work on the blocking pool, exactly
/// like a `kill_loop_check` request.
async fn reconcile_loop(state: SharedState, period: Duration) {
    let mut ticker = tokio::time::interval(period);
    // The first tick completes immediately; skip it so startup stays quiet.
    ticker.tick().await;

    loop {
        ticker.tick().await;
        let worker_state = state.clone();
        let result = tokio::task::spawn_blocking(move || {
            let store = worker_state.store();
            let table = worker_state.process_table();
            let report = ReconciliationEngine::new(&store, &table).reconcile();
            (report, store.load().len())
        })
        .await;

        match result {
            Ok((report, remaining)) => {
                if report.processed_count > 0 {
                    info!(
                        "Scheduled reconciliation: {} processed, {} remaining in kill list",
                        report.processed_count, remaining
                    );
                }
                if let Some(metrics) = &state.metrics {
                    metrics.record_reconciliation(&report);
                    metrics.kill_list_entries.set(remaining as f64);
                }
            }
            Err(e) => error!("Scheduled reconciliation task failed: {}", e),
        }
    }
}

/// Main application entry point.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Early config resolution for show/check modes
    if args.show_config || args.check_config {
        let config = resolve_config(&args)?;

        if args.check_config {
            if let Err(e) = validate_effective_config(&config) {
                eprintln!("❌ Configuration invalid: {}", e);
                std::process::exit(1);
            }
            println!("✅ Configuration is valid");
            return Ok(());
        }

        return show_config(&config, args.config_format);
    }

    // Handle subcommands
    if let Some(command) = &args.command {
        if let Commands::Config {
            output,
            format,
            commented,
        } = command
        {
            return command_config(output.clone(), format.clone(), *commented);
        }

        let (config, level) = load_validated_config(&args)?;
        if level != LogLevel::Off {
            setup_logging(level);
        }

        return match command {
            Commands::Check => command_check(&config),
            Commands::Reconcile => command_reconcile(&config),
            Commands::KillList { action } => command_kill_list(action, &config),
            Commands::Config { .. } => unreachable!("Config handled above"),
        };
    }

    // Load configuration for main server mode
    let (config, level) = load_validated_config(&args)?;

    setup_logging(level);

    info!("Starting herakles-process-control");

    let bind_ip_str = config
        .bind
        .clone()
        .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
    let port = config.port.unwrap_or(DEFAULT_PORT);
    let enable_health = config.enable_health.unwrap_or(true);
    let enable_telemetry = config.enable_telemetry.unwrap_or(true);
    let reconcile_interval = config.reconcile_interval_seconds.unwrap_or(0);

    let state = Arc::new(AppState::new(config.clone(), enable_telemetry)?);
    debug!("Application state initialized");

    if !state.proc_root.exists() {
        warn!(
            "⚠️  Process table root {} does not exist - listings will be empty",
            state.proc_root.display()
        );
    }
    if !nix::unistd::geteuid().is_root() {
        warn!("⚠️  Not running as root - kills of foreign processes will be denied");
    }

    let initial_entries = state.store().load().len();
    info!(
        "Kill list {} holds {} entries",
        state.kill_list_path.display(),
        initial_entries
    );
    if let Some(metrics) = &state.metrics {
        metrics.kill_list_entries.set(initial_entries as f64);
    }

    if reconcile_interval > 0 {
        info!(
            "Background reconciliation enabled every {} seconds",
            reconcile_interval
        );
        tokio::spawn(reconcile_loop(
            state.clone(),
            Duration::from_secs(reconcile_interval),
        ));
    } else {
        info!("Background reconciliation disabled - kill list reconciled on request only");
    }

    // Setup graceful shutdown signal handlers
    let shutdown_signal = async {
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
                info!("Received SIGINT (Ctrl+C), shutting down gracefully...");
            }
            _ = terminate => {
                info!("Received SIGTERM, shutting down gracefully...");
            }
        }
    };

    // Configure HTTP server routes
    let addr: SocketAddr = format!("{}:{}", bind_ip_str, port).parse()?;

    let mut app = Router::new()
        .route("/", get(root_handler))
        .route("/html", get(html_dashboard_handler))
        .route("/html/", get(html_dashboard_handler))
        .route(
            "/sysinfo",
            get(sysinfo_get_handler).post(sysinfo_post_handler),
        );

    if enable_health {
        app = app.route("/health", get(health_handler));
    }
    if enable_telemetry {
        app = app.route("/metrics", get(metrics_handler));
    }

    let app = app.with_state(state.clone());

    // Check if TLS is enabled
    let enable_tls = config.enable_tls.unwrap_or(false);

    if enable_tls {
        // These paths are guaranteed to exist since validate_effective_config() was called earlier
        let (Some(cert_path), Some(key_path)) =
            (config.tls_cert_path.as_ref(), config.tls_key_path.as_ref())
        else {
            return Err("TLS enabled without tls_cert_path/tls_key_path".into());
        };

        info!("Loading TLS certificate from: {}", cert_path);
        info!("Loading TLS private key from: {}", key_path);

        let tls_config = RustlsConfig::from_pem_file(cert_path, key_path)
            .await
            .map_err(|e| {
                error!("Failed to load TLS configuration: {}", e);
                e
            })?;

        info!(
            "herakles-process-control listening on https://{}:{}",
            bind_ip_str, port
        );

        let server = axum_server::bind_rustls(addr, tls_config).serve(app.into_make_service());

        tokio::select! {
            result = server => {
                if let Err(e) = result {
                    error!("Server error: {}", e);
                    return Err(e.into());
                }
            }
            _ = shutdown_signal => {
                info!("Shutdown signal received, exiting...");
            }
        }
    } else {
        let listener = TcpListener::bind(addr).await?;
        info!(
            "herakles-process-control listening on http://{}:{}",
            bind_ip_str, port
        );

        let server = axum::serve(listener, app);

        tokio::select! {
            result = server => {
                if let Err(e) = result {
                    error!("Server error: {}", e);
                    return Err(e.into());
                }
            }
            _ = shutdown_signal => {
                info!("Shutdown signal received, exiting...");
            }
        }
    }

    info!("herakles-process-control stopped gracefully");
    Ok(())
}
