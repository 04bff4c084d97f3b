use anyhow::Context as _;
use clap::{Parser, ValueEnum};
use mcp_toolhub::config::HubConfig;
use mcp_toolhub::http::{HubState, router};
use mcp_toolhub::pipeline::Pipeline;
use mcp_toolhub::registry::{ClientRegistry, ServerRegistry};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "mcp-toolhub", version, about)]
struct Args {
    /// Path to the hub config (YAML or JSON).
    #[arg(short, long, env = "MCP_TOOLHUB_CONFIG")]
    config: PathBuf,

    /// Address to serve HTTP on.
    #[arg(long, env = "MCP_TOOLHUB_BIND", default_value = "127.0.0.1:8080")]
    bind: SocketAddr,

    /// Default log level; `RUST_LOG` overrides it.
    #[arg(long, env = "MCP_TOOLHUB_LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[arg(long, env = "MCP_TOOLHUB_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

fn init_tracing(level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level, args.log_format);

    let cfg = HubConfig::load(&args.config)
        .with_context(|| format!("load config {}", args.config.display()))?;

    let servers = ServerRegistry::connect(&cfg.servers, cfg.hub.startup_timeout()).await;
    tracing::info!(
        configured = cfg.servers.len(),
        connected = servers.len(),
        clients = cfg.clients.len(),
        "registries ready"
    );

    let shutdown = CancellationToken::new();
    let state = Arc::new(HubState {
        pipeline: Pipeline::with_settings(
            Arc::new(servers),
            Arc::new(ClientRegistry::from_config(&cfg)),
            &cfg.hub,
        ),
        shutdown: shutdown.clone(),
    });

    let listener = tokio::net::TcpListener::bind(args.bind)
        .await
        .with_context(|| format!("bind {}", args.bind))?;
    tracing::info!(bind = %args.bind, "mcp-toolhub listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await
        .context("serve http")?;

    tracing::info!("mcp-toolhub stopped");
    Ok(())
}

/// Resolve on Ctrl-C or SIGTERM, cancelling in-flight validations first.
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for ctrl-c");
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
                tracing::warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }

    tracing::info!("shutdown requested");
    shutdown.cancel();
}
