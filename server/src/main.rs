mod config;
mod routes;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use coach_engine::{AnalysisConfig, Analyzer};
use routes::AppState;

/// Chess engine analysis service.
#[derive(Parser)]
#[command(name = "coach-server", about = "UCI engine analysis over HTTP")]
struct Cli {
    /// Engine binary to run (overrides COACH_ENGINE_PATH).
    #[arg(long, global = true)]
    engine: Option<PathBuf>,

    /// Time budget per analysis in milliseconds (overrides COACH_ENGINE_TIMEOUT_MS).
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    /// Defaults to `serve` when omitted.
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the analysis API over HTTP.
    Serve {
        /// Listen address (overrides COACH_BIND_ADDR).
        #[arg(long)]
        bind: Option<SocketAddr>,
    },
    /// Analyze a single position and print the result as JSON.
    Analyze {
        /// Position in FEN.
        #[arg(long)]
        fen: String,

        /// Search depth (defaults to COACH_ENGINE_DEPTH or 15).
        #[arg(long)]
        depth: Option<u8>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing with span durations; stdout is reserved for results.
    use tracing_subscriber::fmt::format::FmtSpan;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut analysis_config = AnalysisConfig::from_env();
    if let Some(engine) = cli.engine {
        analysis_config.engine_path = engine;
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        analysis_config.time_budget = Duration::from_millis(timeout_ms);
    }
    tracing::info!(
        "Using engine {} (budget {:?}, default depth {})",
        analysis_config.engine_path.display(),
        analysis_config.time_budget,
        analysis_config.default_depth
    );

    let analyzer = Arc::new(Analyzer::new(analysis_config));

    match cli.command.unwrap_or(Commands::Serve { bind: None }) {
        Commands::Serve { bind } => serve(analyzer, bind.unwrap_or_else(config::get_bind_addr)).await,
        Commands::Analyze { fen, depth } => {
            let result = analyzer.analyze(&fen, depth).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
    }
}

async fn serve(analyzer: Arc<Analyzer>, addr: SocketAddr) -> anyhow::Result<()> {
    let app = routes::router(AppState { analyzer });

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!("Analysis server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("Analysis server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_analyze_subcommand() {
        let cli = Cli::try_parse_from([
            "coach-server",
            "--engine",
            "/usr/games/stockfish",
            "analyze",
            "--fen",
            "8/8/8/8/8/8/8/K6k w - - 0 1",
            "--depth",
            "12",
        ])
        .unwrap();

        assert_eq!(cli.engine, Some(PathBuf::from("/usr/games/stockfish")));
        match cli.command {
            Some(Commands::Analyze { fen, depth }) => {
                assert_eq!(fen, "8/8/8/8/8/8/8/K6k w - - 0 1");
                assert_eq!(depth, Some(12));
            }
            _ => panic!("expected analyze subcommand"),
        }
    }

    #[test]
    fn test_defaults_to_serve() {
        let cli = Cli::try_parse_from(["coach-server"]).unwrap();
        assert!(cli.command.is_none());
    }
}
