//! Audience Planner: segments a client base into a few high-coverage
//! audience groups, served over HTTP or computed once from the command line.

use audience_api::ApiServer;
use audience_core::config::AppConfig;
use audience_core::types::{FilterInput, SegmentationRequest};
use audience_segmentation::{register_segmentation_tool, JsonFileClientSource, SegmentationEngine, ToolRegistry};
use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "audience-planner")]
#[command(about = "Coverage-maximizing audience segmentation for campaign targeting")]
#[command(version)]
struct Cli {
    /// Optional TOML config file
    #[arg(long)]
    config: Option<String>,

    /// Client snapshot (JSON array of decrypted records, overrides config)
    #[arg(long, env = "AUDIENCE_PLANNER__POPULATION__PATH")]
    clients: Option<String>,

    /// HTTP port (overrides config)
    #[arg(long, env = "AUDIENCE_PLANNER__API__HTTP_PORT")]
    http_port: Option<u16>,

    /// Compute one strategy, print it as JSON and exit
    #[arg(long, default_value_t = false)]
    plan: bool,

    /// Filters for --plan, as a JSON array
    #[arg(long, requires = "plan")]
    filters: Option<String>,

    /// Segment cap for --plan
    #[arg(long, requires = "plan")]
    max_criteria: Option<usize>,

    /// Minimum group size for --plan
    #[arg(long, requires = "plan")]
    min_group_size: Option<usize>,
}

/// A config file named on the command line must load; without one, a bad
/// environment falls back to defaults.
fn load_config(file: Option<&str>) -> anyhow::Result<AppConfig> {
    match AppConfig::load(file) {
        Ok(config) => Ok(config),
        Err(e) if file.is_some() => Err(e.into()),
        Err(e) => {
            warn!(error = %e, "Failed to load config, using defaults");
            Ok(AppConfig::default())
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "audience_planner=info,audience_segmentation=info,tower_http=info".into()
            }),
        )
        .json()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    info!("Audience Planner starting up");

    // Load configuration
    let mut config = load_config(cli.config.as_deref())?;

    // Apply CLI overrides
    if let Some(path) = cli.clients {
        config.population.path = path;
    }
    if let Some(port) = cli.http_port {
        config.api.http_port = port;
    }

    info!(
        node_id = %config.node_id,
        population = %config.population.path,
        http_port = config.api.http_port,
        max_segment_groups = config.segmentation.max_segment_groups,
        "Configuration loaded"
    );

    let source = Arc::new(JsonFileClientSource::new(config.population.path.clone()));
    let engine = Arc::new(SegmentationEngine::new(source, config.segmentation.clone()));

    if cli.plan {
        let filters = cli
            .filters
            .as_deref()
            .map(serde_json::from_str::<Vec<FilterInput>>)
            .transpose()?;
        let request = SegmentationRequest {
            filters,
            max_criteria_used: cli.max_criteria,
            min_group_size: cli.min_group_size,
        };
        let result = engine.plan(request).await?;
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    // Register tools once; the registry is immutable afterwards
    let mut tools = ToolRegistry::new();
    register_segmentation_tool(&mut tools, engine.clone());
    info!(tools = tools.len(), "Tools registered");

    let api_server = ApiServer::new(config.clone(), engine, Arc::new(tools));

    // Start metrics exporter
    if let Err(e) = api_server.start_metrics().await {
        error!(error = %e, "Failed to start metrics exporter");
    }

    info!("Audience Planner is ready to serve traffic");

    // Start HTTP server (blocks until shutdown)
    api_server.start_http().await?;

    Ok(())
}
