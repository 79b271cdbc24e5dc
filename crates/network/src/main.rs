//! CiteForge CLI
//!
//! Traces the citation network around one paper:
//! 1. Resolves the start paper by DOI, PMID, service id or title search
//! 2. Expands citing and referenced papers breadth-first
//! 3. Prints a summary and exports the knowledge graph as JSON
//!
//! A previously exported graph can be reloaded with `--network-file`.

use anyhow::Context;
use citeforge_common::{config::AppConfig, metrics, ScholarApi, SemanticScholarClient, VERSION};
use citeforge_network::{CitationGraph, ExportedGraph, NetworkBuilder, NetworkSummary};
use clap::{Args, Parser};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "citeforge",
    version,
    about = "Trace citation networks through the Semantic Scholar API"
)]
struct Cli {
    #[command(flatten)]
    input: Input,

    /// Center paper id when reloading a network file
    #[arg(long, requires = "network_file")]
    paper_id: Option<String>,

    /// Citation search depth
    #[arg(short, long)]
    depth: Option<usize>,

    /// Max papers fetched per direction per paper
    #[arg(long)]
    max_per_level: Option<usize>,

    /// Hard cap on papers in the network
    #[arg(long)]
    node_cap: Option<usize>,

    /// Minimum delay between API requests in milliseconds
    #[arg(long)]
    delay_ms: Option<u64>,

    /// Number of most-cited papers to list
    #[arg(long, default_value_t = 5)]
    top: usize,

    /// Output knowledge graph file
    #[arg(short, long, default_value = "citation_network.json")]
    output: PathBuf,

    /// Configuration file (defaults to config/default + APP__ variables)
    #[arg(long)]
    config: Option<String>,
}

#[derive(Debug, Args)]
#[group(required = true, multiple = false)]
struct Input {
    /// Paper DOI to query
    #[arg(long)]
    doi: Option<String>,

    /// PubMed ID to query
    #[arg(long)]
    pmid: Option<String>,

    /// Semantic Scholar paper id to query
    #[arg(long)]
    id: Option<String>,

    /// Paper title to search; the best match becomes the center
    #[arg(long)]
    title: Option<String>,

    /// Exported network JSON file to reload instead of querying
    #[arg(short = 'n', long)]
    network_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Load configuration
    let mut config = match &cli.config {
        Some(path) => AppConfig::from_file(path),
        None => AppConfig::load(),
    }
    .context("Failed to load configuration")?;
    apply_overrides(&mut config, &cli);

    init_tracing(&config);
    metrics::register_metrics();

    info!("Starting CiteForge v{}", VERSION);

    let (graph, center_id) = match &cli.input.network_file {
        Some(path) => load_offline(path, cli.paper_id.clone())?,
        None => build_online(&config, &cli.input).await?,
    };

    println!("\n{}", NetworkSummary::from_graph(&graph, center_id.as_deref(), cli.top));

    let exported = graph.export(center_id.as_deref());
    exported
        .write_to(&cli.output)
        .with_context(|| format!("Failed to write {}", cli.output.display()))?;
    println!(
        "Exported {} nodes and {} edges to {}",
        exported.nodes.len(),
        exported.edges.len(),
        cli.output.display()
    );

    Ok(())
}

fn apply_overrides(config: &mut AppConfig, cli: &Cli) {
    if let Some(depth) = cli.depth {
        config.traversal.max_depth = depth;
    }
    if let Some(max_per_level) = cli.max_per_level {
        config.traversal.max_per_level = max_per_level;
    }
    if let Some(node_cap) = cli.node_cap {
        config.traversal.node_cap = node_cap;
    }
    if let Some(delay_ms) = cli.delay_ms {
        config.scholar.min_interval_ms = delay_ms;
    }
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.observability.log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    if config.observability.json_logging {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_offline(
    path: &PathBuf,
    paper_id: Option<String>,
) -> anyhow::Result<(CitationGraph, Option<String>)> {
    info!(path = %path.display(), "Loading offline network");
    let exported = ExportedGraph::read_from(path)
        .with_context(|| format!("Failed to load network file {}", path.display()))?;

    let graph = CitationGraph::from_export(&exported);
    let center_id = paper_id.or_else(|| exported.center_id().map(String::from));
    info!(papers = graph.node_count(), citations = graph.edge_count(), "Loaded offline network");

    Ok((graph, center_id))
}

async fn build_online(
    config: &AppConfig,
    input: &Input,
) -> anyhow::Result<(CitationGraph, Option<String>)> {
    let client: Arc<dyn ScholarApi> = Arc::new(SemanticScholarClient::new(&config.scholar)?);

    let query = match (&input.doi, &input.pmid, &input.id, &input.title) {
        (Some(doi), ..) => doi.clone(),
        (_, Some(pmid), ..) => pmid.clone(),
        (_, _, Some(id), _) => id.clone(),
        (.., Some(title)) => pick_by_title(client.as_ref(), title).await?,
        _ => anyhow::bail!("No query given"),
    };

    // Ctrl+C stops the traversal between nodes; the partial network is kept
    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Received Ctrl+C, stopping after the current paper...");
            let _ = cancel_tx.send(true);
        }
    });

    let builder =
        NetworkBuilder::new(client, config.traversal.clone())?.with_cancellation(cancel_rx);
    let build = builder.build(&query).await.map_err(|e| {
        error!(error = %e, "Could not build citation network");
        e
    })?;

    println!(
        "Traversal stopped: {} ({} papers expanded, {} failed fetches)",
        build.stats.stop_reason, build.stats.expanded, build.stats.failed_fetches
    );

    Ok((build.graph, Some(build.center_id)))
}

async fn pick_by_title(client: &dyn ScholarApi, title: &str) -> anyhow::Result<String> {
    info!(title = %title, "Searching by title");
    let matches = client.search(title, 5).await?;

    let Some(best) = matches.first() else {
        anyhow::bail!("No papers found for title: {}", title);
    };

    println!("Found {} matches:", matches.len());
    for (i, paper) in matches.iter().enumerate() {
        println!("   {}. [{}] {}", i + 1, paper.year, paper.short_title(80));
    }
    println!("Using: {}", best.short_title(80));

    Ok(best.id.clone())
}
