use clap::{Args, Parser, Subcommand};
use dotenv::dotenv;
use itertools::Itertools;
use routegen::config::{
    DEFAULT_FLUSH_EVERY, DEFAULT_MAX_HOPS, DEFAULT_MAX_ROUTES, DEFAULT_OUTPUT,
    DEFAULT_QUERY_TIMEOUT_SECS, DEFAULT_SUBMIT_BACKOFF_MS, DEFAULT_SUBMIT_RETRIES, DEFAULT_WORKERS,
};
use routegen::{
    DumpConfig, DumpOrchestrator, PoolGraph, Route, RouteError, Universe, encode_route,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "routegen")]
#[command(about = "Swap route generator over dex pool listings", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Dump ranked routes for every ordered token pair in the listings
    Dump {
        /// Dex listing files (JSON)
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[command(flatten)]
        ranking: RankingArgs,
        /// Output file, appended to
        #[arg(long, env = "ROUTEGEN_OUT", default_value = DEFAULT_OUTPUT)]
        out: PathBuf,
        /// Worker threads
        #[arg(long, alias = "routine", env = "ROUTEGEN_WORKERS", default_value_t = DEFAULT_WORKERS)]
        workers: usize,
        /// Task queue capacity (defaults to the number of token pairs)
        #[arg(long, env = "ROUTEGEN_QUEUE_CAPACITY")]
        queue_capacity: Option<usize>,
        /// Lines written between syncs to disk
        #[arg(long, env = "ROUTEGEN_FLUSH_EVERY", default_value_t = DEFAULT_FLUSH_EVERY)]
        flush_every: usize,
        /// Per-pair query deadline in seconds, 0 to wait forever
        #[arg(long, env = "ROUTEGEN_QUERY_TIMEOUT", default_value_t = DEFAULT_QUERY_TIMEOUT_SECS)]
        query_timeout: u64,
        /// Resubmissions when the task queue is full
        #[arg(long, env = "ROUTEGEN_SUBMIT_RETRIES", default_value_t = DEFAULT_SUBMIT_RETRIES)]
        submit_retries: usize,
    },
    /// Print ranked routes between two tokens
    Query {
        token0: String,
        token1: String,
        /// Dex listing files (JSON)
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[command(flatten)]
        ranking: RankingArgs,
    },
    /// List the deduplicated token universe of the listings
    Tokens {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

#[derive(Args)]
struct RankingArgs {
    /// Max hops per route
    #[arg(long, alias = "op", env = "ROUTEGEN_MAX_HOPS", default_value_t = DEFAULT_MAX_HOPS)]
    max_hops: usize,
    /// Max routes kept per pair
    #[arg(long, alias = "max-steps", env = "ROUTEGEN_MAX_ROUTES", default_value_t = DEFAULT_MAX_ROUTES)]
    max_routes: usize,
}

fn load_graph(files: &[PathBuf]) -> Result<(Universe, Arc<PoolGraph>), RouteError> {
    let universe = Universe::load(files);
    if universe.is_empty() {
        return Err(RouteError::Config("no pools found in listing files".to_string()));
    }
    let graph = PoolGraph::from_edges(&universe.edges);
    info!(tokens = graph.token_count(), pools = graph.pool_count(), "pool graph loaded");
    Ok((universe, Arc::new(graph)))
}

fn describe(route: &Route) -> String {
    let mut text = String::new();
    for (n, hop) in route.hops.iter().enumerate() {
        if n == 0 {
            text.push_str(&hop.source);
        }
        let pools = hop
            .pools
            .iter()
            .map(|p| format!("{}:{}:{}", p.dex, p.address, p.fee))
            .join("|");
        text.push_str(&format!(" ---({})---> {}", pools, hop.destination));
    }
    text
}

fn main() -> Result<(), RouteError> {
    dotenv().ok();
    routegen::init_tracing("routegen");
    let cli = Cli::parse();

    match cli.command {
        Commands::Dump {
            files,
            ranking,
            out,
            workers,
            queue_capacity,
            flush_every,
            query_timeout,
            submit_retries,
        } => {
            let (universe, graph) = load_graph(&files)?;
            let tokens = universe.tokens();
            let config = DumpConfig {
                output: out,
                max_hops: ranking.max_hops,
                workers,
                max_routes: ranking.max_routes,
                queue_capacity,
                flush_every,
                query_timeout: (query_timeout > 0).then(|| Duration::from_secs(query_timeout)),
                submit_retries,
                submit_backoff: Duration::from_millis(DEFAULT_SUBMIT_BACKOFF_MS),
            };
            let orchestrator = DumpOrchestrator::new(config, graph)?;
            match orchestrator.dump(&tokens) {
                Ok(report) => {
                    info!(?report, "dump token route finished");
                    if report.pairs_skipped > 0 {
                        warn!(skipped = report.pairs_skipped, "some token pairs were never queued");
                        return Err(RouteError::QueueFull);
                    }
                }
                Err(e) => {
                    error!(error = %e, "dump token route failed");
                    return Err(e);
                }
            }
        }
        Commands::Query {
            token0,
            token1,
            files,
            ranking,
        } => {
            let (_, graph) = load_graph(&files)?;
            let config = DumpConfig {
                max_hops: ranking.max_hops,
                max_routes: ranking.max_routes,
                ..DumpConfig::default()
            };
            let orchestrator = DumpOrchestrator::new(config, graph)?;
            let routes = orchestrator.query_pair(&token0, &token1)?;
            if routes.is_empty() {
                println!("no route from {} to {}", token0, token1);
            }
            for (i, route) in routes.iter().enumerate() {
                println!("path[{}]={}", i, describe(route));
                print!("{}", encode_route(route)?);
            }
        }
        Commands::Tokens { files } => {
            let universe = Universe::load(&files);
            for token in universe.tokens() {
                println!("{}", token);
            }
        }
    }

    Ok(())
}
