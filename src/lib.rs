pub mod config;
pub mod encoder;
pub mod error;
pub mod graph;
pub mod metadata;
pub mod orchestrator;
pub mod path_finder;
pub mod ranker;
pub mod task_pool;
pub mod types;
pub mod universe;
pub mod writer;

pub use config::DumpConfig;
pub use encoder::{EncodedLine, encode_route};
pub use error::*;
pub use graph::PoolGraph;
pub use orchestrator::{DumpOrchestrator, DumpReport};
pub use path_finder::{DeadlinePathFinder, PathFinder};
pub use ranker::RouteRanker;
pub use task_pool::TaskPool;
pub use types::{Hop, PoolRef, Route, Token};
pub use universe::Universe;

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the fmt subscriber. `RUST_LOG` overrides the default `info` level.
/// Calling it twice is harmless; the second call is ignored.
pub fn init_tracing(service: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_names(true),
        )
        .try_init();
    if installed.is_ok() {
        tracing::debug!(service, "tracing initialized");
    }
}
