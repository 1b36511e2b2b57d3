use clap::Parser;
use dotenv::dotenv;
use routegen::metadata::{NameResolver, RpcNameResolver};
use routegen::{RouteError, Universe};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

#[derive(Parser)]
#[command(name = "token_names")]
#[command(about = "Resolve on-chain names for every token in the listings", long_about = None)]
struct Cli {
    /// Dex listing files (JSON)
    #[arg(required = true)]
    files: Vec<PathBuf>,
    /// JSON-RPC endpoint
    #[arg(long, env = "ROUTEGEN_RPC_URL", default_value = "https://rpc.ankr.com/bsc")]
    url: String,
    /// Per-call timeout in seconds
    #[arg(long, default_value_t = 10)]
    timeout: u64,
}

fn main() -> Result<(), RouteError> {
    dotenv().ok();
    routegen::init_tracing("routegen-token-names");
    let cli = Cli::parse();

    let universe = Universe::load(&cli.files);
    let resolver = RpcNameResolver::new(&cli.url, Duration::from_secs(cli.timeout))?;
    let tokens = universe.tokens();
    info!(tokens = tokens.len(), url = %cli.url, "resolving token names");

    let mut unresolved = 0;
    for token in &tokens {
        let name = resolver.resolve_name(token);
        if name.is_empty() {
            unresolved += 1;
        }
        println!("{}\t{}", token, name);
    }
    info!(resolved = tokens.len() - unresolved, unresolved, "done");
    Ok(())
}
