use crate::RouteError;
use crate::types::{PoolRef, Token};
use itertools::Itertools;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::{error, info, warn};

/// A pool listed between two tokens. Pools are bidirectional.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolEdge {
    pub pool: PoolRef,
    pub token0: Token,
    pub token1: Token,
}

#[derive(Debug, Deserialize)]
struct DexPair {
    #[serde(rename = "contract")]
    address: String,
    token0: String,
    token1: String,
}

#[derive(Debug, Deserialize)]
struct DexData {
    #[serde(rename = "dex")]
    name: String,
    #[serde(default)]
    fee: String,
    #[serde(default)]
    pairs: Vec<DexPair>,
}

#[derive(Debug, Deserialize)]
struct SubgraphToken {
    #[serde(alias = "id")]
    address: String,
}

#[derive(Debug, Deserialize)]
struct SubgraphPair {
    #[serde(default, alias = "id")]
    address: Option<String>,
    token0: SubgraphToken,
    token1: SubgraphToken,
}

#[derive(Debug, Deserialize)]
struct SubgraphPairs {
    #[serde(default)]
    pairs: Vec<SubgraphPair>,
}

#[derive(Debug, Deserialize)]
struct SubgraphExport {
    data: SubgraphPairs,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ListingFile {
    Dexes(Vec<DexData>),
    Subgraph(SubgraphExport),
}

/// Parse one listing document in either the per-dex format or a subgraph
/// `pairs` export. Entries without a pool address are logged and skipped.
pub fn parse_listing(data: &str) -> Result<Vec<PoolEdge>, RouteError> {
    let listing: ListingFile = serde_json::from_str(data)?;
    let mut edges: Vec<PoolEdge> = match listing {
        ListingFile::Dexes(dexes) => dexes
            .into_iter()
            .flat_map(|dex| {
                let DexData { name, fee, pairs } = dex;
                pairs.into_iter().map(move |pair| PoolEdge {
                    pool: PoolRef::new(&name, &pair.address, &fee),
                    token0: pair.token0,
                    token1: pair.token1,
                })
            })
            .collect(),
        ListingFile::Subgraph(export) => export
            .data
            .pairs
            .into_iter()
            .map(|pair| PoolEdge {
                pool: PoolRef::new("", pair.address.as_deref().unwrap_or_default(), ""),
                token0: pair.token0.address,
                token1: pair.token1.address,
            })
            .collect(),
    };

    let listed = edges.len();
    edges.retain(|edge| !edge.pool.address.is_empty());
    if edges.len() < listed {
        warn!(skipped = listed - edges.len(), "listing entries without a pool address");
    }
    Ok(edges)
}

pub fn load_listing_file(path: &Path) -> Result<Vec<PoolEdge>, RouteError> {
    let data = fs::read_to_string(path)?;
    parse_listing(&data)
}

/// Every pool edge and token found across a set of listing files.
#[derive(Debug, Clone, Default)]
pub struct Universe {
    pub edges: Vec<PoolEdge>,
}

impl Universe {
    pub fn from_edges(edges: Vec<PoolEdge>) -> Self {
        Self { edges }
    }

    /// Load every readable listing. Missing or malformed files are logged and
    /// skipped.
    pub fn load<P: AsRef<Path>>(paths: &[P]) -> Self {
        let mut edges = Vec::new();
        for path in paths {
            let path = path.as_ref();
            if !path.exists() {
                error!(file = %path.display(), "listing file does not exist");
                continue;
            }
            match load_listing_file(path) {
                Ok(found) => {
                    info!(file = %path.display(), pools = found.len(), "loaded listing");
                    edges.extend(found);
                }
                Err(e) => error!(file = %path.display(), error = %e, "failed to load listing"),
            }
        }
        Self { edges }
    }

    /// Deduplicated token list in first-seen order.
    pub fn tokens(&self) -> Vec<Token> {
        self.edges
            .iter()
            .flat_map(|edge| [edge.token0.clone(), edge.token1.clone()])
            .unique()
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const DEX_LISTING: &str = r#"[
        {"dex": "pancake", "fee": "2500", "pairs": [
            {"contract": "0xP1", "token0": "0xA", "token1": "0xB"},
            {"contract": "0xP2", "token0": "0xB", "token1": "0xC"}
        ]},
        {"dex": "biswap", "fee": "1000", "pairs": [
            {"contract": "0xP3", "token0": "0xA", "token1": "0xC"}
        ]}
    ]"#;

    #[test]
    fn test_parse_dex_listing() {
        let edges = parse_listing(DEX_LISTING).unwrap();
        assert_eq!(edges.len(), 3);
        assert_eq!(edges[2].pool.dex, "biswap");
        assert_eq!(edges[2].pool.fee, "1000");
        assert_eq!(edges[2].pool.address, "0xP3");
    }

    #[test]
    fn test_parse_subgraph_export() {
        let data = r#"{"data": {"pairs": [
            {"id": "0xP1", "token0": {"id": "0xA"}, "token1": {"address": "0xB"}}
        ]}}"#;
        let edges = parse_listing(data).unwrap();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].token0, "0xA");
        assert_eq!(edges[0].token1, "0xB");
        assert_eq!(edges[0].pool.address, "0xP1");
    }

    #[test]
    fn test_pairs_without_address_are_skipped() {
        let data = r#"{"data": {"pairs": [
            {"token0": {"id": "0xA"}, "token1": {"id": "0xB"}},
            {"token0": {"id": "0xB"}, "token1": {"id": "0xC"}},
            {"id": "0xP3", "token0": {"id": "0xC"}, "token1": {"id": "0xD"}}
        ]}}"#;
        let edges = parse_listing(data).unwrap();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].pool.address, "0xP3");
        assert_eq!(edges[0].token0, "0xC");

        let dexes = r#"[{"dex": "pancake", "pairs": [
            {"contract": "", "token0": "0xA", "token1": "0xB"},
            {"contract": "0xP1", "token0": "0xA", "token1": "0xB"}
        ]}]"#;
        let edges = parse_listing(dexes).unwrap();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].pool.address, "0xP1");
    }

    #[test]
    fn test_tokens_are_deduplicated() {
        let universe = Universe::from_edges(parse_listing(DEX_LISTING).unwrap());
        assert_eq!(universe.tokens(), vec!["0xA", "0xB", "0xC"]);
    }

    #[test]
    fn test_load_skips_missing_and_broken_files() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.json");
        let bad = dir.path().join("bad.json");
        fs::File::create(&good).unwrap().write_all(DEX_LISTING.as_bytes()).unwrap();
        fs::File::create(&bad).unwrap().write_all(b"not json").unwrap();
        let missing = dir.path().join("missing.json");

        let universe = Universe::load(&[good, bad, missing]);
        assert_eq!(universe.edges.len(), 3);
    }
}
