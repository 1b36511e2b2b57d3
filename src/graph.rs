use crate::RouteError;
use crate::path_finder::PathFinder;
use crate::types::{Hop, PoolRef, Route, Token};
use crate::universe::PoolEdge;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::warn;

/// In-memory liquidity graph: tokens are vertices, every pool is an edge in
/// both directions.
///
/// Path enumeration yields one route per distinct combination of pool edges,
/// with exactly one pool per hop, so routes sharing a token shape are left for
/// the ranker to merge.
#[derive(Debug, Clone, Default)]
pub struct PoolGraph {
    adjacency: FxHashMap<Token, Vec<(Token, PoolRef)>>,
    pool_count: usize,
}

impl PoolGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_edges<'a>(edges: impl IntoIterator<Item = &'a PoolEdge>) -> Self {
        let mut graph = Self::new();
        let mut seen: FxHashSet<&str> = FxHashSet::default();
        for edge in edges {
            if edge.pool.address.is_empty() {
                warn!(token0 = %edge.token0, token1 = %edge.token1, "pool without address ignored");
                continue;
            }
            if edge.token0 == edge.token1 || !seen.insert(edge.pool.address.as_str()) {
                continue;
            }
            graph.add_pool(&edge.token0, &edge.token1, edge.pool.clone());
        }
        graph
    }

    pub fn add_pool(&mut self, token0: &str, token1: &str, pool: PoolRef) {
        self.adjacency
            .entry(token0.to_string())
            .or_default()
            .push((token1.to_string(), pool.clone()));
        self.adjacency
            .entry(token1.to_string())
            .or_default()
            .push((token0.to_string(), pool));
        self.pool_count += 1;
    }

    pub fn token_count(&self) -> usize {
        self.adjacency.len()
    }

    pub fn pool_count(&self) -> usize {
        self.pool_count
    }

    fn walk<'a>(
        &'a self,
        current: &'a str,
        destination: &str,
        max_hops: usize,
        visited: &mut Vec<&'a str>,
        hops: &mut Vec<Hop>,
        found: &mut Vec<Route>,
    ) {
        if hops.len() >= max_hops {
            return;
        }
        let Some(neighbors) = self.adjacency.get(current) else {
            return;
        };
        for (next, pool) in neighbors {
            if visited.contains(&next.as_str()) {
                continue;
            }
            hops.push(Hop::new(current, next, [pool.clone()]));
            if next == destination {
                found.push(Route::new(hops.clone()));
            } else {
                visited.push(next);
                self.walk(next, destination, max_hops, visited, hops, found);
                visited.pop();
            }
            hops.pop();
        }
    }
}

impl PathFinder for PoolGraph {
    fn find_paths(
        &self,
        source: &str,
        destination: &str,
        max_hops: usize,
    ) -> Result<Vec<Route>, RouteError> {
        let mut found = Vec::new();
        if source == destination {
            return Ok(found);
        }
        let Some((start, _)) = self.adjacency.get_key_value(source) else {
            return Ok(found);
        };
        let mut visited = vec![start.as_str()];
        let mut hops = Vec::with_capacity(max_hops);
        self.walk(start, destination, max_hops, &mut visited, &mut hops, &mut found);
        Ok(found)
    }
}
