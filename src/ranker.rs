//! Ranking pipeline for the candidate routes of one (source, destination)
//! query: sort, pool-disjoint filter, trim, merge.
//!
//! Every stage works on a `Vec<Route>` owned by the calling task. Nothing here
//! does I/O.

use crate::types::Route;
use rustc_hash::FxHashSet;
use tracing::{debug, warn};

/// Drop routes the path query should never have produced: no hops, a hop with
/// no pools, or a broken token chain.
pub fn retain_valid(routes: &mut Vec<Route>) {
    routes.retain(|route| match route.validate() {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "dropping malformed route");
            false
        }
    });
}

/// Fewer hops first. Routes with equal hop counts have no defined order.
pub fn sort_routes(routes: &mut [Route]) {
    routes.sort_by_key(Route::len);
}

/// Greedy pool-disjoint selection over an already sorted list.
///
/// The first route is always kept. A later route is dropped when any one of
/// its hops can only be served by pools that earlier kept routes already use.
/// Kept routes are not narrowed: they keep every pool they came with.
pub fn filter_routes(routes: Vec<Route>) -> Vec<Route> {
    let mut consumed: FxHashSet<String> = FxHashSet::default();
    let mut kept = Vec::with_capacity(routes.len());

    for route in routes {
        if !kept.is_empty() {
            let covered = route
                .hops
                .iter()
                .any(|hop| hop.pools.iter().all(|pool| consumed.contains(&pool.address)));
            if covered {
                debug!(route = %route, "route filtered, pools already used");
                continue;
            }
        }
        consumed.extend(route.pools().map(|pool| pool.address.clone()));
        kept.push(route);
    }

    kept
}

pub fn trim_routes(routes: &mut Vec<Route>, max_routes: usize) {
    routes.truncate(max_routes);
}

/// Combine routes that walk the same token transitions.
///
/// Takes the first unmerged route as an anchor, appends the pools of every
/// other route with the same shape to the anchor's hops, and removes those
/// routes. Anchor order is preserved.
pub fn merge_routes(routes: Vec<Route>) -> Vec<Route> {
    let mut merged = Vec::with_capacity(routes.len());
    let mut pending = routes;

    while !pending.is_empty() {
        let mut anchor = pending.remove(0);
        let (same, rest): (Vec<Route>, Vec<Route>) =
            pending.into_iter().partition(|other| anchor.shape_eq(other));

        for other in same {
            debug!(anchor = %anchor, other = %other, "merge route");
            for (hop, other_hop) in anchor.hops.iter_mut().zip(other.hops) {
                hop.pools.extend(other_hop.pools);
            }
        }

        merged.push(anchor);
        pending = rest;
    }

    merged
}

/// The full ranking pipeline with a fixed route cap.
#[derive(Debug, Clone, Copy)]
pub struct RouteRanker {
    max_routes: usize,
}

impl RouteRanker {
    pub fn new(max_routes: usize) -> Self {
        Self { max_routes }
    }

    pub fn max_routes(&self) -> usize {
        self.max_routes
    }

    pub fn rank(&self, mut routes: Vec<Route>) -> Vec<Route> {
        let raw = routes.len();
        retain_valid(&mut routes);
        sort_routes(&mut routes);
        let mut filtered = filter_routes(routes);
        let survived = filtered.len();
        trim_routes(&mut filtered, self.max_routes);
        let merged = merge_routes(filtered);
        debug!(raw, survived, merged = merged.len(), "ranked routes");
        merged
    }
}

impl Default for RouteRanker {
    fn default() -> Self {
        Self::new(10)
    }
}
