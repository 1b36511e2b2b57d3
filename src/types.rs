use crate::RouteError;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Address of a fungible asset. Compared byte for byte.
pub type Token = String;

/// Pools realizing a single hop. Most hops have one or two.
pub type PoolList = SmallVec<[PoolRef; 2]>;

/// One liquidity pool able to swap between the two tokens of a hop.
///
/// Two refs are the same pool when their addresses match; dex and fee only
/// describe it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PoolRef {
    #[serde(rename = "pair")]
    pub address: String,
    #[serde(default)]
    pub fee: String,
    #[serde(default)]
    pub dex: String,
}

impl PoolRef {
    pub fn new(dex: &str, address: &str, fee: &str) -> Self {
        Self {
            address: address.to_string(),
            fee: fee.to_string(),
            dex: dex.to_string(),
        }
    }
}

impl PartialEq for PoolRef {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address
    }
}

impl Eq for PoolRef {}

impl Hash for PoolRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.address.hash(state);
    }
}

/// A directed token-to-token transition and every pool that can execute it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hop {
    #[serde(rename = "pair")]
    pub pools: PoolList,
    #[serde(rename = "from")]
    pub source: Token,
    #[serde(rename = "to")]
    pub destination: Token,
}

impl Hop {
    pub fn new(source: &str, destination: &str, pools: impl IntoIterator<Item = PoolRef>) -> Self {
        Self {
            pools: pools.into_iter().collect(),
            source: source.to_string(),
            destination: destination.to_string(),
        }
    }

    /// Same (source, destination) transition, regardless of pools.
    pub fn same_transition(&self, other: &Hop) -> bool {
        self.source == other.source && self.destination == other.destination
    }
}

/// An ordered chain of hops from a source token to a destination token.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Route {
    #[serde(rename = "steps")]
    pub hops: Vec<Hop>,
}

impl Route {
    pub fn new(hops: Vec<Hop>) -> Self {
        Self { hops }
    }

    pub fn len(&self) -> usize {
        self.hops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hops.is_empty()
    }

    pub fn source(&self) -> Option<&str> {
        self.hops.first().map(|h| h.source.as_str())
    }

    pub fn destination(&self) -> Option<&str> {
        self.hops.last().map(|h| h.destination.as_str())
    }

    /// Flat token path: source of the first hop, then every hop's destination.
    pub fn tokens(&self) -> Vec<&str> {
        let mut tokens = Vec::with_capacity(self.hops.len() + 1);
        if let Some(first) = self.hops.first() {
            tokens.push(first.source.as_str());
        }
        tokens.extend(self.hops.iter().map(|h| h.destination.as_str()));
        tokens
    }

    pub fn pools(&self) -> impl Iterator<Item = &PoolRef> {
        self.hops.iter().flat_map(|h| h.pools.iter())
    }

    /// True when both routes walk the same token transitions, hop by hop.
    pub fn shape_eq(&self, other: &Route) -> bool {
        self.hops.len() == other.hops.len()
            && self
                .hops
                .iter()
                .zip(other.hops.iter())
                .all(|(a, b)| a.same_transition(b))
    }

    pub fn validate(&self) -> Result<(), RouteError> {
        if self.hops.is_empty() {
            return Err(RouteError::InvalidRoute("route has no hops".to_string()));
        }
        for (i, hop) in self.hops.iter().enumerate() {
            if hop.pools.is_empty() {
                return Err(RouteError::InvalidRoute(format!(
                    "hop {} ({} -> {}) has no pools",
                    i, hop.source, hop.destination
                )));
            }
        }
        for (i, pair) in self.hops.windows(2).enumerate() {
            if pair[0].destination != pair[1].source {
                return Err(RouteError::InvalidRoute(format!(
                    "hop {} ends at {} but hop {} starts at {}",
                    i,
                    pair[0].destination,
                    i + 1,
                    pair[1].source
                )));
            }
        }
        Ok(())
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(s) => f.write_str(&s),
            Err(_) => write!(f, "{:?}", self.tokens()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hop(src: &str, dst: &str, pool: &str) -> Hop {
        Hop::new(src, dst, [PoolRef::new("uniswap", pool, "3000")])
    }

    #[test]
    fn test_pool_equality_ignores_dex_and_fee() {
        let a = PoolRef::new("uniswap", "0xP1", "3000");
        let b = PoolRef::new("sushi", "0xP1", "500");
        assert_eq!(a, b);
        let mut set = std::collections::HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn test_tokens_walks_the_chain() {
        let route = Route::new(vec![hop("0xA", "0xC", "0xP2"), hop("0xC", "0xB", "0xP3")]);
        assert_eq!(route.tokens(), vec!["0xA", "0xC", "0xB"]);
        assert_eq!(route.source(), Some("0xA"));
        assert_eq!(route.destination(), Some("0xB"));
    }

    #[test]
    fn test_validate_rejects_empty_and_broken_routes() {
        assert!(Route::default().validate().is_err());

        let no_pools = Route::new(vec![Hop::new("0xA", "0xB", Vec::new())]);
        assert!(matches!(no_pools.validate(), Err(RouteError::InvalidRoute(_))));

        let broken = Route::new(vec![hop("0xA", "0xC", "0xP2"), hop("0xD", "0xB", "0xP3")]);
        assert!(broken.validate().is_err());

        let ok = Route::new(vec![hop("0xA", "0xC", "0xP2"), hop("0xC", "0xB", "0xP3")]);
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn test_shape_eq_ignores_pools() {
        let r1 = Route::new(vec![hop("0xA", "0xB", "0xP1")]);
        let r2 = Route::new(vec![hop("0xA", "0xB", "0xP2")]);
        let r3 = Route::new(vec![hop("0xA", "0xC", "0xP2"), hop("0xC", "0xB", "0xP3")]);
        assert!(r1.shape_eq(&r2));
        assert!(!r1.shape_eq(&r3));
    }

    #[test]
    fn test_route_json_uses_step_field_names() {
        let route = Route::new(vec![hop("0xA", "0xB", "0xP1")]);
        let json = route.to_string();
        assert!(json.contains("\"steps\""));
        assert!(json.contains("\"from\":\"0xA\""));
        assert!(json.contains("\"to\":\"0xB\""));
        assert!(json.contains("\"pair\":\"0xP1\""));
        let back: Route = serde_json::from_str(&json).unwrap();
        assert_eq!(back, route);
    }
}
