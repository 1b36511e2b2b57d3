use crate::RouteError;
use crate::types::Route;
use std::fmt;

/// One dump-file line, newline included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedLine(String);

impl EncodedLine {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for EncodedLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Serialize a merged route as
/// `[[["pool",...],...],["token",...]]\n`:
/// one array of pool addresses per hop, then the flat token path.
pub fn encode_route(route: &Route) -> Result<EncodedLine, RouteError> {
    let pools: Vec<Vec<&str>> = route
        .hops
        .iter()
        .map(|hop| hop.pools.iter().map(|p| p.address.as_str()).collect())
        .collect();
    let mut line = serde_json::to_string(&(pools, route.tokens()))?;
    line.push('\n');
    Ok(EncodedLine(line))
}

pub fn encode_routes(routes: &[Route]) -> Result<Vec<EncodedLine>, RouteError> {
    routes.iter().map(encode_route).collect()
}
