use std::fmt;
use std::time::Duration;

#[derive(Debug)]
pub enum RouteError {
    Collaborator(String),
    Timeout(Duration),
    QueueFull,
    PoolClosed,
    InvalidRoute(String),
    Io(std::io::Error),
    Json(serde_json::Error),
    Rpc(String),
    Config(String),
    Other(String),
}

impl fmt::Display for RouteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteError::Collaborator(e) => write!(f, "Path query error: {}", e),
            RouteError::Timeout(d) => write!(f, "Path query timed out after {:?}", d),
            RouteError::QueueFull => write!(f, "task pool is full"),
            RouteError::PoolClosed => write!(f, "task pool is closed"),
            RouteError::InvalidRoute(e) => write!(f, "Invalid route: {}", e),
            RouteError::Io(e) => write!(f, "IO error: {}", e),
            RouteError::Json(e) => write!(f, "JSON error: {}", e),
            RouteError::Rpc(e) => write!(f, "RPC error: {}", e),
            RouteError::Config(e) => write!(f, "Config error: {}", e),
            RouteError::Other(e) => write!(f, "Error: {}", e),
        }
    }
}

impl std::error::Error for RouteError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RouteError::Io(e) => Some(e),
            RouteError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for RouteError {
    fn from(err: std::io::Error) -> Self {
        RouteError::Io(err)
    }
}

impl From<serde_json::Error> for RouteError {
    fn from(err: serde_json::Error) -> Self {
        RouteError::Json(err)
    }
}

#[cfg(feature = "rpc")]
impl From<reqwest::Error> for RouteError {
    fn from(err: reqwest::Error) -> Self {
        RouteError::Rpc(err.to_string())
    }
}

impl From<String> for RouteError {
    fn from(err: String) -> Self {
        RouteError::Other(err)
    }
}

impl From<&str> for RouteError {
    fn from(err: &str) -> Self {
        RouteError::Other(err.to_string())
    }
}
