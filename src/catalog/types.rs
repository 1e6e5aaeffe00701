use std::fmt;

use serde::{Deserialize, Serialize};

/// A database connection registered in the remote catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub engine: String,
}

/// A saved query, annotated with the connection that owns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedQuery {
    pub id: i64,
    pub name: String,
    pub connection_id: i64,
    #[serde(default)]
    pub connection_name: String,
}

#[derive(Debug, Deserialize)]
struct ConnectionsEnvelope {
    #[serde(default)]
    connections: Vec<Connection>,
}

#[derive(Debug, Deserialize)]
struct QueriesEnvelope {
    #[serde(default)]
    queries: Vec<SavedQuery>,
}

#[derive(Debug, Deserialize)]
struct ColumnsEnvelope {
    #[serde(default)]
    columns: Vec<String>,
}

/// Reads the `connections` array of a catalog response. A missing key is an
/// empty list.
pub fn decode_connections(body: &str) -> Result<Vec<Connection>, CatalogError> {
    serde_json::from_str::<ConnectionsEnvelope>(body)
        .map(|envelope| envelope.connections)
        .map_err(CatalogError::Decode)
}

pub fn decode_queries(body: &str) -> Result<Vec<SavedQuery>, CatalogError> {
    serde_json::from_str::<QueriesEnvelope>(body)
        .map(|envelope| envelope.queries)
        .map_err(CatalogError::Decode)
}

pub fn decode_columns(body: &str) -> Result<Vec<String>, CatalogError> {
    serde_json::from_str::<ColumnsEnvelope>(body)
        .map(|envelope| envelope.columns)
        .map_err(CatalogError::Decode)
}

/// Failure of a single catalog lookup.
#[derive(Debug)]
pub enum CatalogError {
    Transport(String),
    Status(u16),
    Decode(serde_json::Error),
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogError::Transport(message) => write!(f, "catalog request failed: {message}"),
            CatalogError::Status(code) => write!(f, "catalog responded with status {code}"),
            CatalogError::Decode(err) => write!(f, "catalog response is not valid JSON: {err}"),
        }
    }
}

impl std::error::Error for CatalogError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CatalogError::Decode(err) => Some(err),
            CatalogError::Transport(_) | CatalogError::Status(_) => None,
        }
    }
}
