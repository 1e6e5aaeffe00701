//! External option source: cascading connection → query → columns lookups
//! for list questions whose options come from a remote catalog.

mod cascade;
mod client;
mod types;

pub use cascade::{
    CascadeState, LOAD_FAILED_LABEL, LOADING_LABEL, LoadKind, LoadRequest, LoadResponse,
    LoadResult, SelectorEntry, SelectorState, Stage, fetch,
};
#[cfg(feature = "http")]
pub use client::HttpCatalog;
pub use client::{CatalogEndpoints, CatalogSource};
pub use types::{
    CatalogError, Connection, SavedQuery, decode_columns, decode_connections, decode_queries,
};
