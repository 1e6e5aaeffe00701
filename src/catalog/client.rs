use async_trait::async_trait;

use super::types::{CatalogError, Connection, SavedQuery};

/// Read-only lookups backing the connection → query → columns cascade.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn connections(&self) -> Result<Vec<Connection>, CatalogError>;

    /// Saved queries, restricted to one connection when given.
    async fn queries(&self, connection: Option<i64>) -> Result<Vec<SavedQuery>, CatalogError>;

    async fn columns(&self, query: i64) -> Result<Vec<String>, CatalogError>;
}

/// Location of the catalog endpoints. `columns_path` contains an `{id}`
/// placeholder for the query id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEndpoints {
    pub base_url: String,
    pub connections_path: String,
    pub queries_path: String,
    pub columns_path: String,
}

impl Default for CatalogEndpoints {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/sqlhub".to_string(),
            connections_path: "api/connections/".to_string(),
            queries_path: "api/queries/".to_string(),
            columns_path: "queries/{id}/columns/".to_string(),
        }
    }
}

impl CatalogEndpoints {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn connections_url(&self) -> String {
        self.join(&self.connections_path)
    }

    pub fn queries_url(&self, connection: Option<i64>) -> String {
        let url = self.join(&self.queries_path);
        match connection {
            Some(id) => format!("{url}?connection={id}"),
            None => url,
        }
    }

    pub fn columns_url(&self, query: i64) -> String {
        self.join(&self.columns_path.replace("{id}", &query.to_string()))
    }

    fn join(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[cfg(feature = "http")]
pub use http::HttpCatalog;

#[cfg(feature = "http")]
mod http {
    use async_trait::async_trait;

    use super::{CatalogEndpoints, CatalogSource};
    use crate::catalog::types::{
        CatalogError, Connection, SavedQuery, decode_columns, decode_connections, decode_queries,
    };

    /// Catalog lookups over HTTP. One request per call, no retry.
    #[derive(Debug, Clone)]
    pub struct HttpCatalog {
        client: reqwest::Client,
        endpoints: CatalogEndpoints,
    }

    impl HttpCatalog {
        pub fn new(endpoints: CatalogEndpoints) -> Self {
            Self::with_client(reqwest::Client::new(), endpoints)
        }

        pub fn with_client(client: reqwest::Client, endpoints: CatalogEndpoints) -> Self {
            Self { client, endpoints }
        }

        async fn get_body(&self, url: String) -> Result<String, CatalogError> {
            log::debug!("catalog GET {url}");
            let response = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(|err| CatalogError::Transport(err.to_string()))?;
            let status = response.status();
            if !status.is_success() {
                return Err(CatalogError::Status(status.as_u16()));
            }
            response
                .text()
                .await
                .map_err(|err| CatalogError::Transport(err.to_string()))
        }
    }

    #[async_trait]
    impl CatalogSource for HttpCatalog {
        async fn connections(&self) -> Result<Vec<Connection>, CatalogError> {
            let body = self.get_body(self.endpoints.connections_url()).await?;
            decode_connections(&body)
        }

        async fn queries(&self, connection: Option<i64>) -> Result<Vec<SavedQuery>, CatalogError> {
            let body = self.get_body(self.endpoints.queries_url(connection)).await?;
            decode_queries(&body)
        }

        async fn columns(&self, query: i64) -> Result<Vec<String>, CatalogError> {
            let body = self.get_body(self.endpoints.columns_url(query)).await?;
            decode_columns(&body)
        }
    }
}
