use std::time::Duration;

use crate::catalog::CatalogEndpoints;
use crate::domain::default_category_names;
use crate::form::DEFAULT_PREFIX;

pub const DEFAULT_PLACEHOLDER_TOKEN: &str = "__prefix__";

#[derive(Debug, Clone)]
pub struct BuilderOptions {
    /// Quiet period after the last incremental edit before a save fires.
    pub debounce: Duration,
    pub prefix: String,
    /// Token in the new-card skeleton replaced by the card's index.
    pub placeholder_token: String,
    pub upload_categories: Vec<String>,
    pub catalog: CatalogEndpoints,
    pub template_url: String,
    pub save_url: String,
}

impl Default for BuilderOptions {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(400),
            prefix: DEFAULT_PREFIX.to_string(),
            placeholder_token: DEFAULT_PLACEHOLDER_TOKEN.to_string(),
            upload_categories: default_category_names(),
            catalog: CatalogEndpoints::default(),
            template_url: "http://localhost:8000/formularios/api/campo-vazio/".to_string(),
            save_url: "http://localhost:8000/formularios/1/builder/".to_string(),
        }
    }
}

impl BuilderOptions {
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_placeholder_token(mut self, token: impl Into<String>) -> Self {
        self.placeholder_token = token.into();
        self
    }

    pub fn with_upload_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.upload_categories = categories.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_catalog(mut self, catalog: CatalogEndpoints) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_catalog_base(mut self, base_url: impl Into<String>) -> Self {
        self.catalog.base_url = base_url.into();
        self
    }

    pub fn with_template_url(mut self, url: impl Into<String>) -> Self {
        self.template_url = url.into();
        self
    }

    pub fn with_save_url(mut self, url: impl Into<String>) -> Self {
        self.save_url = url.into();
        self
    }
}
