use std::fmt;

use async_trait::async_trait;

pub const ADD_QUESTION_LABEL: &str = "+ Add question";
pub const TEMPLATE_FAILED_LABEL: &str = "Failed to load";

/// Supplies the skeleton of a new card: a JSON object of form fields whose
/// keys carry a placeholder token in place of the card index.
#[async_trait]
pub trait TemplateSource: Send + Sync {
    async fn fetch_skeleton(&self) -> Result<String, TemplateError>;
}

#[derive(Debug)]
pub enum TemplateError {
    Transport(String),
    Status(u16),
}

impl fmt::Display for TemplateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateError::Transport(message) => write!(f, "template request failed: {message}"),
            TemplateError::Status(code) => write!(f, "template responded with status {code}"),
        }
    }
}

impl std::error::Error for TemplateError {}

/// State of the "add question" action. The skeleton is fetched once and
/// cached; a failed fetch disables the action for good.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AddQuestionControl {
    #[default]
    Loading,
    Ready(String),
    Failed,
}

impl AddQuestionControl {
    pub fn is_enabled(&self) -> bool {
        matches!(self, AddQuestionControl::Ready(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            AddQuestionControl::Failed => TEMPLATE_FAILED_LABEL,
            AddQuestionControl::Loading | AddQuestionControl::Ready(_) => ADD_QUESTION_LABEL,
        }
    }

    pub fn skeleton(&self) -> Option<&str> {
        match self {
            AddQuestionControl::Ready(skeleton) => Some(skeleton),
            _ => None,
        }
    }

    /// Records the outcome of the single skeleton fetch. Later outcomes are
    /// ignored.
    pub fn resolve(&mut self, result: Result<String, TemplateError>) {
        if *self != AddQuestionControl::Loading {
            return;
        }
        *self = match result {
            Ok(skeleton) => AddQuestionControl::Ready(skeleton),
            Err(err) => {
                log::warn!("add-question template unavailable: {err}");
                AddQuestionControl::Failed
            }
        };
    }
}

#[cfg(feature = "http")]
pub use http::HttpTemplateSource;

#[cfg(feature = "http")]
mod http {
    use async_trait::async_trait;

    use super::{TemplateError, TemplateSource};

    #[derive(Debug, Clone)]
    pub struct HttpTemplateSource {
        client: reqwest::Client,
        url: String,
    }

    impl HttpTemplateSource {
        pub fn new(url: impl Into<String>) -> Self {
            Self::with_client(reqwest::Client::new(), url)
        }

        pub fn with_client(client: reqwest::Client, url: impl Into<String>) -> Self {
            Self {
                client,
                url: url.into(),
            }
        }
    }

    #[async_trait]
    impl TemplateSource for HttpTemplateSource {
        async fn fetch_skeleton(&self) -> Result<String, TemplateError> {
            log::debug!("template GET {}", self.url);
            let response = self
                .client
                .get(&self.url)
                .send()
                .await
                .map_err(|err| TemplateError::Transport(err.to_string()))?;
            let status = response.status();
            if !status.is_success() {
                return Err(TemplateError::Status(status.as_u16()));
            }
            response
                .text()
                .await
                .map_err(|err| TemplateError::Transport(err.to_string()))
        }
    }
}
