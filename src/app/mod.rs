mod autosave;
mod builder;
mod header;
mod options;
mod persistence;
mod status;
mod template;

pub use autosave::AutosaveScheduler;
pub use builder::{BuilderCommand, BuilderError, FormBuilder, UploadSnapshot};
pub use header::{FIELD_ACCEPTING, FIELD_DESCRIPTION, FIELD_TITLE, HeaderState};
pub use options::{BuilderOptions, DEFAULT_PLACEHOLDER_TOKEN};
#[cfg(feature = "http")]
pub use persistence::HttpPersistence;
pub use persistence::{
    Persistence, PersistenceError, SaveOutcome, SaveSignal, parse_sync_ids,
};
pub use status::{READY_STATUS, StatusLine};
#[cfg(feature = "http")]
pub use template::HttpTemplateSource;
pub use template::{
    ADD_QUESTION_LABEL, AddQuestionControl, TEMPLATE_FAILED_LABEL, TemplateError, TemplateSource,
};
