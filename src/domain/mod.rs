mod payload;
mod question;

pub use payload::{
    DEFAULT_MAX_FILES, DEFAULT_MAX_SIZE_MB, ExternalSource, FILE_CATEGORIES, UploadConstraints,
    UploadConstraintsRecord, default_category_names,
};
pub use question::{FieldKind, OptionsSource, QuestionType};
