#![deny(rust_2018_idioms)]

pub mod app;
pub mod catalog;
pub mod domain;
pub mod form;
pub mod io;

pub use app::{BuilderCommand, BuilderOptions, FormBuilder, SaveOutcome, SaveSignal};
pub use io::{
    DocumentFormat, OutputDestination, OutputOptions, PayloadEncoding, load_field_map,
    parse_document_str,
};

pub mod prelude {
    pub use super::app::{
        AddQuestionControl, BuilderCommand, BuilderOptions, FormBuilder, Persistence,
        SaveOutcome, SaveSignal, TemplateSource,
    };
    pub use super::catalog::{CatalogEndpoints, CatalogSource};
    pub use super::domain::{FieldKind, OptionsSource, QuestionType};
    pub use super::form::{
        CardCollection, CardEvent, CardId, CardState, OptionEdit, SaveMode, StageSelection,
        UploadEdit,
    };
}
