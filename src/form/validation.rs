use std::collections::BTreeMap;
use std::fmt;

use crate::domain::{OptionsSource, QuestionType};

use super::card::CardState;
use super::serializer::{limit_in_range, options_payload};

/// Named per-field error holders on a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ErrorSlot {
    Type,
    Label,
    Options,
    UploadCategories,
    UploadMaxFiles,
    UploadMaxSize,
    ExternalSource,
}

impl fmt::Display for ErrorSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorSlot::Type => "type",
            ErrorSlot::Label => "label",
            ErrorSlot::Options => "options",
            ErrorSlot::UploadCategories => "upload.categories",
            ErrorSlot::UploadMaxFiles => "upload.max_files",
            ErrorSlot::UploadMaxSize => "upload.max_size_mb",
            ErrorSlot::ExternalSource => "external_source",
        };
        f.write_str(name)
    }
}

pub const MSG_TYPE_REQUIRED: &str = "Select a type.";
pub const MSG_LABEL_REQUIRED: &str = "Enter a label.";
pub const MSG_OPTIONS_REQUIRED: &str = "Add at least one option.";
pub const MSG_CATEGORY_REQUIRED: &str = "Select at least one file category.";
pub const MSG_MAX_FILES_RANGE: &str = "Maximum number of files must be at least 1.";
pub const MSG_MAX_SIZE_RANGE: &str = "Maximum size (MB) must be at least 1.";

/// Transient validation messages of one card. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardErrors {
    slots: BTreeMap<ErrorSlot, String>,
}

impl CardErrors {
    pub fn get(&self, slot: ErrorSlot) -> Option<&str> {
        self.slots.get(&slot).map(String::as_str)
    }

    /// Card-level summary flag: any active error slot.
    pub fn has_problems(&self) -> bool {
        !self.slots.is_empty()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ErrorSlot, &str)> {
        self.slots.iter().map(|(slot, msg)| (*slot, msg.as_str()))
    }

    fn set(&mut self, slot: ErrorSlot, message: impl Into<String>) {
        self.slots.insert(slot, message.into());
    }
}

/// Recomputes every error slot from the card's current inputs.
pub fn validate_card(card: &CardState) -> CardErrors {
    let mut errors = CardErrors::default();

    if card.label().trim().is_empty() {
        errors.set(ErrorSlot::Label, MSG_LABEL_REQUIRED);
    }
    let Some(question_type) = card.question_type() else {
        errors.set(ErrorSlot::Type, MSG_TYPE_REQUIRED);
        return errors;
    };

    match question_type {
        QuestionType::List => match card.options_source() {
            OptionsSource::ExternalCatalog => {
                let missing = card.external_selection().missing_parts();
                if !missing.is_empty() {
                    errors.set(
                        ErrorSlot::ExternalSource,
                        format!("Missing: {}", missing.join(", ")),
                    );
                }
            }
            OptionsSource::Manual => {
                if options_payload(card.option_rows()).is_empty() {
                    errors.set(ErrorSlot::Options, MSG_OPTIONS_REQUIRED);
                }
            }
        },
        QuestionType::FileUpload => {
            let upload = card.upload_panel();
            if upload.restrict_to_categories && upload.checked_categories().is_empty() {
                errors.set(ErrorSlot::UploadCategories, MSG_CATEGORY_REQUIRED);
            }
            if !limit_in_range(&upload.max_files) {
                errors.set(ErrorSlot::UploadMaxFiles, MSG_MAX_FILES_RANGE);
            }
            if !limit_in_range(&upload.max_size_mb) {
                errors.set(ErrorSlot::UploadMaxSize, MSG_MAX_SIZE_RANGE);
            }
        }
        _ => {}
    }

    errors
}
