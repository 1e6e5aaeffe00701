use crate::domain::{FieldKind, OptionsSource, QuestionType};

/// Which configuration panels of a card are shown.
///
/// Panels are resolved independently from `(type, optionsSource)`; the
/// structured hidden slots follow the panel that governs them, so at most one
/// slot is ever active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PanelVisibility {
    pub origin: bool,
    pub external_catalog: bool,
    pub options: bool,
    pub upload_config: bool,
}

impl PanelVisibility {
    pub fn resolve(question_type: Option<QuestionType>, source: OptionsSource) -> Self {
        let is_list = question_type == Some(QuestionType::List);
        let external = source == OptionsSource::ExternalCatalog;
        Self {
            origin: is_list,
            external_catalog: is_list && external,
            options: matches!(
                question_type,
                Some(QuestionType::MultipleChoice | QuestionType::CheckboxGroup)
            ) || (is_list && !external),
            upload_config: question_type == Some(QuestionType::FileUpload),
        }
    }

    /// The structured slot eligible for submission, if any.
    pub fn active_slot(&self) -> Option<FieldKind> {
        if self.options {
            Some(FieldKind::Options)
        } else if self.upload_config {
            Some(FieldKind::UploadConstraints)
        } else if self.external_catalog {
            Some(FieldKind::ExternalSource)
        } else {
            None
        }
    }

    pub fn is_active(&self, slot: FieldKind) -> bool {
        match slot {
            FieldKind::Options => self.options,
            FieldKind::UploadConstraints => self.upload_config,
            FieldKind::ExternalSource => self.external_catalog,
        }
    }
}
