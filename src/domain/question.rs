use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of answer a question card collects.
///
/// The serialized names are the server-side choice values, so a card's `tipo`
/// field can be parsed and written back without translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuestionType {
    #[serde(rename = "texto_curto")]
    ShortText,
    #[serde(rename = "paragrafo")]
    Paragraph,
    #[serde(rename = "multipla")]
    MultipleChoice,
    #[serde(rename = "checkbox")]
    CheckboxGroup,
    #[serde(rename = "lista")]
    List,
    #[serde(rename = "escala")]
    Scale,
    #[serde(rename = "data")]
    Date,
    #[serde(rename = "hora")]
    Time,
    #[serde(rename = "arquivo")]
    FileUpload,
}

impl QuestionType {
    pub const ALL: [QuestionType; 9] = [
        QuestionType::ShortText,
        QuestionType::Paragraph,
        QuestionType::MultipleChoice,
        QuestionType::CheckboxGroup,
        QuestionType::List,
        QuestionType::Scale,
        QuestionType::Date,
        QuestionType::Time,
        QuestionType::FileUpload,
    ];

    pub fn wire_name(self) -> &'static str {
        match self {
            QuestionType::ShortText => "texto_curto",
            QuestionType::Paragraph => "paragrafo",
            QuestionType::MultipleChoice => "multipla",
            QuestionType::CheckboxGroup => "checkbox",
            QuestionType::List => "lista",
            QuestionType::Scale => "escala",
            QuestionType::Date => "data",
            QuestionType::Time => "hora",
            QuestionType::FileUpload => "arquivo",
        }
    }

    /// Parses a `tipo` value. Blank or unknown values yield `None`, which the
    /// validator reports as a missing type.
    pub fn from_wire(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.wire_name() == value)
    }

    /// Types whose answers are picked from an inline option list.
    pub fn uses_inline_options(self) -> bool {
        matches!(
            self,
            QuestionType::MultipleChoice | QuestionType::CheckboxGroup | QuestionType::List
        )
    }

    pub fn display_name(self) -> &'static str {
        match self {
            QuestionType::ShortText => "Short text",
            QuestionType::Paragraph => "Paragraph",
            QuestionType::MultipleChoice => "Multiple choice",
            QuestionType::CheckboxGroup => "Checkboxes",
            QuestionType::List => "Dropdown list",
            QuestionType::Scale => "Scale 1-10",
            QuestionType::Date => "Date",
            QuestionType::Time => "Time",
            QuestionType::FileUpload => "File upload",
        }
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Where a list question gets its options from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OptionsSource {
    #[default]
    #[serde(rename = "manual")]
    Manual,
    #[serde(rename = "sqlhub")]
    ExternalCatalog,
}

impl OptionsSource {
    pub const ALL: [OptionsSource; 2] = [OptionsSource::Manual, OptionsSource::ExternalCatalog];

    pub fn wire_name(self) -> &'static str {
        match self {
            OptionsSource::Manual => "manual",
            OptionsSource::ExternalCatalog => "sqlhub",
        }
    }

    /// Anything other than the catalog marker counts as manual entry.
    pub fn from_wire(value: &str) -> Self {
        if value.trim() == OptionsSource::ExternalCatalog.wire_name() {
            OptionsSource::ExternalCatalog
        } else {
            OptionsSource::Manual
        }
    }
}

impl fmt::Display for OptionsSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Structured hidden slots carried by every card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Options,
    UploadConstraints,
    ExternalSource,
}

impl FieldKind {
    pub const ALL: [FieldKind; 3] = [
        FieldKind::Options,
        FieldKind::UploadConstraints,
        FieldKind::ExternalSource,
    ];

    /// Name of the hidden input that stores this slot.
    pub fn wire_name(self) -> &'static str {
        match self {
            FieldKind::Options => "opcoes_json",
            FieldKind::UploadConstraints => "valid_json",
            FieldKind::ExternalSource => "sqlhub_json",
        }
    }

    pub fn from_wire(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.wire_name() == name)
    }
}
