use serde::{Deserialize, Serialize};

use crate::catalog::LoadRequest;
use crate::domain::{OptionsSource, QuestionType};

/// A user interaction routed to the card that owns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CardEvent {
    TypeChanged { question_type: Option<QuestionType> },
    OriginChanged { source: OptionsSource },
    LabelEdited { text: String },
    HelpEdited { text: String },
    RequiredToggled { on: bool },
    OptionEdited { edit: OptionEdit },
    UploadConfigChanged { edit: UploadEdit },
    ExternalStageChanged { selection: StageSelection },
}

/// Edits to the rows of the options panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum OptionEdit {
    /// Appends an empty row.
    Add,
    Set { index: usize, text: String },
    Remove { index: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum UploadEdit {
    RestrictToggled { on: bool },
    CategoryToggled { name: String, checked: bool },
    MaxFiles { raw: String },
    MaxSizeMb { raw: String },
}

/// A change to one selector of the external-catalog cascade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum StageSelection {
    Connection { id: Option<i64> },
    Query { id: Option<i64> },
    ValueField { column: Option<String> },
    LabelField { column: Option<String> },
}

/// How urgently a change has to reach the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SaveMode {
    /// Coalesced with other edits inside the debounce window.
    Debounced,
    /// Saved right away.
    Immediate,
}

/// What the builder has to do after a card handled an event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardOutcome {
    pub save: Option<SaveMode>,
    pub loads: Vec<LoadRequest>,
}

impl CardOutcome {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn debounced() -> Self {
        Self {
            save: Some(SaveMode::Debounced),
            loads: Vec::new(),
        }
    }

    pub fn immediate() -> Self {
        Self {
            save: Some(SaveMode::Immediate),
            loads: Vec::new(),
        }
    }

    pub fn with_loads(mut self, loads: Vec<LoadRequest>) -> Self {
        self.loads.extend(loads);
        self
    }
}
