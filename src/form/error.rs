use std::fmt;

use crate::domain::FieldKind;

/// A persisted structured slot that could not be read back.
#[derive(Debug)]
pub struct PayloadError {
    pub slot: FieldKind,
    pub message: String,
}

impl PayloadError {
    pub(crate) fn new(slot: FieldKind, message: impl Into<String>) -> Self {
        Self {
            slot,
            message: message.into(),
        }
    }

    pub(crate) fn from_json(slot: FieldKind, err: serde_json::Error) -> Self {
        Self::new(slot, err.to_string())
    }
}

impl fmt::Display for PayloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.slot.wire_name(), self.message)
    }
}

impl std::error::Error for PayloadError {}

/// A card skeleton (new-card template or swapped-in markup) that could not be
/// turned into a card.
#[derive(Debug)]
pub enum SkeletonError {
    Parse(serde_json::Error),
    MissingPrefix,
}

impl fmt::Display for SkeletonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkeletonError::Parse(err) => write!(f, "card skeleton is not a field map: {err}"),
            SkeletonError::MissingPrefix => {
                write!(f, "card skeleton has no field named <prefix>-<index>-<name>")
            }
        }
    }
}

impl std::error::Error for SkeletonError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SkeletonError::Parse(err) => Some(err),
            SkeletonError::MissingPrefix => None,
        }
    }
}
