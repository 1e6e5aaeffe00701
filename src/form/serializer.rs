use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use crate::domain::{
    DEFAULT_MAX_FILES, DEFAULT_MAX_SIZE_MB, ExternalSource, FieldKind, UploadConstraints,
    UploadConstraintsRecord,
};

use super::error::PayloadError;

static INTEGER_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*([+-]?\d+)").expect("static regex"));

/// Input state of a card's upload-config panel.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadPanel {
    pub restrict_to_categories: bool,
    /// Category checkbox → checked, in display order.
    pub categories: IndexMap<String, bool>,
    pub max_files: String,
    pub max_size_mb: String,
}

impl UploadPanel {
    pub fn new(categories: &[String]) -> Self {
        Self {
            restrict_to_categories: false,
            categories: categories
                .iter()
                .map(|name| (name.clone(), false))
                .collect(),
            max_files: DEFAULT_MAX_FILES.to_string(),
            max_size_mb: DEFAULT_MAX_SIZE_MB.to_string(),
        }
    }

    pub fn checked_categories(&self) -> Vec<String> {
        self.categories
            .iter()
            .filter(|(_, checked)| **checked)
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Checks or unchecks a category box. Unknown categories are ignored, the
    /// same way a missing checkbox cannot be clicked.
    pub fn set_category(&mut self, name: &str, checked: bool) -> bool {
        match self.categories.get_mut(name) {
            Some(current) if *current != checked => {
                *current = checked;
                true
            }
            _ => false,
        }
    }

    /// Fixed-shape payload with both limits clamped to at least one.
    pub fn constraints(&self) -> UploadConstraints {
        UploadConstraints {
            restrict_to_categories: self.restrict_to_categories,
            categories: self.checked_categories(),
            max_files: parse_limit(&self.max_files, DEFAULT_MAX_FILES),
            max_size_mb: parse_limit(&self.max_size_mb, DEFAULT_MAX_SIZE_MB),
        }
    }

    /// Repopulates the panel from a persisted `valid_json` value.
    ///
    /// Categories without a matching checkbox are skipped and a zero or
    /// missing limit keeps the current input.
    pub fn restore(&mut self, raw: &str) -> Result<(), PayloadError> {
        let record: UploadConstraintsRecord = serde_json::from_str(raw)
            .map_err(|err| PayloadError::from_json(FieldKind::UploadConstraints, err))?;
        self.restrict_to_categories = !record.tipos_livres;
        for name in &record.categorias {
            if let Some(checked) = self.categories.get_mut(name) {
                *checked = true;
            }
        }
        if let Some(max_files) = record.max_arquivos.filter(|value| *value != 0) {
            self.max_files = max_files.to_string();
        }
        if let Some(max_mb) = record.max_mb.filter(|value| *value != 0) {
            self.max_size_mb = max_mb.to_string();
        }
        Ok(())
    }
}

/// Trimmed, non-empty option rows in visual order. Duplicates are kept.
pub fn options_payload(rows: &[String]) -> Vec<String> {
    rows.iter()
        .map(|row| row.trim())
        .filter(|row| !row.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn encode_options(rows: &[String]) -> String {
    to_json(&options_payload(rows))
}

/// Reads an `opcoes_json` array back into option rows.
///
/// Scalars are stringified the way the server stores them; nulls, blanks and
/// nested values are dropped.
pub fn decode_options(raw: &str) -> Result<Vec<String>, PayloadError> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|err| PayloadError::from_json(FieldKind::Options, err))?;
    let Value::Array(items) = value else {
        return Err(PayloadError::new(
            FieldKind::Options,
            "expected a JSON array of options",
        ));
    };
    let rows = items
        .into_iter()
        .filter_map(|item| match item {
            Value::String(text) => Some(text),
            Value::Number(number) => Some(number.to_string()),
            Value::Bool(flag) => Some(flag.to_string()),
            _ => None,
        })
        .filter(|text| !text.trim().is_empty())
        .collect();
    Ok(rows)
}

pub fn encode_upload(panel: &UploadPanel) -> String {
    to_json(&panel.constraints())
}

pub fn encode_external(source: &ExternalSource) -> String {
    to_json(source)
}

pub fn decode_external(raw: &str) -> Result<ExternalSource, PayloadError> {
    serde_json::from_str(raw).map_err(|err| PayloadError::from_json(FieldKind::ExternalSource, err))
}

/// Integer-prefix parse of a numeric limit input.
///
/// Leading whitespace and a sign are accepted and trailing text is ignored.
/// A missing, non-numeric or zero value falls back to `default`; the result
/// is floored to one.
pub fn parse_limit(raw: &str, default: u32) -> u32 {
    let parsed = INTEGER_PREFIX
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|digits| {
            digits
                .as_str()
                .parse::<i64>()
                .unwrap_or(if digits.as_str().starts_with('-') {
                    i64::MIN
                } else {
                    i64::MAX
                })
        })
        .filter(|value| *value != 0)
        .unwrap_or(i64::from(default));
    parsed.clamp(1, i64::from(u32::MAX)) as u32
}

/// Whether a raw limit input is a plain integer of at least one, before any
/// clamping is applied.
pub fn limit_in_range(raw: &str) -> bool {
    raw.trim().parse::<i64>().is_ok_and(|value| value >= 1)
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|err| {
        log::warn!("failed to serialize payload: {err}");
        String::new()
    })
}
