use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Default upload categories and the file extensions each one admits.
pub const FILE_CATEGORIES: &[(&str, &[&str])] = &[
    ("documento", &["doc", "docx", "odt", "rtf", "txt"]),
    ("apresentação", &["ppt", "pptx", "odp"]),
    ("planilha", &["xls", "xlsx", "ods", "csv"]),
    ("desenho", &["dwg", "dxf", "svg"]),
    ("pdf", &["pdf"]),
    ("imagem", &["png", "jpg", "jpeg", "gif", "webp"]),
    ("vídeo", &["mp4", "mov", "mkv", "avi"]),
    ("áudio", &["mp3", "wav", "ogg", "aac"]),
];

pub const DEFAULT_MAX_FILES: u32 = 1;
pub const DEFAULT_MAX_SIZE_MB: u32 = 10;

pub fn default_category_names() -> Vec<String> {
    FILE_CATEGORIES
        .iter()
        .map(|(name, _)| (*name).to_string())
        .collect()
}

/// Limits attached to a file-upload question.
///
/// Serializes to the fixed wire shape
/// `{"tipos_livres", "categorias", "max_arquivos", "max_mb"}` where
/// `tipos_livres` is the negation of [`restrict_to_categories`].
///
/// [`restrict_to_categories`]: UploadConstraints::restrict_to_categories
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "UploadConstraintsRecord")]
pub struct UploadConstraints {
    pub restrict_to_categories: bool,
    pub categories: Vec<String>,
    pub max_files: u32,
    pub max_size_mb: u32,
}

impl Default for UploadConstraints {
    fn default() -> Self {
        Self {
            restrict_to_categories: false,
            categories: Vec::new(),
            max_files: DEFAULT_MAX_FILES,
            max_size_mb: DEFAULT_MAX_SIZE_MB,
        }
    }
}

impl UploadConstraints {
    /// Value for an HTML `accept` attribute, e.g. `.pdf,.png`.
    /// Empty when any file type is allowed.
    pub fn accept_string(&self) -> String {
        if !self.restrict_to_categories {
            return String::new();
        }
        let extensions: BTreeSet<&str> = self
            .categories
            .iter()
            .filter_map(|name| {
                FILE_CATEGORIES
                    .iter()
                    .find(|(category, _)| category == name)
                    .map(|(_, exts)| *exts)
            })
            .flatten()
            .copied()
            .collect();
        extensions
            .into_iter()
            .map(|ext| format!(".{ext}"))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Lenient wire representation of the upload slot.
///
/// Every key is optional on the way in; persisted payloads written by older
/// builders may omit the limits.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UploadConstraintsRecord {
    #[serde(default = "default_true")]
    pub tipos_livres: bool,
    #[serde(default)]
    pub categorias: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_arquivos: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_mb: Option<i64>,
}

fn default_true() -> bool {
    true
}

impl From<UploadConstraints> for UploadConstraintsRecord {
    fn from(value: UploadConstraints) -> Self {
        Self {
            tipos_livres: !value.restrict_to_categories,
            categorias: value.categories,
            max_arquivos: Some(i64::from(value.max_files)),
            max_mb: Some(i64::from(value.max_size_mb)),
        }
    }
}

/// Catalog-backed option source of a list question.
///
/// Each part stays optional until the user finishes the
/// connection → query → columns cascade.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalSource {
    #[serde(default)]
    pub connection_id: Option<i64>,
    #[serde(default)]
    pub query_id: Option<i64>,
    #[serde(default)]
    pub value_field: Option<String>,
    #[serde(default)]
    pub label_field: Option<String>,
}

impl ExternalSource {
    pub fn is_empty(&self) -> bool {
        self.connection_id.is_none()
            && self.query_id.is_none()
            && self.value_field.is_none()
            && self.label_field.is_none()
    }

    /// Display names of the parts that are still unset, in cascade order.
    pub fn missing_parts(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.connection_id.is_none() {
            missing.push("Connection");
        }
        if self.query_id.is_none() {
            missing.push("Query");
        }
        if self.value_field.is_none() {
            missing.push("Value field");
        }
        if self.label_field.is_none() {
            missing.push("Label field");
        }
        missing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn upload_constraints_use_wire_keys() {
        let constraints = UploadConstraints {
            restrict_to_categories: true,
            categories: vec!["pdf".into()],
            max_files: 3,
            max_size_mb: 25,
        };
        let value = serde_json::to_value(&constraints).unwrap();
        assert_eq!(
            value,
            json!({"tipos_livres": false, "categorias": ["pdf"], "max_arquivos": 3, "max_mb": 25})
        );
    }

    #[test]
    fn record_defaults_to_free_types() {
        let record: UploadConstraintsRecord = serde_json::from_str("{}").unwrap();
        assert!(record.tipos_livres);
        assert!(record.categorias.is_empty());
        assert_eq!(record.max_arquivos, None);
    }

    #[test]
    fn accept_string_merges_category_extensions() {
        let constraints = UploadConstraints {
            restrict_to_categories: true,
            categories: vec!["pdf".into(), "imagem".into(), "unknown".into()],
            ..UploadConstraints::default()
        };
        assert_eq!(constraints.accept_string(), ".gif,.jpeg,.jpg,.pdf,.png,.webp");
    }

    #[test]
    fn accept_string_is_empty_without_restriction() {
        let constraints = UploadConstraints {
            categories: vec!["pdf".into()],
            ..UploadConstraints::default()
        };
        assert_eq!(constraints.accept_string(), "");
    }

    #[test]
    fn missing_parts_follow_cascade_order() {
        let source = ExternalSource {
            connection_id: Some(4),
            ..ExternalSource::default()
        };
        assert_eq!(source.missing_parts(), vec!["Query", "Value field", "Label field"]);
    }
}
