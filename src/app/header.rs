use indexmap::IndexMap;

use crate::form::split_card_key;

pub const FIELD_TITLE: &str = "titulo";
pub const FIELD_DESCRIPTION: &str = "descricao";
pub const FIELD_ACCEPTING: &str = "aceita_respostas";

/// Form-level fields outside the card formset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderState {
    pub title: String,
    pub description: String,
    pub accepting_responses: bool,
    /// Other form-level fields (publication window, audience, ...) submitted
    /// unchanged.
    pub extra: IndexMap<String, String>,
}

impl HeaderState {
    /// Picks the header fields out of a flat field map, skipping everything
    /// that belongs to the `prefix` formset.
    pub fn from_fields(prefix: &str, fields: &IndexMap<String, String>) -> Self {
        let mut header = Self::default();
        let management = format!("{prefix}-");
        for (key, value) in fields {
            if split_card_key(prefix, key).is_some() || key.starts_with(&management) {
                continue;
            }
            match key.as_str() {
                FIELD_TITLE => header.title = value.clone(),
                FIELD_DESCRIPTION => header.description = value.clone(),
                FIELD_ACCEPTING => header.accepting_responses = is_on(value),
                _ => {
                    header.extra.insert(key.clone(), value.clone());
                }
            }
        }
        header
    }

    /// Updates a header field by name. Returns `false` when nothing changed.
    pub fn set(&mut self, name: &str, value: String) -> bool {
        let slot = match name {
            FIELD_TITLE => &mut self.title,
            FIELD_DESCRIPTION => &mut self.description,
            FIELD_ACCEPTING => {
                let on = is_on(&value);
                let changed = self.accepting_responses != on;
                self.accepting_responses = on;
                return changed;
            }
            other => self.extra.entry(other.to_string()).or_default(),
        };
        if *slot == value {
            return false;
        }
        *slot = value;
        true
    }

    pub fn form_fields(&self) -> Vec<(String, String)> {
        let mut fields = vec![
            (FIELD_TITLE.to_string(), self.title.clone()),
            (FIELD_DESCRIPTION.to_string(), self.description.clone()),
        ];
        if self.accepting_responses {
            fields.push((FIELD_ACCEPTING.to_string(), "on".to_string()));
        }
        fields.extend(
            self.extra
                .iter()
                .map(|(key, value)| (key.clone(), value.clone())),
        );
        fields
    }
}

fn is_on(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "on" | "true" | "1" | "yes"
    )
}
