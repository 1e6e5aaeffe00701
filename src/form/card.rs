use std::collections::BTreeSet;
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::catalog::{CascadeState, LoadRequest, LoadResponse};
use crate::domain::{ExternalSource, FieldKind, OptionsSource, QuestionType};

use super::actions::{CardEvent, CardOutcome};
use super::reducers::apply_card_event;
use super::serializer::{
    UploadPanel, decode_external, decode_options, encode_external, encode_options, encode_upload,
};
use super::validation::{CardErrors, validate_card};
use super::visibility::PanelVisibility;

pub const FIELD_ID: &str = "id";
pub const FIELD_ORDER: &str = "ordem";
pub const FIELD_TYPE: &str = "tipo";
pub const FIELD_LABEL: &str = "rotulo";
pub const FIELD_HELP: &str = "ajuda";
pub const FIELD_REQUIRED: &str = "obrigatorio";
pub const FIELD_ORIGIN: &str = "origem_opcoes";

/// Identity of a card for the lifetime of a builder. Unlike the formset
/// index it survives reordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardId(pub u64);

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "card#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Unready,
    Ready,
}

/// One question card: its inputs, derived panel state and the structured
/// hidden slots submitted to the server.
#[derive(Debug, Clone)]
pub struct CardState {
    id: CardId,
    record_id: String,
    pub(super) question_type: Option<QuestionType>,
    pub(super) origin: Option<OptionsSource>,
    pub(super) origin_choice: Option<OptionsSource>,
    pub(super) label: String,
    pub(super) help: String,
    pub(super) required: bool,
    order: usize,
    pub(super) option_rows: Vec<String>,
    pub(super) upload: UploadPanel,
    pub(super) cascade: CascadeState,
    slots: IndexMap<FieldKind, String>,
    visibility: PanelVisibility,
    active_fields: BTreeSet<FieldKind>,
    errors: CardErrors,
    lifecycle: Lifecycle,
    extra: IndexMap<String, String>,
}

impl CardState {
    pub fn new(id: CardId, categories: &[String]) -> Self {
        Self {
            id,
            record_id: String::new(),
            question_type: None,
            origin: None,
            origin_choice: None,
            label: String::new(),
            help: String::new(),
            required: false,
            order: 0,
            option_rows: Vec::new(),
            upload: UploadPanel::new(categories),
            cascade: CascadeState::default(),
            slots: FieldKind::ALL
                .into_iter()
                .map(|kind| (kind, String::new()))
                .collect(),
            visibility: PanelVisibility::default(),
            active_fields: BTreeSet::new(),
            errors: CardErrors::default(),
            lifecycle: Lifecycle::Unready,
            extra: IndexMap::new(),
        }
    }

    /// Builds an unready card from its form fields, keyed by bare field name
    /// (`tipo`, `rotulo`, `valid_json`, ...). Unknown fields are carried
    /// through to the payload untouched.
    pub fn from_fields(
        id: CardId,
        fields: &IndexMap<String, String>,
        categories: &[String],
    ) -> Self {
        let mut card = Self::new(id, categories);
        for (name, value) in fields {
            match name.as_str() {
                FIELD_ID => card.record_id = value.trim().to_string(),
                FIELD_TYPE => card.question_type = QuestionType::from_wire(value),
                FIELD_ORIGIN => {
                    card.origin =
                        (!value.trim().is_empty()).then(|| OptionsSource::from_wire(value));
                }
                FIELD_LABEL => card.label = value.clone(),
                FIELD_HELP => card.help = value.clone(),
                FIELD_REQUIRED => card.required = is_checked(value),
                FIELD_ORDER => card.order = value.trim().parse().unwrap_or(0),
                other => match FieldKind::from_wire(other) {
                    Some(kind) => {
                        card.slots.insert(kind, value.clone());
                    }
                    None => {
                        card.extra.insert(other.to_string(), value.clone());
                    }
                },
            }
        }
        card
    }

    pub fn id(&self) -> CardId {
        self.id
    }

    pub fn record_id(&self) -> &str {
        &self.record_id
    }

    pub fn question_type(&self) -> Option<QuestionType> {
        self.question_type
    }

    /// Effective options source; an unset origin counts as manual.
    pub fn options_source(&self) -> OptionsSource {
        self.origin.unwrap_or_default()
    }

    pub fn origin_choice(&self) -> Option<OptionsSource> {
        self.origin_choice
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn help(&self) -> &str {
        &self.help
    }

    pub fn required(&self) -> bool {
        self.required
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn option_rows(&self) -> &[String] {
        &self.option_rows
    }

    pub fn upload_panel(&self) -> &UploadPanel {
        &self.upload
    }

    pub fn cascade(&self) -> &CascadeState {
        &self.cascade
    }

    pub fn external_selection(&self) -> &ExternalSource {
        self.cascade.selection()
    }

    pub fn visibility(&self) -> PanelVisibility {
        self.visibility
    }

    pub fn active_fields(&self) -> &BTreeSet<FieldKind> {
        &self.active_fields
    }

    pub fn is_active(&self, slot: FieldKind) -> bool {
        self.active_fields.contains(&slot)
    }

    /// Serialized value of a structured slot. Always empty while suppressed.
    pub fn slot_value(&self, slot: FieldKind) -> &str {
        self.slots.get(&slot).map(String::as_str).unwrap_or_default()
    }

    pub fn errors(&self) -> &CardErrors {
        &self.errors
    }

    pub fn has_problems(&self) -> bool {
        self.errors.has_problems()
    }

    pub fn is_ready(&self) -> bool {
        self.lifecycle == Lifecycle::Ready
    }

    pub(crate) fn set_order(&mut self, order: usize) {
        self.order = order;
    }

    pub(crate) fn assign_record_id(&mut self, record_id: i64) -> bool {
        if !self.record_id.is_empty() {
            return false;
        }
        self.record_id = record_id.to_string();
        true
    }

    /// One-time `unready → ready` transition.
    ///
    /// Defaults the origin, syncs the origin selector, resolves panels,
    /// validates, then restores panel inputs from non-empty persisted slots.
    /// Returns the catalog lookups to start when the card is a catalog-backed
    /// list. A second call is a no-op.
    pub fn init(&mut self) -> Vec<LoadRequest> {
        if self.lifecycle == Lifecycle::Ready {
            return Vec::new();
        }
        self.lifecycle = Lifecycle::Ready;

        if self.origin.is_none() {
            self.origin = Some(OptionsSource::Manual);
        }
        self.origin_choice = self.origin;
        self.apply_visibility();
        self.errors = validate_card(self);

        self.restore_slots();
        self.errors = validate_card(self);
        log::debug!(
            "{} ready: type={:?} origin={} active={:?}",
            self.id,
            self.question_type,
            self.options_source(),
            self.active_fields
        );

        self.ensure_cascade()
    }

    /// Routes one interaction to this card. Events reaching a card that has
    /// not been initialised are dropped.
    pub fn handle(&mut self, event: CardEvent) -> CardOutcome {
        apply_card_event(self, event)
    }

    /// Applies a finished catalog lookup and returns follow-up lookups.
    pub fn apply_load(&mut self, response: LoadResponse) -> Vec<LoadRequest> {
        let follow_up = self.cascade.apply(response);
        self.refresh();
        follow_up
    }

    /// Rebuilds every active slot from the panel inputs and clears the rest.
    pub fn sync_payloads(&mut self) {
        for kind in FieldKind::ALL {
            let value = if self.active_fields.contains(&kind) {
                match kind {
                    FieldKind::Options => encode_options(&self.option_rows),
                    FieldKind::UploadConstraints => encode_upload(&self.upload),
                    FieldKind::ExternalSource => encode_external(self.cascade.selection()),
                }
            } else {
                String::new()
            };
            self.slots.insert(kind, value);
        }
    }

    /// Form fields of this card in emission order, suppressed slots omitted.
    pub fn form_fields(&self) -> Vec<(String, String)> {
        let mut fields = vec![
            (FIELD_ID.to_string(), self.record_id.clone()),
            (FIELD_ORDER.to_string(), self.order.to_string()),
            (
                FIELD_TYPE.to_string(),
                self.question_type
                    .map(|kind| kind.wire_name().to_string())
                    .unwrap_or_default(),
            ),
            (FIELD_LABEL.to_string(), self.label.clone()),
            (FIELD_HELP.to_string(), self.help.clone()),
        ];
        if self.required {
            fields.push((FIELD_REQUIRED.to_string(), "on".to_string()));
        }
        fields.push((
            FIELD_ORIGIN.to_string(),
            self.options_source().wire_name().to_string(),
        ));
        for kind in &self.active_fields {
            fields.push((kind.wire_name().to_string(), self.slot_value(*kind).to_string()));
        }
        fields.extend(
            self.extra
                .iter()
                .map(|(name, value)| (name.clone(), value.clone())),
        );
        fields
    }

    /// Recomputes the payload slots and error slots after an input change.
    pub(super) fn refresh(&mut self) {
        self.sync_payloads();
        self.errors = validate_card(self);
    }

    pub(super) fn apply_visibility(&mut self) {
        self.visibility = PanelVisibility::resolve(self.question_type, self.options_source());
        for kind in FieldKind::ALL {
            if self.visibility.is_active(kind) {
                self.active_fields.insert(kind);
            } else {
                self.active_fields.remove(&kind);
                self.slots.insert(kind, String::new());
            }
        }
        log::debug!(
            "{} panels: origin={} external={} options={} upload={}",
            self.id,
            self.visibility.origin,
            self.visibility.external_catalog,
            self.visibility.options,
            self.visibility.upload_config
        );
    }

    pub(super) fn ensure_cascade(&mut self) -> Vec<LoadRequest> {
        if self.visibility.external_catalog {
            self.cascade.init()
        } else {
            Vec::new()
        }
    }

    fn restore_slots(&mut self) {
        let options = self.slot_value(FieldKind::Options).to_string();
        if !options.is_empty() {
            match decode_options(&options) {
                Ok(rows) => self.option_rows = rows,
                Err(err) => log::warn!("{}: ignoring persisted options ({err})", self.id),
            }
        }

        let upload = self.slot_value(FieldKind::UploadConstraints).to_string();
        if !upload.is_empty() {
            if let Err(err) = self.upload.restore(&upload) {
                log::warn!("{}: ignoring persisted upload config ({err})", self.id);
            }
        }

        let external = self.slot_value(FieldKind::ExternalSource).to_string();
        if !external.is_empty() {
            match decode_external(&external) {
                Ok(selection) => self.cascade.restore_selection(selection),
                Err(err) => log::warn!("{}: ignoring persisted catalog source ({err})", self.id),
            }
        }
    }
}

fn is_checked(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "on" | "true" | "1" | "yes"
    )
}
