use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde_json::Value;

use crate::catalog::LoadRequest;

use super::card::{CardId, CardState};
use super::error::SkeletonError;

pub const DEFAULT_PREFIX: &str = "campo_set";
pub const TOTAL_FORMS: &str = "TOTAL_FORMS";
pub const INITIAL_FORMS: &str = "INITIAL_FORMS";

/// A catalog lookup requested on behalf of one card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingLoad {
    pub card: CardId,
    pub request: LoadRequest,
}

/// The ordered set of cards behind one formset prefix.
///
/// The total count is always the number of cards. The initial count only
/// moves when the server confirms a save.
#[derive(Debug, Clone)]
pub struct CardCollection {
    prefix: String,
    categories: Vec<String>,
    cards: Vec<CardState>,
    initial_forms: usize,
    next_id: u64,
}

impl CardCollection {
    pub fn new(prefix: impl Into<String>, categories: Vec<String>) -> Self {
        Self {
            prefix: prefix.into(),
            categories,
            cards: Vec::new(),
            initial_forms: 0,
            next_id: 1,
        }
    }

    /// Rebuilds a collection from a server-rendered field map. Cards stay
    /// unready until [`init_all`](Self::init_all).
    pub fn from_fields(
        prefix: impl Into<String>,
        categories: Vec<String>,
        fields: &IndexMap<String, String>,
    ) -> Self {
        let mut collection = Self::new(prefix, categories);
        collection.initial_forms = collection.management_value(fields, INITIAL_FORMS);
        for card_fields in group_card_fields(&collection.prefix, fields).into_values() {
            let id = collection.allocate_id();
            collection
                .cards
                .push(CardState::from_fields(id, &card_fields, &collection.categories));
        }
        collection
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn cards(&self) -> &[CardState] {
        &self.cards
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn total_forms(&self) -> usize {
        self.cards.len()
    }

    pub fn initial_forms(&self) -> usize {
        self.initial_forms
    }

    pub fn card(&self, id: CardId) -> Option<&CardState> {
        self.cards.iter().find(|card| card.id() == id)
    }

    pub fn card_mut(&mut self, id: CardId) -> Option<&mut CardState> {
        self.cards.iter_mut().find(|card| card.id() == id)
    }

    pub fn position(&self, id: CardId) -> Option<usize> {
        self.cards.iter().position(|card| card.id() == id)
    }

    pub fn card_ids(&self) -> Vec<CardId> {
        self.cards.iter().map(CardState::id).collect()
    }

    /// Formset prefix of the card at `index`, e.g. `campo_set-2`.
    pub fn card_prefix(&self, index: usize) -> String {
        format!("{}-{index}", self.prefix)
    }

    /// Runs lifecycle init on every card that is not ready yet.
    pub fn init_all(&mut self) -> Vec<PendingLoad> {
        let mut loads = Vec::new();
        for card in &mut self.cards {
            let card_id = card.id();
            loads.extend(card.init().into_iter().map(|request| PendingLoad {
                card: card_id,
                request,
            }));
        }
        loads
    }

    /// Appends a card built from a new-card skeleton.
    ///
    /// `token` in the skeleton is replaced with the current total count before
    /// parsing. The skeleton is a JSON object of form fields.
    pub fn add_from_skeleton(
        &mut self,
        skeleton: &str,
        token: &str,
    ) -> Result<(CardId, Vec<PendingLoad>), SkeletonError> {
        let rendered = skeleton.replace(token, &self.total_forms().to_string());
        let fields = parse_field_map(&rendered)?;
        let card_fields = group_card_fields(&self.prefix, &fields)
            .into_values()
            .next()
            .ok_or(SkeletonError::MissingPrefix)?;

        let id = self.allocate_id();
        self.cards
            .push(CardState::from_fields(id, &card_fields, &self.categories));
        let loads = self.init_all();
        self.renumber();
        log::debug!("added {id}; {} cards", self.total_forms());
        Ok((id, loads))
    }

    /// Removes a card and renumbers the rest.
    pub fn remove(&mut self, id: CardId) -> Option<CardState> {
        let index = self.position(id)?;
        let card = self.cards.remove(index);
        self.renumber();
        log::debug!("removed {id}; {} cards", self.total_forms());
        Some(card)
    }

    /// Moves the card at `from` to `to` (end of a drag) and renumbers.
    pub fn move_card(&mut self, from: usize, to: usize) -> bool {
        if from >= self.cards.len() || to >= self.cards.len() {
            return false;
        }
        let card = self.cards.remove(from);
        self.cards.insert(to, card);
        self.renumber();
        true
    }

    /// Sets each card's order to its 1-based position.
    pub fn renumber(&mut self) {
        for (index, card) in self.cards.iter_mut().enumerate() {
            card.set_order(index + 1);
        }
    }

    /// Replaces the card set with freshly rendered markup.
    ///
    /// Cards whose record id matches a current card keep its identity; every
    /// card is rebuilt from the new fields and initialised again.
    pub fn swap_markup(&mut self, fields: &IndexMap<String, String>) -> Vec<PendingLoad> {
        let known: IndexMap<String, CardId> = self
            .cards
            .iter()
            .filter(|card| !card.record_id().is_empty())
            .map(|card| (card.record_id().to_string(), card.id()))
            .collect();

        let mut cards = Vec::new();
        for card_fields in group_card_fields(&self.prefix, fields).into_values() {
            let id = card_fields
                .get(super::card::FIELD_ID)
                .and_then(|record| known.get(record.trim()).copied())
                .unwrap_or_else(|| self.allocate_id());
            cards.push(CardState::from_fields(id, &card_fields, &self.categories));
        }
        self.cards = cards;
        if fields.contains_key(&self.management_key(INITIAL_FORMS)) {
            self.initial_forms = self.management_value(fields, INITIAL_FORMS);
        }

        let loads = self.init_all();
        self.renumber();
        log::debug!("markup swapped; {} cards", self.total_forms());
        loads
    }

    pub fn sync_all_payloads(&mut self) {
        for card in &mut self.cards {
            card.sync_payloads();
        }
    }

    /// The server accepted a save: every card now exists remotely.
    pub fn confirm_saved(&mut self) {
        self.initial_forms = self.total_forms();
    }

    /// Fills in record ids the server assigned to new cards.
    ///
    /// `ids` is keyed by card prefix as emitted in the saved payload and
    /// `emitted` lists the card ids in that payload's order. Returns how many
    /// cards received an id.
    pub fn apply_assigned_ids(&mut self, emitted: &[CardId], ids: &IndexMap<String, i64>) -> usize {
        let mut assigned = 0;
        for (key, record_id) in ids {
            let Some(index) = key
                .strip_prefix(&self.prefix)
                .and_then(|rest| rest.strip_prefix('-'))
                .and_then(|index| index.parse::<usize>().ok())
            else {
                log::warn!("ignoring assigned id for unknown prefix {key}");
                continue;
            };
            let Some(card_id) = emitted.get(index).copied() else {
                continue;
            };
            if let Some(card) = self.card_mut(card_id)
                && card.assign_record_id(*record_id)
            {
                assigned += 1;
            }
        }
        assigned
    }

    /// Management fields followed by every card's fields, keyed by position.
    pub fn payload_fields(&self) -> Vec<(String, String)> {
        let mut fields = vec![
            (
                self.management_key(TOTAL_FORMS),
                self.total_forms().to_string(),
            ),
            (
                self.management_key(INITIAL_FORMS),
                self.initial_forms.to_string(),
            ),
        ];
        for (index, card) in self.cards.iter().enumerate() {
            let prefix = self.card_prefix(index);
            fields.extend(
                card.form_fields()
                    .into_iter()
                    .map(|(name, value)| (format!("{prefix}-{name}"), value)),
            );
        }
        fields
    }

    fn allocate_id(&mut self) -> CardId {
        let id = CardId(self.next_id);
        self.next_id += 1;
        id
    }

    fn management_key(&self, name: &str) -> String {
        format!("{}-{name}", self.prefix)
    }

    fn management_value(&self, fields: &IndexMap<String, String>, name: &str) -> usize {
        fields
            .get(&self.management_key(name))
            .and_then(|value| value.trim().parse().ok())
            .unwrap_or(0)
    }
}

/// Splits `<prefix>-<index>-<name>` into its index and field name.
pub fn split_card_key<'a>(prefix: &str, key: &'a str) -> Option<(usize, &'a str)> {
    let rest = key.strip_prefix(prefix)?.strip_prefix('-')?;
    let (index, name) = rest.split_once('-')?;
    let index = index.parse().ok()?;
    (!name.is_empty()).then_some((index, name))
}

/// Groups a flat field map by card index, in index order.
pub fn group_card_fields(
    prefix: &str,
    fields: &IndexMap<String, String>,
) -> BTreeMap<usize, IndexMap<String, String>> {
    let mut cards: BTreeMap<usize, IndexMap<String, String>> = BTreeMap::new();
    for (key, value) in fields {
        if let Some((index, name)) = split_card_key(prefix, key) {
            cards
                .entry(index)
                .or_default()
                .insert(name.to_string(), value.clone());
        }
    }
    cards
}

/// Parses a JSON object of form fields. Scalars are stringified; `null` is
/// an empty field.
pub fn parse_field_map(raw: &str) -> Result<IndexMap<String, String>, SkeletonError> {
    let object: IndexMap<String, Value> =
        serde_json::from_str(raw).map_err(SkeletonError::Parse)?;
    Ok(object
        .into_iter()
        .map(|(key, value)| {
            let text = match value {
                Value::String(text) => text,
                Value::Null => String::new(),
                other => other.to_string(),
            };
            (key, text)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SKELETON: &str = r#"{
        "campo_set-__prefix__-id": "",
        "campo_set-__prefix__-tipo": "texto_curto",
        "campo_set-__prefix__-rotulo": "",
        "campo_set-__prefix__-ordem": "0"
    }"#;

    fn collection_with(count: usize) -> CardCollection {
        let mut collection = CardCollection::new(DEFAULT_PREFIX, Vec::new());
        for _ in 0..count {
            collection.add_from_skeleton(SKELETON, "__prefix__").unwrap();
        }
        collection
    }

    fn orders(collection: &CardCollection) -> Vec<usize> {
        collection.cards().iter().map(CardState::order).collect()
    }

    #[test]
    fn split_card_key_requires_index_and_name() {
        assert_eq!(
            split_card_key("campo_set", "campo_set-3-rotulo"),
            Some((3, "rotulo"))
        );
        assert_eq!(split_card_key("campo_set", "campo_set-TOTAL_FORMS"), None);
        assert_eq!(split_card_key("campo_set", "outro-1-rotulo"), None);
        assert_eq!(split_card_key("campo_set", "campo_set-1-"), None);
    }

    #[test]
    fn adding_cards_renumbers() {
        let collection = collection_with(3);
        assert_eq!(collection.total_forms(), 3);
        assert_eq!(orders(&collection), vec![1, 2, 3]);
        assert!(collection.cards().iter().all(CardState::is_ready));
    }

    #[test]
    fn removing_middle_card_renumbers() {
        let mut collection = collection_with(3);
        let ids = collection.card_ids();
        collection.remove(ids[1]).unwrap();
        assert_eq!(orders(&collection), vec![1, 2]);
        assert_eq!(collection.total_forms(), 2);
        assert_eq!(collection.card_ids(), vec![ids[0], ids[2]]);
    }

    #[test]
    fn moving_a_card_keeps_orders_contiguous() {
        let mut collection = collection_with(3);
        let ids = collection.card_ids();
        assert!(collection.move_card(2, 0));
        assert_eq!(collection.card_ids(), vec![ids[2], ids[0], ids[1]]);
        assert_eq!(orders(&collection), vec![1, 2, 3]);
        assert!(!collection.move_card(5, 0));
    }

    #[test]
    fn skeleton_without_prefixed_fields_is_rejected() {
        let mut collection = collection_with(0);
        let err = collection
            .add_from_skeleton(r#"{"tipo": "data"}"#, "__prefix__")
            .unwrap_err();
        assert!(matches!(err, SkeletonError::MissingPrefix));
        assert!(collection.is_empty());
    }

    #[test]
    fn initial_forms_only_move_on_confirmation() {
        let mut collection = collection_with(2);
        assert_eq!(collection.initial_forms(), 0);
        collection.confirm_saved();
        assert_eq!(collection.initial_forms(), 2);
    }

    #[test]
    fn assigned_ids_fill_only_unsaved_cards() {
        let mut collection = collection_with(2);
        let emitted = collection.card_ids();
        let ids: IndexMap<String, i64> = [
            ("campo_set-0".to_string(), 11),
            ("campo_set-1".to_string(), 12),
        ]
        .into_iter()
        .collect();
        assert_eq!(collection.apply_assigned_ids(&emitted, &ids), 2);
        assert_eq!(collection.cards()[1].record_id(), "12");
        assert_eq!(collection.apply_assigned_ids(&emitted, &ids), 0);
    }

    #[test]
    fn payload_is_keyed_by_position() {
        let mut collection = collection_with(2);
        collection.move_card(1, 0);
        let fields = collection.payload_fields();
        assert!(fields.contains(&("campo_set-TOTAL_FORMS".into(), "2".into())));
        assert!(fields.contains(&("campo_set-0-ordem".into(), "1".into())));
        assert!(fields.contains(&("campo_set-1-ordem".into(), "2".into())));
    }

    #[test]
    fn markup_swap_keeps_identity_of_known_records() {
        let fields: IndexMap<String, String> = [
            ("campo_set-TOTAL_FORMS", "1"),
            ("campo_set-INITIAL_FORMS", "1"),
            ("campo_set-0-id", "40"),
            ("campo_set-0-tipo", "data"),
            ("campo_set-0-rotulo", "When"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        let mut collection = CardCollection::from_fields(DEFAULT_PREFIX, Vec::new(), &fields);
        collection.init_all();
        let before = collection.card_ids();

        collection.swap_markup(&fields);
        assert_eq!(collection.card_ids(), before);
        assert_eq!(collection.initial_forms(), 1);
        assert!(collection.cards()[0].is_ready());
        assert_eq!(orders(&collection), vec![1]);
    }
}
