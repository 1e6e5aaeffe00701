use std::collections::VecDeque;
use std::fmt;
use std::time::Instant;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::catalog::{CatalogSource, fetch};
use crate::domain::{FieldKind, QuestionType};
use crate::form::{CardCollection, CardEvent, CardId, PendingLoad, SaveMode, SkeletonError};

use super::autosave::AutosaveScheduler;
use super::header::{FIELD_ACCEPTING, HeaderState};
use super::options::BuilderOptions;
use super::persistence::{Persistence, PersistenceError, SaveOutcome, SaveSignal};
use super::status::StatusLine;
use super::template::{AddQuestionControl, TemplateSource};

/// Everything the builder page can be asked to do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum BuilderCommand {
    Card { card: CardId, event: CardEvent },
    HeaderEdited { name: String, value: String },
    AcceptingToggled { on: bool },
    AddCard,
    RemoveCard { card: CardId },
    /// End of a drag: the card at `from` now sits at `to`.
    ReorderEnded { from: usize, to: usize },
    /// The formset markup was replaced by a server-rendered field map.
    MarkupSwapped { fields: IndexMap<String, String> },
}

#[derive(Debug)]
pub enum BuilderError {
    UnknownCard(CardId),
    TemplateUnavailable,
    Skeleton(SkeletonError),
}

impl fmt::Display for BuilderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuilderError::UnknownCard(id) => write!(f, "no such card: {id}"),
            BuilderError::TemplateUnavailable => f.write_str("new-question template not loaded"),
            BuilderError::Skeleton(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for BuilderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BuilderError::Skeleton(err) => Some(err),
            BuilderError::UnknownCard(_) | BuilderError::TemplateUnavailable => None,
        }
    }
}

impl From<SkeletonError> for BuilderError {
    fn from(err: SkeletonError) -> Self {
        BuilderError::Skeleton(err)
    }
}

/// Per-card summary of the upload configuration, logged with every save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSnapshot {
    pub prefix: String,
    pub slot_active: bool,
    pub slot_value: String,
    pub restrict_to_categories: bool,
    pub checked_categories: Vec<String>,
    pub max_files: String,
    pub max_size_mb: String,
}

/// Owns the header, the card collection and the shared autosave timer of
/// one form, and turns commands into save signals and catalog lookups.
#[derive(Debug)]
pub struct FormBuilder {
    options: BuilderOptions,
    header: HeaderState,
    cards: CardCollection,
    autosave: AutosaveScheduler,
    add_question: AddQuestionControl,
    pending_loads: VecDeque<PendingLoad>,
    status: StatusLine,
    sequence: u64,
}

impl FormBuilder {
    pub fn new(options: BuilderOptions) -> Self {
        let cards = CardCollection::new(options.prefix.clone(), options.upload_categories.clone());
        Self::assemble(options, HeaderState::default(), cards)
    }

    /// Restores a builder from the server-rendered field map and initialises
    /// every card. Catalog-backed cards queue their restoration lookups.
    pub fn from_fields(options: BuilderOptions, fields: &IndexMap<String, String>) -> Self {
        let header = HeaderState::from_fields(&options.prefix, fields);
        let cards = CardCollection::from_fields(
            options.prefix.clone(),
            options.upload_categories.clone(),
            fields,
        );
        let mut builder = Self::assemble(options, header, cards);
        let loads = builder.cards.init_all();
        builder.pending_loads.extend(loads);
        builder.cards.renumber();
        builder
    }

    fn assemble(options: BuilderOptions, header: HeaderState, cards: CardCollection) -> Self {
        Self {
            autosave: AutosaveScheduler::new(options.debounce),
            options,
            header,
            cards,
            add_question: AddQuestionControl::default(),
            pending_loads: VecDeque::new(),
            status: StatusLine::new(),
            sequence: 0,
        }
    }

    pub fn options(&self) -> &BuilderOptions {
        &self.options
    }

    pub fn header(&self) -> &HeaderState {
        &self.header
    }

    pub fn cards(&self) -> &CardCollection {
        &self.cards
    }

    pub fn add_question(&self) -> &AddQuestionControl {
        &self.add_question
    }

    pub fn status(&self) -> &StatusLine {
        &self.status
    }

    pub fn pending_loads(&self) -> usize {
        self.pending_loads.len()
    }

    pub fn is_save_pending(&self) -> bool {
        self.autosave.is_pending()
    }

    pub fn problem_count(&self) -> usize {
        self.cards
            .cards()
            .iter()
            .filter(|card| card.has_problems())
            .count()
    }

    pub fn dispatch(&mut self, command: BuilderCommand, now: Instant) -> Result<(), BuilderError> {
        match command {
            BuilderCommand::Card { card, event } => {
                let target = self
                    .cards
                    .card_mut(card)
                    .ok_or(BuilderError::UnknownCard(card))?;
                let outcome = target.handle(event);
                self.pending_loads
                    .extend(outcome.loads.into_iter().map(|request| PendingLoad { card, request }));
                if let Some(mode) = outcome.save {
                    self.schedule(mode, now);
                }
            }
            BuilderCommand::HeaderEdited { name, value } => {
                let mode = if name == FIELD_ACCEPTING {
                    SaveMode::Immediate
                } else {
                    SaveMode::Debounced
                };
                if self.header.set(&name, value) {
                    self.schedule(mode, now);
                }
            }
            BuilderCommand::AcceptingToggled { on } => {
                self.header.accepting_responses = on;
                self.schedule(SaveMode::Immediate, now);
            }
            BuilderCommand::AddCard => {
                self.add_card()?;
            }
            BuilderCommand::RemoveCard { card } => {
                self.cards
                    .remove(card)
                    .ok_or(BuilderError::UnknownCard(card))?;
                self.pending_loads.retain(|load| load.card != card);
                self.schedule(SaveMode::Immediate, now);
            }
            BuilderCommand::ReorderEnded { from, to } => {
                if self.cards.move_card(from, to) {
                    self.schedule(SaveMode::Immediate, now);
                }
            }
            BuilderCommand::MarkupSwapped { fields } => {
                self.pending_loads.clear();
                let loads = self.cards.swap_markup(&fields);
                self.pending_loads.extend(loads);
            }
        }
        Ok(())
    }

    /// Appends a card from the cached skeleton.
    pub fn add_card(&mut self) -> Result<CardId, BuilderError> {
        let skeleton = self
            .add_question
            .skeleton()
            .ok_or(BuilderError::TemplateUnavailable)?
            .to_string();
        let (id, loads) = self
            .cards
            .add_from_skeleton(&skeleton, &self.options.placeholder_token)?;
        self.pending_loads.extend(loads);
        Ok(id)
    }

    /// Fires the save once its window has elapsed.
    pub fn tick(&mut self, now: Instant) -> Option<SaveSignal> {
        if self.autosave.poll(now) {
            Some(self.save_now())
        } else {
            None
        }
    }

    /// Builds the save signal right away, cancelling any pending window.
    /// Every card's payload is recomputed first.
    pub fn save_now(&mut self) -> SaveSignal {
        self.autosave.cancel();
        self.cards.sync_all_payloads();
        for snapshot in self.upload_snapshots() {
            log::debug!("upload snapshot: {snapshot:?}");
        }

        self.sequence += 1;
        let mut fields = self.header.form_fields();
        fields.extend(self.cards.payload_fields());
        let signal = SaveSignal {
            sequence: self.sequence,
            fields,
            cards: self.cards.card_ids(),
        };
        log::debug!(
            "save #{} emitted: {} cards, {} fields",
            signal.sequence,
            signal.cards.len(),
            signal.fields.len()
        );
        self.status.saving(signal.sequence);
        signal
    }

    /// Upload configuration of every file-upload card, in payload order.
    pub fn upload_snapshots(&self) -> Vec<UploadSnapshot> {
        self.cards
            .cards()
            .iter()
            .enumerate()
            .filter(|(_, card)| card.question_type() == Some(QuestionType::FileUpload))
            .map(|(index, card)| {
                let upload = card.upload_panel();
                UploadSnapshot {
                    prefix: self.cards.card_prefix(index),
                    slot_active: card.is_active(FieldKind::UploadConstraints),
                    slot_value: card.slot_value(FieldKind::UploadConstraints).to_string(),
                    restrict_to_categories: upload.restrict_to_categories,
                    checked_categories: upload.checked_categories(),
                    max_files: upload.max_files.clone(),
                    max_size_mb: upload.max_size_mb.clone(),
                }
            })
            .collect()
    }

    /// Applies the server's verdict on `signal`.
    pub fn acknowledge_save(&mut self, signal: &SaveSignal, outcome: SaveOutcome) {
        match outcome {
            SaveOutcome::Saved { assigned_ids } => {
                let assigned = self.cards.apply_assigned_ids(&signal.cards, &assigned_ids);
                self.cards.confirm_saved();
                log::debug!("save #{} confirmed; {assigned} ids assigned", signal.sequence);
                match self.problem_count() {
                    0 => self.status.saved(assigned),
                    count => self.status.issues_remaining(count),
                }
            }
            SaveOutcome::Rejected { status, .. } => {
                log::warn!("save #{} rejected with status {status}", signal.sequence);
                self.status.rejected(status);
            }
        }
    }

    /// Sends `signal` and applies the outcome.
    pub async fn submit(
        &mut self,
        persistence: &dyn Persistence,
        signal: SaveSignal,
    ) -> Result<SaveOutcome, PersistenceError> {
        match persistence.save(&signal).await {
            Ok(outcome) => {
                self.acknowledge_save(&signal, outcome.clone());
                Ok(outcome)
            }
            Err(err) => {
                log::warn!("save #{} failed: {err}", signal.sequence);
                self.status.save_failed(&err.to_string());
                Err(err)
            }
        }
    }

    /// Performs queued catalog lookups one at a time, feeding each response
    /// back to its card before starting the next. Returns how many lookups
    /// ran.
    pub async fn drain_loads(&mut self, catalog: &dyn CatalogSource) -> usize {
        let mut performed = 0;
        while let Some(load) = self.pending_loads.pop_front() {
            let response = fetch(catalog, &load.request).await;
            performed += 1;
            let Some(card) = self.cards.card_mut(load.card) else {
                log::debug!("dropping lookup for removed {}", load.card);
                continue;
            };
            let follow_up = card.apply_load(response);
            self.pending_loads.extend(follow_up.into_iter().map(|request| PendingLoad {
                card: load.card,
                request,
            }));
        }
        performed
    }

    /// Fetches the new-card skeleton. Only the first call does any work.
    pub async fn load_template(&mut self, source: &dyn TemplateSource) {
        if self.add_question != AddQuestionControl::Loading {
            return;
        }
        let result = source.fetch_skeleton().await;
        self.add_question.resolve(result);
    }

    fn schedule(&mut self, mode: SaveMode, now: Instant) {
        self.autosave.request(mode, now);
        self.status.pending();
    }
}
