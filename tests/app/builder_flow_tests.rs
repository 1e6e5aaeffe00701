use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use formdeck::app::{
    AddQuestionControl, BuilderError, PersistenceError, TEMPLATE_FAILED_LABEL, TemplateError,
};
use formdeck::catalog::{CatalogError, Connection, SavedQuery};
use formdeck::prelude::*;
use indexmap::IndexMap;

const WINDOW: Duration = Duration::from_millis(400);

const SKELETON: &str = r#"{
    "campo_set-__prefix__-id": "",
    "campo_set-__prefix__-ordem": "0",
    "campo_set-__prefix__-tipo": "texto_curto",
    "campo_set-__prefix__-rotulo": "Nova pergunta"
}"#;

fn fields(pairs: &[(&str, &str)]) -> IndexMap<String, String> {
    pairs
        .iter()
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect()
}

fn three_card_form() -> IndexMap<String, String> {
    fields(&[
        ("titulo", "Pesquisa de clima"),
        ("descricao", ""),
        ("campo_set-TOTAL_FORMS", "3"),
        ("campo_set-INITIAL_FORMS", "3"),
        ("campo_set-0-id", "11"),
        ("campo_set-0-tipo", "texto_curto"),
        ("campo_set-0-rotulo", "Nome"),
        ("campo_set-1-id", "12"),
        ("campo_set-1-tipo", "multipla"),
        ("campo_set-1-rotulo", "Humor"),
        ("campo_set-1-opcoes_json", r#"["Bom","Ruim"]"#),
        ("campo_set-2-id", "13"),
        ("campo_set-2-tipo", "data"),
        ("campo_set-2-rotulo", "Nascimento"),
    ])
}

fn builder(form: &IndexMap<String, String>) -> FormBuilder {
    FormBuilder::from_fields(BuilderOptions::default().with_debounce(WINDOW), form)
}

fn orders(builder: &FormBuilder) -> Vec<usize> {
    builder.cards().cards().iter().map(|card| card.order()).collect()
}

fn assert_renumbered(builder: &mut FormBuilder) {
    let count = builder.cards().len();
    assert_eq!(orders(builder), (1..=count).collect::<Vec<_>>());
    let signal = builder.save_now();
    let expected = count.to_string();
    assert_eq!(signal.field("campo_set-TOTAL_FORMS"), Some(expected.as_str()));
    for index in 0..count {
        let key = format!("campo_set-{index}-ordem");
        let order = (index + 1).to_string();
        assert_eq!(signal.field(&key), Some(order.as_str()));
    }
}

struct StaticTemplate(Result<&'static str, u16>);

#[async_trait]
impl TemplateSource for StaticTemplate {
    async fn fetch_skeleton(&self) -> Result<String, TemplateError> {
        self.0
            .map(str::to_string)
            .map_err(TemplateError::Status)
    }
}

struct FakeCatalog;

#[async_trait]
impl CatalogSource for FakeCatalog {
    async fn connections(&self) -> Result<Vec<Connection>, CatalogError> {
        Ok(vec![
            Connection {
                id: 1,
                name: "ERP".into(),
                engine: "postgres".into(),
            },
            Connection {
                id: 2,
                name: "CRM".into(),
                engine: "mysql".into(),
            },
        ])
    }

    async fn queries(&self, connection: Option<i64>) -> Result<Vec<SavedQuery>, CatalogError> {
        let all = vec![
            SavedQuery {
                id: 5,
                name: "Clientes".into(),
                connection_id: 2,
                connection_name: "CRM".into(),
            },
            SavedQuery {
                id: 6,
                name: "Produtos".into(),
                connection_id: 1,
                connection_name: "ERP".into(),
            },
        ];
        Ok(all
            .into_iter()
            .filter(|query| connection.is_none_or(|id| query.connection_id == id))
            .collect())
    }

    async fn columns(&self, query: i64) -> Result<Vec<String>, CatalogError> {
        match query {
            5 => Ok(vec!["ID".into(), "NOME".into()]),
            _ => Err(CatalogError::Status(500)),
        }
    }
}

struct RecordingPersistence {
    outcome: SaveOutcome,
    seen: Mutex<Vec<u64>>,
}

impl RecordingPersistence {
    fn new(outcome: SaveOutcome) -> Self {
        Self {
            outcome,
            seen: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Persistence for RecordingPersistence {
    async fn save(&self, signal: &SaveSignal) -> Result<SaveOutcome, PersistenceError> {
        self.seen.lock().unwrap().push(signal.sequence);
        Ok(self.outcome.clone())
    }
}

struct OfflinePersistence;

#[async_trait]
impl Persistence for OfflinePersistence {
    async fn save(&self, _signal: &SaveSignal) -> Result<SaveOutcome, PersistenceError> {
        Err(PersistenceError::Transport("connection refused".into()))
    }
}

#[test]
fn removing_the_middle_card_renumbers_the_rest() {
    let mut builder = builder(&three_card_form());
    let ids = builder.cards().card_ids();
    let now = Instant::now();

    builder
        .dispatch(BuilderCommand::RemoveCard { card: ids[1] }, now)
        .unwrap();

    assert_eq!(orders(&builder), vec![1, 2]);
    assert_eq!(builder.cards().total_forms(), 2);
    let signal = builder.tick(now).expect("removal saves right away");
    assert_eq!(signal.field("campo_set-TOTAL_FORMS"), Some("2"));
    assert_eq!(signal.field("campo_set-1-rotulo"), Some("Nascimento"));
    assert!(!signal.has_field("campo_set-2-rotulo"));
}

#[test]
fn rapid_edits_coalesce_into_one_save() {
    let mut builder = builder(&three_card_form());
    let card = builder.cards().card_ids()[0];
    let start = Instant::now();
    let mut now = start;
    let mut signals = Vec::new();

    for step in 1..=5 {
        now = start + Duration::from_millis(step * 60);
        builder
            .dispatch(
                BuilderCommand::Card {
                    card,
                    event: CardEvent::LabelEdited {
                        text: format!("Nome v{step}"),
                    },
                },
                now,
            )
            .unwrap();
        signals.extend(builder.tick(now));
    }
    signals.extend(builder.tick(now + WINDOW - Duration::from_millis(1)));
    assert!(signals.is_empty());

    signals.extend(builder.tick(now + WINDOW));
    signals.extend(builder.tick(now + WINDOW * 3));
    assert_eq!(signals.len(), 1);
    assert_eq!(signals[0].field("campo_set-0-rotulo"), Some("Nome v5"));
}

#[test]
fn immediate_change_absorbs_a_pending_debounce() {
    let mut builder = builder(&three_card_form());
    let now = Instant::now();
    builder
        .dispatch(
            BuilderCommand::HeaderEdited {
                name: "titulo".into(),
                value: "Clima 2026".into(),
            },
            now,
        )
        .unwrap();
    builder
        .dispatch(BuilderCommand::AcceptingToggled { on: true }, now)
        .unwrap();

    let signal = builder.tick(now).expect("toggle saves right away");
    assert_eq!(signal.field("titulo"), Some("Clima 2026"));
    assert_eq!(signal.field("aceita_respostas"), Some("on"));
    assert!(builder.tick(now + WINDOW).is_none());
}

#[tokio::test]
async fn order_stays_a_permutation_through_add_remove_and_reorder() {
    let mut builder = builder(&three_card_form());
    builder.load_template(&StaticTemplate(Ok(SKELETON))).await;
    let now = Instant::now();
    assert_renumbered(&mut builder);

    builder.dispatch(BuilderCommand::AddCard, now).unwrap();
    builder.dispatch(BuilderCommand::AddCard, now).unwrap();
    assert_eq!(builder.cards().len(), 5);
    assert_renumbered(&mut builder);

    let first = builder.cards().card_ids()[0];
    builder
        .dispatch(BuilderCommand::RemoveCard { card: first }, now)
        .unwrap();
    assert_renumbered(&mut builder);

    let moved = builder.cards().card_ids()[3];
    builder
        .dispatch(BuilderCommand::ReorderEnded { from: 3, to: 0 }, now)
        .unwrap();
    assert_eq!(builder.cards().card_ids()[0], moved);
    assert_renumbered(&mut builder);
}

#[tokio::test]
async fn failed_template_disables_add_question() {
    let mut builder = builder(&three_card_form());
    builder.load_template(&StaticTemplate(Err(502))).await;
    assert_eq!(builder.add_question(), &AddQuestionControl::Failed);
    assert_eq!(builder.add_question().label(), TEMPLATE_FAILED_LABEL);

    // A later successful fetch is ignored.
    builder.load_template(&StaticTemplate(Ok(SKELETON))).await;
    let err = builder
        .dispatch(BuilderCommand::AddCard, Instant::now())
        .unwrap_err();
    assert!(matches!(err, BuilderError::TemplateUnavailable));
    assert_eq!(builder.cards().len(), 3);
}

#[tokio::test]
async fn catalog_restoration_fills_the_connection_from_the_query() {
    let form = fields(&[
        ("campo_set-TOTAL_FORMS", "1"),
        ("campo_set-INITIAL_FORMS", "1"),
        ("campo_set-0-id", "21"),
        ("campo_set-0-tipo", "lista"),
        ("campo_set-0-rotulo", "Cliente"),
        ("campo_set-0-origem_opcoes", "sqlhub"),
        (
            "campo_set-0-sqlhub_json",
            r#"{"connection_id":null,"query_id":5,"value_field":"ID","label_field":"APAGADA"}"#,
        ),
    ]);
    let mut builder = builder(&form);
    assert!(builder.pending_loads() > 0);

    let performed = builder.drain_loads(&FakeCatalog).await;
    assert_eq!(performed, 3);
    assert_eq!(builder.pending_loads(), 0);

    let card = &builder.cards().cards()[0];
    let selection = card.external_selection();
    assert_eq!(selection.query_id, Some(5));
    assert_eq!(selection.connection_id, Some(2));
    assert_eq!(selection.value_field.as_deref(), Some("ID"));
    assert_eq!(selection.label_field, None);
    assert_eq!(card.cascade().columns().items().len(), 2);
    assert!(card.has_problems());
}

#[tokio::test]
async fn failed_column_lookup_keeps_the_card_editable() {
    let form = fields(&[
        ("campo_set-TOTAL_FORMS", "1"),
        ("campo_set-0-tipo", "lista"),
        ("campo_set-0-rotulo", "Produto"),
        ("campo_set-0-origem_opcoes", "sqlhub"),
    ]);
    let mut builder = builder(&form);
    builder.drain_loads(&FakeCatalog).await;
    let card = builder.cards().card_ids()[0];

    builder
        .dispatch(
            BuilderCommand::Card {
                card,
                event: CardEvent::ExternalStageChanged {
                    selection: StageSelection::Query { id: Some(6) },
                },
            },
            Instant::now(),
        )
        .unwrap();
    builder.drain_loads(&FakeCatalog).await;

    let state = builder.cards().card(card).unwrap();
    assert!(state.cascade().columns().is_failed());
    assert_eq!(state.external_selection().query_id, Some(6));
    assert_eq!(state.external_selection().connection_id, Some(1));
    assert!(builder.is_save_pending());
}

#[tokio::test]
async fn accepted_save_assigns_ids_to_new_cards() {
    let mut builder = builder(&three_card_form());
    builder.load_template(&StaticTemplate(Ok(SKELETON))).await;
    builder
        .dispatch(BuilderCommand::AddCard, Instant::now())
        .unwrap();
    let added: CardId = builder.cards().card_ids()[3];
    assert_eq!(builder.cards().initial_forms(), 3);

    let signal = builder.save_now();
    assert_eq!(signal.field("campo_set-3-id"), Some(""));
    let persistence = RecordingPersistence::new(SaveOutcome::Saved {
        assigned_ids: [("campo_set-3".to_string(), 44)].into_iter().collect(),
    });
    builder.submit(&persistence, signal).await.unwrap();

    assert_eq!(*persistence.seen.lock().unwrap(), vec![1]);
    assert_eq!(builder.cards().card(added).unwrap().record_id(), "44");
    assert_eq!(builder.cards().initial_forms(), 4);

    let next = builder.save_now();
    assert_eq!(next.field("campo_set-3-id"), Some("44"));
    assert_eq!(next.field("campo_set-INITIAL_FORMS"), Some("4"));
}

#[tokio::test]
async fn rejected_and_failed_saves_leave_the_counters_alone() {
    let mut builder = builder(&three_card_form());
    let rejected = RecordingPersistence::new(SaveOutcome::Rejected {
        status: 400,
        body: "<ul class=\"errorlist\"></ul>".into(),
    });
    let signal = builder.save_now();
    let outcome = builder.submit(&rejected, signal).await.unwrap();
    assert!(matches!(outcome, SaveOutcome::Rejected { status: 400, .. }));
    assert!(builder.status().message().contains("400"));

    let signal = builder.save_now();
    assert!(builder.submit(&OfflinePersistence, signal).await.is_err());
    assert!(builder.status().message().contains("connection refused"));
    assert_eq!(builder.cards().initial_forms(), 3);
}

#[tokio::test]
async fn restored_query_missing_from_catalog_drops_its_columns() {
    let form = fields(&[
        ("campo_set-TOTAL_FORMS", "1"),
        ("campo_set-0-id", "22"),
        ("campo_set-0-tipo", "lista"),
        ("campo_set-0-rotulo", "Cliente"),
        ("campo_set-0-origem_opcoes", "sqlhub"),
        (
            "campo_set-0-sqlhub_json",
            r#"{"connection_id":1,"query_id":5,"value_field":"ID","label_field":"NOME"}"#,
        ),
    ]);
    let mut builder = builder(&form);
    builder.drain_loads(&FakeCatalog).await;

    let signal = builder.save_now();
    assert_eq!(
        signal.field("campo_set-0-sqlhub_json"),
        Some(r#"{"connection_id":1,"query_id":null,"value_field":null,"label_field":null}"#)
    );
}
