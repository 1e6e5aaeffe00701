use crate::domain::ExternalSource;

use super::client::CatalogSource;
use super::types::{CatalogError, Connection, SavedQuery};

pub const LOAD_FAILED_LABEL: &str = "Failed to load";
pub const LOADING_LABEL: &str = "Loading…";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Connections,
    Queries,
    Columns,
}

impl Stage {
    fn index(self) -> usize {
        match self {
            Stage::Connections => 0,
            Stage::Queries => 1,
            Stage::Columns => 2,
        }
    }
}

/// Contents of one cascade selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectorState<T> {
    Idle,
    Loading,
    Ready(Vec<T>),
    Failed,
}

impl<T> Default for SelectorState<T> {
    fn default() -> Self {
        SelectorState::Idle
    }
}

impl<T> SelectorState<T> {
    pub fn items(&self) -> &[T] {
        match self {
            SelectorState::Ready(items) => items,
            _ => &[],
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, SelectorState::Loading)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, SelectorState::Failed)
    }

    /// Rendered entries. Loading and failure show a single disabled marker.
    pub fn entries(&self, render: impl Fn(&T) -> SelectorEntry) -> Vec<SelectorEntry> {
        match self {
            SelectorState::Idle => Vec::new(),
            SelectorState::Loading => vec![SelectorEntry::marker(LOADING_LABEL)],
            SelectorState::Failed => vec![SelectorEntry::marker(LOAD_FAILED_LABEL)],
            SelectorState::Ready(items) => items.iter().map(render).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorEntry {
    pub value: String,
    pub label: String,
    pub enabled: bool,
}

impl SelectorEntry {
    fn option(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
            enabled: true,
        }
    }

    fn marker(label: &str) -> Self {
        Self {
            value: String::new(),
            label: label.to_string(),
            enabled: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadKind {
    Connections,
    Queries { connection: Option<i64> },
    Columns { query: i64 },
}

impl LoadKind {
    pub fn stage(&self) -> Stage {
        match self {
            LoadKind::Connections => Stage::Connections,
            LoadKind::Queries { .. } => Stage::Queries,
            LoadKind::Columns { .. } => Stage::Columns,
        }
    }
}

/// A lookup the cascade wants performed. The generation identifies the
/// request among others issued for the same stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    pub kind: LoadKind,
    pub generation: u64,
}

#[derive(Debug)]
pub enum LoadResult {
    Connections(Result<Vec<Connection>, CatalogError>),
    Queries(Result<Vec<SavedQuery>, CatalogError>),
    Columns(Result<Vec<String>, CatalogError>),
}

impl LoadResult {
    pub fn stage(&self) -> Stage {
        match self {
            LoadResult::Connections(_) => Stage::Connections,
            LoadResult::Queries(_) => Stage::Queries,
            LoadResult::Columns(_) => Stage::Columns,
        }
    }
}

#[derive(Debug)]
pub struct LoadResponse {
    pub generation: u64,
    pub result: LoadResult,
}

/// Performs one lookup against the catalog.
pub async fn fetch(catalog: &dyn CatalogSource, request: &LoadRequest) -> LoadResponse {
    let result = match request.kind {
        LoadKind::Connections => LoadResult::Connections(catalog.connections().await),
        LoadKind::Queries { connection } => LoadResult::Queries(catalog.queries(connection).await),
        LoadKind::Columns { query } => LoadResult::Columns(catalog.columns(query).await),
    };
    LoadResponse {
        generation: request.generation,
        result,
    }
}

/// Per-card state of the connection → query → columns cascade.
///
/// Each stage keeps a generation counter; a response whose generation is not
/// the latest issued for its stage is discarded, so a slow stale response
/// can never overwrite a newer selector.
#[derive(Debug, Clone, Default)]
pub struct CascadeState {
    initialized: bool,
    restoring: bool,
    selection: ExternalSource,
    connections: SelectorState<Connection>,
    queries: SelectorState<SavedQuery>,
    columns: SelectorState<String>,
    generations: [u64; 3],
}

impl CascadeState {
    pub fn new(selection: ExternalSource) -> Self {
        Self {
            selection,
            ..Self::default()
        }
    }

    pub fn selection(&self) -> &ExternalSource {
        &self.selection
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn connections(&self) -> &SelectorState<Connection> {
        &self.connections
    }

    pub fn queries(&self) -> &SelectorState<SavedQuery> {
        &self.queries
    }

    pub fn columns(&self) -> &SelectorState<String> {
        &self.columns
    }

    pub fn connection_entries(&self) -> Vec<SelectorEntry> {
        self.connections
            .entries(|conn| SelectorEntry::option(conn.id.to_string(), conn.name.clone()))
    }

    pub fn query_entries(&self) -> Vec<SelectorEntry> {
        self.queries.entries(|query| {
            let label = if query.connection_name.is_empty() {
                query.name.clone()
            } else {
                format!("{} ({})", query.name, query.connection_name)
            };
            SelectorEntry::option(query.id.to_string(), label)
        })
    }

    /// Shared by the value-column and label-column selectors.
    pub fn column_entries(&self) -> Vec<SelectorEntry> {
        self.columns
            .entries(|column| SelectorEntry::option(column.clone(), column.clone()))
    }

    /// Replaces the selection from a persisted payload. Only meaningful before
    /// [`init`](Self::init).
    pub fn restore_selection(&mut self, selection: ExternalSource) {
        self.selection = selection;
    }

    /// Starts the restoration cascade. Runs at most once per card; later
    /// calls return no requests.
    pub fn init(&mut self) -> Vec<LoadRequest> {
        if self.initialized {
            return Vec::new();
        }
        self.initialized = true;
        self.restoring = true;
        log::debug!("cascade init with {:?}", self.selection);
        vec![self.begin(LoadKind::Connections)]
    }

    /// User picked a connection. Clears the query and both columns, then
    /// reloads queries for that connection.
    pub fn select_connection(&mut self, connection: Option<i64>) -> Vec<LoadRequest> {
        if self.selection.connection_id == connection {
            return Vec::new();
        }
        self.restoring = false;
        self.selection.connection_id = connection;
        self.selection.query_id = None;
        self.clear_columns();
        vec![self.begin(LoadKind::Queries { connection })]
    }

    /// User picked a query. Clears both columns, repairs the connection
    /// selector from the query's owner and loads the query's columns.
    pub fn select_query(&mut self, query: Option<i64>) -> Vec<LoadRequest> {
        if self.selection.query_id == query {
            return Vec::new();
        }
        self.restoring = false;
        self.selection.query_id = query;
        self.clear_columns();
        match query {
            Some(id) => {
                self.repair_connection();
                vec![self.begin(LoadKind::Columns { query: id })]
            }
            None => Vec::new(),
        }
    }

    pub fn select_value_field(&mut self, column: Option<String>) -> bool {
        let changed = self.selection.value_field != column;
        self.selection.value_field = column;
        changed
    }

    pub fn select_label_field(&mut self, column: Option<String>) -> bool {
        let changed = self.selection.label_field != column;
        self.selection.label_field = column;
        changed
    }

    /// Applies a finished lookup and returns any follow-up lookups of the
    /// restoration sequence.
    pub fn apply(&mut self, response: LoadResponse) -> Vec<LoadRequest> {
        let stage = response.result.stage();
        if response.generation != self.generations[stage.index()] {
            log::debug!(
                "discarding stale {stage:?} response (generation {} < {})",
                response.generation,
                self.generations[stage.index()]
            );
            return Vec::new();
        }

        match response.result {
            LoadResult::Connections(Ok(connections)) => {
                self.selection.connection_id = self
                    .selection
                    .connection_id
                    .filter(|id| connections.iter().any(|conn| conn.id == *id));
                self.connections = SelectorState::Ready(connections);
                if self.restoring {
                    let connection = self.selection.connection_id;
                    return vec![self.begin(LoadKind::Queries { connection })];
                }
            }
            LoadResult::Queries(Ok(queries)) => {
                let previous = self.selection.query_id;
                self.selection.query_id =
                    previous.filter(|id| queries.iter().any(|query| query.id == *id));
                if previous.is_some() && self.selection.query_id.is_none() {
                    log::debug!("query {previous:?} no longer listed; clearing columns");
                    self.clear_columns();
                }
                self.queries = SelectorState::Ready(queries);
                if let Some(query) = self.selection.query_id {
                    self.repair_connection();
                    if self.restoring {
                        return vec![self.begin(LoadKind::Columns { query })];
                    }
                }
                self.restoring = false;
            }
            LoadResult::Columns(Ok(columns)) => {
                let known = |name: &Option<String>| {
                    name.clone().filter(|name| columns.iter().any(|col| col == name))
                };
                self.selection.value_field = known(&self.selection.value_field);
                self.selection.label_field = known(&self.selection.label_field);
                self.columns = SelectorState::Ready(columns);
                self.restoring = false;
            }
            LoadResult::Connections(Err(err)) => {
                log::warn!("loading connections failed: {err}");
                self.connections = SelectorState::Failed;
                self.restoring = false;
            }
            LoadResult::Queries(Err(err)) => {
                log::warn!("loading queries failed: {err}");
                self.queries = SelectorState::Failed;
                self.restoring = false;
            }
            LoadResult::Columns(Err(err)) => {
                log::warn!("loading columns failed: {err}");
                self.columns = SelectorState::Failed;
                self.restoring = false;
            }
        }
        Vec::new()
    }

    fn begin(&mut self, kind: LoadKind) -> LoadRequest {
        let stage = kind.stage();
        let slot = &mut self.generations[stage.index()];
        *slot += 1;
        match stage {
            Stage::Connections => self.connections = SelectorState::Loading,
            Stage::Queries => self.queries = SelectorState::Loading,
            Stage::Columns => self.columns = SelectorState::Loading,
        }
        LoadRequest {
            kind,
            generation: *slot,
        }
    }

    /// Drops both column selections and anything in flight for them.
    fn clear_columns(&mut self) {
        self.selection.value_field = None;
        self.selection.label_field = None;
        self.columns = SelectorState::Idle;
        self.generations[Stage::Columns.index()] += 1;
    }

    fn repair_connection(&mut self) {
        let Some(query_id) = self.selection.query_id else {
            return;
        };
        let owner = self
            .queries
            .items()
            .iter()
            .find(|query| query.id == query_id)
            .map(|query| query.connection_id);
        if let Some(owner) = owner
            && self.selection.connection_id != Some(owner)
        {
            log::debug!("query {query_id} belongs to connection {owner}; updating selector");
            self.selection.connection_id = Some(owner);
        }
    }
}
