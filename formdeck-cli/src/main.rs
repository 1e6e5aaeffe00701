//! `formdeck` restores a question builder from a form snapshot, replays a log
//! of builder commands against it and writes every autosave payload the
//! builder emits.
//!
//! The command log holds one JSON object per line:
//!
//! ```text
//! {"after_ms": 50, "command": {"command": "card", "card": 1, "event": {"event": "label_edited", "text": "Name"}}}
//! ```
//!
//! `after_ms` advances a virtual clock, so debounce windows behave exactly as
//! they would under a real user without the replay having to sleep.

use std::fmt::Write as FmtWrite;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use clap::{ArgAction, Parser};
use color_eyre::eyre::{Report, Result, WrapErr, eyre};
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

use formdeck::app::{TemplateError, TemplateSource};
use formdeck::catalog::{CatalogError, CatalogSource, Connection, SavedQuery};
use formdeck::form::DEFAULT_PREFIX;
use formdeck::io::{emit_signal, field_map_from_value};
use formdeck::{
    BuilderCommand, BuilderOptions, DocumentFormat, FormBuilder, OutputDestination,
    OutputOptions, SaveSignal, parse_document_str,
};

#[derive(Debug, Parser)]
#[command(
    name = "formdeck",
    version,
    about = "Replay question-builder interactions and emit the autosave payloads"
)]
struct Cli {
    /// Form snapshot: file path, inline payload, or "-" for stdin
    #[arg(short = 's', long = "snapshot", value_name = "SPEC")]
    snapshot: Option<String>,

    /// Command log (JSON lines): file path, or "-" for stdin
    #[arg(short = 'c', long = "commands", value_name = "SPEC")]
    commands: Option<String>,

    /// New-question skeleton: file path or inline JSON field map
    #[arg(long = "template", value_name = "SPEC", conflicts_with = "template_url")]
    template: Option<String>,

    /// Fetch the new-question skeleton from this URL
    #[arg(long = "template-url", value_name = "URL")]
    template_url: Option<String>,

    /// Catalog fixture: file path or inline JSON with connections, queries and columns
    #[arg(long = "catalog", value_name = "SPEC", conflicts_with = "catalog_url")]
    catalog: Option<String>,

    /// Base URL of the remote catalog
    #[arg(long = "catalog-url", value_name = "URL")]
    catalog_url: Option<String>,

    /// Submit every save to this URL and apply the server's answer
    #[arg(long = "save-url", value_name = "URL")]
    save_url: Option<String>,

    /// Formset prefix of the card fields
    #[arg(long = "prefix", value_name = "PREFIX", default_value = DEFAULT_PREFIX)]
    prefix: String,

    /// Debounce window for incremental edits
    #[arg(long = "debounce-ms", value_name = "MS", default_value_t = 400)]
    debounce_ms: u64,

    /// Output destinations ("-" writes to stdout). Accepts multiple values per flag use.
    #[arg(short = 'o', long = "output", value_name = "DEST", num_args = 1.., action = ArgAction::Append)]
    outputs: Vec<String>,

    /// Write payloads as the urlencoded request body instead of a document
    #[arg(long = "form-body")]
    form_body: bool,

    /// Emit compact JSON/TOML rather than pretty formatting
    #[arg(long = "no-pretty")]
    no_pretty: bool,

    /// Overwrite output files even if they already exist
    #[arg(short = 'f', long = "force", short_alias = 'y', alias = "yes")]
    force: bool,

    /// Log engine decisions (repeat for more detail); RUST_LOG overrides
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug)]
enum InputSource {
    File(PathBuf),
    Stdin,
}

#[derive(Debug, Deserialize)]
struct ReplayStep {
    #[serde(default)]
    after_ms: u64,
    command: BuilderCommand,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut diagnostics = DiagnosticCollector::default();
    if cli.snapshot.as_deref() == Some("-") && cli.commands.as_deref() == Some("-") {
        diagnostics.push_input(
            "snapshot/commands",
            "cannot read snapshot and commands from stdin simultaneously",
        );
    }

    let snapshot = load_optional_value(cli.snapshot.as_deref(), "snapshot", &mut diagnostics);
    let template = load_optional_value(cli.template.as_deref(), "template", &mut diagnostics);
    let catalog = load_optional_value(cli.catalog.as_deref(), "catalog", &mut diagnostics);
    let steps = match cli.commands.as_deref() {
        Some(spec) => match load_steps(spec) {
            Ok(steps) => steps,
            Err(err) => {
                diagnostics.push_input("commands", err.to_string());
                Vec::new()
            }
        },
        None => Vec::new(),
    };
    let (output, output_paths) = build_output_options(&cli, &mut diagnostics);
    ensure_output_paths_available(&output_paths, cli.force, &mut diagnostics);
    diagnostics.into_result()?;

    let snapshot = snapshot.unwrap_or_else(|| Value::Object(Default::default()));
    let fields = field_map_from_value(&snapshot, &cli.prefix).map_err(Report::msg)?;

    let mut options = BuilderOptions::default()
        .with_prefix(cli.prefix.clone())
        .with_debounce(Duration::from_millis(cli.debounce_ms));
    if let Some(url) = cli.catalog_url.as_ref() {
        options = options.with_catalog_base(url.clone());
    }
    if let Some(url) = cli.template_url.as_ref() {
        options = options.with_template_url(url.clone());
    }
    if let Some(url) = cli.save_url.as_ref() {
        options = options.with_save_url(url.clone());
    }

    let mut builder = FormBuilder::from_fields(options, &fields);
    let catalog = build_catalog(&cli, catalog, &builder)?;
    let persistence = build_persistence(&cli, &builder)?;

    if let Some(skeleton) = template {
        builder
            .load_template(&FixtureTemplate(skeleton_text(skeleton)))
            .await;
    } else {
        load_remote_template(&cli, &mut builder).await;
    }

    let mut replay = Replay {
        builder,
        catalog,
        persistence,
        output,
        clock: Instant::now(),
        emitted: 0,
    };
    replay.settle().await?;
    for (line, step) in steps.into_iter().enumerate() {
        replay.clock += Duration::from_millis(step.after_ms);
        replay.settle().await?;
        let now = replay.clock;
        if let Err(err) = replay.builder.dispatch(step.command, now) {
            log::warn!("command on line {} ignored: {err}", line + 1);
        }
        replay.settle().await?;
    }
    replay.flush().await?;

    eprintln!(
        "{} save(s) emitted; {}",
        replay.emitted,
        replay.builder.status().message()
    );
    Ok(())
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .target(env_logger::Target::Stderr)
        .init();
}

struct Replay {
    builder: FormBuilder,
    catalog: Option<Box<dyn CatalogSource>>,
    persistence: Option<Box<dyn formdeck::app::Persistence>>,
    output: OutputOptions,
    clock: Instant,
    emitted: usize,
}

impl Replay {
    /// Runs queued lookups and fires a save if one is due at the current
    /// clock.
    async fn settle(&mut self) -> Result<()> {
        if let Some(catalog) = self.catalog.as_deref() {
            self.builder.drain_loads(catalog).await;
        }
        if let Some(signal) = self.builder.tick(self.clock) {
            self.publish(signal).await?;
        }
        Ok(())
    }

    /// Lets any pending debounce window elapse.
    async fn flush(&mut self) -> Result<()> {
        if self.builder.is_save_pending() {
            self.clock += self.builder.options().debounce;
            self.settle().await?;
        }
        Ok(())
    }

    async fn publish(&mut self, signal: SaveSignal) -> Result<()> {
        emit_signal(&signal, &self.output).map_err(Report::msg)?;
        self.emitted += 1;
        if let Some(persistence) = self.persistence.as_deref()
            && let Err(err) = self.builder.submit(persistence, signal).await
        {
            log::warn!("continuing after failed save: {err}");
        }
        Ok(())
    }
}

/// Catalog answers read from a local JSON document.
#[derive(Debug, Default, Deserialize)]
struct FixtureCatalog {
    #[serde(default)]
    connections: Vec<Connection>,
    #[serde(default)]
    queries: Vec<SavedQuery>,
    /// Query id → column names.
    #[serde(default)]
    columns: IndexMap<String, Vec<String>>,
}

#[async_trait]
impl CatalogSource for FixtureCatalog {
    async fn connections(&self) -> Result<Vec<Connection>, CatalogError> {
        Ok(self.connections.clone())
    }

    async fn queries(&self, connection: Option<i64>) -> Result<Vec<SavedQuery>, CatalogError> {
        Ok(self
            .queries
            .iter()
            .filter(|query| connection.is_none_or(|id| query.connection_id == id))
            .cloned()
            .collect())
    }

    async fn columns(&self, query: i64) -> Result<Vec<String>, CatalogError> {
        self.columns
            .get(&query.to_string())
            .cloned()
            .ok_or(CatalogError::Status(404))
    }
}

struct FixtureTemplate(String);

#[async_trait]
impl TemplateSource for FixtureTemplate {
    async fn fetch_skeleton(&self) -> Result<String, TemplateError> {
        Ok(self.0.clone())
    }
}

fn skeleton_text(value: Value) -> String {
    match value {
        Value::String(text) => text,
        other => other.to_string(),
    }
}

fn build_catalog(
    cli: &Cli,
    fixture: Option<Value>,
    builder: &FormBuilder,
) -> Result<Option<Box<dyn CatalogSource>>> {
    if let Some(value) = fixture {
        let catalog: FixtureCatalog =
            serde_json::from_value(value).wrap_err("catalog fixture has an unexpected shape")?;
        return Ok(Some(Box::new(catalog)));
    }
    if cli.catalog_url.is_some() {
        return remote_catalog(builder);
    }
    if builder.pending_loads() > 0 {
        log::warn!("no catalog configured; catalog-backed questions stay unloaded");
    }
    Ok(None)
}

#[cfg(feature = "http")]
fn remote_catalog(builder: &FormBuilder) -> Result<Option<Box<dyn CatalogSource>>> {
    let endpoints = builder.options().catalog.clone();
    Ok(Some(Box::new(formdeck::catalog::HttpCatalog::new(endpoints))))
}

#[cfg(not(feature = "http"))]
fn remote_catalog(_builder: &FormBuilder) -> Result<Option<Box<dyn CatalogSource>>> {
    Err(eyre!("--catalog-url requires the 'http' feature"))
}

#[cfg(feature = "http")]
fn build_persistence(
    cli: &Cli,
    builder: &FormBuilder,
) -> Result<Option<Box<dyn formdeck::app::Persistence>>> {
    Ok(cli.save_url.as_ref().map(|_| {
        Box::new(formdeck::app::HttpPersistence::new(
            builder.options().save_url.clone(),
        )) as Box<dyn formdeck::app::Persistence>
    }))
}

#[cfg(not(feature = "http"))]
fn build_persistence(
    cli: &Cli,
    _builder: &FormBuilder,
) -> Result<Option<Box<dyn formdeck::app::Persistence>>> {
    match cli.save_url {
        Some(_) => Err(eyre!("--save-url requires the 'http' feature")),
        None => Ok(None),
    }
}

#[cfg(feature = "http")]
async fn load_remote_template(cli: &Cli, builder: &mut FormBuilder) {
    if cli.template_url.is_some() {
        let source = formdeck::app::HttpTemplateSource::new(builder.options().template_url.clone());
        builder.load_template(&source).await;
    }
}

#[cfg(not(feature = "http"))]
async fn load_remote_template(cli: &Cli, _builder: &mut FormBuilder) {
    if cli.template_url.is_some() {
        log::warn!("--template-url ignored: built without the 'http' feature");
    }
}

fn load_steps(spec: &str) -> Result<Vec<ReplayStep>> {
    let contents = if spec == "-" {
        read_from_source(&InputSource::Stdin)?
    } else {
        read_from_source(&InputSource::File(PathBuf::from(spec)))?
    };
    parse_steps(&contents)
}

fn parse_steps(contents: &str) -> Result<Vec<ReplayStep>> {
    contents
        .lines()
        .enumerate()
        .filter(|(_, line)| {
            let trimmed = line.trim();
            !trimmed.is_empty() && !trimmed.starts_with('#')
        })
        .map(|(idx, line)| {
            serde_json::from_str::<ReplayStep>(line)
                .wrap_err_with(|| format!("invalid command on line {}", idx + 1))
        })
        .collect()
}

fn load_optional_value(
    spec: Option<&str>,
    label: &str,
    diagnostics: &mut DiagnosticCollector,
) -> Option<Value> {
    let raw = spec?;
    let format = match probe_format_from_extension(Path::new(raw)) {
        ExtensionFormat::Known(format) => format,
        ExtensionFormat::UnsupportedFeature {
            format_name,
            feature_flag,
        } => {
            diagnostics.push_input(
                label,
                format!(
                    "{label} '{raw}' requires {format_name} support, but this build lacks the '{feature_flag}' feature"
                ),
            );
            return None;
        }
        ExtensionFormat::Unknown => DocumentFormat::default(),
    };
    match load_value(raw, format, label) {
        Ok(value) => Some(value),
        Err(err) => {
            diagnostics.push_input(label, err.to_string());
            None
        }
    }
}

fn load_value(spec: &str, format: DocumentFormat, label: &str) -> Result<Value> {
    if spec == "-" {
        let contents = read_from_source(&InputSource::Stdin)?;
        return parse_contents(&contents, format, label);
    }

    let path = PathBuf::from(spec);
    match read_from_source(&InputSource::File(path.clone())) {
        Ok(contents) => parse_contents(&contents, format, label),
        Err(err) => {
            if is_not_found(&err) {
                let inline_label = format!("inline {label}");
                return parse_contents(spec, format, &inline_label);
            }
            Err(err.wrap_err(format!("failed to load {label} from {}", path.display())))
        }
    }
}

fn read_from_source(source: &InputSource) -> Result<String> {
    match source {
        InputSource::Stdin => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .wrap_err("failed to read from stdin")?;
            Ok(buffer)
        }
        InputSource::File(path) => fs::read_to_string(path)
            .wrap_err_with(|| format!("failed to read file {}", path.display())),
    }
}

fn is_not_found(err: &Report) -> bool {
    err.downcast_ref::<io::Error>()
        .is_some_and(|io_err| io_err.kind() == io::ErrorKind::NotFound)
}

fn parse_contents(contents: &str, format: DocumentFormat, label: &str) -> Result<Value> {
    match parse_document_str(contents, format) {
        Ok(value) => Ok(value),
        Err(primary) => {
            for candidate in DocumentFormat::available_formats() {
                if candidate == format {
                    continue;
                }
                if let Ok(value) = parse_document_str(contents, candidate) {
                    return Ok(value);
                }
            }
            Err(Report::msg(format!(
                "failed to parse {label}: tried {} (first error: {primary})",
                format_list()
            )))
        }
    }
}

fn format_list() -> String {
    let items: Vec<String> = DocumentFormat::available_formats()
        .into_iter()
        .map(|fmt| fmt.to_string())
        .collect();
    items.join(", ")
}

#[derive(Default)]
struct DiagnosticCollector {
    messages: Vec<String>,
}

impl DiagnosticCollector {
    fn push_input(&mut self, label: &str, message: impl Into<String>) {
        self.messages
            .push(format!("input ({label}): {}", message.into()));
    }

    fn push_output(&mut self, message: impl Into<String>) {
        self.messages.push(format!("output: {}", message.into()));
    }

    fn into_result(self) -> Result<()> {
        if self.messages.is_empty() {
            return Ok(());
        }
        let mut body = String::from("encountered input/output issues:\n");
        for (idx, msg) in self.messages.iter().enumerate() {
            let _ = writeln!(body, "  {}. {}", idx + 1, msg);
        }
        Err(eyre!(body))
    }
}

fn build_output_options(
    cli: &Cli,
    diagnostics: &mut DiagnosticCollector,
) -> (OutputOptions, Vec<PathBuf>) {
    let mut destinations = Vec::new();
    for raw in &cli.outputs {
        if raw.trim().is_empty() {
            diagnostics.push_output("output destination cannot be empty");
            continue;
        }
        if raw == "-" {
            destinations.push(OutputDestination::Stdout);
        } else {
            destinations.push(OutputDestination::file(raw));
        }
    }
    if cli.outputs.is_empty() {
        destinations.push(OutputDestination::Stdout);
    }

    let file_paths: Vec<PathBuf> = destinations
        .iter()
        .filter_map(|dest| match dest {
            OutputDestination::File(path) => Some(path.clone()),
            OutputDestination::Stdout => None,
        })
        .collect();

    let options = if cli.form_body {
        OutputOptions::form_body()
    } else {
        OutputOptions::new(infer_format_from_files(&file_paths, diagnostics).unwrap_or_default())
    };

    (
        options
            .with_pretty(!cli.no_pretty)
            .with_destinations(destinations),
        file_paths,
    )
}

fn infer_format_from_files(
    file_paths: &[PathBuf],
    diagnostics: &mut DiagnosticCollector,
) -> Option<DocumentFormat> {
    let mut detected: Option<DocumentFormat> = None;
    for path in file_paths {
        match probe_format_from_extension(path) {
            ExtensionFormat::Known(format) => {
                if let Some(existing) = detected {
                    if existing != format {
                        diagnostics.push_output(format!(
                            "output file {} uses {format} but other destinations use {existing}; align extensions",
                            path.display()
                        ));
                    }
                } else {
                    detected = Some(format);
                }
            }
            ExtensionFormat::UnsupportedFeature {
                format_name,
                feature_flag,
            } => diagnostics.push_output(format!(
                "output file {} requires {format_name} support, but this build was compiled without the '{feature_flag}' feature",
                path.display()
            )),
            ExtensionFormat::Unknown => diagnostics.push_output(format!(
                "cannot infer format from output file {}; use .json/.yaml/.toml or --form-body",
                path.display()
            )),
        }
    }
    detected
}

fn probe_format_from_extension(path: &Path) -> ExtensionFormat {
    let Some(ext) = path.extension() else {
        return ExtensionFormat::Unknown;
    };
    let normalized = ext.to_string_lossy().to_ascii_lowercase();
    if let Some(format) = DocumentFormat::from_extension(&normalized) {
        return ExtensionFormat::Known(format);
    }
    match normalized.as_str() {
        "yaml" | "yml" => ExtensionFormat::UnsupportedFeature {
            format_name: "yaml",
            feature_flag: "yaml",
        },
        "toml" => ExtensionFormat::UnsupportedFeature {
            format_name: "toml",
            feature_flag: "toml",
        },
        _ => ExtensionFormat::Unknown,
    }
}

#[derive(Debug)]
enum ExtensionFormat {
    Known(DocumentFormat),
    UnsupportedFeature {
        format_name: &'static str,
        feature_flag: &'static str,
    },
    Unknown,
}

fn ensure_output_paths_available(
    paths: &[PathBuf],
    force: bool,
    diagnostics: &mut DiagnosticCollector,
) {
    if force {
        return;
    }
    for path in paths {
        if path.exists() {
            diagnostics.push_output(format!(
                "file {} already exists (pass --force to overwrite)",
                path.display()
            ));
        }
    }
}
