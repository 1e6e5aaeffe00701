use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::{Map, Value};

use crate::app::SaveSignal;

use super::DocumentFormat;

/// Destination for serialized output values.
#[derive(Debug, Clone)]
pub enum OutputDestination {
    Stdout,
    File(PathBuf),
}

impl OutputDestination {
    pub fn file(path: impl AsRef<Path>) -> Self {
        OutputDestination::File(path.as_ref().to_path_buf())
    }
}

/// How an emitted save payload is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadEncoding {
    /// A structured document: `{"sequence": n, "fields": {..}}`.
    Document(DocumentFormat),
    /// The urlencoded request body the server receives.
    FormBody,
}

/// Controls how save payloads are serialized.
#[derive(Debug, Clone)]
pub struct OutputOptions {
    pub encoding: PayloadEncoding,
    pub pretty: bool,
    pub destinations: Vec<OutputDestination>,
}

impl OutputOptions {
    pub fn new(format: DocumentFormat) -> Self {
        Self {
            encoding: PayloadEncoding::Document(format),
            pretty: true,
            destinations: vec![OutputDestination::Stdout],
        }
    }

    pub fn form_body() -> Self {
        Self {
            encoding: PayloadEncoding::FormBody,
            ..Self::default()
        }
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn with_destinations(mut self, destinations: Vec<OutputDestination>) -> Self {
        self.destinations = destinations;
        self
    }
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self::new(DocumentFormat::Json)
    }
}

/// Structured view of a save signal. Field order is kept.
pub fn signal_to_value(signal: &SaveSignal) -> Value {
    let fields: Map<String, Value> = signal
        .fields
        .iter()
        .map(|(key, value)| (key.clone(), Value::String(value.clone())))
        .collect();
    let mut root = Map::new();
    root.insert("sequence".to_string(), Value::from(signal.sequence));
    root.insert("fields".to_string(), Value::Object(fields));
    Value::Object(root)
}

/// Serialize and write a save payload to every configured destination.
pub fn emit_signal(signal: &SaveSignal, options: &OutputOptions) -> Result<()> {
    if options.destinations.is_empty() {
        return Ok(());
    }
    let payload = match options.encoding {
        PayloadEncoding::FormBody => signal.to_form_body(),
        PayloadEncoding::Document(format) => {
            serialize_value(&signal_to_value(signal), format, options.pretty)?
        }
    };
    write_all(&payload, &options.destinations)
}

fn write_all(payload: &str, destinations: &[OutputDestination]) -> Result<()> {
    for destination in destinations {
        write_payload(destination, payload).with_context(|| match destination {
            OutputDestination::Stdout => "failed to write to stdout".to_string(),
            OutputDestination::File(path) => {
                format!("failed to write to file {}", path.display())
            }
        })?;
    }
    Ok(())
}

fn serialize_value(value: &Value, format: DocumentFormat, pretty: bool) -> Result<String> {
    match format {
        DocumentFormat::Json => {
            if pretty {
                serde_json::to_string_pretty(value).context("failed to serialize JSON")
            } else {
                serde_json::to_string(value).context("failed to serialize JSON")
            }
        }
        #[cfg(feature = "yaml")]
        DocumentFormat::Yaml => serde_yaml::to_string(value).context("failed to serialize YAML"),
        #[cfg(feature = "toml")]
        DocumentFormat::Toml => {
            if pretty {
                toml::to_string_pretty(value).context("failed to serialize TOML")
            } else {
                toml::to_string(value).context("failed to serialize TOML")
            }
        }
    }
}

fn write_payload(destination: &OutputDestination, payload: &str) -> Result<()> {
    match destination {
        OutputDestination::Stdout => {
            let mut stdout = io::stdout();
            stdout
                .write_all(payload.as_bytes())
                .and_then(|_| stdout.write_all(b"\n"))
                .context("failed to flush stdout")?;
            stdout.flush().context("failed to flush stdout")
        }
        OutputDestination::File(path) => {
            let mut file = File::create(path)?;
            file.write_all(payload.as_bytes())?;
            file.write_all(b"\n")?;
            file.flush()?;
            Ok(())
        }
    }
}
