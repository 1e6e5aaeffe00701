//! Snapshot documents in, save payloads out.

mod format;
mod input;
mod output;

pub use format::DocumentFormat;
pub use input::{field_map_from_value, load_field_map, parse_document_str};
pub use output::{
    OutputDestination, OutputOptions, PayloadEncoding, emit_signal, signal_to_value,
};
