//! Error types for case parsing and network editing.
//!
//! - [`ModelError`] - invariant violations on records and rejected `System::add_*` calls
//! - [`ParseError`] - whole-file failures (missing file, unknown format, nothing usable)
//!
//! Row-level decode failures are not errors at this level: they are
//! [`crate::fields::RowError`] values that section decoders log and drop.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the data model.
#[derive(Debug, Error)]
pub enum ModelError {
    /// A bus with this id is already present.
    #[error("Bus {bus_id} already exists (current max: {max_bus_id})")]
    DuplicateBus { bus_id: usize, max_bus_id: usize },

    /// A component references a bus that is not in the system.
    #[error(
        "{role} {bus_id} not found. Available bus IDs: {available:?}. Add the bus with add_bus() first."
    )]
    MissingBus {
        role: &'static str,
        bus_id: usize,
        available: Vec<usize>,
    },

    /// Lookup by bus id failed.
    #[error("Bus {0} not found in system")]
    BusNotFound(usize),

    #[error("tap_ratio cannot be zero")]
    ZeroTapRatio,

    #[error("Invalid status: {status}. Must be 0 (out-of-service) or 1 (in-service)")]
    InvalidStatus { status: i64 },

    #[error("Invalid bus type code: {0}. Must be 1 (PQ), 2 (PV), 3 (Slack), or 4 (Isolated)")]
    InvalidBusType(i64),

    #[error("Invalid cost model: {0}. Must be 1 (piecewise linear) or 2 (polynomial)")]
    InvalidCostModel(i64),

    /// `GeneratorCost::evaluate` only handles polynomial curves.
    #[error("Piecewise linear cost evaluation is not supported; evaluate() requires a polynomial cost")]
    PiecewiseLinearEvaluation,

    #[error("Generator cost refers to generator index {gen_index} but the system has {num_generators} generators")]
    CostIndexOutOfRange {
        gen_index: usize,
        num_generators: usize,
    },
}

/// Errors raised while reading a case file.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unknown format: '{name}'. Available formats: {available:?}")]
    UnknownFormat {
        name: String,
        available: Vec<&'static str>,
    },

    #[error("Unknown extension: '{extension}'. Supported extensions: {supported:?}")]
    UnknownExtension {
        extension: String,
        supported: Vec<&'static str>,
    },

    #[error("Cannot determine format: file has no extension: {}", .0.display())]
    MissingExtension(PathBuf),

    /// Section extraction found nothing to decode.
    #[error("No usable {format} data found in {origin}")]
    NoData { format: &'static str, origin: String },

    #[error("Invalid parse options: {0}")]
    Config(#[from] serde_json::Error),
}

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Result type for parse operations.
pub type ParseResult<T> = Result<T, ParseError>;
