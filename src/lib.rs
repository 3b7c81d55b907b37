//! Readers for PSS/E RAW (v33, v34) and MATPOWER case files.
//!
//! Both formats load into the same [`System`], with powers in p.u. on the
//! system base and angles in radians.
//!
//! ```no_run
//! let system = busbar::parse_file("cases/ieee14.raw")?;
//! for problem in system.validate() {
//!     eprintln!("{problem}");
//! }
//! # Ok::<(), busbar::ParseError>(())
//! ```

pub mod case;
pub mod config;
pub mod error;
pub mod fields;
pub mod format;
pub mod matpower;
pub mod raw;
pub mod system;
pub mod validate;

pub use case::{
    Branch, Bus, BusType, CostModel, DEFAULT_BASE_MVA, Generator, GeneratorCost, Load, Shunt,
};
pub use config::ParseOptions;
pub use error::{ModelError, ModelResult, ParseError, ParseResult};
pub use format::{
    CaseParser, Format, MatpowerParser, RawParser, available_formats, parse_as, parse_file,
    parse_file_with, parse_matpower, parse_raw, supported_extensions,
};
pub use system::System;
pub use validate::validate;
