use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::case::DEFAULT_BASE_MVA;
use crate::error::{ParseError, ParseResult};

/// Options threaded through every parser and decoder call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    /// System base used when the file omits its own base or it does not parse.
    pub default_base_mva: f64,
    /// Let a bare RAW end marker advance through the standard PSS/E section order
    /// (bus, load, fixed shunt, generator, branch, transformer) when no
    /// `BEGIN ... DATA` clause names the next section.
    pub implicit_raw_sections: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            default_base_mva: DEFAULT_BASE_MVA,
            implicit_raw_sections: false,
        }
    }
}

impl ParseOptions {
    /// Options for legacy v33 files that carry no `BEGIN` markers.
    pub fn implicit_sections() -> Self {
        Self {
            implicit_raw_sections: true,
            ..Default::default()
        }
    }

    pub fn with_default_base_mva(mut self, base_mva: f64) -> Self {
        self.default_base_mva = base_mva;
        self
    }

    pub fn from_json_str(json: &str) -> ParseResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> ParseResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ParseError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }
}
