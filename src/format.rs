//! Format dispatch: pick a reader by name, extension or path.

use std::fs;
use std::path::Path;

use log::warn;

use crate::config::ParseOptions;
use crate::error::{ParseError, ParseResult};
use crate::system::System;
use crate::{matpower, raw};

/// A reader for one case file format.
pub trait CaseParser {
    /// Parses in-memory text. `origin` is used in messages and as the fallback case name.
    fn parse_str(&self, content: &str, origin: &str) -> ParseResult<System>;

    fn supported_extensions(&self) -> &'static [&'static str];

    fn format_name(&self) -> &'static str;

    fn parse(&self, path: &Path) -> ParseResult<System> {
        let content = read_text(path)?;
        self.parse_str(&content, &path.display().to_string())
    }
}

#[derive(Debug, Clone, Default)]
pub struct RawParser {
    pub options: ParseOptions,
}

impl RawParser {
    pub fn new(options: ParseOptions) -> Self {
        Self { options }
    }
}

impl CaseParser for RawParser {
    fn parse_str(&self, content: &str, origin: &str) -> ParseResult<System> {
        raw::read_case(content, origin, &self.options)
    }

    fn supported_extensions(&self) -> &'static [&'static str] {
        Format::Raw.extensions()
    }

    fn format_name(&self) -> &'static str {
        "PSS/E RAW"
    }
}

#[derive(Debug, Clone, Default)]
pub struct MatpowerParser {
    pub options: ParseOptions,
}

impl MatpowerParser {
    pub fn new(options: ParseOptions) -> Self {
        Self { options }
    }
}

impl CaseParser for MatpowerParser {
    fn parse_str(&self, content: &str, origin: &str) -> ParseResult<System> {
        matpower::read_case(content, origin, &self.options)
    }

    fn supported_extensions(&self) -> &'static [&'static str] {
        Format::Matpower.extensions()
    }

    fn format_name(&self) -> &'static str {
        "MATPOWER"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Raw,
    Matpower,
}

impl Format {
    pub const ALL: [Format; 2] = [Format::Raw, Format::Matpower];

    pub fn name(&self) -> &'static str {
        match self {
            Format::Raw => "raw",
            Format::Matpower => "matpower",
        }
    }

    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Format::Raw => &["raw", "RAW"],
            Format::Matpower => &["m"],
        }
    }

    /// Exact format name: `raw` or `matpower`.
    pub fn from_name(name: &str) -> ParseResult<Self> {
        Self::ALL
            .into_iter()
            .find(|f| f.name() == name)
            .ok_or_else(|| ParseError::UnknownFormat {
                name: name.to_string(),
                available: available_formats(),
            })
    }

    /// Extension with or without the leading dot. Matching is case-sensitive.
    pub fn from_extension(extension: &str) -> ParseResult<Self> {
        let ext = extension.strip_prefix('.').unwrap_or(extension);
        Self::ALL
            .into_iter()
            .find(|f| f.extensions().contains(&ext))
            .ok_or_else(|| ParseError::UnknownExtension {
                extension: extension.to_string(),
                supported: supported_extensions(),
            })
    }

    pub fn from_path(path: impl AsRef<Path>) -> ParseResult<Self> {
        let path = path.as_ref();
        match path.extension() {
            Some(ext) => Self::from_extension(&ext.to_string_lossy()),
            None => Err(ParseError::MissingExtension(path.to_path_buf())),
        }
    }

    pub fn parser(&self, options: ParseOptions) -> Box<dyn CaseParser> {
        match self {
            Format::Raw => Box::new(RawParser::new(options)),
            Format::Matpower => Box::new(MatpowerParser::new(options)),
        }
    }
}

pub fn available_formats() -> Vec<&'static str> {
    Format::ALL.iter().map(Format::name).collect()
}

pub fn supported_extensions() -> Vec<&'static str> {
    Format::ALL
        .iter()
        .flat_map(|f| f.extensions().iter().copied())
        .collect()
}

/// Reads the whole file. Invalid UTF-8 is replaced rather than rejected.
fn read_text(path: &Path) -> ParseResult<String> {
    if !path.exists() {
        return Err(ParseError::NotFound(path.to_path_buf()));
    }
    let bytes = fs::read(path).map_err(|source| ParseError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    match String::from_utf8(bytes) {
        Ok(text) => Ok(text),
        Err(e) => {
            warn!("{} is not valid UTF-8; undecodable bytes replaced", path.display());
            Ok(String::from_utf8_lossy(e.as_bytes()).into_owned())
        }
    }
}

/// Parses a file, choosing the reader from its extension.
pub fn parse_file(path: impl AsRef<Path>) -> ParseResult<System> {
    parse_file_with(path, ParseOptions::default())
}

pub fn parse_file_with(path: impl AsRef<Path>, options: ParseOptions) -> ParseResult<System> {
    let path = path.as_ref();
    Format::from_path(path)?.parser(options).parse(path)
}

/// Parses a file with an explicitly named format.
pub fn parse_as(path: impl AsRef<Path>, format_name: &str) -> ParseResult<System> {
    Format::from_name(format_name)?
        .parser(ParseOptions::default())
        .parse(path.as_ref())
}

pub fn parse_raw(path: impl AsRef<Path>) -> ParseResult<System> {
    RawParser::default().parse(path.as_ref())
}

pub fn parse_matpower(path: impl AsRef<Path>) -> ParseResult<System> {
    MatpowerParser::default().parse(path.as_ref())
}
