//! PSS/E RAW (v33 / v34) reader.
//!
//! Reading happens in two passes. [`RawSections::split`] walks the file once
//! and files every data line under the section it belongs to; the decoders
//! then turn each section into model records. Rows that fail to decode are
//! logged at debug level and skipped.

use std::collections::HashMap;
use std::path::Path;

use log::{debug, info};

use crate::case::*;
use crate::config::ParseOptions;
use crate::error::{ParseError, ParseResult};
use crate::fields::{Row, RowError, is_numeric};
use crate::system::System;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RawSection {
    Bus,
    Load,
    FixedShunt,
    Generator,
    Branch,
    Transformer,
}

impl RawSection {
    pub const ALL: [RawSection; 6] = [
        RawSection::Bus,
        RawSection::Load,
        RawSection::FixedShunt,
        RawSection::Generator,
        RawSection::Branch,
        RawSection::Transformer,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            RawSection::Bus => "BUS_DATA",
            RawSection::Load => "LOAD_DATA",
            RawSection::FixedShunt => "FIXED_SHUNT_DATA",
            RawSection::Generator => "GENERATOR_DATA",
            RawSection::Branch => "BRANCH_DATA",
            RawSection::Transformer => "TRANSFORMER_DATA",
        }
    }

    fn marker(&self) -> &'static str {
        match self {
            RawSection::Bus => "BEGIN BUS DATA",
            RawSection::Load => "BEGIN LOAD DATA",
            RawSection::FixedShunt => "BEGIN FIXED SHUNT DATA",
            RawSection::Generator => "BEGIN GENERATOR DATA",
            RawSection::Branch => "BEGIN BRANCH DATA",
            RawSection::Transformer => "BEGIN TRANSFORMER DATA",
        }
    }

    /// Next section in PSS/E file order.
    fn next(&self) -> Option<RawSection> {
        match self {
            RawSection::Bus => Some(RawSection::Load),
            RawSection::Load => Some(RawSection::FixedShunt),
            RawSection::FixedShunt => Some(RawSection::Generator),
            RawSection::Generator => Some(RawSection::Branch),
            RawSection::Branch => Some(RawSection::Transformer),
            RawSection::Transformer => None,
        }
    }
}

/// A `BEGIN ... DATA` clause found on a line.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Begin {
    Known(RawSection),
    Other,
}

fn begin_marker(line: &str) -> Option<Begin> {
    let upper = line.to_uppercase();
    if let Some(section) = RawSection::ALL
        .into_iter()
        .find(|s| upper.contains(s.marker()))
    {
        return Some(Begin::Known(section));
    }
    match upper.find("BEGIN ") {
        Some(at) if upper[at..].contains(" DATA") => Some(Begin::Other),
        _ => None,
    }
}

fn is_end_marker(line: &str) -> bool {
    line.starts_with("0 /") || line.starts_with('Q') || line == "0"
}

/// The lines of a RAW file grouped by section.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawSections {
    /// The three case identification lines.
    pub case_id: Vec<String>,
    sections: HashMap<RawSection, Vec<String>>,
}

impl RawSections {
    /// Groups the lines of `content`.
    ///
    /// `@` comment lines are dropped first. The next three lines are the case
    /// identification; bus data follows immediately unless a marker says
    /// otherwise. End markers (`0 /`, `0`, `Q`) close the active section and
    /// may carry a `BEGIN ... DATA` clause for the next one on the same line.
    /// With `implicit` set, a bare `0` marker moves on to the next section in
    /// file order instead of leaving no section active.
    pub fn split(content: &str, implicit: bool) -> Self {
        let mut out = RawSections::default();
        let mut current: Option<RawSection> = None;
        let mut pending: Vec<String> = Vec::new();

        let lines = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.starts_with('@'));

        for line in lines {
            if out.case_id.len() < 3 {
                out.case_id.push(line.to_string());
                if out.case_id.len() == 3 {
                    current = Some(RawSection::Bus);
                }
                continue;
            }

            let begin = begin_marker(line);

            if is_end_marker(line) {
                let ended = current.take();
                if let Some(section) = ended {
                    out.commit(section, &mut pending);
                }
                match begin {
                    Some(begin) => current = out.open(begin, line),
                    None if implicit && line.starts_with('0') => {
                        current = ended.and_then(|s| s.next());
                    }
                    None => {}
                }
                continue;
            }

            if let Some(begin) = begin {
                if let Some(section) = current.take() {
                    out.commit(section, &mut pending);
                }
                current = out.open(begin, line);
                continue;
            }

            if current.is_some() && !line.is_empty() {
                pending.push(line.to_string());
            }
        }

        if let Some(section) = current {
            out.commit(section, &mut pending);
        }
        out
    }

    fn open(&self, begin: Begin, line: &str) -> Option<RawSection> {
        match begin {
            Begin::Known(section) => Some(section),
            Begin::Other => {
                debug!("Ignoring unsupported RAW section: {line}");
                None
            }
        }
    }

    fn commit(&mut self, section: RawSection, pending: &mut Vec<String>) {
        if pending.is_empty() {
            return;
        }
        self.sections
            .entry(section)
            .or_default()
            .append(pending);
    }

    pub fn lines(&self, section: RawSection) -> &[String] {
        self.sections
            .get(&section)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// True when no section collected any data line.
    pub fn is_empty(&self) -> bool {
        self.sections.values().all(Vec::is_empty)
    }
}

/// Decoded case identification lines.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseHeader {
    pub base_mva: f64,
    /// Lines 2 and 3 joined.
    pub title: Option<String>,
    /// Free text after `/` on line 1.
    pub comment: Option<String>,
}

/// Line 1 is `IC, SBASE, REV, XFRRAT, NXFRAT, BASFRQ / comment`.
pub fn parse_header(case_id: &[String], default_base_mva: f64) -> CaseHeader {
    let first = case_id.first().map(String::as_str).unwrap_or("");
    let (data, comment) = match first.split_once('/') {
        Some((data, comment)) => (data, Some(comment.trim())),
        None => (first, None),
    };

    let base_mva = data
        .split(',')
        .nth(1)
        .and_then(|f| f.trim().parse::<f64>().ok())
        .filter(|b| b.is_finite() && *b > 0.0)
        .unwrap_or(default_base_mva);

    let title = case_id
        .iter()
        .skip(1)
        .take(2)
        .map(|l| l.trim())
        .filter(|l| !l.is_empty() && !is_end_marker(l) && begin_marker(l).is_none())
        .collect::<Vec<_>>()
        .join(" ");

    CaseHeader {
        base_mva,
        title: Some(title).filter(|t| !t.is_empty()),
        comment: comment.filter(|c| !c.is_empty()).map(str::to_string),
    }
}

fn row_status(row: &Row, index: usize, column: &'static str) -> Result<u8, RowError> {
    let code = row.int_or(index, column, 1)?;
    status_from_code(code).map_err(|e| RowError::Invalid(e.to_string()))
}

/// `I, 'NAME', BASKV, IDE, AREA, ZONE, OWNER, VM, VA, NVHI, NVLO, EVHI, EVLO`
pub fn decode_bus(row: &Row) -> Result<Bus, RowError> {
    let bus_id = row.bus(0, "I")?;
    let code = row.int_or(3, "IDE", 1)?;
    let bus_type = BusType::from_code(code).map_err(|e| RowError::Invalid(e.to_string()))?;

    let mut bus = Bus::new(bus_id, bus_type)
        .with_base_kv(row.float_or(2, "BASKV", 1.0)?)
        .with_voltage(
            row.float_or(7, "VM", 1.0)?,
            row.float_or(8, "VA", 0.0)?.to_radians(),
        );
    bus.name = row.text(1);
    bus.area = row.int_or(4, "AREA", 1)?;
    bus.zone = row.int_or(5, "ZONE", 1)?;
    bus.v_max = row.float_or(9, "NVHI", 1.1)?;
    bus.v_min = row.float_or(10, "NVLO", 0.9)?;
    Ok(bus)
}

/// `I, 'ID', STATUS, AREA, ZONE, PL, QL, ...`
pub fn decode_load(row: &Row, base_mva: f64) -> Result<Load, RowError> {
    row.require(7)?;
    let mut load = Load::new(
        row.bus(0, "I")?,
        row.float(5, "PL")? / base_mva,
        row.float(6, "QL")? / base_mva,
    )
    .with_id(row.text_or(1, "1"));
    load.status = row_status(row, 2, "STATUS")?;
    Ok(load)
}

/// `I, 'ID', STATUS, GL, BL`
pub fn decode_fixed_shunt(row: &Row, base_mva: f64) -> Result<Shunt, RowError> {
    row.require(5)?;
    let mut shunt = Shunt::new(
        row.bus(0, "I")?,
        row.float(3, "GL")? / base_mva,
        row.float(4, "BL")? / base_mva,
    )
    .with_id(row.text_or(1, "1"));
    shunt.status = row_status(row, 2, "STATUS")?;
    Ok(shunt)
}

/// Column of the generator `STAT` field.
const GEN_STATUS_COLUMN: usize = 14;

/// `I, 'ID', PG, QG, QT, QB, VS, IREG, MBASE, ZR, ZX, RT, XT, GTAP, STAT, RMPCT, PT, PB, ...`
pub fn decode_generator(row: &Row, base_mva: f64) -> Result<Generator, RowError> {
    row.require(7)?;
    let optional = |index: usize, column: &'static str| -> Result<Option<f64>, RowError> {
        match row.get(index) {
            None | Some("") => Ok(None),
            Some(_) => Ok(Some(row.float(index, column)? / base_mva)),
        }
    };

    let mut generator = Generator::new(row.bus(0, "I")?, row.float(2, "PG")? / base_mva)
        .with_id(row.text_or(1, "1"));
    generator.q_gen = row.float(3, "QG")? / base_mva;
    generator.q_max = Some(row.float(4, "QT")? / base_mva);
    generator.q_min = Some(row.float(5, "QB")? / base_mva);
    generator.v_setpoint = row.float(6, "VS")?;
    generator.mbase = row.float_or(8, "MBASE", base_mva)?;
    generator.status = row_status(row, GEN_STATUS_COLUMN, "STAT")?;
    generator.p_max = optional(16, "PT")?;
    generator.p_min = optional(17, "PB")?;
    Ok(generator)
}

/// Branch record layouts. v34 inserts a `NAME` column after `B` and carries
/// twelve ratings instead of three.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchLayout {
    /// `I, J, 'CKT', R, X, B, RATEA, RATEB, RATEC, GI, BI, GJ, BJ, ST, ...`
    V33,
    /// `I, J, 'CKT', R, X, B, 'NAME', RATE1..RATE12, GI, BI, GJ, BJ, ST, ...`
    V34,
}

impl BranchLayout {
    /// Probes the column after `B`: a number means v33, anything else is a v34 name.
    pub fn detect(row: &Row) -> Self {
        match row.get(6) {
            Some(field) if !is_numeric(field) => BranchLayout::V34,
            _ => BranchLayout::V33,
        }
    }

    fn rating_start(&self) -> usize {
        match self {
            BranchLayout::V33 => 6,
            BranchLayout::V34 => 7,
        }
    }

    fn status_column(&self) -> usize {
        match self {
            BranchLayout::V33 => 13,
            BranchLayout::V34 => 23,
        }
    }
}

pub fn decode_branch(row: &Row) -> Result<Branch, RowError> {
    row.require(6)?;
    let layout = BranchLayout::detect(row);
    let rate = layout.rating_start();

    let mut branch = Branch::new(
        row.bus(0, "I")?,
        row.bus(1, "J")?,
        row.float(3, "R")?,
        row.float(4, "X")?,
    )
    .with_circuit(row.text_or(2, "1"))
    .with_charging(row.float(5, "B")?)
    .with_ratings(
        row.float_or(rate, "RATEA", 0.0)?,
        row.float_or(rate + 1, "RATEB", 0.0)?,
        row.float_or(rate + 2, "RATEC", 0.0)?,
    );
    if layout == BranchLayout::V34 {
        branch.name = row.text(6);
    }
    branch.status = row_status(row, layout.status_column(), "ST")?;
    Ok(branch)
}

/// Three-winding records may flag a single winding out of service. The
/// equivalent branch spans windings 1 and 2, so it is in service only when
/// those two are.
fn transformer_status(code: i64, three_winding: bool) -> Result<u8, RowError> {
    match (code, three_winding) {
        (0, _) => Ok(0),
        (1, _) | (3, true) => Ok(1),
        (2 | 4, true) => Ok(0),
        _ => Err(RowError::Invalid(format!(
            "invalid transformer status {code}"
        ))),
    }
}

/// Decodes the transformer record starting at `lines[0]`.
///
/// Line 1 is `I, J, K, 'CKT', CW, CZ, CM, MAG1, MAG2, NMETR, 'NAME', STAT, ...`.
/// A non-zero `K` marks a three-winding record of five lines, otherwise the
/// record has four:
///
/// - line 2: `R1-2, X1-2, SBASE1-2, ...`
/// - line 3: `WINDV1, NOMV1, ANG1, RATA1, RATB1, RATC1, ...`
/// - line 4: `WINDV2, NOMV2, ...`
/// - line 5: winding 3 data, read past and dropped
///
/// `@` lines inside a record are passed over. Returns the decoded branch and
/// the number of lines consumed. Once `K` is readable the record length is
/// known and any failure consumes the whole record; an unreadable `K`
/// consumes only line 1.
pub fn decode_transformer(lines: &[String]) -> (Result<Branch, RowError>, usize) {
    let Some(first) = lines.first() else {
        return (Err(RowError::Invalid(String::from("no transformer record"))), 0);
    };
    let header = Row::from_csv(first);

    let k = match header.int_or(2, "K", 0) {
        Ok(k) => k,
        Err(e) => return (Err(e), 1),
    };
    let three_winding = k != 0;
    let needed = if three_winding { 4 } else { 3 };

    let mut consumed = 1;
    let mut rows = Vec::with_capacity(needed);
    while rows.len() < needed {
        let Some(line) = lines.get(consumed) else {
            return (
                Err(RowError::Invalid(format!(
                    "transformer record truncated after {consumed} lines"
                ))),
                consumed,
            );
        };
        consumed += 1;
        if line.starts_with('@') {
            continue;
        }
        rows.push(Row::from_csv(line));
    }

    (build_transformer(&header, &rows, three_winding), consumed)
}

/// R and X are read as given, on the system base.
fn build_transformer(header: &Row, rows: &[Row], three_winding: bool) -> Result<Branch, RowError> {
    let [impedance, winding1, winding2, ..] = rows else {
        return Err(RowError::Invalid(String::from("transformer record incomplete")));
    };

    let windv1 = winding1.float(0, "WINDV1")?;
    let windv2 = winding2.float(0, "WINDV2")?;
    let tap = if windv2 == 0.0 { windv1 } else { windv1 / windv2 };
    let shift = winding1.float_or(2, "ANG1", 0.0)?.to_radians();

    let mut branch = Branch::new(
        header.bus(0, "I")?,
        header.bus(1, "J")?,
        impedance.float(0, "R1-2")?,
        impedance.float(1, "X1-2")?,
    )
    .with_circuit(header.text_or(3, "1"))
    .with_tap(tap, shift)
    .map_err(|e| RowError::Invalid(e.to_string()))?
    .with_ratings(
        winding1.float_or(3, "RATA1", 0.0)?,
        winding1.float_or(4, "RATB1", 0.0)?,
        winding1.float_or(5, "RATC1", 0.0)?,
    );
    branch.name = header.text(10);
    branch.status = transformer_status(header.int_or(11, "STAT", 1)?, three_winding)?;
    Ok(branch)
}

fn skip_line(line: &str) -> bool {
    line.is_empty() || line.starts_with('0')
}

fn decode_rows<T>(
    section: RawSection,
    lines: &[String],
    decode: impl Fn(&Row) -> Result<T, RowError>,
) -> Vec<T> {
    let mut records = Vec::with_capacity(lines.len());
    for (i, line) in lines.iter().enumerate() {
        if skip_line(line) {
            continue;
        }
        match decode(&Row::from_csv(line)) {
            Ok(record) => records.push(record),
            Err(e) => debug!("Skipping {} line {}: {}", section.name(), i + 1, e),
        }
    }
    records
}

fn decode_transformers(lines: &[String]) -> Vec<Branch> {
    let mut branches = Vec::new();
    let mut cursor = 0;
    while cursor < lines.len() {
        let line = &lines[cursor];
        if skip_line(line) || line.starts_with('@') {
            cursor += 1;
            continue;
        }
        let (result, consumed) = decode_transformer(&lines[cursor..]);
        match result {
            Ok(branch) => branches.push(branch),
            Err(e) => debug!(
                "Skipping {} record at line {}: {}",
                RawSection::Transformer.name(),
                cursor + 1,
                e
            ),
        }
        cursor += consumed.max(1);
    }
    branches
}

/// Parses RAW text into a [`System`]. `origin` names the source in errors
/// and supplies the case name when the file carries none.
pub fn read_case(content: &str, origin: &str, options: &ParseOptions) -> ParseResult<System> {
    let sections = RawSections::split(content, options.implicit_raw_sections);
    if sections.is_empty() {
        return Err(ParseError::NoData {
            format: "PSS/E RAW",
            origin: origin.to_string(),
        });
    }

    let header = parse_header(&sections.case_id, options.default_base_mva);
    let base_mva = header.base_mva;
    let name = header
        .title
        .or(header.comment)
        .unwrap_or_else(|| origin_stem(origin));

    let mut system = System::new(name, base_mva);

    system.buses = decode_rows(RawSection::Bus, sections.lines(RawSection::Bus), decode_bus);
    system.loads = decode_rows(RawSection::Load, sections.lines(RawSection::Load), |row| {
        decode_load(row, base_mva)
    });
    system.shunts = decode_rows(
        RawSection::FixedShunt,
        sections.lines(RawSection::FixedShunt),
        |row| decode_fixed_shunt(row, base_mva),
    );
    system.generators = decode_rows(
        RawSection::Generator,
        sections.lines(RawSection::Generator),
        |row| decode_generator(row, base_mva),
    );
    system.branches = decode_rows(
        RawSection::Branch,
        sections.lines(RawSection::Branch),
        decode_branch,
    );
    let transformers = decode_transformers(sections.lines(RawSection::Transformer));
    let num_transformers = transformers.len();
    system.branches.extend(transformers);

    info!(
        "Parsed {} buses, {} loads, {} shunts, {} generators, {} branches ({} transformers) from {}",
        system.num_buses(),
        system.num_loads(),
        system.num_shunts(),
        system.num_generators(),
        system.num_branches(),
        num_transformers,
        origin,
    );

    Ok(system)
}

pub(crate) fn origin_stem(origin: &str) -> String {
    Path::new(origin)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| origin.to_string())
}
