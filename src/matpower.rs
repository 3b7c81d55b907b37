//! MATPOWER case file reader.
//!
//! Only the numeric matrices are read: `mpc.bus`, `mpc.gen`, `mpc.branch` and
//! `mpc.gencost`, plus `mpc.baseMVA` and the `function mpc = name` line.
//! Loads and shunts have no matrix of their own; they are built from the
//! `PD/QD` and `GS/BS` columns of each bus row.

use std::collections::HashMap;
use std::sync::LazyLock;

use log::{debug, info, warn};
use regex::Regex;

use crate::case::*;
use crate::config::ParseOptions;
use crate::error::{ParseError, ParseResult};
use crate::fields::{Row, RowError};
use crate::raw::origin_stem;
use crate::system::System;

static BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)mpc\.(\w+)\s*=\s*\[(.*?)\];").expect("static pattern")
});
static BASE_MVA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"mpc\.baseMVA\s*=\s*([0-9.]+)").expect("static pattern"));
static CASE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"function\s+mpc\s*=\s*(\w+)").expect("static pattern"));
static COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"%.*$").expect("static pattern"));

pub type Block = Vec<Vec<String>>;

/// Every `mpc.<name> = [ ... ];` matrix in the file, tokenized by row.
///
/// `%` comments and trailing semicolons are stripped and rows left empty are
/// dropped. Matrices with no rows are not returned.
pub fn extract_blocks(content: &str) -> HashMap<String, Block> {
    let mut blocks = HashMap::new();
    for caps in BLOCK.captures_iter(content) {
        let rows: Block = caps[2]
            .lines()
            .map(|line| COMMENT.replace(line, ""))
            .map(|line| line.trim().trim_end_matches(';').trim().to_string())
            .filter(|line| !line.is_empty())
            .map(|line| line.split_whitespace().map(str::to_string).collect())
            .collect();
        if !rows.is_empty() {
            blocks.insert(caps[1].to_string(), rows);
        }
    }
    blocks
}

pub fn base_mva(content: &str, default_base_mva: f64) -> f64 {
    BASE_MVA
        .captures(content)
        .and_then(|caps| caps[1].parse::<f64>().ok())
        .filter(|b| b.is_finite() && *b > 0.0)
        .unwrap_or(default_base_mva)
}

/// Name from the `function mpc = name` declaration.
pub fn case_name(content: &str) -> Option<String> {
    CASE_NAME
        .captures(content)
        .map(|caps| caps[1].to_string())
}

/// A bus row and the load / shunt embedded in it.
#[derive(Debug, Clone, PartialEq)]
pub struct BusRecord {
    pub bus: Bus,
    pub load: Option<Load>,
    pub shunt: Option<Shunt>,
}

/// `BUS_I TYPE PD QD GS BS AREA VM VA BASEKV ZONE VMAX VMIN`
pub fn decode_bus(row: &Row, base_mva: f64) -> Result<BusRecord, RowError> {
    row.require(13)?;
    let bus_id = row.bus(0, "BUS_I")?;
    let bus_type = BusType::from_code(row.int(1, "BUS_TYPE")?)
        .map_err(|e| RowError::Invalid(e.to_string()))?;
    let pd = row.float(2, "PD")?;
    let qd = row.float(3, "QD")?;
    let gs = row.float(4, "GS")?;
    let bs = row.float(5, "BS")?;

    let mut bus = Bus::new(bus_id, bus_type)
        .with_voltage(row.float(7, "VM")?, row.float(8, "VA")?.to_radians())
        .with_base_kv(row.float(9, "BASE_KV")?);
    bus.area = row.int(6, "BUS_AREA")?;
    bus.zone = row.int(10, "ZONE")?;
    bus.v_max = row.float(11, "VMAX")?;
    bus.v_min = row.float(12, "VMIN")?;

    let load = (pd != 0.0 || qd != 0.0).then(|| Load::new(bus_id, pd / base_mva, qd / base_mva));
    let shunt =
        (gs != 0.0 || bs != 0.0).then(|| Shunt::new(bus_id, gs / base_mva, bs / base_mva));

    Ok(BusRecord { bus, load, shunt })
}

/// `GEN_BUS PG QG QMAX QMIN VG MBASE GEN_STATUS PMAX PMIN ...`
///
/// `gen_id` is left at its default; the section decoder numbers units per bus.
pub fn decode_generator(row: &Row, base_mva: f64) -> Result<Generator, RowError> {
    row.require(10)?;
    let mut generator = Generator::new(row.bus(0, "GEN_BUS")?, row.float(1, "PG")? / base_mva);
    generator.q_gen = row.float(2, "QG")? / base_mva;
    generator.q_max = Some(row.float(3, "QMAX")? / base_mva);
    generator.q_min = Some(row.float(4, "QMIN")? / base_mva);
    generator.v_setpoint = row.float(5, "VG")?;
    let mbase = row.float(6, "MBASE")?;
    generator.mbase = if mbase > 0.0 { mbase } else { base_mva };
    generator.status = if row.float(7, "GEN_STATUS")? > 0.0 { 1 } else { 0 };
    generator.p_max = Some(row.float(8, "PMAX")? / base_mva);
    generator.p_min = Some(row.float(9, "PMIN")? / base_mva);
    Ok(generator)
}

/// `F_BUS T_BUS BR_R BR_X BR_B RATE_A RATE_B RATE_C TAP SHIFT BR_STATUS ANGMIN ANGMAX`
///
/// A `TAP` of zero marks a plain line and is stored as 1.0.
pub fn decode_branch(row: &Row) -> Result<Branch, RowError> {
    row.require(13)?;
    let ratio = row.float(8, "TAP")?;
    let tap = if ratio == 0.0 { 1.0 } else { ratio };
    let status = status_from_code(row.int(10, "BR_STATUS")?)
        .map_err(|e| RowError::Invalid(e.to_string()))?;

    let mut branch = Branch::new(
        row.bus(0, "F_BUS")?,
        row.bus(1, "T_BUS")?,
        row.float(2, "BR_R")?,
        row.float(3, "BR_X")?,
    )
    .with_charging(row.float(4, "BR_B")?)
    .with_ratings(
        row.float(5, "RATE_A")?,
        row.float(6, "RATE_B")?,
        row.float(7, "RATE_C")?,
    )
    .with_tap(tap, row.float(9, "SHIFT")?.to_radians())
    .map_err(|e| RowError::Invalid(e.to_string()))?;
    branch.status = status;
    branch.angmin = Some(row.float(11, "ANGMIN")?.to_radians());
    branch.angmax = Some(row.float(12, "ANGMAX")?.to_radians());
    Ok(branch)
}

/// `MODEL STARTUP SHUTDOWN NCOST COST...`
///
/// Polynomial rows carry `NCOST` coefficients; piecewise-linear rows carry
/// `NCOST` (MW, $/hr) pairs.
pub fn decode_gencost(row: &Row, gen_index: usize) -> Result<GeneratorCost, RowError> {
    row.require(4)?;
    let model = CostModel::from_code(row.int(0, "MODEL")?)
        .map_err(|e| RowError::Invalid(e.to_string()))?;
    let ncost = row.int(3, "NCOST")?;
    let bad_ncost = || RowError::BadField {
        column: "NCOST",
        index: 3,
        value: ncost.to_string(),
    };
    let per_point = match model {
        CostModel::Polynomial => 1,
        CostModel::PiecewiseLinear => 2,
    };
    let end = usize::try_from(ncost)
        .ok()
        .and_then(|n| n.checked_mul(per_point))
        .and_then(|count| count.checked_add(4))
        .ok_or_else(bad_ncost)?;
    row.require(end)?;

    let coefficients = (4..end)
        .map(|i| row.float(i, "COST"))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(GeneratorCost {
        gen_index,
        model,
        startup: row.float(1, "STARTUP")?,
        shutdown: row.float(2, "SHUTDOWN")?,
        coefficients,
    })
}

fn decode_block<T>(
    name: &str,
    rows: &[Vec<String>],
    mut decode: impl FnMut(usize, &Row) -> Result<T, RowError>,
) -> Vec<T> {
    let mut records = Vec::with_capacity(rows.len());
    for (i, tokens) in rows.iter().enumerate() {
        match decode(i, &Row::from_tokens(tokens.as_slice())) {
            Ok(record) => records.push(record),
            Err(e) => debug!("Skipping mpc.{} row {}: {}", name, i + 1, e),
        }
    }
    records
}

/// Gives each item a 1-based id counting up per key.
fn number_per_key<K: std::hash::Hash + Eq>(keys: impl Iterator<Item = K>) -> Vec<String> {
    let mut counts: HashMap<K, usize> = HashMap::new();
    keys.map(|key| {
        let n = counts.entry(key).or_insert(0);
        *n += 1;
        n.to_string()
    })
    .collect()
}

/// Parses MATPOWER text into a [`System`]. `origin` names the source in
/// errors and supplies the case name when there is no function declaration.
pub fn read_case(content: &str, origin: &str, options: &ParseOptions) -> ParseResult<System> {
    let blocks = extract_blocks(content);
    if blocks.is_empty() {
        return Err(ParseError::NoData {
            format: "MATPOWER",
            origin: origin.to_string(),
        });
    }

    let base_mva = base_mva(content, options.default_base_mva);
    let name = case_name(content).unwrap_or_else(|| origin_stem(origin));
    let mut system = System::new(name, base_mva);
    let block = |name: &str| blocks.get(name).map(Vec::as_slice).unwrap_or_default();

    for record in decode_block("bus", block("bus"), |_, row| decode_bus(row, base_mva)) {
        system.buses.push(record.bus);
        system.loads.extend(record.load);
        system.shunts.extend(record.shunt);
    }

    system.generators = decode_block("gen", block("gen"), |_, row| {
        decode_generator(row, base_mva)
    });
    let gen_ids = number_per_key(system.generators.iter().map(|g| g.bus_id));
    for (generator, gen_id) in system.generators.iter_mut().zip(gen_ids) {
        generator.gen_id = gen_id;
    }

    system.branches = decode_block("branch", block("branch"), |_, row| decode_branch(row));
    let circuits = number_per_key(system.branches.iter().map(|br| (br.from_bus, br.to_bus)));
    for (branch, circuit_id) in system.branches.iter_mut().zip(circuits) {
        branch.circuit_id = circuit_id;
    }

    let gencost = block("gencost");
    if !gencost.is_empty() && gencost.len() != system.generators.len() {
        warn!(
            "{}: {} gencost rows for {} generators; costs are matched by row position",
            origin,
            gencost.len(),
            system.generators.len()
        );
    }
    system.generator_costs = decode_block("gencost", gencost, |i, row| decode_gencost(row, i));

    info!(
        "Parsed {} buses, {} loads, {} shunts, {} generators, {} branches, {} costs from {}",
        system.num_buses(),
        system.num_loads(),
        system.num_shunts(),
        system.num_generators(),
        system.num_branches(),
        system.generator_costs.len(),
        origin,
    );

    Ok(system)
}
