use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::case::*;
use crate::error::{ModelError, ModelResult, ParseResult};

/// A complete network case. Every p.u. quantity is on `base_mva`; angles are radians.
///
/// Fields are public for read access. Editing the lists directly skips the
/// checks done by the `add_*` methods; run [`System::validate`] afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct System {
    pub name: String,
    pub base_mva: f64,

    pub buses: Vec<Bus>,
    pub branches: Vec<Branch>,
    pub generators: Vec<Generator>,
    pub loads: Vec<Load>,
    pub shunts: Vec<Shunt>,
    pub generator_costs: Vec<GeneratorCost>,
}

impl Default for System {
    fn default() -> Self {
        Self::new(String::new(), DEFAULT_BASE_MVA)
    }
}

impl System {
    pub fn new(name: impl Into<String>, base_mva: f64) -> Self {
        Self {
            name: name.into(),
            base_mva,
            buses: Vec::new(),
            branches: Vec::new(),
            generators: Vec::new(),
            loads: Vec::new(),
            shunts: Vec::new(),
            generator_costs: Vec::new(),
        }
    }

    /// Reads a case file, picking the format from the extension.
    pub fn from_file(path: impl AsRef<Path>) -> ParseResult<Self> {
        crate::format::parse_file(path)
    }

    pub fn from_raw(path: impl AsRef<Path>) -> ParseResult<Self> {
        crate::format::parse_raw(path)
    }

    pub fn from_matpower(path: impl AsRef<Path>) -> ParseResult<Self> {
        crate::format::parse_matpower(path)
    }

    pub fn num_buses(&self) -> usize {
        self.buses.len()
    }

    pub fn num_branches(&self) -> usize {
        self.branches.len()
    }

    pub fn num_generators(&self) -> usize {
        self.generators.len()
    }

    pub fn num_loads(&self) -> usize {
        self.loads.len()
    }

    pub fn num_shunts(&self) -> usize {
        self.shunts.len()
    }

    pub fn bus_ids(&self) -> Vec<usize> {
        self.buses.iter().map(|b| b.bus_id).collect()
    }

    /// Largest bus id present, 0 for an empty system.
    pub fn max_bus_id(&self) -> usize {
        self.buses.iter().map(|b| b.bus_id).max().unwrap_or(0)
    }

    pub fn has_bus(&self, bus_id: usize) -> bool {
        self.buses.iter().any(|b| b.bus_id == bus_id)
    }

    pub fn get_bus(&self, bus_id: usize) -> Option<&Bus> {
        self.buses.iter().find(|b| b.bus_id == bus_id)
    }

    pub fn get_bus_mut(&mut self, bus_id: usize) -> Option<&mut Bus> {
        self.buses.iter_mut().find(|b| b.bus_id == bus_id)
    }

    /// Position of the bus in `buses`.
    pub fn bus_index(&self, bus_id: usize) -> ModelResult<usize> {
        self.buses
            .iter()
            .position(|b| b.bus_id == bus_id)
            .ok_or(ModelError::BusNotFound(bus_id))
    }

    /// Branches touching the bus at either end.
    pub fn branches_at_bus(&self, bus_id: usize, in_service_only: bool) -> Vec<&Branch> {
        self.branches
            .iter()
            .filter(|br| br.from_bus == bus_id || br.to_bus == bus_id)
            .filter(|br| !in_service_only || br.is_in_service())
            .collect()
    }

    pub fn generators_at_bus(&self, bus_id: usize, in_service_only: bool) -> Vec<&Generator> {
        self.generators
            .iter()
            .filter(|g| g.bus_id == bus_id)
            .filter(|g| !in_service_only || g.is_in_service())
            .collect()
    }

    pub fn loads_at_bus(&self, bus_id: usize, in_service_only: bool) -> Vec<&Load> {
        self.loads
            .iter()
            .filter(|l| l.bus_id == bus_id)
            .filter(|l| !in_service_only || l.is_in_service())
            .collect()
    }

    pub fn shunts_at_bus(&self, bus_id: usize, in_service_only: bool) -> Vec<&Shunt> {
        self.shunts
            .iter()
            .filter(|s| s.bus_id == bus_id)
            .filter(|s| !in_service_only || s.is_in_service())
            .collect()
    }

    pub fn in_service_branches(&self) -> Vec<&Branch> {
        self.branches.iter().filter(|br| br.is_in_service()).collect()
    }

    pub fn transformers(&self) -> Vec<&Branch> {
        self.branches.iter().filter(|br| br.is_transformer()).collect()
    }

    pub fn slack_buses(&self) -> Vec<&Bus> {
        self.buses.iter().filter(|b| b.is_slack()).collect()
    }

    pub fn pv_buses(&self) -> Vec<&Bus> {
        self.buses.iter().filter(|b| b.is_pv()).collect()
    }

    pub fn pq_buses(&self) -> Vec<&Bus> {
        self.buses.iter().filter(|b| b.is_pq()).collect()
    }

    /// Net scheduled real injection at a bus: in-service generation minus in-service load.
    pub fn bus_p_injection(&self, bus_id: usize) -> f64 {
        let p_gen: f64 = self
            .generators_at_bus(bus_id, true)
            .iter()
            .map(|g| g.p_gen)
            .sum();
        let p_load: f64 = self.loads_at_bus(bus_id, true).iter().map(|l| l.p_load).sum();
        p_gen - p_load
    }

    pub fn bus_q_injection(&self, bus_id: usize) -> f64 {
        let q_gen: f64 = self
            .generators_at_bus(bus_id, true)
            .iter()
            .map(|g| g.q_gen)
            .sum();
        let q_load: f64 = self.loads_at_bus(bus_id, true).iter().map(|l| l.q_load).sum();
        q_gen - q_load
    }

    /// Total (G, B) of in-service shunts at the bus.
    pub fn bus_shunt_admittance(&self, bus_id: usize) -> (f64, f64) {
        self.shunts_at_bus(bus_id, true)
            .iter()
            .fold((0.0, 0.0), |(g, b), s| (g + s.g_pu, b + s.b_pu))
    }

    /// Sum of (P, Q) over generators.
    pub fn total_generation(&self, in_service_only: bool) -> (f64, f64) {
        self.generators
            .iter()
            .filter(|g| !in_service_only || g.is_in_service())
            .fold((0.0, 0.0), |(p, q), g| (p + g.p_gen, q + g.q_gen))
    }

    /// Sum of (P, Q) over loads.
    pub fn total_load(&self, in_service_only: bool) -> (f64, f64) {
        self.loads
            .iter()
            .filter(|l| !in_service_only || l.is_in_service())
            .fold((0.0, 0.0), |(p, q), l| (p + l.p_load, q + l.q_load))
    }

    /// Cost curve attached to the generator at `gen_index`.
    pub fn generator_cost(&self, gen_index: usize) -> Option<&GeneratorCost> {
        self.generator_costs.iter().find(|c| c.gen_index == gen_index)
    }

    pub fn add_bus(&mut self, bus: Bus) -> ModelResult<()> {
        if self.has_bus(bus.bus_id) {
            return Err(ModelError::DuplicateBus {
                bus_id: bus.bus_id,
                max_bus_id: self.max_bus_id(),
            });
        }
        self.buses.push(bus);
        Ok(())
    }

    pub fn add_branch(&mut self, branch: Branch) -> ModelResult<()> {
        branch.check()?;
        self.require_bus("from_bus", branch.from_bus)?;
        self.require_bus("to_bus", branch.to_bus)?;
        self.branches.push(branch);
        Ok(())
    }

    pub fn add_generator(&mut self, generator: Generator) -> ModelResult<()> {
        generator.check()?;
        self.require_bus("Bus", generator.bus_id)?;
        self.generators.push(generator);
        Ok(())
    }

    pub fn add_load(&mut self, load: Load) -> ModelResult<()> {
        load.check()?;
        self.require_bus("Bus", load.bus_id)?;
        self.loads.push(load);
        Ok(())
    }

    pub fn add_shunt(&mut self, shunt: Shunt) -> ModelResult<()> {
        shunt.check()?;
        self.require_bus("Bus", shunt.bus_id)?;
        self.shunts.push(shunt);
        Ok(())
    }

    /// The cost's `gen_index` must point into the current generator list.
    pub fn add_generator_cost(&mut self, cost: GeneratorCost) -> ModelResult<()> {
        if cost.gen_index >= self.generators.len() {
            return Err(ModelError::CostIndexOutOfRange {
                gen_index: cost.gen_index,
                num_generators: self.generators.len(),
            });
        }
        self.generator_costs.push(cost);
        Ok(())
    }

    fn require_bus(&self, role: &'static str, bus_id: usize) -> ModelResult<()> {
        if self.has_bus(bus_id) {
            return Ok(());
        }
        Err(ModelError::MissingBus {
            role,
            bus_id,
            available: self.bus_ids(),
        })
    }

    /// Structural checks. An empty list means the system is consistent.
    pub fn validate(&self) -> Vec<String> {
        crate::validate::validate(self)
    }

    /// Ids that appear more than once in `buses`, in first-repeat order.
    pub(crate) fn duplicate_bus_ids(&self) -> Vec<usize> {
        let mut seen = HashSet::new();
        self.buses
            .iter()
            .map(|b| b.bus_id)
            .filter(|id| !seen.insert(*id))
            .collect()
    }
}

impl fmt::Display for System {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (p_gen, q_gen) = self.total_generation(true);
        let (p_load, q_load) = self.total_load(true);
        writeln!(f, "Case: {}", self.name)?;
        writeln!(f, "Base: {:.1} MVA", self.base_mva)?;
        writeln!(
            f,
            "Buses: {} ({} slack, {} PV, {} PQ)",
            self.num_buses(),
            self.slack_buses().len(),
            self.pv_buses().len(),
            self.pq_buses().len()
        )?;
        writeln!(
            f,
            "Branches: {} ({} transformers)",
            self.num_branches(),
            self.transformers().len()
        )?;
        writeln!(
            f,
            "Generators: {}  Loads: {}  Shunts: {}  Costs: {}",
            self.num_generators(),
            self.num_loads(),
            self.num_shunts(),
            self.generator_costs.len()
        )?;
        writeln!(
            f,
            "Generation: {:.2} MW, {:.2} MVAr",
            p_gen * self.base_mva,
            q_gen * self.base_mva
        )?;
        write!(
            f,
            "Load: {:.2} MW, {:.2} MVAr",
            p_load * self.base_mva,
            q_load * self.base_mva
        )
    }
}
