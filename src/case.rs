use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ModelError, ModelResult};

/// Fallback system base used when a case does not state one.
pub const DEFAULT_BASE_MVA: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BusType {
    PQ,       // load bus
    PV,       // generator bus
    Slack,    // slack, swing, Vd, reference bus
    Isolated, // disconnected from the network
}

impl BusType {
    /// Maps the PSS/E `IDE` / MATPOWER `BUS_TYPE` code (1-4).
    pub fn from_code(code: i64) -> ModelResult<Self> {
        match code {
            1 => Ok(BusType::PQ),
            2 => Ok(BusType::PV),
            3 => Ok(BusType::Slack),
            4 => Ok(BusType::Isolated),
            other => Err(ModelError::InvalidBusType(other)),
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            BusType::PQ => 1,
            BusType::PV => 2,
            BusType::Slack => 3,
            BusType::Isolated => 4,
        }
    }
}

impl fmt::Display for BusType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BusType::Slack => write!(f, "REF"),
            BusType::PQ => write!(f, "P-Q"),
            BusType::PV => write!(f, "P-V"),
            BusType::Isolated => write!(f, "ISO"),
        }
    }
}

/// Status codes are 0 (out of service) or 1 (in service).
fn check_status(status: u8) -> ModelResult<()> {
    match status {
        0 | 1 => Ok(()),
        other => Err(ModelError::InvalidStatus {
            status: other as i64,
        }),
    }
}

/// Converts a signed status column into a checked status code.
pub fn status_from_code(code: i64) -> ModelResult<u8> {
    match code {
        0 => Ok(0),
        1 => Ok(1),
        other => Err(ModelError::InvalidStatus { status: other }),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bus {
    pub bus_id: usize,
    pub bus_type: BusType,
    pub name: Option<String>,
    pub base_kv: f64,
    pub area: i64,
    pub zone: i64,

    // Voltage (p.u., radians)
    pub v_magnitude: f64,
    pub v_angle: f64,

    // Limits
    pub v_max: f64,
    pub v_min: f64,
}

impl Bus {
    pub fn new(bus_id: usize, bus_type: BusType) -> Self {
        Self {
            bus_id,
            bus_type,
            name: None,
            base_kv: 1.0,
            area: 1,
            zone: 1,
            v_magnitude: 1.0,
            v_angle: 0.0,
            v_max: 1.1,
            v_min: 0.9,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_base_kv(mut self, base_kv: f64) -> Self {
        self.base_kv = base_kv;
        self
    }

    pub fn with_voltage(mut self, v_magnitude: f64, v_angle: f64) -> Self {
        self.v_magnitude = v_magnitude;
        self.v_angle = v_angle;
        self
    }

    pub fn is_slack(&self) -> bool {
        self.bus_type == BusType::Slack
    }

    pub fn is_pv(&self) -> bool {
        self.bus_type == BusType::PV
    }

    pub fn is_pq(&self) -> bool {
        self.bus_type == BusType::PQ
    }

    pub fn is_isolated(&self) -> bool {
        self.bus_type == BusType::Isolated
    }
}

impl fmt::Display for Bus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Bus {:>4} {:<14} {:>5} {:>8.2} kV  |V|={:.6}  Angle={:>9.6} rad",
            self.bus_id,
            self.name.as_deref().unwrap_or(""),
            self.bus_type,
            self.base_kv,
            self.v_magnitude,
            self.v_angle
        )
    }
}

/// Line or transformer between two buses. Impedances are p.u. on the system base.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    // Identifiers
    pub from_bus: usize,
    pub to_bus: usize,
    pub circuit_id: String,
    pub name: Option<String>,
    pub status: u8,

    // Impedance data
    pub r_pu: f64,
    pub x_pu: f64,
    pub b_pu: f64, // total line charging

    // Transformer data
    pub tap_ratio: f64,
    pub shift_angle: f64, // radians

    // Limits (MVA; None = unlimited)
    pub rate_a: Option<f64>,
    pub rate_b: Option<f64>,
    pub rate_c: Option<f64>,
    pub angmin: Option<f64>,
    pub angmax: Option<f64>,
}

impl Branch {
    pub fn new(from_bus: usize, to_bus: usize, r_pu: f64, x_pu: f64) -> Self {
        Self {
            from_bus,
            to_bus,
            circuit_id: String::from("1"),
            name: None,
            status: 1,
            r_pu,
            x_pu,
            b_pu: 0.0,
            tap_ratio: 1.0,
            shift_angle: 0.0,
            rate_a: None,
            rate_b: None,
            rate_c: None,
            angmin: None,
            angmax: None,
        }
    }

    pub fn with_charging(mut self, b_pu: f64) -> Self {
        self.b_pu = b_pu;
        self
    }

    /// Sets the off-nominal ratio and phase shift. A zero ratio is rejected.
    pub fn with_tap(mut self, tap_ratio: f64, shift_angle: f64) -> ModelResult<Self> {
        if tap_ratio == 0.0 {
            return Err(ModelError::ZeroTapRatio);
        }
        self.tap_ratio = tap_ratio;
        self.shift_angle = shift_angle;
        Ok(self)
    }

    pub fn with_status(mut self, status: u8) -> ModelResult<Self> {
        check_status(status)?;
        self.status = status;
        Ok(self)
    }

    pub fn with_circuit(mut self, circuit_id: impl Into<String>) -> Self {
        self.circuit_id = circuit_id.into();
        self
    }

    /// Ratings of zero or below mean "unlimited".
    pub fn with_ratings(mut self, rate_a: f64, rate_b: f64, rate_c: f64) -> Self {
        self.rate_a = positive(rate_a);
        self.rate_b = positive(rate_b);
        self.rate_c = positive(rate_c);
        self
    }

    /// Re-checks the invariants; fields are public so they can drift after construction.
    pub fn check(&self) -> ModelResult<()> {
        if self.tap_ratio == 0.0 {
            return Err(ModelError::ZeroTapRatio);
        }
        check_status(self.status)
    }

    pub fn is_transformer(&self) -> bool {
        self.tap_ratio != 1.0 || self.shift_angle != 0.0
    }

    pub fn is_in_service(&self) -> bool {
        self.status == 1
    }
}

pub(crate) fn positive(value: f64) -> Option<f64> {
    if value > 0.0 { Some(value) } else { None }
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_transformer() { "Xfmr" } else { "Line" };
        write!(
            f,
            "{:<4} {:>4} -> {:<4} ckt {:<3} R={:>10.6}  X={:>10.6}  B={:>9.5}  Tap={:.4}  RateA={}",
            kind,
            self.from_bus,
            self.to_bus,
            self.circuit_id,
            self.r_pu,
            self.x_pu,
            self.b_pu,
            self.tap_ratio,
            self.rate_a
                .map(|r| format!("{r:.1}"))
                .unwrap_or_else(|| String::from("-")),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Generator {
    // Identifiers
    pub bus_id: usize,
    pub gen_id: String,
    pub name: Option<String>,
    pub status: u8,

    // Setpoints (p.u.)
    pub p_gen: f64,
    pub q_gen: f64,
    pub v_setpoint: f64,
    pub mbase: f64,

    // Limits (p.u.; None = unlimited)
    pub p_max: Option<f64>,
    pub p_min: Option<f64>,
    pub q_max: Option<f64>,
    pub q_min: Option<f64>,
}

impl Generator {
    pub fn new(bus_id: usize, p_gen: f64) -> Self {
        Self {
            bus_id,
            gen_id: String::from("1"),
            name: None,
            status: 1,
            p_gen,
            q_gen: 0.0,
            v_setpoint: 1.0,
            mbase: DEFAULT_BASE_MVA,
            p_max: None,
            p_min: None,
            q_max: None,
            q_min: None,
        }
    }

    pub fn with_id(mut self, gen_id: impl Into<String>) -> Self {
        self.gen_id = gen_id.into();
        self
    }

    pub fn with_q_limits(mut self, q_min: Option<f64>, q_max: Option<f64>) -> Self {
        self.q_min = q_min;
        self.q_max = q_max;
        self
    }

    pub fn with_status(mut self, status: u8) -> ModelResult<Self> {
        check_status(status)?;
        self.status = status;
        Ok(self)
    }

    pub fn check(&self) -> ModelResult<()> {
        check_status(self.status)
    }

    pub fn is_in_service(&self) -> bool {
        self.status == 1
    }

    /// Returns whether `q` lies within the reactive limits, and `q` clamped to them.
    /// A missing bound leaves that side unlimited.
    pub fn check_q_limits(&self, q: f64) -> (bool, f64) {
        if let Some(q_max) = self.q_max {
            if q > q_max {
                return (false, q_max);
            }
        }
        if let Some(q_min) = self.q_min {
            if q < q_min {
                return (false, q_min);
            }
        }
        (true, q)
    }
}

impl fmt::Display for Generator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Gen {:<3} Bus {:>4}  P={:>9.4} pu  Q={:>9.4} pu  Vset={:.5}  {}",
            self.gen_id,
            self.bus_id,
            self.p_gen,
            self.q_gen,
            self.v_setpoint,
            if self.is_in_service() { "on" } else { "off" }
        )
    }
}

/// Constant-power load (p.u. on the system base).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Load {
    pub bus_id: usize,
    pub load_id: String,
    pub name: Option<String>,
    pub status: u8,

    pub p_load: f64,
    pub q_load: f64,
}

impl Load {
    pub fn new(bus_id: usize, p_load: f64, q_load: f64) -> Self {
        Self {
            bus_id,
            load_id: String::from("1"),
            name: None,
            status: 1,
            p_load,
            q_load,
        }
    }

    pub fn with_id(mut self, load_id: impl Into<String>) -> Self {
        self.load_id = load_id.into();
        self
    }

    pub fn with_status(mut self, status: u8) -> ModelResult<Self> {
        check_status(status)?;
        self.status = status;
        Ok(self)
    }

    pub fn check(&self) -> ModelResult<()> {
        check_status(self.status)
    }

    pub fn is_in_service(&self) -> bool {
        self.status == 1
    }

    /// |S| = sqrt(P^2 + Q^2)
    pub fn apparent_power(&self) -> f64 {
        self.p_load.hypot(self.q_load)
    }

    /// P / |S|, or 1.0 for a load that draws nothing.
    pub fn power_factor(&self) -> f64 {
        let s = self.apparent_power();
        if s == 0.0 { 1.0 } else { self.p_load / s }
    }
}

impl fmt::Display for Load {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Load {:<3} Bus {:>4}  P={:>9.4} pu  Q={:>9.4} pu",
            self.load_id, self.bus_id, self.p_load, self.q_load
        )
    }
}

/// Fixed shunt at a bus.
/// G and B are p.u. at 1.0 pu voltage on the system base (positive B = capacitive).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shunt {
    pub bus_id: usize,
    pub shunt_id: String,
    pub name: Option<String>,
    pub status: u8,
    pub g_pu: f64,
    pub b_pu: f64,
}

impl Shunt {
    pub fn new(bus_id: usize, g_pu: f64, b_pu: f64) -> Self {
        Self {
            bus_id,
            shunt_id: String::from("1"),
            name: None,
            status: 1,
            g_pu,
            b_pu,
        }
    }

    pub fn with_id(mut self, shunt_id: impl Into<String>) -> Self {
        self.shunt_id = shunt_id.into();
        self
    }

    pub fn with_status(mut self, status: u8) -> ModelResult<Self> {
        check_status(status)?;
        self.status = status;
        Ok(self)
    }

    pub fn check(&self) -> ModelResult<()> {
        check_status(self.status)
    }

    pub fn is_in_service(&self) -> bool {
        self.status == 1
    }

    pub fn is_capacitive(&self) -> bool {
        self.b_pu > 0.0
    }
}

impl fmt::Display for Shunt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Shunt {:<4} Bus {:>4}  G={:>8.4} pu  B={:>8.4} pu",
            self.shunt_id, self.bus_id, self.g_pu, self.b_pu
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CostModel {
    PiecewiseLinear,
    Polynomial,
}

impl CostModel {
    /// MATPOWER `MODEL` column: 1 = piecewise linear, 2 = polynomial.
    pub fn from_code(code: i64) -> ModelResult<Self> {
        match code {
            1 => Ok(CostModel::PiecewiseLinear),
            2 => Ok(CostModel::Polynomial),
            other => Err(ModelError::InvalidCostModel(other)),
        }
    }
}

/// Cost curve for the generator at `gen_index` in `System::generators`.
///
/// Polynomial coefficients run from the highest degree down to the constant
/// term; piecewise-linear data is interleaved `(MW, $/hr)` breakpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorCost {
    pub gen_index: usize,
    pub model: CostModel,
    pub startup: f64,
    pub shutdown: f64,
    pub coefficients: Vec<f64>,
}

impl GeneratorCost {
    pub fn polynomial(gen_index: usize, coefficients: Vec<f64>) -> Self {
        Self {
            gen_index,
            model: CostModel::Polynomial,
            startup: 0.0,
            shutdown: 0.0,
            coefficients,
        }
    }

    pub fn piecewise_linear(gen_index: usize, points: Vec<f64>) -> Self {
        Self {
            gen_index,
            model: CostModel::PiecewiseLinear,
            startup: 0.0,
            shutdown: 0.0,
            coefficients: points,
        }
    }

    pub fn is_polynomial(&self) -> bool {
        self.model == CostModel::Polynomial
    }

    /// Cost at `p_mw` by Horner's rule. Only defined for polynomial curves.
    pub fn evaluate(&self, p_mw: f64) -> ModelResult<f64> {
        if self.model == CostModel::PiecewiseLinear {
            return Err(ModelError::PiecewiseLinearEvaluation);
        }
        Ok(self
            .coefficients
            .iter()
            .fold(0.0, |acc, coeff| acc * p_mw + coeff))
    }
}

impl fmt::Display for GeneratorCost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let model = match self.model {
            CostModel::PiecewiseLinear => "pwl",
            CostModel::Polynomial => "poly",
        };
        write!(
            f,
            "Cost gen[{}] {:<4} startup={:.1} shutdown={:.1} data={:?}",
            self.gen_index, model, self.startup, self.shutdown, self.coefficients
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bus_type_codes() {
        assert_eq!(BusType::from_code(3).unwrap(), BusType::Slack);
        assert_eq!(BusType::from_code(4).unwrap(), BusType::Isolated);
        assert_eq!(BusType::Isolated.code(), 4);
        assert!(matches!(
            BusType::from_code(7),
            Err(ModelError::InvalidBusType(7))
        ));
    }

    #[test]
    fn test_bus_defaults() {
        let bus = Bus::new(5, BusType::PQ);
        assert_eq!(bus.v_magnitude, 1.0);
        assert_eq!(bus.v_angle, 0.0);
        assert_eq!(bus.base_kv, 1.0);
        assert_eq!((bus.area, bus.zone), (1, 1));
        assert_eq!((bus.v_max, bus.v_min), (1.1, 0.9));
        assert!(bus.name.is_none());
    }

    #[test]
    fn test_branch_rejects_zero_tap() {
        let result = Branch::new(1, 2, 0.0, 0.1).with_tap(0.0, 0.0);
        assert!(matches!(result, Err(ModelError::ZeroTapRatio)));
    }

    #[test]
    fn test_branch_rejects_bad_status() {
        assert!(Branch::new(1, 2, 0.0, 0.1).with_status(2).is_err());
        assert!(Branch::new(1, 2, 0.0, 0.1).with_status(0).is_ok());
    }

    #[test]
    fn test_branch_transformer_detection() {
        let line = Branch::new(1, 2, 0.01, 0.1);
        assert!(!line.is_transformer());
        let tap = Branch::new(1, 2, 0.0, 0.1).with_tap(0.978, 0.0).unwrap();
        assert!(tap.is_transformer());
        let shifter = Branch::new(1, 2, 0.0, 0.1).with_tap(1.0, 0.1).unwrap();
        assert!(shifter.is_transformer());
    }

    #[test]
    fn test_branch_ratings_zero_means_unlimited() {
        let branch = Branch::new(1, 2, 0.01, 0.1).with_ratings(0.0, 150.0, -1.0);
        assert_eq!(branch.rate_a, None);
        assert_eq!(branch.rate_b, Some(150.0));
        assert_eq!(branch.rate_c, None);
    }

    #[test]
    fn test_check_q_limits() {
        let generator = Generator::new(1, 0.5).with_q_limits(Some(-0.3), Some(0.5));
        assert_eq!(generator.check_q_limits(0.8), (false, 0.5));
        assert_eq!(generator.check_q_limits(-0.5), (false, -0.3));
        assert_eq!(generator.check_q_limits(0.2), (true, 0.2));
    }

    #[test]
    fn test_check_q_limits_open_side() {
        let generator = Generator::new(1, 0.5).with_q_limits(None, Some(0.5));
        assert_eq!(generator.check_q_limits(-1e6), (true, -1e6));
        assert_eq!(generator.check_q_limits(0.6), (false, 0.5));
    }

    #[test]
    fn test_load_power_factor() {
        let load = Load::new(2, 0.3, 0.4);
        assert!((load.apparent_power() - 0.5).abs() < 1e-12);
        assert!((load.power_factor() - 0.6).abs() < 1e-12);
        assert_eq!(Load::new(2, 0.0, 0.0).power_factor(), 1.0);
    }

    #[test]
    fn test_polynomial_cost() {
        let cost = GeneratorCost::polynomial(0, vec![0.04, 20.0, 100.0]);
        assert!((cost.evaluate(50.0).unwrap() - 1200.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_polynomial_cost_is_zero() {
        let cost = GeneratorCost::polynomial(0, Vec::new());
        assert_eq!(cost.evaluate(0.0).unwrap(), 0.0);
        assert_eq!(cost.evaluate(275.0).unwrap(), 0.0);
    }

    #[test]
    fn test_piecewise_cost_evaluation_fails() {
        let cost = GeneratorCost::piecewise_linear(0, vec![0.0, 0.0, 100.0, 2000.0]);
        assert!(matches!(
            cost.evaluate(50.0),
            Err(ModelError::PiecewiseLinearEvaluation)
        ));
    }

    #[test]
    fn test_cost_model_codes() {
        assert_eq!(CostModel::from_code(1).unwrap(), CostModel::PiecewiseLinear);
        assert_eq!(CostModel::from_code(2).unwrap(), CostModel::Polynomial);
        assert!(CostModel::from_code(3).is_err());
    }
}
