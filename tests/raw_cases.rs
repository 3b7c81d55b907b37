use std::f64::consts::PI;
use std::fs;
use std::path::PathBuf;

use busbar::{BusType, ParseOptions, System, parse_file_with, parse_raw};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn ieee14() -> System {
    init_logger();
    parse_raw(fixture("ieee14.raw")).unwrap()
}

fn ieee9() -> System {
    init_logger();
    parse_raw(fixture("ieee9.raw")).unwrap()
}

#[test]
fn test_ieee14_counts() {
    let system = ieee14();
    assert_eq!(system.num_buses(), 14);
    assert_eq!(system.num_branches(), 20);
    assert_eq!(system.num_generators(), 5);
    assert_eq!(system.num_loads(), 11);
    assert_eq!(system.num_shunts(), 1);
    assert_eq!(system.base_mva, 100.0);
    assert!(system.name.starts_with("IEEE 14 BUS TEST CASE"));
}

#[test]
fn test_ieee14_bus_types() {
    let system = ieee14();
    assert_eq!(system.slack_buses().len(), 1);
    assert_eq!(system.slack_buses()[0].bus_id, 1);
    assert_eq!(system.pv_buses().len(), 4);
    assert_eq!(system.pq_buses().len(), 9);
    assert_eq!(system.get_bus(8).unwrap().bus_type, BusType::PV);
    assert_eq!(system.get_bus(6).unwrap().base_kv, 69.0);
    assert_eq!(system.get_bus(3).unwrap().name.as_deref(), Some("BUS 3"));
}

#[test]
fn test_ieee14_units() {
    let system = ieee14();
    let bus2 = system.get_bus(2).unwrap();
    assert!((bus2.v_angle - (-4.98 * PI / 180.0)).abs() < 1e-9);
    assert!((bus2.v_magnitude - 1.045).abs() < 1e-12);

    let load3 = system.loads_at_bus(3, false)[0];
    assert!((load3.p_load - 94.2 / 100.0).abs() < 1e-9);
    assert!((load3.q_load - 19.0 / 100.0).abs() < 1e-9);

    let (p_load, _) = system.total_load(false);
    assert!((p_load - 2.59).abs() < 1e-9);
    let (p_gen, _) = system.total_generation(false);
    assert!((p_gen - 2.724).abs() < 1e-9);
}

#[test]
fn test_ieee14_generators() {
    let system = ieee14();
    let buses: Vec<usize> = system.generators.iter().map(|g| g.bus_id).collect();
    assert_eq!(buses, vec![1, 2, 3, 6, 8]);
    assert!(system.generators.iter().all(|g| g.is_in_service()));

    let g1 = &system.generators[0];
    assert_eq!(g1.mbase, 615.0);
    assert!((g1.p_max.unwrap() - 3.324).abs() < 1e-9);
    assert!((g1.q_max.unwrap() - 0.1).abs() < 1e-9);

    let g2 = &system.generators[1];
    assert!((g2.q_min.unwrap() + 0.4).abs() < 1e-9);
    assert_eq!(g2.v_setpoint, 1.045);
}

#[test]
fn test_ieee14_shunt() {
    let system = ieee14();
    let shunt = &system.shunts[0];
    assert_eq!(shunt.bus_id, 9);
    assert!(shunt.b_pu > 0.0);
    assert!((shunt.b_pu - 0.19).abs() < 1e-9);
    let (_, b) = system.bus_shunt_admittance(9);
    assert!((b - 0.19).abs() < 1e-9);
}

#[test]
fn test_ieee14_transformers() {
    let system = ieee14();
    let transformers = system.transformers();
    assert_eq!(transformers.len(), 3);

    // transformer records are appended after the line records
    let tail: Vec<(usize, usize)> = system.branches[17..]
        .iter()
        .map(|br| (br.from_bus, br.to_bus))
        .collect();
    assert_eq!(tail, vec![(4, 7), (4, 9), (5, 6)]);

    let t47 = &system.branches[17];
    assert!((t47.tap_ratio - 0.978).abs() < 1e-12);
    assert_eq!(t47.b_pu, 0.0);
    assert!((t47.x_pu - 0.20912).abs() < 1e-12);
    assert_eq!(t47.rate_a, None);
    assert!((system.branches[19].tap_ratio - 0.932).abs() < 1e-12);
}

#[test]
fn test_ieee14_v33_branch_layout() {
    let system = ieee14();
    let first = &system.branches[0];
    assert_eq!((first.from_bus, first.to_bus), (1, 2));
    assert!((first.r_pu - 0.01938).abs() < 1e-12);
    assert!((first.b_pu - 0.0528).abs() < 1e-12);
    assert_eq!(first.rate_a, None);
    assert_eq!(first.name, None);
    assert_eq!(first.circuit_id, "1");
    assert!(first.is_in_service());
}

#[test]
fn test_ieee14_is_valid() {
    assert_eq!(ieee14().validate(), Vec::<String>::new());
}

#[test]
fn test_ieee9_v34_sections() {
    let system = ieee9();
    assert_eq!(system.name, "WSCC 9 BUS NINE BUS TEST CASE");
    // system-wide data rows are read as bus rows and skipped
    assert_eq!(system.num_buses(), 9);
    assert_eq!(system.num_loads(), 3);
    assert_eq!(system.num_shunts(), 0);
    assert_eq!(system.num_generators(), 3);
    assert_eq!(system.num_branches(), 9);

    let (p_load, q_load) = system.total_load(true);
    assert!((p_load - 3.15).abs() < 1e-9);
    assert!((q_load - 1.15).abs() < 1e-9);
    assert!(system.validate().is_empty());
}

#[test]
fn test_ieee9_v34_branch_layout() {
    let system = ieee9();
    let line = &system.branches[0];
    assert_eq!(line.name.as_deref(), Some("LINE 4-5"));
    assert_eq!(line.rate_a, Some(250.0));
    assert_eq!(line.rate_b, Some(250.0));
    assert!((line.b_pu - 0.176).abs() < 1e-12);
    assert!(line.is_in_service());
    assert_eq!(system.branches[3].rate_a, Some(150.0));
}

#[test]
fn test_ieee9_v34_transformers() {
    let system = ieee9();
    let gsu = &system.branches[6..];
    assert_eq!(gsu.len(), 3);
    assert_eq!((gsu[0].from_bus, gsu[0].to_bus), (1, 4));
    assert_eq!(gsu[0].name.as_deref(), Some("GSU 1"));
    assert_eq!(gsu[0].tap_ratio, 1.0);
    assert_eq!(gsu[0].b_pu, 0.0);
    assert_eq!(gsu[2].rate_a, Some(300.0));
    assert!((gsu[1].x_pu - 0.0625).abs() < 1e-12);
    // unity ratio, no shift: modelled like a line
    assert!(system.transformers().is_empty());
}

#[test]
fn test_ieee9_generator_columns() {
    let system = ieee9();
    let g1 = &system.generators[0];
    assert!((g1.p_gen - 0.71641).abs() < 1e-9);
    assert_eq!(g1.mbase, 247.5);
    assert_eq!(g1.status, 1);
    assert!((g1.p_max.unwrap() - 2.5).abs() < 1e-9);
    assert!((g1.p_min.unwrap() - 0.1).abs() < 1e-9);
}

#[test]
fn test_malformed_rows_are_skipped() {
    init_logger();
    let text = fs::read_to_string(fixture("ieee14.raw")).unwrap();
    let broken = text
        .replacen("     5,'BUS 5       ', 138.0000,1", "     5,'BUS 5       ', abc,1", 1)
        .replacen("     4,     5,'1 ', 1.33500E-2", "     4,     5,'1 ', x.xxxxx", 1);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.raw");
    fs::write(&path, broken).unwrap();

    let system = parse_raw(&path).unwrap();
    assert_eq!(system.num_buses(), 13);
    assert_eq!(system.num_branches(), 19);
    assert!(system.get_bus(5).is_none());

    let errors = system.validate();
    assert!(!errors.is_empty());
    assert!(errors.iter().all(|e| e.contains('5')));
}

#[test]
fn test_implicit_sections_option() {
    init_logger();
    let text = "\
0, 100.0, 33 / bare sections
LEGACY CASE

1,'A',138.0,3,1,1,1,1.0,0.0
2,'B',138.0,1,1,1,1,1.0,-2.0
0
2,'1',1,1,1,50.0,20.0
0
0
1,'1',50.0,0.0,99.0,-99.0,1.0
0
1,2,'1',0.01,0.1,0.02,100.0,0.0,0.0,0,0,0,0,1
0
Q
";
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("legacy.raw");
    fs::write(&path, text).unwrap();

    let default = parse_raw(&path).unwrap();
    assert_eq!(default.num_buses(), 2);
    assert_eq!(default.num_loads(), 0);

    let system = parse_file_with(&path, ParseOptions::implicit_sections()).unwrap();
    assert_eq!(system.name, "LEGACY CASE");
    assert_eq!(system.num_buses(), 2);
    assert_eq!(system.num_loads(), 1);
    assert_eq!(system.num_generators(), 1);
    assert_eq!(system.num_branches(), 1);
    assert!(system.validate().is_empty());
}

#[test]
fn test_default_base_mva_option() {
    let text = "0, ???, 33\nNO BASE\n\n1,'A',138.0,3\n0 / END OF BUS DATA, BEGIN LOAD DATA\n1,'1',1,1,1,50.0,0.0\n0\nQ\n";
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nobase.raw");
    fs::write(&path, text).unwrap();

    let system = parse_file_with(&path, ParseOptions::default().with_default_base_mva(50.0)).unwrap();
    assert_eq!(system.base_mva, 50.0);
    assert!((system.loads[0].p_load - 1.0).abs() < 1e-12);
}
