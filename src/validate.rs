//! Structural checks over a [`System`].
//!
//! Every finding is returned as a message naming the offending component and
//! bus id. Nothing here mutates the system or fails early.

use std::collections::HashSet;

use crate::system::System;

pub fn validate(system: &System) -> Vec<String> {
    let mut errors = Vec::new();

    check_slack(system, &mut errors);

    for bus_id in system.duplicate_bus_ids() {
        errors.push(format!("Duplicate bus ID: {bus_id}"));
    }

    let bus_ids: HashSet<usize> = system.buses.iter().map(|b| b.bus_id).collect();

    for (i, branch) in system.branches.iter().enumerate() {
        if !bus_ids.contains(&branch.from_bus) {
            errors.push(format!(
                "Branch {i} ({}-{} ckt {}): from_bus {} does not exist",
                branch.from_bus, branch.to_bus, branch.circuit_id, branch.from_bus
            ));
        }
        if !bus_ids.contains(&branch.to_bus) {
            errors.push(format!(
                "Branch {i} ({}-{} ckt {}): to_bus {} does not exist",
                branch.from_bus, branch.to_bus, branch.circuit_id, branch.to_bus
            ));
        }
    }

    for generator in &system.generators {
        if !bus_ids.contains(&generator.bus_id) {
            errors.push(format!(
                "Generator {} references non-existent bus {}",
                generator.gen_id, generator.bus_id
            ));
        }
    }

    for load in &system.loads {
        if !bus_ids.contains(&load.bus_id) {
            errors.push(format!(
                "Load {} references non-existent bus {}",
                load.load_id, load.bus_id
            ));
        }
    }

    for shunt in &system.shunts {
        if !bus_ids.contains(&shunt.bus_id) {
            errors.push(format!(
                "Shunt {} references non-existent bus {}",
                shunt.shunt_id, shunt.bus_id
            ));
        }
    }

    for cost in &system.generator_costs {
        if cost.gen_index >= system.generators.len() {
            errors.push(format!(
                "Generator cost references generator index {} but only {} generators exist",
                cost.gen_index,
                system.generators.len()
            ));
        }
    }

    errors
}

fn check_slack(system: &System, errors: &mut Vec<String>) {
    let slack: Vec<usize> = system.slack_buses().iter().map(|b| b.bus_id).collect();
    match slack.len() {
        0 => errors.push(String::from(
            "no slack bus found. Exactly one bus must have type Slack.",
        )),
        1 => {}
        _ => errors.push(format!("Multiple slack buses found: {slack:?}")),
    }
}
