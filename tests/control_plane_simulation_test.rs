//! End-to-end tests that run whole control planes in the deterministic [`Simulation`].

use std::{
    collections::{BTreeMap, BTreeSet},
    sync::{Arc, Mutex},
    time::Duration,
};

use log::LevelFilter;

use sdn_control_plane::{
    simulation::{
        ControlPlaneLayout, EndReason, InstalledControlPlane, Simulation, SimulationConfiguration,
    },
    types::data_types::{ControllerID, Epoch, Timestamp},
};

mod common;

use common::logging::setup_logger;

// Four controllers (IDs 1 to 4) and three switches (IDs 1001 to 1003), with every default parameter.
fn four_controller_simulation(config: SimulationConfiguration) -> (Simulation, InstalledControlPlane) {
    setup_logger(LevelFilter::Info);
    let mut simulation = Simulation::new(config).unwrap();
    let installed = simulation
        .install(&ControlPlaneLayout::builder().controllers(4).switches(3).build())
        .unwrap();
    (simulation, installed)
}

// Cut controller 4 off from controllers 1 to 3, leaving its links to the switches up.
fn isolate_highest_controller(
    simulation: &mut Simulation,
    installed: &InstalledControlPlane,
    at: Duration,
) {
    let controllers = installed.controller_addresses();
    simulation.partition_at(at, &controllers[3..], &controllers[..3]);
}

#[test]
fn healthy_control_plane_test() {
    let (mut simulation, installed) =
        four_controller_simulation(SimulationConfiguration::builder().log_events(true).build());

    let leaders = Arc::new(Mutex::new(BTreeMap::new()));
    let leaders_handle = leaders.clone();
    simulation.handlers_mut().on_select_leader(move |event| {
        leaders_handle
            .lock()
            .unwrap()
            .insert(event.controller, event.leader);
    });

    let outcome = simulation.run();

    // The first controller past epoch 80 ends the run at its 82nd round.
    assert_eq!(outcome.end_reason, EndReason::Stopped);
    assert_eq!(outcome.end_time, Duration::from_millis(8200));
    assert!(outcome.violations.is_empty());
    assert_eq!(outcome.switches_in_violation, 0);

    for (id, address) in &installed.controllers {
        let controller = simulation.controller(*address).unwrap();
        assert_eq!(controller.id(), *id);
        assert_eq!(controller.leader(), ControllerID::new(4));
        assert_eq!(controller.epoch(), Epoch::new(81));
    }
    assert!(leaders
        .lock()
        .unwrap()
        .values()
        .all(|leader| *leader == ControllerID::new(4)));

    for address in installed.switch_addresses() {
        let switch = simulation.switch(address).unwrap();
        assert!(switch.violation_count().is_zero());
    }
    let stats = simulation.network_stats();
    assert_eq!(stats.dropped, 0);
    assert!(stats.delivered > 0);
}

/// Once controller 4 can no longer reach its peers, controllers 3 and 4 both consider themselves
/// leader and ping every switch. Each switch sees {3, 4} in the windows closing at 2 s, 3 s and 4 s,
/// and reports at 4 s.
#[test]
fn isolated_controller_causes_violation_test() {
    let (mut simulation, installed) =
        four_controller_simulation(SimulationConfiguration::builder().build());
    isolate_highest_controller(&mut simulation, &installed, Duration::from_millis(500));

    let outcome = simulation.run();

    assert_eq!(outcome.end_reason, EndReason::Stopped);
    assert_eq!(outcome.violations.len(), 3);
    for report in &outcome.violations {
        assert_eq!(report.time, Timestamp::new(4_000_000_000));
        assert_eq!(
            report.controllers,
            BTreeSet::from([ControllerID::new(3), ControllerID::new(4)])
        );
        assert_eq!(report.violation_count.int(), 3);
    }
    assert_eq!(outcome.switches_in_violation, 3);
    assert_eq!(simulation.tally().count(), 3);

    let controllers = installed.controller_addresses();
    assert_eq!(
        simulation.controller(controllers[0]).unwrap().leader(),
        ControllerID::new(3)
    );
    assert_eq!(
        simulation.controller(controllers[3]).unwrap().leader(),
        ControllerID::new(4)
    );
}

#[test]
fn abort_on_violation_test() {
    let (mut simulation, installed) = four_controller_simulation(
        SimulationConfiguration::builder()
            .abort_on_violation(true)
            .build(),
    );
    isolate_highest_controller(&mut simulation, &installed, Duration::from_millis(500));

    let outcome = simulation.run();

    match &outcome.end_reason {
        EndReason::ControlPlaneViolation(report) => {
            assert_eq!(report.time, Timestamp::new(4_000_000_000))
        }
        other => panic!("expected a violation, got {:?}", other),
    }
    assert_eq!(outcome.end_time, Duration::from_secs(4));
    assert_eq!(outcome.violations.len(), 1);
    // Every switch started seeing two controllers at 2 s.
    assert_eq!(outcome.switches_in_violation, 3);
}

/// The partition heals before any switch reaches the threshold, so controller 4 takes the lead back
/// everywhere and the switches recover.
#[test]
fn healed_partition_test() {
    let (mut simulation, installed) =
        four_controller_simulation(SimulationConfiguration::builder().build());
    isolate_highest_controller(&mut simulation, &installed, Duration::from_millis(500));
    let controllers = installed.controller_addresses();
    for peer in &controllers[..3] {
        simulation.restore_link_at(Duration::from_millis(2500), controllers[3], *peer);
    }

    let outcome = simulation.run();

    assert_eq!(outcome.end_reason, EndReason::Stopped);
    assert!(outcome.violations.is_empty());
    assert_eq!(outcome.switches_in_violation, 0);
    for address in &controllers {
        assert_eq!(
            simulation.controller(*address).unwrap().leader(),
            ControllerID::new(4)
        );
    }
}

#[test]
fn immediate_link_failure_test() {
    let (mut simulation, installed) =
        four_controller_simulation(SimulationConfiguration::builder().build());
    let controllers = installed.controller_addresses();
    for peer in &controllers[..3] {
        simulation.fail_link(controllers[3], *peer);
    }

    let outcome = simulation.run();

    // Controllers 1 to 3 never hear from controller 4, so the split starts with the first switch pings.
    assert_eq!(outcome.violations.len(), 3);
    assert!(outcome
        .violations
        .iter()
        .all(|report| report.time == Timestamp::new(4_000_000_000)));
}

#[test]
fn time_limit_test() {
    let (mut simulation, _) = four_controller_simulation(
        SimulationConfiguration::builder()
            .until(Duration::from_millis(1500))
            .build(),
    );

    let outcome = simulation.run();

    assert_eq!(outcome.end_reason, EndReason::TimeLimit);
    assert!(outcome.end_time <= Duration::from_millis(1500));
    assert!(outcome.violations.is_empty());
}

#[test]
fn lossy_network_is_deterministic_test() {
    let lossy = || {
        SimulationConfiguration::builder()
            .drop_probability(0.2)
            .max_jitter(Duration::from_millis(1))
            .seed(7)
            .until(Duration::from_secs(3))
            .build()
    };

    let (mut first, _) = four_controller_simulation(lossy());
    let (mut second, _) = four_controller_simulation(lossy());
    let first_outcome = first.run();
    let second_outcome = second.run();

    assert_eq!(first_outcome, second_outcome);
    assert_eq!(first.network_stats(), second.network_stats());
    assert!(first.network_stats().dropped > 0);
}

#[test]
fn invalid_drop_probability_test() {
    assert!(Simulation::new(
        SimulationConfiguration::builder()
            .drop_probability(1.5)
            .build()
    )
    .is_err());
}
