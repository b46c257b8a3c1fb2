//! Tests for the switch's windowed violation detector, driven through a [`MockHost`].

use std::{
    collections::BTreeSet,
    net::Ipv4Addr,
    sync::mpsc::{self, Receiver},
    time::Duration,
};

use log::LevelFilter;

use sdn_control_plane::{
    config::*,
    events::Event,
    messages::{DecodeError, SwitchMessage, WireMessage},
    networking::transport::Endpoint,
    scheduling::Timer,
    switch::{
        types::{StabilityCheck, ViolationPolicy},
        Switch, SwitchError, ViolationTally,
    },
    types::data_types::{ControllerID, SwitchID, ViolationCount},
};

mod common;

use common::{host::MockHost, logging::setup_logger};

type TestSwitch = Switch<MockHost, MockHost>;

fn switch_config(max_violation_count: u8) -> SwitchConfiguration {
    SwitchConfiguration::builder()
        .id(SwitchID::new(1001))
        .port(DEFAULT_SWITCH_PORT)
        .window_duration(DEFAULT_WINDOW_DURATION)
        .max_violation_count(ViolationCount::new(max_violation_count))
        .build()
}

fn initialized_switch(
    config: SwitchConfiguration,
    tally: ViolationTally,
) -> (TestSwitch, MockHost, Receiver<Event>) {
    setup_logger(LevelFilter::Debug);
    let host = MockHost::new();
    let (event_publisher, event_subscriber) = mpsc::channel();
    let mut switch =
        Switch::new(config, host.clone(), host.clone(), tally, Some(event_publisher)).unwrap();
    switch.initialize().unwrap();
    (switch, host, event_subscriber)
}

fn controller_endpoint(id: u32) -> Endpoint {
    Endpoint::new(Ipv4Addr::new(10, 0, 0, id as u8), DEFAULT_CONTROLLER_PORT)
}

fn ping(switch: &mut TestSwitch, controller: u32) {
    let msg = SwitchMessage {
        sender: ControllerID::new(controller),
        respond_port: DEFAULT_CONTROLLER_PORT,
    };
    switch
        .on_receive(&msg.encode(), controller_endpoint(controller))
        .unwrap();
}

// Ping the switch once from each of `controllers`, then close the window.
fn window(switch: &mut TestSwitch, controllers: &[u32]) -> Result<(), SwitchError> {
    for controller in controllers {
        ping(switch, *controller);
    }
    switch.update_window()
}

fn controller_set(ids: &[u32]) -> BTreeSet<ControllerID> {
    ids.iter().map(|id| ControllerID::new(*id)).collect()
}

fn reports(event_subscriber: &Receiver<Event>) -> usize {
    event_subscriber
        .try_iter()
        .filter(|event| matches!(event, Event::ReportViolation(_)))
        .count()
}

#[test]
fn initialize_test() {
    let (mut switch, host, _) = initialized_switch(switch_config(3), ViolationTally::new());
    switch.initialize().unwrap();

    assert_eq!(host.bound_ports(), vec![DEFAULT_SWITCH_PORT]);
    assert_eq!(
        host.scheduled(),
        vec![(DEFAULT_WINDOW_DURATION, Timer::UpdateWindow)]
    );
}

#[test]
fn invalid_configuration_test() {
    let host = MockHost::new();
    assert_eq!(
        Switch::new(switch_config(0), host.clone(), host.clone(), ViolationTally::new(), None).err(),
        Some(SwitchError::ConfigError(ConfigError::ZeroViolationThreshold))
    );

    let config = SwitchConfiguration {
        window_duration: Duration::ZERO,
        ..switch_config(3)
    };
    assert_eq!(
        Switch::new(config, host.clone(), host, ViolationTally::new(), None).err(),
        Some(SwitchError::ConfigError(ConfigError::ZeroDuration {
            parameter: "window_duration"
        }))
    );
}

#[test]
fn same_controllers_increment_count_test() {
    let (mut switch, _, _) = initialized_switch(switch_config(10), ViolationTally::new());

    window(&mut switch, &[3, 7]).unwrap();
    let after_first = switch.violation_count();
    assert_eq!(after_first, ViolationCount::new(1));

    // Order within a window does not matter.
    window(&mut switch, &[7, 3]).unwrap();
    assert_eq!(switch.violation_count(), after_first.incremented());
    assert_eq!(switch.previous_controllers(), &controller_set(&[3, 7]));
}

#[test]
fn single_controller_resets_count_test() {
    let (mut switch, _, _) = initialized_switch(switch_config(10), ViolationTally::new());

    window(&mut switch, &[3, 7]).unwrap();
    window(&mut switch, &[3]).unwrap();
    assert_eq!(switch.violation_count(), ViolationCount::new(0));

    window(&mut switch, &[3, 7]).unwrap();
    window(&mut switch, &[]).unwrap();
    assert_eq!(switch.violation_count(), ViolationCount::new(0));
}

#[test]
fn duplicate_pings_collapse_test() {
    let (mut switch, _, _) = initialized_switch(switch_config(10), ViolationTally::new());

    // One controller pinging many times is normal.
    window(&mut switch, &[4, 4, 4]).unwrap();
    assert_eq!(switch.violation_count(), ViolationCount::new(0));
    assert_eq!(switch.previous_controllers(), &controller_set(&[4]));

    for controller in [3, 3, 7] {
        ping(&mut switch, controller);
    }
    assert_eq!(switch.current_controllers(), controller_set(&[3, 7]));
    switch.update_window().unwrap();
    assert_eq!(switch.violation_count(), ViolationCount::new(1));
    assert!(switch.current_controllers().is_empty());
}

#[test]
fn different_controllers_restart_count_test() {
    let (mut switch, _, _) = initialized_switch(switch_config(10), ViolationTally::new());

    window(&mut switch, &[3, 7]).unwrap();
    window(&mut switch, &[3, 7]).unwrap();
    assert_eq!(switch.violation_count(), ViolationCount::new(2));

    window(&mut switch, &[3, 8]).unwrap();
    assert_eq!(switch.violation_count(), ViolationCount::new(1));
}

#[test]
fn report_once_at_threshold_test() {
    let (mut switch, host, events) = initialized_switch(switch_config(3), ViolationTally::new());

    window(&mut switch, &[5, 9]).unwrap();
    window(&mut switch, &[5, 9]).unwrap();
    assert_eq!(reports(&events), 0);

    host.set_now(Duration::from_secs(3));
    match window(&mut switch, &[5, 9]) {
        Err(SwitchError::ControlPlaneViolation(report)) => {
            assert_eq!(report.switch, SwitchID::new(1001));
            assert_eq!(report.controllers, controller_set(&[5, 9]));
            assert_eq!(report.violation_count, ViolationCount::new(3));
            assert_eq!(report.time.elapsed(), Duration::from_secs(3));
        }
        other => panic!("expected a violation, got {:?}", other),
    }
    assert_eq!(reports(&events), 1);

    // Monitoring continues, but the same streak is not reported again.
    window(&mut switch, &[5, 9]).unwrap();
    assert_eq!(switch.violation_count(), ViolationCount::new(4));
    assert_eq!(reports(&events), 0);

    // A new streak after the count fell back is reported again.
    window(&mut switch, &[5]).unwrap();
    window(&mut switch, &[5, 9]).unwrap();
    window(&mut switch, &[5, 9]).unwrap();
    assert!(matches!(
        window(&mut switch, &[5, 9]),
        Err(SwitchError::ControlPlaneViolation(_))
    ));

    let armed = host
        .scheduled()
        .into_iter()
        .filter(|(_, timer)| *timer == Timer::UpdateWindow)
        .count();
    assert_eq!(armed, 9);
}

#[test]
fn report_every_window_test() {
    let config = SwitchConfiguration {
        violation_policy: ViolationPolicy::ReportEveryWindow,
        ..switch_config(2)
    };
    let (mut switch, _, events) = initialized_switch(config, ViolationTally::new());

    window(&mut switch, &[1, 2]).unwrap();
    assert!(window(&mut switch, &[1, 2]).is_err());
    assert!(window(&mut switch, &[1, 2]).is_err());
    assert!(window(&mut switch, &[1, 2]).is_err());
    assert_eq!(reports(&events), 3);
}

#[test]
fn halt_after_report_test() {
    let config = SwitchConfiguration {
        violation_policy: ViolationPolicy::Halt,
        ..switch_config(2)
    };
    let (mut switch, host, _) = initialized_switch(config, ViolationTally::new());

    window(&mut switch, &[1, 2]).unwrap();
    assert!(window(&mut switch, &[1, 2]).is_err());
    assert!(switch.is_halted());
    let armed = host.scheduled().len();

    ping(&mut switch, 1);
    ping(&mut switch, 2);
    assert!(switch.current_controllers().is_empty());
    switch.update_window().unwrap();
    assert_eq!(host.scheduled().len(), armed);
    assert_eq!(switch.violation_count(), ViolationCount::new(2));
}

#[test]
fn union_subset_check_test() {
    let union_config = SwitchConfiguration {
        stability_check: StabilityCheck::UnionSubset,
        ..switch_config(10)
    };
    let (mut union_switch, _, _) = initialized_switch(union_config, ViolationTally::new());
    let (mut equality_switch, _, _) = initialized_switch(switch_config(10), ViolationTally::new());

    for switch in [&mut union_switch, &mut equality_switch] {
        window(switch, &[3, 7, 9]).unwrap();
        window(switch, &[3, 7]).unwrap();
    }

    // {3, 7} adds nothing to {3, 7, 9}.
    assert_eq!(union_switch.violation_count(), ViolationCount::new(2));
    assert_eq!(equality_switch.violation_count(), ViolationCount::new(1));

    // {3, 7, 9} is not covered by {3, 7}.
    window(&mut union_switch, &[3, 7, 9]).unwrap();
    assert_eq!(union_switch.violation_count(), ViolationCount::new(1));
}

#[test]
fn tally_counts_edges_test() {
    let tally = ViolationTally::new();
    let (mut first, _, _) = initialized_switch(switch_config(10), tally.clone());
    let (mut second, _, _) = initialized_switch(switch_config(10), tally.clone());

    window(&mut first, &[1, 2]).unwrap();
    assert_eq!(tally.count(), 1);
    window(&mut first, &[1, 2]).unwrap();
    window(&mut first, &[1, 3]).unwrap();
    assert_eq!(tally.count(), 1);

    window(&mut second, &[1, 2]).unwrap();
    assert_eq!(tally.count(), 2);

    window(&mut first, &[1]).unwrap();
    assert_eq!(tally.count(), 1);
    window(&mut first, &[]).unwrap();
    assert_eq!(tally.count(), 1);

    window(&mut second, &[2]).unwrap();
    assert_eq!(tally.count(), 0);
}

#[test]
fn tally_never_goes_below_zero_test() {
    setup_logger(LevelFilter::Debug);
    let tally = ViolationTally::new();

    tally.leave();
    assert_eq!(tally.count(), 0);

    tally.enter();
    tally.leave();
    tally.leave();
    assert_eq!(tally.count(), 0);

    tally.enter();
    assert_eq!(tally.count(), 1);
}

#[test]
fn echo_test() {
    let (mut switch, host, _) = initialized_switch(switch_config(3), ViolationTally::new());

    ping(&mut switch, 4);
    ping(&mut switch, 4);
    assert_eq!(host.connected(), vec![controller_endpoint(4)]);
    let echoes = host.take_sent_as::<SwitchMessage>();
    assert_eq!(echoes.len(), 2);
    for (to, echo) in echoes {
        assert_eq!(to, controller_endpoint(4));
        assert_eq!(
            echo,
            SwitchMessage {
                sender: ControllerID::new(4),
                respond_port: DEFAULT_SWITCH_PORT
            }
        );
    }

    let quiet_config = SwitchConfiguration {
        echo_responses: false,
        ..switch_config(3)
    };
    let (mut quiet_switch, quiet_host, _) = initialized_switch(quiet_config, ViolationTally::new());
    ping(&mut quiet_switch, 4);
    assert!(quiet_host.take_sent().is_empty());
    assert_eq!(quiet_switch.current_controllers(), controller_set(&[4]));
}

#[test]
fn truncated_ping_is_surfaced_test() {
    let (mut switch, _, _) = initialized_switch(switch_config(3), ViolationTally::new());

    assert_eq!(
        switch.on_receive(&[0, 0, 0, 4], controller_endpoint(4)),
        Err(SwitchError::DecodeError(DecodeError::TruncatedMessage {
            expected: 6,
            actual: 4
        }))
    );
    assert!(switch.current_controllers().is_empty());
}
