/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Functions that log out events.
//!
//! The logs defined in this module are printed if the host enabled them via its
//! [configuration](crate::simulation::SimulationConfiguration::log_events).
//!
//! The control plane logs using the [log](https://docs.rs/log/latest/log/) crate. To get these
//! messages printed onto a terminal or to a file, set up a
//! [logging implementation](https://docs.rs/log/latest/log/#available-logging-implementations).
//!
//! ## Log message format
//!
//! Log messages are CSVs (Comma Separated Values) with at least two values. The first two values are
//! always:
//! 1. The name of the [event](crate::events) in PascalCase (defined in this module as constants).
//! 2. The virtual time the event was emitted, in seconds since the start of the run.
//!
//! The rest of the values differ depending on the kind of event. For example, the following snippet
//! is how a [SelectLeader](crate::events::SelectLeaderEvent) is printed:
//!
//! ```text
//! SelectLeader, 0.200000, 1, 2, 1, 3, 1 2 3
//! ```
//!
//! In the snippet:
//! - The third value is the ID of the controller that selected a leader.
//! - The fourth value is the epoch the leader was selected for.
//! - The fifth and sixth values are the previous leader and the new leader.
//! - The seventh value lists the leader candidates, separated by spaces.

use std::collections::BTreeSet;

use crate::events::*;
use crate::types::data_types::ControllerID;

// Names of each event in PascalCase for printing:
pub const PING_CONTROLLERS: &str = "PingControllers";
pub const PING_SWITCHES: &str = "PingSwitches";
pub const SELECT_LEADER: &str = "SelectLeader";
pub const RECEIVE_CONTROL_MESSAGE: &str = "ReceiveControlMessage";
pub const BUFFER_MESSAGE: &str = "BufferMessage";
pub const DISCARD_MESSAGE: &str = "DiscardMessage";
pub const REACH_MAX_EPOCH: &str = "ReachMaxEpoch";

pub const RECEIVE_SWITCH_PING: &str = "ReceiveSwitchPing";
pub const CLOSE_WINDOW: &str = "CloseWindow";
pub const REPORT_VIOLATION: &str = "ReportViolation";

/// Implemented by event types. Used to get a closure that logs the event.
pub(crate) trait Logger {
    /// Returns a pointer to the default logging handler for a given event type.
    fn get_logger() -> Box<dyn Fn(&Self) + Send>;
}

impl Logger for PingControllersEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |ping_controllers_event: &PingControllersEvent| {
            log::info!(
                "{}, {}, {}, {}, {}, {}, {}",
                PING_CONTROLLERS,
                ping_controllers_event.timestamp,
                ping_controllers_event.controller,
                ping_controllers_event.leader,
                ping_controllers_event.epoch,
                ping_controllers_event.peers_reached,
                ping_controllers_event.peers_failed
            )
        };
        Box::new(logger)
    }
}

impl Logger for PingSwitchesEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |ping_switches_event: &PingSwitchesEvent| {
            log::info!(
                "{}, {}, {}, {}, {}",
                PING_SWITCHES,
                ping_switches_event.timestamp,
                ping_switches_event.controller,
                ping_switches_event.switches_reached,
                ping_switches_event.switches_failed
            )
        };
        Box::new(logger)
    }
}

impl Logger for SelectLeaderEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |select_leader_event: &SelectLeaderEvent| {
            log::info!(
                "{}, {}, {}, {}, {}, {}, {}",
                SELECT_LEADER,
                select_leader_event.timestamp,
                select_leader_event.controller,
                select_leader_event.epoch,
                select_leader_event.previous_leader,
                select_leader_event.leader,
                space_separated(&select_leader_event.candidates)
            )
        };
        Box::new(logger)
    }
}

impl Logger for ReceiveControlMessageEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |receive_control_message_event: &ReceiveControlMessageEvent| {
            log::info!(
                "{}, {}, {}, {}, {}, {}, {}",
                RECEIVE_CONTROL_MESSAGE,
                receive_control_message_event.timestamp,
                receive_control_message_event.controller,
                receive_control_message_event.origin,
                receive_control_message_event.message.sender,
                receive_control_message_event.message.leader,
                receive_control_message_event.message.epoch
            )
        };
        Box::new(logger)
    }
}

impl Logger for BufferMessageEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |buffer_message_event: &BufferMessageEvent| {
            log::info!(
                "{}, {}, {}, {}, {}",
                BUFFER_MESSAGE,
                buffer_message_event.timestamp,
                buffer_message_event.controller,
                buffer_message_event.message.sender,
                buffer_message_event.message.epoch
            )
        };
        Box::new(logger)
    }
}

impl Logger for DiscardMessageEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |discard_message_event: &DiscardMessageEvent| {
            log::info!(
                "{}, {}, {}, {}, {}, {:?}",
                DISCARD_MESSAGE,
                discard_message_event.timestamp,
                discard_message_event.controller,
                discard_message_event.message.sender,
                discard_message_event.message.epoch,
                discard_message_event.reason
            )
        };
        Box::new(logger)
    }
}

impl Logger for ReachMaxEpochEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |reach_max_epoch_event: &ReachMaxEpochEvent| {
            log::info!(
                "{}, {}, {}, {}",
                REACH_MAX_EPOCH,
                reach_max_epoch_event.timestamp,
                reach_max_epoch_event.controller,
                reach_max_epoch_event.epoch
            )
        };
        Box::new(logger)
    }
}

impl Logger for ReceiveSwitchPingEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |receive_switch_ping_event: &ReceiveSwitchPingEvent| {
            log::info!(
                "{}, {}, {}, {}, {}",
                RECEIVE_SWITCH_PING,
                receive_switch_ping_event.timestamp,
                receive_switch_ping_event.switch,
                receive_switch_ping_event.origin,
                receive_switch_ping_event.controller
            )
        };
        Box::new(logger)
    }
}

impl Logger for CloseWindowEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |close_window_event: &CloseWindowEvent| {
            log::info!(
                "{}, {}, {}, {}, {}",
                CLOSE_WINDOW,
                close_window_event.timestamp,
                close_window_event.switch,
                close_window_event.violation_count,
                space_separated(&close_window_event.controllers)
            )
        };
        Box::new(logger)
    }
}

impl Logger for ReportViolationEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |report_violation_event: &ReportViolationEvent| {
            log::error!(
                "{}, {}, {}, {}, {}",
                REPORT_VIOLATION,
                report_violation_event.timestamp,
                report_violation_event.report.switch,
                report_violation_event.report.violation_count,
                space_separated(&report_violation_event.report.controllers)
            )
        };
        Box::new(logger)
    }
}

// Print a set of controller IDs as one CSV value.
fn space_separated(controllers: &BTreeSet<ControllerID>) -> String {
    controllers
        .iter()
        .map(|controller| controller.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}
