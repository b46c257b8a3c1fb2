/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Definitions of control plane events for event handling and logging.
//!
//! Note: an event for a given action indicates that the action has been completed. Every event
//! carries the virtual time at which it happened.

use std::collections::BTreeSet;
use std::sync::mpsc::Sender;

use crate::messages::ControlMessage;
use crate::networking::transport::Endpoint;
use crate::switch::types::ViolationReport;
use crate::types::data_types::{ControllerID, Epoch, SwitchID, Timestamp, ViolationCount};

pub enum Event {
    // Events emitted by controllers.
    PingControllers(PingControllersEvent),
    PingSwitches(PingSwitchesEvent),
    SelectLeader(SelectLeaderEvent),
    ReceiveControlMessage(ReceiveControlMessageEvent),
    BufferMessage(BufferMessageEvent),
    DiscardMessage(DiscardMessageEvent),
    ReachMaxEpoch(ReachMaxEpochEvent),
    // Events emitted by switches.
    ReceiveSwitchPing(ReceiveSwitchPingEvent),
    CloseWindow(CloseWindowEvent),
    ReportViolation(ReportViolationEvent),
}

impl Event {
    pub(crate) fn publish(self, event_publisher: &Option<Sender<Event>>) {
        if let Some(event_publisher) = event_publisher {
            // The receiving end only goes away when the host has stopped observing.
            let _ = event_publisher.send(self);
        }
    }
}

/// A controller entered a new epoch and sent its identity to its peer controllers.
pub struct PingControllersEvent {
    pub timestamp: Timestamp,
    pub controller: ControllerID,
    pub leader: ControllerID,
    pub epoch: Epoch,
    pub peers_reached: usize,
    pub peers_failed: usize,
}

/// The leader pinged its switches.
pub struct PingSwitchesEvent {
    pub timestamp: Timestamp,
    pub controller: ControllerID,
    pub switches_reached: usize,
    pub switches_failed: usize,
}

/// A controller resolved the leader of its current epoch.
pub struct SelectLeaderEvent {
    pub timestamp: Timestamp,
    pub controller: ControllerID,
    pub epoch: Epoch,
    pub previous_leader: ControllerID,
    pub leader: ControllerID,
    pub candidates: BTreeSet<ControllerID>,
}

/// A controller accepted a current-epoch message from a peer controller as a leader candidate.
pub struct ReceiveControlMessageEvent {
    pub timestamp: Timestamp,
    pub controller: ControllerID,
    pub origin: Endpoint,
    pub message: ControlMessage,
}

/// A controller buffered a message from a future epoch.
pub struct BufferMessageEvent {
    pub timestamp: Timestamp,
    pub controller: ControllerID,
    pub message: ControlMessage,
}

/// A controller dropped a message without considering it.
pub struct DiscardMessageEvent {
    pub timestamp: Timestamp,
    pub controller: ControllerID,
    pub message: ControlMessage,
    pub reason: DiscardReason,
}

/// Why a [`ControlMessage`] was dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiscardReason {
    /// The message claims to come from the receiving controller itself.
    SelfOriginated,

    /// The message belongs to an epoch the receiver has already left.
    Stale,

    /// The message belongs to a future epoch, but the future-epoch buffer is full.
    BufferFull,
}

/// A controller's epoch went past its maximum epoch; it has stopped and asked the host to end the run.
pub struct ReachMaxEpochEvent {
    pub timestamp: Timestamp,
    pub controller: ControllerID,
    pub epoch: Epoch,
}

/// A switch received a ping from a controller.
pub struct ReceiveSwitchPingEvent {
    pub timestamp: Timestamp,
    pub switch: SwitchID,
    pub origin: Endpoint,
    pub controller: ControllerID,
}

/// A switch closed an observation window.
pub struct CloseWindowEvent {
    pub timestamp: Timestamp,
    pub switch: SwitchID,
    pub controllers: BTreeSet<ControllerID>,
    pub violation_count: ViolationCount,
}

/// A switch detected a control plane violation.
pub struct ReportViolationEvent {
    pub timestamp: Timestamp,
    pub report: ViolationReport,
}
