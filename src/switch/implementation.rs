/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Event-driven implementation of the switch violation detector.
//!
//! Main type: [`Switch`].

use std::{
    collections::BTreeSet,
    error::Error,
    fmt::{self, Display, Formatter},
    sync::mpsc::Sender,
};

use crate::{
    config::{ConfigError, SwitchConfiguration},
    events::{CloseWindowEvent, Event, ReceiveSwitchPingEvent, ReportViolationEvent},
    messages::{DecodeError, SwitchMessage, WireMessage},
    networking::{
        sending::SenderHandle,
        transport::{Endpoint, Transport, TransportError},
    },
    scheduling::{Scheduler, Timer},
    types::data_types::{ControllerID, SwitchID, Timestamp, ViolationCount},
};

use super::{
    tally::ViolationTally,
    types::{ViolationPolicy, ViolationReport},
    window::ViolationWindow,
};

/// A single switch taking part in violation detection.
///
/// # Usage
///
/// After creating a `Switch` with [`new`](Self::new), the host interacts with it by calling three
/// methods:
/// 1. [`initialize`](Self::initialize), once the switch should start, to bind its port and arm its
///    window timer.
/// 2. [`on_receive`](Self::on_receive), whenever bytes arrive on the switch's port.
/// 3. [`on_timer`](Self::on_timer), whenever a timer the switch armed through its [`Scheduler`]
///    fires.
pub struct Switch<T: Transport, S: Scheduler> {
    config: SwitchConfiguration,
    window: ViolationWindow,
    sender: SenderHandle<T>,
    scheduler: S,
    tally: ViolationTally,
    reply_channels: BTreeSet<Endpoint>,
    bound: bool,
    started: bool,
    halted: bool,
    event_publisher: Option<Sender<Event>>,
}

impl<T: Transport, S: Scheduler> Switch<T, S> {
    /// Create a new `Switch` after checking that `config` is valid. The switch does nothing until it is
    /// [initialized](Self::initialize).
    pub fn new(
        config: SwitchConfiguration,
        transport: T,
        scheduler: S,
        tally: ViolationTally,
        event_publisher: Option<Sender<Event>>,
    ) -> Result<Self, SwitchError> {
        config.validate()?;
        let window = ViolationWindow::new(
            config.max_violation_count,
            config.stability_check,
            config.violation_policy,
        );
        Ok(Self {
            config,
            window,
            sender: SenderHandle::new(transport),
            scheduler,
            tally,
            reply_channels: BTreeSet::new(),
            bound: false,
            started: false,
            halted: false,
            event_publisher,
        })
    }

    /// Bind the switch's port and schedule the first [`update_window`](Self::update_window) after one
    /// window duration. Calling this again after a successful call does nothing, and a call after a failed
    /// one does not bind the port twice.
    pub fn initialize(&mut self) -> Result<(), SwitchError> {
        if self.started {
            return Ok(());
        }
        if !self.bound {
            self.sender.bind(self.config.port)?;
            self.bound = true;
        }
        self.scheduler
            .schedule_after(self.config.window_duration, Timer::UpdateWindow);
        self.started = true;
        log::debug!(
            "switch {} listening on port {}, window {:?}",
            self.config.id,
            self.config.port,
            self.config.window_duration
        );
        Ok(())
    }

    /// Dispatch a timer that this switch armed.
    pub fn on_timer(&mut self, timer: Timer) -> Result<(), SwitchError> {
        match timer {
            Timer::UpdateWindow => self.update_window(),
            Timer::PingControllers | Timer::PingSwitches => {
                log::warn!("switch {} ignoring controller timer {:?}", self.config.id, timer);
                Ok(())
            }
        }
    }

    /// Record the controller that sent a ping into the in-progress window and, if enabled, echo the
    /// ping back on the port it names.
    ///
    /// A ping that fails to decode is dropped and its [`DecodeError`] returned; the window is not
    /// touched.
    pub fn on_receive(&mut self, bytes: &[u8], from: Endpoint) -> Result<(), SwitchError> {
        if self.halted {
            return Ok(());
        }

        let msg = SwitchMessage::decode(bytes).map_err(|err| {
            log::warn!("switch {} dropped ping from {}: {}", self.config.id, from, err);
            err
        })?;
        log::trace!(
            "switch {} received ping from {} (controller {})",
            self.config.id,
            from,
            msg.sender
        );

        self.window.record(msg.sender);
        Event::ReceiveSwitchPing(ReceiveSwitchPingEvent {
            timestamp: self.now(),
            switch: self.config.id,
            origin: from,
            controller: msg.sender,
        })
        .publish(&self.event_publisher);

        if self.config.echo_responses {
            self.echo(msg, from)?;
        }
        Ok(())
    }

    /// Close the in-progress window and compare it against the previous one.
    ///
    /// If the configured [`ViolationPolicy`] calls for a report, the violation is reported and returned
    /// as [`SwitchError::ControlPlaneViolation`]. The window timer is re-armed in every case except a
    /// report under [`ViolationPolicy::Halt`].
    pub fn update_window(&mut self) -> Result<(), SwitchError> {
        if self.halted {
            return Ok(());
        }

        let closed = self.window.close();

        match (
            closed.previous_violation_count.is_zero(),
            closed.violation_count.is_zero(),
        ) {
            (true, false) => self.tally.enter(),
            (false, true) => self.tally.leave(),
            _ => {}
        }

        Event::CloseWindow(CloseWindowEvent {
            timestamp: self.now(),
            switch: self.config.id,
            controllers: closed.controllers.clone(),
            violation_count: closed.violation_count,
        })
        .publish(&self.event_publisher);

        if closed.report_due {
            let report = self.report_violation(closed.controllers, closed.violation_count);
            if self.config.violation_policy == ViolationPolicy::Halt {
                self.halted = true;
            } else {
                self.rearm();
            }
            return Err(SwitchError::ControlPlaneViolation(report));
        }

        self.rearm();
        Ok(())
    }

    /// Announce that `controllers` kept contacting this switch for `violation_count` consecutive
    /// windows.
    pub fn report_violation(
        &mut self,
        controllers: BTreeSet<ControllerID>,
        violation_count: ViolationCount,
    ) -> ViolationReport {
        let report = ViolationReport {
            switch: self.config.id,
            controllers,
            violation_count,
            time: self.now(),
        };
        log::error!(
            "control plane violation at switch {}: {} controllers for {} windows",
            report.switch,
            report.controllers.len(),
            report.violation_count
        );
        Event::ReportViolation(ReportViolationEvent {
            timestamp: report.time,
            report: report.clone(),
        })
        .publish(&self.event_publisher);
        report
    }

    pub fn id(&self) -> SwitchID {
        self.config.id
    }

    pub fn violation_count(&self) -> ViolationCount {
        self.window.violation_count()
    }

    /// The distinct controllers seen in the last closed window.
    pub fn previous_controllers(&self) -> &BTreeSet<ControllerID> {
        self.window.previous_controllers()
    }

    /// The distinct controllers seen so far in the in-progress window.
    pub fn current_controllers(&self) -> BTreeSet<ControllerID> {
        self.window.current_controllers()
    }

    /// Whether the switch has left the protocol after a report under [`ViolationPolicy::Halt`].
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    fn echo(&mut self, msg: SwitchMessage, from: Endpoint) -> Result<(), SwitchError> {
        let reply_to = Endpoint::new(*from.ip(), msg.respond_port);
        if !self.reply_channels.contains(&reply_to) {
            self.sender.connect(reply_to)?;
            self.reply_channels.insert(reply_to);
        }
        let reply = SwitchMessage {
            sender: msg.sender,
            respond_port: self.config.port,
        };
        self.sender.send(reply_to, &reply)?;
        Ok(())
    }

    fn rearm(&mut self) {
        self.scheduler
            .schedule_after(self.config.window_duration, Timer::UpdateWindow)
    }

    fn now(&self) -> Timestamp {
        Timestamp::from_elapsed(self.scheduler.now())
    }
}

/// Enumerates the ways a [`Switch`] call can fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwitchError {
    /// See: [`ConfigError`].
    ConfigError(ConfigError),

    /// See: [`TransportError`].
    TransportError(TransportError),

    /// See: [`DecodeError`].
    DecodeError(DecodeError),

    /// The same set of several controllers kept contacting the switch for at least
    /// `max_violation_count` consecutive windows. This is an unrecoverable control plane fault.
    ControlPlaneViolation(ViolationReport),
}

impl From<ConfigError> for SwitchError {
    fn from(value: ConfigError) -> Self {
        SwitchError::ConfigError(value)
    }
}

impl From<TransportError> for SwitchError {
    fn from(value: TransportError) -> Self {
        SwitchError::TransportError(value)
    }
}

impl From<DecodeError> for SwitchError {
    fn from(value: DecodeError) -> Self {
        SwitchError::DecodeError(value)
    }
}

impl Display for SwitchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            SwitchError::ConfigError(err) => write!(f, "invalid switch configuration: {}", err),
            SwitchError::TransportError(err) => write!(f, "transport error: {}", err),
            SwitchError::DecodeError(err) => write!(f, "decode error: {}", err),
            SwitchError::ControlPlaneViolation(report) => write!(
                f,
                "control plane violation at switch {} after {} windows",
                report.switch, report.violation_count
            ),
        }
    }
}

impl Error for SwitchError {}
