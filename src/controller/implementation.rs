/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Event-driven implementation of the leader election engine.
//!
//! Main type: [`Controller`].

use std::{
    error::Error,
    fmt::{self, Display, Formatter},
    sync::mpsc::Sender,
};

use crate::{
    config::{ConfigError, ControllerConfiguration},
    events::{
        BufferMessageEvent, DiscardMessageEvent, DiscardReason, Event, PingControllersEvent,
        PingSwitchesEvent, ReachMaxEpochEvent, ReceiveControlMessageEvent, SelectLeaderEvent,
    },
    messages::{ControlMessage, DecodeError, WireMessage},
    networking::{
        sending::SenderHandle,
        transport::{Endpoint, Transport, TransportError},
    },
    scheduling::{Scheduler, Timer},
    types::data_types::{ControllerID, Epoch, Timestamp},
};

use super::{
    ping_driver::SwitchPingDriver,
    types::{BufferInsertion, EpochMessageBuffer, LeaderCandidates},
};

/// A single controller taking part in leader election.
///
/// # Usage
///
/// After creating a `Controller` with [`new`](Self::new), the host interacts with it by calling three
/// methods:
/// 1. [`initialize`](Self::initialize), once the controller should start, to bind its port, open its
///    channels, and arm its two periodic processes.
/// 2. [`on_receive`](Self::on_receive), whenever bytes arrive on the controller's port.
/// 3. [`on_timer`](Self::on_timer), whenever a timer the controller armed through its [`Scheduler`]
///    fires.
///
/// Both periodic processes re-arm themselves until the controller's epoch passes its `max_epoch`.
pub struct Controller<T: Transport, S: Scheduler> {
    config: ControllerConfiguration,
    state: ControllerState,
    sender: SenderHandle<T>,
    scheduler: S,
    ping_driver: SwitchPingDriver,
    event_publisher: Option<Sender<Event>>,
}

/// The mutable part of a controller, owned exclusively by it.
struct ControllerState {
    leader: ControllerID,
    epoch: Epoch,
    candidates: LeaderCandidates,
    buffer: EpochMessageBuffer,
    // Set once the port is bound, so that a retried `initialize` does not bind it again.
    bound: bool,
    started: bool,
    terminated: bool,
}

impl<T: Transport, S: Scheduler> Controller<T, S> {
    /// Create a new `Controller` after checking that `config` is valid. The controller starts out as its
    /// own leader in epoch 0, and does nothing until it is [initialized](Self::initialize).
    pub fn new(
        config: ControllerConfiguration,
        transport: T,
        scheduler: S,
        event_publisher: Option<Sender<Event>>,
    ) -> Result<Self, ControllerError> {
        config.validate()?;
        let state = ControllerState {
            leader: config.id,
            epoch: Epoch::init(),
            candidates: LeaderCandidates::new(),
            buffer: EpochMessageBuffer::new(config.msg_buffer_capacity),
            bound: false,
            started: false,
            terminated: false,
        };
        let ping_driver = SwitchPingDriver::new(config.peer_switches.clone(), config.port);
        Ok(Self {
            config,
            state,
            sender: SenderHandle::new(transport),
            scheduler,
            ping_driver,
            event_publisher,
        })
    }

    /// Bind the controller's port, open one channel per peer controller and per switch, then schedule the
    /// first [`ping_switches`](Self::ping_switches) and the first
    /// [`ping_controllers`](Self::ping_controllers) after their respective intervals.
    ///
    /// Calling this again after a successful call does nothing. After a failed call, it can be called
    /// again: the port is not bound twice, and channels already open are opened again.
    pub fn initialize(&mut self) -> Result<(), ControllerError> {
        if self.state.started {
            return Ok(());
        }

        if !self.state.bound {
            self.sender.bind(self.config.port)?;
            self.state.bound = true;
        }
        for peer in self
            .config
            .peer_controllers
            .iter()
            .chain(self.config.peer_switches.iter())
        {
            self.sender.connect(*peer)?;
        }

        self.scheduler
            .schedule_after(self.config.ping_switches_interval, Timer::PingSwitches);
        self.scheduler
            .schedule_after(self.config.ping_controllers_interval, Timer::PingControllers);
        self.state.started = true;

        log::debug!(
            "controller {} listening on port {} with {} peer controllers and {} switches",
            self.config.id,
            self.config.port,
            self.config.peer_controllers.len(),
            self.ping_driver.switch_count()
        );
        Ok(())
    }

    /// Dispatch a timer that this controller armed.
    pub fn on_timer(&mut self, timer: Timer) -> Result<(), ControllerError> {
        match timer {
            Timer::PingControllers => self.ping_controllers(),
            Timer::PingSwitches => self.ping_switches(),
            Timer::UpdateWindow => {
                log::warn!("controller {} ignoring switch timer {:?}", self.config.id, timer);
                Ok(())
            }
        }
    }

    /// Resolve the leader of the current epoch, enter the next epoch, and tell every peer controller about
    /// it. Re-arms itself.
    ///
    /// If the current epoch is past `max_epoch`, the controller instead stops for good and asks the host to
    /// end the run.
    ///
    /// Sends are never retried. If some of them fail, the round still completes and the failures are
    /// returned as [`ControllerError::SendFailures`].
    pub fn ping_controllers(&mut self) -> Result<(), ControllerError> {
        if self.state.terminated {
            return Ok(());
        }
        if self.state.epoch > self.config.max_epoch {
            self.state.terminated = true;
            log::info!(
                "controller {} passed max epoch {} with leader {}",
                self.config.id,
                self.config.max_epoch,
                self.state.leader
            );
            Event::ReachMaxEpoch(ReachMaxEpochEvent {
                timestamp: self.now(),
                controller: self.config.id,
                epoch: self.state.epoch,
            })
            .publish(&self.event_publisher);
            self.scheduler.stop();
            return Ok(());
        }

        self.select_leader();
        self.state.epoch += 1;

        let msg = ControlMessage {
            sender: self.config.id,
            leader: self.state.leader,
            respond_port: self.config.port,
            epoch: self.state.epoch,
            time_sent: self.now(),
        };
        let failures = self.sender.multicast(&self.config.peer_controllers, &msg);

        Event::PingControllers(PingControllersEvent {
            timestamp: msg.time_sent,
            controller: self.config.id,
            leader: self.state.leader,
            epoch: self.state.epoch,
            peers_reached: self.config.peer_controllers.len() - failures.len(),
            peers_failed: failures.len(),
        })
        .publish(&self.event_publisher);

        self.scheduler
            .schedule_after(self.config.ping_controllers_interval, Timer::PingControllers);

        if failures.is_empty() {
            Ok(())
        } else {
            Err(ControllerError::SendFailures(failures))
        }
    }

    /// If this controller is its own leader, ping every switch. Re-arms itself until the controller's epoch
    /// passes `max_epoch`, after which it does nothing.
    pub fn ping_switches(&mut self) -> Result<(), ControllerError> {
        if self.state.terminated || self.state.epoch > self.config.max_epoch {
            return Ok(());
        }

        let failures = if self.is_leader() {
            let failures = self.ping_driver.ping_all(&mut self.sender, self.config.id);
            Event::PingSwitches(PingSwitchesEvent {
                timestamp: self.now(),
                controller: self.config.id,
                switches_reached: self.ping_driver.switch_count() - failures.len(),
                switches_failed: failures.len(),
            })
            .publish(&self.event_publisher);
            failures
        } else {
            Vec::new()
        };

        self.scheduler
            .schedule_after(self.config.ping_switches_interval, Timer::PingSwitches);

        if failures.is_empty() {
            Ok(())
        } else {
            Err(ControllerError::SendFailures(failures))
        }
    }

    /// Handle bytes delivered to the controller's port.
    ///
    /// Only bytes from the address of a peer controller are considered. Anything else, including the echoes
    /// sent back by switches, is ignored. Bytes that do not decode into a [`ControlMessage`] are dropped and
    /// the [`DecodeError`] returned.
    pub fn on_receive(&mut self, bytes: &[u8], from: Endpoint) -> Result<(), ControllerError> {
        let from_peer_controller = self
            .config
            .peer_controllers
            .iter()
            .any(|peer| peer.ip() == from.ip());
        if !from_peer_controller {
            log::trace!("controller {} ignoring bytes from {}", self.config.id, from);
            return Ok(());
        }

        let msg = ControlMessage::decode(bytes).map_err(|err| {
            log::warn!("controller {} dropped message from {}: {}", self.config.id, from, err);
            err
        })?;
        self.handle_controller_read(msg, from);
        Ok(())
    }

    /// Sort a message from a peer controller by its epoch:
    /// - From this controller itself: discarded.
    /// - Current epoch: its sender becomes a leader candidate.
    /// - Future epoch: buffered until the controller reaches that epoch.
    /// - Past epoch: discarded as stale.
    pub fn handle_controller_read(&mut self, msg: ControlMessage, origin: Endpoint) {
        if msg.sender == self.config.id {
            self.discard(msg, DiscardReason::SelfOriginated);
        } else if msg.epoch == self.state.epoch {
            log::trace!(
                "controller {} accepted candidate {} for epoch {}",
                self.config.id,
                msg.sender,
                msg.epoch
            );
            self.state.candidates.insert(msg.sender);
            Event::ReceiveControlMessage(ReceiveControlMessageEvent {
                timestamp: self.now(),
                controller: self.config.id,
                origin,
                message: msg,
            })
            .publish(&self.event_publisher);
        } else if msg.epoch > self.state.epoch {
            match self.state.buffer.insert(msg) {
                BufferInsertion::Inserted => self.buffered(msg),
                BufferInsertion::InsertedEvicting(evicted) => {
                    self.buffered(msg);
                    self.discard(evicted, DiscardReason::BufferFull);
                }
                BufferInsertion::Rejected => self.discard(msg, DiscardReason::BufferFull),
            }
        } else {
            self.discard(msg, DiscardReason::Stale);
        }
    }

    /// Resolve the leader of the current epoch as the highest ID among this controller and every peer heard
    /// from in the current epoch, including messages buffered earlier for it. Clears the candidates.
    pub fn select_leader(&mut self) {
        let epoch = self.state.epoch;
        self.state.buffer.remove_expired_msgs(epoch);
        for msg in self.state.buffer.take_epoch(epoch) {
            self.state.candidates.insert(msg.sender);
        }
        self.state.candidates.insert(self.config.id);

        let previous_leader = self.state.leader;
        // Never empty: this controller was just inserted.
        let leader = self.state.candidates.highest().unwrap_or(self.config.id);
        self.state.leader = leader;
        let candidates = self.state.candidates.take();

        if previous_leader != leader {
            log::debug!(
                "controller {} changed leader from {} to {} in epoch {}",
                self.config.id,
                previous_leader,
                leader,
                epoch
            );
        }

        Event::SelectLeader(SelectLeaderEvent {
            timestamp: self.now(),
            controller: self.config.id,
            epoch,
            previous_leader,
            leader,
            candidates,
        })
        .publish(&self.event_publisher);
    }

    pub fn id(&self) -> ControllerID {
        self.config.id
    }

    pub fn leader(&self) -> ControllerID {
        self.state.leader
    }

    pub fn epoch(&self) -> Epoch {
        self.state.epoch
    }

    pub fn is_leader(&self) -> bool {
        self.state.leader == self.config.id
    }

    /// Whether the controller has passed `max_epoch` and stopped taking part in the election.
    pub fn is_terminated(&self) -> bool {
        self.state.terminated
    }

    /// The peers heard from so far in the current epoch.
    pub fn leader_candidates(&self) -> &LeaderCandidates {
        &self.state.candidates
    }

    /// The number of future-epoch messages waiting in the buffer.
    pub fn buffered_messages(&self) -> u64 {
        self.state.buffer.len()
    }

    fn buffered(&self, msg: ControlMessage) {
        log::debug!(
            "controller {} in epoch {} buffered message from {} for epoch {}",
            self.config.id,
            self.state.epoch,
            msg.sender,
            msg.epoch
        );
        Event::BufferMessage(BufferMessageEvent {
            timestamp: self.now(),
            controller: self.config.id,
            message: msg,
        })
        .publish(&self.event_publisher);
    }

    fn discard(&self, msg: ControlMessage, reason: DiscardReason) {
        log::debug!(
            "controller {} in epoch {} discarded message from {} for epoch {}: {:?}",
            self.config.id,
            self.state.epoch,
            msg.sender,
            msg.epoch,
            reason
        );
        Event::DiscardMessage(DiscardMessageEvent {
            timestamp: self.now(),
            controller: self.config.id,
            message: msg,
            reason,
        })
        .publish(&self.event_publisher);
    }

    fn now(&self) -> Timestamp {
        Timestamp::from_elapsed(self.scheduler.now())
    }
}

/// Enumerates the ways a [`Controller`] call can fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerError {
    /// See: [`ConfigError`].
    ConfigError(ConfigError),

    /// See: [`TransportError`].
    TransportError(TransportError),

    /// See: [`DecodeError`].
    DecodeError(DecodeError),

    /// Some sends of a ping round failed. The round itself completed.
    SendFailures(Vec<(Endpoint, TransportError)>),
}

impl From<ConfigError> for ControllerError {
    fn from(value: ConfigError) -> Self {
        ControllerError::ConfigError(value)
    }
}

impl From<TransportError> for ControllerError {
    fn from(value: TransportError) -> Self {
        ControllerError::TransportError(value)
    }
}

impl From<DecodeError> for ControllerError {
    fn from(value: DecodeError) -> Self {
        ControllerError::DecodeError(value)
    }
}

impl Display for ControllerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ControllerError::ConfigError(err) => {
                write!(f, "invalid controller configuration: {}", err)
            }
            ControllerError::TransportError(err) => write!(f, "transport error: {}", err),
            ControllerError::DecodeError(err) => write!(f, "decode error: {}", err),
            ControllerError::SendFailures(failures) => {
                write!(f, "{} sends failed", failures.len())
            }
        }
    }
}

impl Error for ControllerError {}
