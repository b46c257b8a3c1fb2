/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! A deterministic, single-threaded, discrete-event host for controllers and switches.
//!
//! The [`Simulation`] owns a virtual clock, a time-ordered queue of pending events, and every node. Nodes
//! reach the network and the clock through a [`SimHandle`], which implements both
//! [`Transport`](crate::networking::transport::Transport) and
//! [`Scheduler`](crate::scheduling::Scheduler). Each callback into a node runs to completion before the
//! next event is taken from the queue, and events of the same virtual time run in the order they were
//! scheduled, so a run is fully determined by its configuration and its seed.
//!
//! ## Usage
//!
//! ```ignore
//! let mut simulation = Simulation::new(SimulationConfiguration::builder().build())?;
//! let installed = simulation.install(&ControlPlaneLayout::builder().controllers(4).switches(2).build())?;
//! simulation.partition_at(
//!     Duration::from_millis(500),
//!     &installed.controller_addresses()[3..],
//!     &installed.controller_addresses()[..3],
//! );
//! let outcome = simulation.run();
//! ```

use std::{
    error::Error,
    fmt::{self, Display, Formatter},
    net::Ipv4Addr,
    time::Duration,
};

use typed_builder::TypedBuilder;

use crate::{
    controller::ControllerError,
    switch::{types::ViolationReport, SwitchError},
};

pub(crate) mod event_queue;

pub mod host;

pub mod layout;

pub mod network;

pub use host::Simulation;

pub use layout::{ControlPlaneLayout, InstalledControlPlane};

pub use network::{NetworkStats, SimHandle};

pub const DEFAULT_LINK_DELAY: Duration = Duration::from_millis(2);

/// Stores the parameters of a [`Simulation`]:
/// 1. How long datagrams take to cross a link, and how often they are lost.
/// 2. The seed of the random number generator behind losses and jitter.
/// 3. When the run ends.
/// 4. Whether protocol events are logged.
#[derive(Clone, Debug, TypedBuilder)]
#[builder(builder_method(doc = "
    Create a builder for building a [SimulationConfiguration]. On the builder call the following methods to construct a valid [SimulationConfiguration].

    Optional:
    - `.link_delay(...)`
    - `.max_jitter(...)`
    - `.drop_probability(...)`
    - `.seed(...)`
    - `.until(...)`
    - `.abort_on_violation(...)`
    - `.log_events(...)`
"))]
pub struct SimulationConfiguration {
    #[builder(default = DEFAULT_LINK_DELAY, setter(doc = "Set the time every datagram takes to cross a link. Optional."))]
    pub link_delay: Duration,
    #[builder(default, setter(doc = "Set the upper bound of the uniformly random delay added to every datagram. Optional."))]
    pub max_jitter: Duration,
    #[builder(default, setter(doc = "Set the probability, between 0 and 1, that a datagram is lost. Optional."))]
    pub drop_probability: f64,
    #[builder(default, setter(doc = "Set the seed of the random number generator. Optional."))]
    pub seed: u64,
    #[builder(default, setter(strip_option, doc = "Set the virtual time after which the run ends. Optional."))]
    pub until: Option<Duration>,
    #[builder(default, setter(doc = "Set whether the first control plane violation ends the run. Optional."))]
    pub abort_on_violation: bool,
    #[builder(default, setter(doc = "Set whether protocol events are logged. Optional."))]
    pub log_events: bool,
}

impl SimulationConfiguration {
    pub fn validate(&self) -> Result<(), SimulationError> {
        if !(0.0..=1.0).contains(&self.drop_probability) {
            return Err(SimulationError::InvalidDropProbability(self.drop_probability));
        }
        Ok(())
    }
}

/// How a run of a [`Simulation`] went.
#[derive(Clone, Debug, PartialEq)]
pub struct SimulationOutcome {
    /// The virtual time of the last event handled.
    pub end_time: Duration,
    pub end_reason: EndReason,
    /// Every violation reported during the run, in the order they were reported.
    pub violations: Vec<ViolationReport>,
    /// The number of switches whose violation count was non-zero when the run ended.
    pub switches_in_violation: u32,
}

/// Why a run of a [`Simulation`] ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EndReason {
    /// A node asked to stop: a controller went past its maximum epoch.
    Stopped,

    /// No events were left.
    Idle,

    /// The next event was due after the configured time limit.
    TimeLimit,

    /// A switch reported a violation and the configuration asks to abort on violations.
    ControlPlaneViolation(ViolationReport),
}

/// Enumerates the ways setting up a [`Simulation`] can fail.
#[derive(Debug, Clone, PartialEq)]
pub enum SimulationError {
    /// The drop probability is not between 0 and 1.
    InvalidDropProbability(f64),

    /// Another node already owns the address.
    DuplicateAddress(Ipv4Addr),

    /// See: [`ControllerError`].
    ControllerError(ControllerError),

    /// See: [`SwitchError`].
    SwitchError(SwitchError),
}

impl From<ControllerError> for SimulationError {
    fn from(value: ControllerError) -> Self {
        SimulationError::ControllerError(value)
    }
}

impl From<SwitchError> for SimulationError {
    fn from(value: SwitchError) -> Self {
        SimulationError::SwitchError(value)
    }
}

impl Display for SimulationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            SimulationError::InvalidDropProbability(p) => {
                write!(f, "drop probability {} is not between 0 and 1", p)
            }
            SimulationError::DuplicateAddress(address) => {
                write!(f, "address {} is already in use", address)
            }
            SimulationError::ControllerError(err) => write!(f, "controller error: {}", err),
            SimulationError::SwitchError(err) => write!(f, "switch error: {}", err),
        }
    }
}

impl Error for SimulationError {}
