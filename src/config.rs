/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! User-defined parameters of controllers and switches.
//!
//! Both configurations are constructed with the builder pattern, for example:
//!
//! ```ignore
//! let configuration =
//!     ControllerConfiguration::builder()
//!     .id(ControllerID::new(1))
//!     .port(DEFAULT_CONTROLLER_PORT)
//!     .peer_controllers(vec![peer])
//!     .peer_switches(switches)
//!     .ping_controllers_interval(DEFAULT_PING_CONTROLLERS_INTERVAL)
//!     .ping_switches_interval(DEFAULT_PING_SWITCHES_INTERVAL)
//!     .max_epoch(Epoch::new(DEFAULT_MAX_EPOCH))
//!     .build()
//! ```
//!
//! Peer addresses are fixed at construction and never change while the protocol runs.

use std::{
    error::Error,
    fmt::{self, Display, Formatter},
    time::Duration,
};

use typed_builder::TypedBuilder;

use crate::{
    networking::transport::Endpoint,
    switch::types::{StabilityCheck, ViolationPolicy},
    types::data_types::{BufferSize, ControllerID, Epoch, SwitchID, ViolationCount},
};

pub const DEFAULT_CONTROLLER_PORT: u16 = 2244;
pub const DEFAULT_SWITCH_PORT: u16 = 3355;
pub const DEFAULT_PING_CONTROLLERS_INTERVAL: Duration = Duration::from_millis(100);
pub const DEFAULT_PING_SWITCHES_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_WINDOW_DURATION: Duration = DEFAULT_PING_SWITCHES_INTERVAL;
pub const DEFAULT_MAX_VIOLATION_COUNT: u8 = 3;
pub const DEFAULT_MAX_EPOCH: u32 = 80;
pub const DEFAULT_MSG_BUFFER_CAPACITY: u64 = 1024;

/// Stores the parameters of a [`Controller`](crate::controller::Controller):
/// 1. Its ID, which must be unique among all controllers.
/// 2. The port on which it receives messages.
/// 3. The addresses of its peer controllers and of the switches it owns.
/// 4. The periods of its two periodic processes.
/// 5. The epoch after which it stops taking part in the election and ends the run.
/// 6. The maximum number of future-epoch messages it keeps buffered.
#[derive(Clone, Debug, TypedBuilder)]
#[builder(builder_method(doc = "
    Create a builder for building a [ControllerConfiguration]. On the builder call the following methods to construct a valid [ControllerConfiguration].

    Required:
    - `.id(...)`
    - `.port(...)`
    - `.peer_controllers(...)`
    - `.peer_switches(...)`
    - `.ping_controllers_interval(...)`
    - `.ping_switches_interval(...)`
    - `.max_epoch(...)`

    Optional:
    - `.msg_buffer_capacity(...)`
"))]
pub struct ControllerConfiguration {
    #[builder(setter(doc = "Set the controller's ID. Required."))]
    pub id: ControllerID,
    #[builder(setter(doc = "Set the port the controller listens on. Required."))]
    pub port: u16,
    #[builder(setter(doc = "Set the addresses of the peer controllers. Required."))]
    pub peer_controllers: Vec<Endpoint>,
    #[builder(setter(doc = "Set the addresses of the switches this controller pings when it is the leader. Required."))]
    pub peer_switches: Vec<Endpoint>,
    #[builder(setter(doc = "Set the period of pinging peer controllers, i.e., the length of an epoch. Required."))]
    pub ping_controllers_interval: Duration,
    #[builder(setter(doc = "Set the period of pinging switches. Required."))]
    pub ping_switches_interval: Duration,
    #[builder(setter(doc = "Set the last epoch in which the controller pings its peers. Required."))]
    pub max_epoch: Epoch,
    #[builder(
        default = BufferSize::new(DEFAULT_MSG_BUFFER_CAPACITY),
        setter(doc = "Set the maximum number of future-epoch messages kept in the buffer. Optional.")
    )]
    pub msg_buffer_capacity: BufferSize,
}

impl ControllerConfiguration {
    /// Check that both periods are positive and that `max_epoch` can be passed.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ping_controllers_interval.is_zero() {
            return Err(ConfigError::ZeroDuration {
                parameter: "ping_controllers_interval",
            });
        }
        if self.ping_switches_interval.is_zero() {
            return Err(ConfigError::ZeroDuration {
                parameter: "ping_switches_interval",
            });
        }
        if self.max_epoch.int() == u32::MAX {
            return Err(ConfigError::MaxEpochUnreachable);
        }
        Ok(())
    }
}

/// Stores the parameters of a [`Switch`](crate::switch::Switch):
/// 1. Its ID.
/// 2. The port on which it receives pings.
/// 3. The duration of each observation window.
/// 4. The number of consecutive suspicious windows after which it reports a violation.
/// 5. What it does after reporting, and how it compares consecutive windows.
/// 6. Whether it replies to pings.
#[derive(Clone, Debug, TypedBuilder)]
#[builder(builder_method(doc = "
    Create a builder for building a [SwitchConfiguration]. On the builder call the following methods to construct a valid [SwitchConfiguration].

    Required:
    - `.id(...)`
    - `.port(...)`
    - `.window_duration(...)`
    - `.max_violation_count(...)`

    Optional:
    - `.violation_policy(...)`
    - `.stability_check(...)`
    - `.echo_responses(...)`
"))]
pub struct SwitchConfiguration {
    #[builder(setter(doc = "Set the switch's ID. Required."))]
    pub id: SwitchID,
    #[builder(setter(doc = "Set the port the switch listens on. Required."))]
    pub port: u16,
    #[builder(setter(doc = "Set the duration of each observation window. Required."))]
    pub window_duration: Duration,
    #[builder(setter(doc = "Set the number of consecutive suspicious windows that triggers a violation report. Required."))]
    pub max_violation_count: ViolationCount,
    #[builder(
        default,
        setter(doc = "Set what the switch does once it has reported a violation. Optional.")
    )]
    pub violation_policy: ViolationPolicy,
    #[builder(
        default,
        setter(doc = "Set how the switch decides that two consecutive windows saw the same controllers. Optional.")
    )]
    pub stability_check: StabilityCheck,
    #[builder(
        default = true,
        setter(doc = "Set whether the switch replies to pings on the port they name. Optional.")
    )]
    pub echo_responses: bool,
}

impl SwitchConfiguration {
    /// Check that the window is positive and that the violation threshold is at least 1.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_duration.is_zero() {
            return Err(ConfigError::ZeroDuration {
                parameter: "window_duration",
            });
        }
        if self.max_violation_count.is_zero() {
            return Err(ConfigError::ZeroViolationThreshold);
        }
        Ok(())
    }
}

/// Enumerates the ways a configuration can be invalid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// A period or window duration is zero.
    ZeroDuration { parameter: &'static str },

    /// `max_violation_count` is zero, which would report a violation on every window.
    ZeroViolationThreshold,

    /// `max_epoch` is `u32::MAX`, so no epoch can ever pass it.
    MaxEpochUnreachable,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ZeroDuration { parameter } => {
                write!(f, "{} must be a positive duration", parameter)
            }
            ConfigError::ZeroViolationThreshold => {
                write!(f, "max_violation_count must be at least 1")
            }
            ConfigError::MaxEpochUnreachable => {
                write!(f, "max_epoch must be lower than {}", u32::MAX)
            }
        }
    }
}

impl Error for ConfigError {}
