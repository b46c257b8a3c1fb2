/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! [Trait definition](Scheduler) for the host's virtual clock and timer facility.
//!
//! Every periodic process in the control plane re-arms itself: a handler runs, then asks the
//! [`Scheduler`] to fire the same [`Timer`] again after its period. Stopping a process is done by
//! not re-arming it, so no cancellation primitive is needed.

use std::time::Duration;

/// The periodic processes that a node can arm.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Timer {
    /// Fires [`Controller::ping_controllers`](crate::controller::Controller::ping_controllers).
    PingControllers,

    /// Fires [`Controller::ping_switches`](crate::controller::Controller::ping_switches).
    PingSwitches,

    /// Fires [`Switch::update_window`](crate::switch::Switch::update_window).
    UpdateWindow,
}

/// A node's handle on the host's event scheduler.
pub trait Scheduler {
    /// Get the current virtual time, measured from the start of the run.
    fn now(&self) -> Duration;

    /// Ask the host to hand `timer` back to this node once, at virtual time `now() + delay`.
    fn schedule_after(&mut self, delay: Duration, timer: Timer);

    /// Ask the host to end the run.
    fn stop(&mut self);
}
