/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Epoch-driven leader election among the controllers of a control plane.
//!
//! # Epochs
//!
//! Every controller runs the election in rounds called **epochs**. A controller's epoch starts at 0 and
//! goes up by exactly 1 every time its [`ping_controllers`](Controller::ping_controllers) timer fires.
//! Controllers do not synchronize their epochs with each other; they only start at the same time and
//! tick at the same period, which in practice keeps their epochs close together.
//!
//! In each round, a controller:
//! 1. [Selects the leader](Controller::select_leader) of the epoch it is about to leave: the numerically
//!    highest ID among itself and every peer controller it heard from in that epoch.
//! 2. Enters the next epoch.
//! 3. Sends a [`ControlMessage`](crate::messages::ControlMessage) carrying its ID, its leader, and its new
//!    epoch to every peer controller.
//!
//! A received message counts towards the epoch it names. Messages for the receiver's current epoch
//! make their sender a leader candidate straight away. Messages for later epochs are buffered until the
//! receiver gets there. Messages for earlier epochs are stale and discarded.
//!
//! There is no quorum. A controller that has not heard from a peer in an epoch simply does not count
//! that peer, so different controllers may briefly disagree on the leader until messages converge.
//!
//! # Pinging switches
//!
//! On a separate timer, every controller that currently believes itself leader pings each of its switches
//! with a [`SwitchMessage`](crate::messages::SwitchMessage). During disagreement several controllers do
//! so at once, which is what the [switches](crate::switch) watch for.
//!
//! # Termination
//!
//! Once a controller's epoch passes its configured `max_epoch`, it stops both timers and asks the host to
//! end the run through [`Scheduler::stop`](crate::scheduling::Scheduler::stop). This is a clean shutdown,
//! not an error.

pub(crate) mod implementation;

pub(crate) mod ping_driver;

pub mod types;

pub use implementation::{Controller, ControllerError};
