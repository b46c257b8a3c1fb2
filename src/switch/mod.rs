/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Switch-side detection of control plane split-brain.
//!
//! # Idea
//!
//! Exactly one controller should be pinging a switch at any time: the one that the controllers have
//! elected as leader. While the [leader election](crate::controller) is converging it is normal for a
//! switch to briefly hear from two controllers that both believe themselves leader. It is not normal
//! for this to go on.
//!
//! A switch therefore divides time into fixed-length **windows**, and records the ID of every controller
//! that pings it during the in-progress window. When a window closes, the switch looks at the distinct
//! controllers it saw:
//! - At most one controller: all is well. The violation count drops back to 0.
//! - Several controllers, and the window is *stable* with respect to the previous one (by default: the
//!   same set of controllers, see [`StabilityCheck`](types::StabilityCheck)): the violation count goes
//!   up by 1.
//! - Several controllers, but a different set than before: the violation count restarts at 1.
//!
//! Once the count reaches `max_violation_count`, the switch [reports a
//! violation](Switch::report_violation). A report is a fatal fault, not a retryable condition: it is
//! handed to the host as [`SwitchError::ControlPlaneViolation`], and the host decides whether the run
//! ends. What the switch itself does after reporting is set by its
//! [`ViolationPolicy`](types::ViolationPolicy).
//!
//! # Aggregate
//!
//! Every switch of a control plane shares one [`ViolationTally`], which counts the switches whose
//! violation count is currently non-zero.

pub(crate) mod implementation;

pub mod tally;

pub mod types;

pub(crate) mod window;

pub use implementation::{Switch, SwitchError};

pub use tally::ViolationTally;
