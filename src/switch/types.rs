/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Definitions of types specific to the [switch](super) violation detector.

use std::collections::BTreeSet;

use crate::types::data_types::{ControllerID, SwitchID, Timestamp, ViolationCount};

/// What a switch does once its violation count reaches the configured threshold.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ViolationPolicy {
    /// Report when the count first reaches the threshold, then keep monitoring. The switch reports
    /// again only after the count has fallen below the threshold and climbed back up.
    #[default]
    ReportOnceAndContinue,

    /// Report at the end of every window whose count is at or above the threshold.
    ReportEveryWindow,

    /// Report once, then stop closing windows and ignore every further ping.
    Halt,
}

/// How a switch decides that two consecutive windows were contacted by the same controllers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StabilityCheck {
    /// The deduplicated controller sets of both windows are equal.
    #[default]
    SetEquality,

    /// The union of both windows adds nothing to the previous window, i.e., the current set is a
    /// subset of the previous one.
    UnionSubset,
}

impl StabilityCheck {
    /// Returns whether a window that saw `current` continues the suspicious streak of a window that
    /// saw `previous`.
    pub fn is_stable(
        &self,
        current: &BTreeSet<ControllerID>,
        previous: &BTreeSet<ControllerID>,
    ) -> bool {
        match self {
            StabilityCheck::SetEquality => current == previous,
            StabilityCheck::UnionSubset => {
                let union: BTreeSet<ControllerID> = current.union(previous).copied().collect();
                union == *previous
            }
        }
    }
}

/// A switch's account of a control plane violation: the controllers that kept contacting it, and for
/// how many consecutive windows.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ViolationReport {
    pub switch: SwitchID,
    pub controllers: BTreeSet<ControllerID>,
    pub violation_count: ViolationCount,
    pub time: Timestamp,
}
