/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The sliding-window state machine at the heart of the violation detector.
//!
//! [`ViolationWindow`] holds no handles on the network or the clock. The [`Switch`](super::Switch)
//! feeds it controller IDs as pings arrive and closes it on every window timer.

use std::collections::BTreeSet;

use crate::types::data_types::{ControllerID, ViolationCount};

use super::types::{StabilityCheck, ViolationPolicy};

pub(crate) struct ViolationWindow {
    // Kept in arrival order. Deduplicated when the window closes.
    current_controllers: Vec<ControllerID>,
    previous_controllers: BTreeSet<ControllerID>,
    violation_count: ViolationCount,
    max_violation_count: ViolationCount,
    stability_check: StabilityCheck,
    violation_policy: ViolationPolicy,
    reported: bool,
}

/// What happened when a window was closed.
pub(crate) struct ClosedWindow {
    pub(crate) controllers: BTreeSet<ControllerID>,
    pub(crate) previous_violation_count: ViolationCount,
    pub(crate) violation_count: ViolationCount,
    pub(crate) report_due: bool,
}

impl ViolationWindow {
    pub(crate) fn new(
        max_violation_count: ViolationCount,
        stability_check: StabilityCheck,
        violation_policy: ViolationPolicy,
    ) -> Self {
        Self {
            current_controllers: Vec::new(),
            previous_controllers: BTreeSet::new(),
            violation_count: ViolationCount::default(),
            max_violation_count,
            stability_check,
            violation_policy,
            reported: false,
        }
    }

    pub(crate) fn record(&mut self, controller: ControllerID) {
        self.current_controllers.push(controller)
    }

    /// Close the in-progress window, update the violation count, and start a new, empty window.
    pub(crate) fn close(&mut self) -> ClosedWindow {
        let controllers: BTreeSet<ControllerID> = self.current_controllers.drain(..).collect();
        let previous_violation_count = self.violation_count;

        self.violation_count = if controllers.len() > 1 {
            if self
                .stability_check
                .is_stable(&controllers, &self.previous_controllers)
            {
                self.violation_count.incremented()
            } else {
                ViolationCount::new(1)
            }
        } else {
            ViolationCount::new(0)
        };
        self.previous_controllers = controllers.clone();

        let at_threshold = self.violation_count >= self.max_violation_count;
        let report_due = match self.violation_policy {
            ViolationPolicy::ReportEveryWindow => at_threshold,
            ViolationPolicy::ReportOnceAndContinue | ViolationPolicy::Halt => {
                at_threshold && !self.reported
            }
        };
        if report_due {
            self.reported = true;
        } else if !at_threshold {
            self.reported = false;
        }

        ClosedWindow {
            controllers,
            previous_violation_count,
            violation_count: self.violation_count,
            report_due,
        }
    }

    pub(crate) fn violation_count(&self) -> ViolationCount {
        self.violation_count
    }

    pub(crate) fn previous_controllers(&self) -> &BTreeSet<ControllerID> {
        &self.previous_controllers
    }

    /// The distinct controllers seen so far in the in-progress window.
    pub(crate) fn current_controllers(&self) -> BTreeSet<ControllerID> {
        self.current_controllers.iter().copied().collect()
    }
}
