/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Aggregate count of switches that are currently seeing a suspicious controller set.

use std::sync::{
    atomic::{AtomicU32, Ordering},
    Arc,
};

/// Shared counter of switches whose violation count is non-zero.
///
/// Every switch of a control plane holds a clone of the same `ViolationTally`. A switch calls
/// [`enter`](Self::enter) when its violation count goes from zero to non-zero, and
/// [`leave`](Self::leave) when it goes back to zero, so the tally moves once per edge and not once per
/// window.
#[derive(Clone, Debug, Default)]
pub struct ViolationTally(Arc<AtomicU32>);

impl ViolationTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one more switch in violation.
    pub fn enter(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    /// Count one less switch in violation. The count never goes below zero.
    pub fn leave(&self) {
        let left = self
            .0
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |count| count.checked_sub(1));
        if left.is_err() {
            log::warn!("violation tally left while already at zero");
        }
    }

    /// Get the number of switches currently in violation.
    pub fn count(&self) -> u32 {
        self.0.load(Ordering::SeqCst)
    }
}
