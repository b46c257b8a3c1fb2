/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Types that exist only to store numbers, and do not have any major "active" behavior.

use std::{
    fmt::{self, Display, Formatter},
    ops::{Add, AddAssign},
    time::Duration,
};

/// Number that uniquely identifies a controller among all controllers of a control plane.
///
/// Controller IDs double as election priorities: the numerically highest `ControllerID` that a
/// controller hears from in an epoch becomes its leader for that epoch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ControllerID(u32);

impl ControllerID {
    /// Create a new `ControllerID` wrapping `int`.
    pub const fn new(int: u32) -> Self {
        Self(int)
    }

    /// Get the inner `u32` value of this `ControllerID`.
    pub const fn int(&self) -> u32 {
        self.0
    }
}

impl Display for ControllerID {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

/// Number that identifies a switch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SwitchID(u32);

impl SwitchID {
    /// Create a new `SwitchID` wrapping `int`.
    pub const fn new(int: u32) -> Self {
        Self(int)
    }

    /// Get the inner `u32` value of this `SwitchID`.
    pub const fn int(&self) -> u32 {
        self.0
    }
}

impl Display for SwitchID {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

/// Round number of the leader election. Starts at 0 and increases by exactly 1 every time a
/// controller pings its peer controllers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Epoch(u32);

impl Epoch {
    /// Create a new `Epoch` wrapping `int`.
    pub const fn new(int: u32) -> Self {
        Self(int)
    }

    /// Get the initial `Epoch`, which is 0.
    pub const fn init() -> Self {
        Self(0)
    }

    /// Get the inner `u32` value of this `Epoch`.
    pub const fn int(&self) -> u32 {
        self.0
    }
}

impl Display for Epoch {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl Add<u32> for Epoch {
    type Output = Epoch;

    fn add(self, rhs: u32) -> Self::Output {
        Epoch(self.0.add(rhs))
    }
}

impl AddAssign<u32> for Epoch {
    fn add_assign(&mut self, rhs: u32) {
        self.0.add_assign(rhs)
    }
}

/// Number of consecutive windows in which the same set of several controllers contacted a switch.
///
/// Saturates at `u8::MAX` instead of wrapping around.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ViolationCount(u8);

impl ViolationCount {
    /// Create a new `ViolationCount` wrapping `int`.
    pub const fn new(int: u8) -> Self {
        Self(int)
    }

    /// Get the inner `u8` value of this `ViolationCount`.
    pub const fn int(&self) -> u8 {
        self.0
    }

    /// Get the `ViolationCount` that follows this one.
    pub const fn incremented(&self) -> Self {
        Self(self.0.saturating_add(1))
    }

    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Display for ViolationCount {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

/// Point in virtual time, in nanoseconds since the start of the simulation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Create a new `Timestamp` wrapping `nanos`.
    pub const fn new(nanos: u64) -> Self {
        Self(nanos)
    }

    /// Get the inner number of nanoseconds of this `Timestamp`.
    pub const fn int(&self) -> u64 {
        self.0
    }

    /// Get the `Timestamp` of the virtual instant `elapsed` after the start of the simulation.
    ///
    /// Instants further than `u64::MAX` nanoseconds (about 584 years) are clamped.
    pub fn from_elapsed(elapsed: Duration) -> Self {
        Self(u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX))
    }

    /// Get the virtual instant of this `Timestamp` as a `Duration` since the start of the simulation.
    pub const fn elapsed(&self) -> Duration {
        Duration::from_nanos(self.0)
    }
}

impl Display for Timestamp {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}", self.elapsed().as_secs_f64())
    }
}

/// Maximum number of messages a buffer can hold.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BufferSize(u64);

impl BufferSize {
    /// Create a new `BufferSize` wrapping `int`.
    pub const fn new(int: u64) -> Self {
        Self(int)
    }

    /// Get the inner `u64` value of this `BufferSize`.
    pub const fn int(&self) -> u64 {
        self.0
    }
}
