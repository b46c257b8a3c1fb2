/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Time-ordered queue of pending simulation events.

use std::{cmp::Ordering, collections::BinaryHeap, net::Ipv4Addr, time::Duration};

use crate::{networking::transport::Endpoint, scheduling::Timer};

/// Something that will happen to a node or a link at a point in virtual time.
#[derive(Debug, Clone)]
pub(crate) enum SimEvent {
    /// Initialize the node.
    Start { node: Ipv4Addr },

    /// Hand a timer back to the node that armed it.
    Timer { node: Ipv4Addr, timer: Timer },

    /// Hand bytes sent from `from` to the node that owns `to`.
    Deliver {
        from: Endpoint,
        to: Endpoint,
        bytes: Vec<u8>,
    },

    /// Bring the link between two nodes up or down.
    SetLink { a: Ipv4Addr, b: Ipv4Addr, up: bool },
}

#[derive(Debug)]
struct ScheduledEvent {
    time: Duration,
    // Breaks ties between events of the same time in insertion order.
    seq: u64,
    event: SimEvent,
}

impl PartialEq for ScheduledEvent {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.seq == other.seq
    }
}

impl Eq for ScheduledEvent {}

impl PartialOrd for ScheduledEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledEvent {
    // Reversed, so that the max-heap pops the earliest event first.
    fn cmp(&self, other: &Self) -> Ordering {
        match other.time.cmp(&self.time) {
            Ordering::Equal => other.seq.cmp(&self.seq),
            ord => ord,
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct EventQueue {
    events: BinaryHeap<ScheduledEvent>,
    next_seq: u64,
}

impl EventQueue {
    pub(crate) fn push(&mut self, time: Duration, event: SimEvent) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.events.push(ScheduledEvent { time, seq, event });
    }

    /// Remove and return the earliest event, unless it is scheduled after `limit`.
    pub(crate) fn pop_until(&mut self, limit: Option<Duration>) -> Option<(Duration, SimEvent)> {
        let next_time = self.events.peek()?.time;
        if limit.is_some_and(|limit| next_time > limit) {
            return None;
        }
        self.events
            .pop()
            .map(|scheduled| (scheduled.time, scheduled.event))
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
