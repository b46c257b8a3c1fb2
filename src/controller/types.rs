/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Definitions of types specific to the [leader election](super) engine.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::{
    messages::ControlMessage,
    types::data_types::{BufferSize, ControllerID, Epoch},
};

/// The controllers heard from in the current epoch, each one a candidate for leadership.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LeaderCandidates(BTreeSet<ControllerID>);

impl LeaderCandidates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, controller: ControllerID) {
        self.0.insert(controller);
    }

    /// Get the candidate with the numerically highest ID, if any.
    pub fn highest(&self) -> Option<ControllerID> {
        self.0.iter().next_back().copied()
    }

    pub fn contains(&self, controller: &ControllerID) -> bool {
        self.0.contains(controller)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Remove every candidate, returning the ones that were present.
    pub fn take(&mut self) -> BTreeSet<ControllerID> {
        std::mem::take(&mut self.0)
    }
}

/// Message buffer for storing [`ControlMessage`]s of epochs that the controller has not reached yet.
///
/// Its size is bounded by its capacity (a number of messages). When the capacity is reached, messages of
/// the highest buffered epoch may be removed to make space for messages of lower epochs.
pub(crate) struct EpochMessageBuffer {
    buffer_capacity: BufferSize,
    buffer: BTreeMap<Epoch, VecDeque<ControlMessage>>,
    buffer_size: u64,
}

/// Result of [`EpochMessageBuffer::insert`].
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum BufferInsertion {
    Inserted,

    /// The message was inserted after evicting a message of the highest buffered epoch.
    InsertedEvicting(ControlMessage),

    /// The buffer is full and the message's epoch is not lower than the highest buffered epoch.
    Rejected,
}

impl EpochMessageBuffer {
    /// Create an empty message buffer.
    pub(crate) fn new(buffer_capacity: BufferSize) -> Self {
        Self {
            buffer_capacity,
            buffer: BTreeMap::new(),
            buffer_size: 0,
        }
    }

    /// Try inserting the message into the buffer.
    ///
    /// If the buffer is full, the message is only inserted if its epoch is lower than the highest epoch in
    /// the buffer. In that case the most recently buffered message of the highest epoch makes room for it.
    pub(crate) fn insert(&mut self, msg: ControlMessage) -> BufferInsertion {
        if self.buffer_size < self.buffer_capacity.int() {
            self.push(msg);
            return BufferInsertion::Inserted;
        }

        let evict_from = match self.buffer.keys().next_back() {
            Some(highest_epoch) if msg.epoch < *highest_epoch => *highest_epoch,
            _ => return BufferInsertion::Rejected,
        };
        let evicted = self
            .buffer
            .get_mut(&evict_from)
            .and_then(|msg_queue| msg_queue.pop_back());
        if self
            .buffer
            .get(&evict_from)
            .is_some_and(|msg_queue| msg_queue.is_empty())
        {
            self.buffer.remove(&evict_from);
        }

        match evicted {
            Some(evicted) => {
                self.buffer_size -= 1;
                self.push(msg);
                BufferInsertion::InsertedEvicting(evicted)
            }
            None => BufferInsertion::Rejected,
        }
    }

    /// Remove and return every message of `epoch`, in the order they were buffered.
    pub(crate) fn take_epoch(&mut self, epoch: Epoch) -> VecDeque<ControlMessage> {
        let msgs = self.buffer.remove(&epoch).unwrap_or_default();
        self.buffer_size -= msgs.len() as u64;
        msgs
    }

    /// Remove all messages of epochs lower than `cur_epoch`.
    pub(crate) fn remove_expired_msgs(&mut self, cur_epoch: Epoch) {
        self.buffer = self.buffer.split_off(&cur_epoch);
        self.buffer_size = self.buffer.values().map(|msgs| msgs.len() as u64).sum();
    }

    pub(crate) fn len(&self) -> u64 {
        self.buffer_size
    }

    fn push(&mut self, msg: ControlMessage) {
        self.buffer.entry(msg.epoch).or_default().push_back(msg);
        self.buffer_size += 1;
    }
}
