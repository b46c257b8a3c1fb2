/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Definitions for the fixed-layout messages that are exchanged between controllers and switches.
//!
//! ## Messages
//!
//! The control plane involves two shapes of messages:
//! 1. [`ControlMessage`], which a controller sends to each of its peer controllers once per epoch.
//! 2. [`SwitchMessage`], which the leader sends to each of its switches, and which switches echo back.
//!
//! Neither shape carries a type tag. Which shape a byte sequence holds is determined by the port
//! it was delivered to: controllers only ever decode `ControlMessage`s, and switches only ever
//! decode `SwitchMessage`s.
//!
//! ## Encoding
//!
//! All fields are written in network (big-endian) byte order, back to back, with no padding:
//!
//! |Message|Layout|Size|
//! |---|---|---|
//! |`ControlMessage`|`sender_id: u32 ‖ leader_id: u32 ‖ respond_port: u16 ‖ epoch: u32 ‖ time_sent: u64`|22 bytes|
//! |`SwitchMessage`|`sender_id: u32 ‖ respond_port: u16`|6 bytes|
//!
//! Decoding checks only that enough bytes are present. Trailing bytes are ignored and the fields
//! themselves are trusted.

use std::{
    error::Error,
    fmt::{self, Display, Formatter},
    mem,
};

use crate::types::data_types::{ControllerID, Epoch, Timestamp};

/// Implemented by messages that have a fixed-width wire encoding.
pub trait WireMessage: Sized {
    /// Exact number of bytes that [`encode`](Self::encode) produces.
    const ENCODED_LEN: usize;

    /// Encode this message into exactly [`ENCODED_LEN`](Self::ENCODED_LEN) bytes.
    fn encode(&self) -> Vec<u8>;

    /// Decode a message from the first [`ENCODED_LEN`](Self::ENCODED_LEN) bytes of `bytes`.
    fn decode(bytes: &[u8]) -> Result<Self, DecodeError>;
}

/// Message that a controller sends to its peer controllers at the start of every epoch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ControlMessage {
    pub sender: ControllerID,
    /// The leader that `sender` believed in when it sent this message.
    pub leader: ControllerID,
    /// The port on which `sender` listens for replies.
    pub respond_port: u16,
    /// The epoch that `sender` entered when it sent this message.
    pub epoch: Epoch,
    pub time_sent: Timestamp,
}

impl WireMessage for ControlMessage {
    const ENCODED_LEN: usize = mem::size_of::<u32>()
        + mem::size_of::<u32>()
        + mem::size_of::<u16>()
        + mem::size_of::<u32>()
        + mem::size_of::<u64>();

    fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::ENCODED_LEN);
        buf.extend_from_slice(&self.sender.int().to_be_bytes());
        buf.extend_from_slice(&self.leader.int().to_be_bytes());
        buf.extend_from_slice(&self.respond_port.to_be_bytes());
        buf.extend_from_slice(&self.epoch.int().to_be_bytes());
        buf.extend_from_slice(&self.time_sent.int().to_be_bytes());
        buf
    }

    fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut reader = Reader::new::<Self>(bytes)?;
        Ok(ControlMessage {
            sender: ControllerID::new(reader.read_u32()),
            leader: ControllerID::new(reader.read_u32()),
            respond_port: reader.read_u16(),
            epoch: Epoch::new(reader.read_u32()),
            time_sent: Timestamp::new(reader.read_u64()),
        })
    }
}

/// Message that the leader sends to its switches, and that switches send back as a reply.
///
/// Only the leader pings switches, so `sender` is also the identity of the leader as seen by the
/// sending controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SwitchMessage {
    pub sender: ControllerID,
    /// The port on which the receiver of this message should reply.
    pub respond_port: u16,
}

impl WireMessage for SwitchMessage {
    const ENCODED_LEN: usize = mem::size_of::<u32>() + mem::size_of::<u16>();

    fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::ENCODED_LEN);
        buf.extend_from_slice(&self.sender.int().to_be_bytes());
        buf.extend_from_slice(&self.respond_port.to_be_bytes());
        buf
    }

    fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut reader = Reader::new::<Self>(bytes)?;
        Ok(SwitchMessage {
            sender: ControllerID::new(reader.read_u32()),
            respond_port: reader.read_u16(),
        })
    }
}

/// Enumerates the ways decoding a [`WireMessage`] can fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecodeError {
    /// The byte sequence is shorter than the encoding of the expected message shape.
    TruncatedMessage { expected: usize, actual: usize },
}

impl Display for DecodeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::TruncatedMessage { expected, actual } => write!(
                f,
                "truncated message: expected {} bytes, got {}",
                expected, actual
            ),
        }
    }
}

impl Error for DecodeError {}

/// Cursor over a byte sequence whose length has already been checked against the message being read.
struct Reader<'a> {
    bytes: &'a [u8],
    cursor: usize,
}

impl<'a> Reader<'a> {
    fn new<M: WireMessage>(bytes: &'a [u8]) -> Result<Self, DecodeError> {
        if bytes.len() < M::ENCODED_LEN {
            return Err(DecodeError::TruncatedMessage {
                expected: M::ENCODED_LEN,
                actual: bytes.len(),
            });
        }
        Ok(Self { bytes, cursor: 0 })
    }

    fn take<const N: usize>(&mut self) -> [u8; N] {
        let mut out = [0u8; N];
        out.copy_from_slice(&self.bytes[self.cursor..self.cursor + N]);
        self.cursor += N;
        out
    }

    fn read_u16(&mut self) -> u16 {
        u16::from_be_bytes(self.take())
    }

    fn read_u32(&mut self) -> u32 {
        u32::from_be_bytes(self.take())
    }

    fn read_u64(&mut self) -> u64 {
        u64::from_be_bytes(self.take())
    }
}
