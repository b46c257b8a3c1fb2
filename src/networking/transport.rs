/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! [Trait definition](Transport) for the pluggable datagram transport that controllers and switches
//! use to exchange messages.

use std::{
    error::Error,
    fmt::{self, Display, Formatter},
    net::SocketAddrV4,
};

/// Address of a bound port on a node: an IPv4 address and a port.
pub type Endpoint = SocketAddrV4;

/// Sending half of a node's connection to the network.
///
/// Delivery is the host's business: a send returns as soon as the bytes have been handed over, and
/// received bytes are handed to the node by the host calling the node's `on_receive` method. The
/// only contract a `Transport` must honor is at-most-once delivery, in the order the host's virtual
/// clock dictates.
pub trait Transport {
    /// Start accepting datagrams addressed to `port` on this node.
    fn bind(&mut self, port: u16) -> Result<(), TransportError>;

    /// Open an outbound channel to `peer`. Must be called before sending to `peer`.
    fn connect(&mut self, peer: Endpoint) -> Result<(), TransportError>;

    /// Send `bytes` to `peer` without blocking.
    fn send(&mut self, peer: Endpoint, bytes: Vec<u8>) -> Result<(), TransportError>;
}

/// Enumerates the ways a [`Transport`] call can fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransportError {
    /// The port is already bound on this node.
    AddressInUse { port: u16 },

    /// No outbound channel to the peer was opened with [`Transport::connect`].
    NotConnected { peer: Endpoint },

    /// The channel to the peer has failed or been closed.
    ChannelDown { peer: Endpoint },

    /// No node owns the peer's address.
    UnknownDestination { peer: Endpoint },
}

impl Display for TransportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::AddressInUse { port } => write!(f, "port {} is already bound", port),
            TransportError::NotConnected { peer } => write!(f, "not connected to {}", peer),
            TransportError::ChannelDown { peer } => write!(f, "channel to {} is down", peer),
            TransportError::UnknownDestination { peer } => write!(f, "no node at {}", peer),
        }
    }
}

impl Error for TransportError {}
