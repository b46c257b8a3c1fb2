//! Pluggable datagram networking.
//!
//! Controllers and switches reach each other through implementations of the [`Transport`](transport::Transport)
//! trait. Inside the crate, nodes hold a [`SenderHandle`](sending::SenderHandle) that encodes
//! [`WireMessage`](crate::messages::WireMessage)s before handing them to the transport.

pub mod transport;

pub(crate) mod sending;
