/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Periodic pings from the leader to the switches it owns.

use crate::{
    messages::SwitchMessage,
    networking::{
        sending::SenderHandle,
        transport::{Endpoint, Transport, TransportError},
    },
    types::data_types::ControllerID,
};

/// Addresses and formats the switch-facing [`SwitchMessage`]s sent by the leader.
///
/// Holds nothing but the switch addresses and the reply port from the controller's configuration. Whether
/// a ping is due at all is decided by the [`Controller`](super::Controller).
pub(crate) struct SwitchPingDriver {
    peer_switches: Vec<Endpoint>,
    respond_port: u16,
}

impl SwitchPingDriver {
    pub(crate) fn new(peer_switches: Vec<Endpoint>, respond_port: u16) -> Self {
        Self {
            peer_switches,
            respond_port,
        }
    }

    /// Send a ping identifying `leader` to every switch. Returns the switches the send failed for.
    pub(crate) fn ping_all<T: Transport>(
        &self,
        sender: &mut SenderHandle<T>,
        leader: ControllerID,
    ) -> Vec<(Endpoint, TransportError)> {
        let msg = SwitchMessage {
            sender: leader,
            respond_port: self.respond_port,
        };
        sender.multicast(&self.peer_switches, &msg)
    }

    pub(crate) fn switch_count(&self) -> usize {
        self.peer_switches.len()
    }
}
