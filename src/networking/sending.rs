//! Functions and types for sending messages through a [`Transport`].

use crate::messages::WireMessage;

use super::transport::{Endpoint, Transport, TransportError};

/// Handle for binding, connecting, and sending [`WireMessage`]s through a [`Transport`].
#[derive(Clone)]
pub(crate) struct SenderHandle<T: Transport> {
    transport: T,
}

impl<T: Transport> SenderHandle<T> {
    pub(crate) fn new(transport: T) -> Self {
        Self { transport }
    }

    pub(crate) fn bind(&mut self, port: u16) -> Result<(), TransportError> {
        self.transport.bind(port)
    }

    pub(crate) fn connect(&mut self, peer: Endpoint) -> Result<(), TransportError> {
        self.transport.connect(peer)
    }

    /// Encode `msg` and send it to `peer`. Failures are logged and returned, never retried.
    pub(crate) fn send<M: WireMessage>(
        &mut self,
        peer: Endpoint,
        msg: &M,
    ) -> Result<(), TransportError> {
        let bytes = msg.encode();
        let len = bytes.len();
        match self.transport.send(peer, bytes) {
            Ok(()) => {
                log::trace!("sent {} bytes to {}", len, peer);
                Ok(())
            }
            Err(err) => {
                log::warn!("failed to send {} bytes to {}: {}", len, peer, err);
                Err(err)
            }
        }
    }

    /// Send `msg` to every peer in `peers`, returning the peers that the send failed for.
    pub(crate) fn multicast<'a, M: WireMessage>(
        &mut self,
        peers: impl IntoIterator<Item = &'a Endpoint>,
        msg: &M,
    ) -> Vec<(Endpoint, TransportError)> {
        peers
            .into_iter()
            .filter_map(|peer| self.send(*peer, msg).err().map(|err| (*peer, err)))
            .collect()
    }
}
