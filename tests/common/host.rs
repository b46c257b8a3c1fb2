//! A mock host that records everything a node asks of it.

use std::{
    collections::BTreeSet,
    sync::{Arc, Mutex},
    time::Duration,
};

use sdn_control_plane::{
    messages::WireMessage,
    networking::transport::{Endpoint, Transport, TransportError},
    scheduling::{Scheduler, Timer},
};

/// A [`Transport`] and [`Scheduler`] stub. Clones share the same state, so a test can keep one clone
/// and hand the others to the node under test.
#[derive(Clone, Default)]
pub(crate) struct MockHost(Arc<Mutex<MockHostState>>);

#[derive(Default)]
struct MockHostState {
    now: Duration,
    bound: Vec<u16>,
    connected: Vec<Endpoint>,
    sent: Vec<(Endpoint, Vec<u8>)>,
    scheduled: Vec<(Duration, Timer)>,
    failing: BTreeSet<Endpoint>,
    unreachable_once: BTreeSet<Endpoint>,
    stopped: bool,
}

impl MockHost {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn set_now(&self, now: Duration) {
        self.0.lock().unwrap().now = now
    }

    /// Make every later send to `peer` fail with [`TransportError::ChannelDown`].
    pub(crate) fn fail_sends_to(&self, peer: Endpoint) {
        self.0.lock().unwrap().failing.insert(peer);
    }

    /// Make the next connect to `peer` fail with [`TransportError::UnknownDestination`].
    pub(crate) fn fail_next_connect_to(&self, peer: Endpoint) {
        self.0.lock().unwrap().unreachable_once.insert(peer);
    }

    pub(crate) fn bound_ports(&self) -> Vec<u16> {
        self.0.lock().unwrap().bound.clone()
    }

    pub(crate) fn connected(&self) -> Vec<Endpoint> {
        self.0.lock().unwrap().connected.clone()
    }

    /// Remove and return every datagram sent so far, in the order it was sent.
    pub(crate) fn take_sent(&self) -> Vec<(Endpoint, Vec<u8>)> {
        std::mem::take(&mut self.0.lock().unwrap().sent)
    }

    /// Remove and decode every datagram sent so far.
    pub(crate) fn take_sent_as<M: WireMessage>(&self) -> Vec<(Endpoint, M)> {
        self.take_sent()
            .into_iter()
            .map(|(peer, bytes)| (peer, M::decode(&bytes).unwrap()))
            .collect()
    }

    /// Every timer armed so far, with the virtual time it is due at.
    pub(crate) fn scheduled(&self) -> Vec<(Duration, Timer)> {
        self.0.lock().unwrap().scheduled.clone()
    }

    pub(crate) fn stopped(&self) -> bool {
        self.0.lock().unwrap().stopped
    }
}

impl Transport for MockHost {
    fn bind(&mut self, port: u16) -> Result<(), TransportError> {
        let mut state = self.0.lock().unwrap();
        if state.bound.contains(&port) {
            return Err(TransportError::AddressInUse { port });
        }
        state.bound.push(port);
        Ok(())
    }

    fn connect(&mut self, peer: Endpoint) -> Result<(), TransportError> {
        let mut state = self.0.lock().unwrap();
        if state.unreachable_once.remove(&peer) {
            return Err(TransportError::UnknownDestination { peer });
        }
        if !state.connected.contains(&peer) {
            state.connected.push(peer);
        }
        Ok(())
    }

    fn send(&mut self, peer: Endpoint, bytes: Vec<u8>) -> Result<(), TransportError> {
        let mut state = self.0.lock().unwrap();
        if state.failing.contains(&peer) {
            return Err(TransportError::ChannelDown { peer });
        }
        if !state.connected.contains(&peer) {
            return Err(TransportError::NotConnected { peer });
        }
        state.sent.push((peer, bytes));
        Ok(())
    }
}

impl Scheduler for MockHost {
    fn now(&self) -> Duration {
        self.0.lock().unwrap().now
    }

    fn schedule_after(&mut self, delay: Duration, timer: Timer) {
        let mut state = self.0.lock().unwrap();
        let due = state.now + delay;
        state.scheduled.push((due, timer));
    }

    fn stop(&mut self) {
        self.0.lock().unwrap().stopped = true
    }
}
