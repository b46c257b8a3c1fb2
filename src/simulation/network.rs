/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The simulated network and clock, and the per-node [`SimHandle`] through which nodes use them.

use std::{
    cell::RefCell,
    collections::BTreeSet,
    net::Ipv4Addr,
    rc::Rc,
    time::Duration,
};

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{
    networking::transport::{Endpoint, Transport, TransportError},
    scheduling::{Scheduler, Timer},
};

use super::{
    event_queue::{EventQueue, SimEvent},
    SimulationConfiguration,
};

/// State shared by the simulation and every node's [`SimHandle`].
pub(crate) struct SimCore {
    pub(crate) now: Duration,
    pub(crate) queue: EventQueue,
    pub(crate) stop_requested: bool,
    pub(crate) stats: NetworkStats,
    link_delay: Duration,
    max_jitter: Duration,
    drop_probability: f64,
    rng: StdRng,
    nodes: BTreeSet<Ipv4Addr>,
    bound: BTreeSet<Endpoint>,
    channels: BTreeSet<(Ipv4Addr, Endpoint)>,
    failed_links: BTreeSet<(Ipv4Addr, Ipv4Addr)>,
}

/// Counts of what happened to the datagrams handed to the simulated network.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NetworkStats {
    pub sent: u64,
    pub delivered: u64,
    /// Lost at random, or in flight on a link that went down.
    pub dropped: u64,
    /// Arrived at a port that nobody had bound.
    pub unclaimed: u64,
}

impl SimCore {
    pub(crate) fn new(config: &SimulationConfiguration) -> Self {
        Self {
            now: Duration::ZERO,
            queue: EventQueue::default(),
            stop_requested: false,
            stats: NetworkStats::default(),
            link_delay: config.link_delay,
            max_jitter: config.max_jitter,
            drop_probability: config.drop_probability,
            rng: StdRng::seed_from_u64(config.seed),
            nodes: BTreeSet::new(),
            bound: BTreeSet::new(),
            channels: BTreeSet::new(),
            failed_links: BTreeSet::new(),
        }
    }

    /// Register a node's address. Returns false if another node already owns it.
    pub(crate) fn add_node(&mut self, address: Ipv4Addr) -> bool {
        self.nodes.insert(address)
    }

    pub(crate) fn is_bound(&self, endpoint: &Endpoint) -> bool {
        self.bound.contains(endpoint)
    }

    pub(crate) fn is_link_up(&self, a: Ipv4Addr, b: Ipv4Addr) -> bool {
        !self.failed_links.contains(&link(a, b))
    }

    pub(crate) fn set_link(&mut self, a: Ipv4Addr, b: Ipv4Addr, up: bool) {
        if up {
            self.failed_links.remove(&link(a, b));
        } else {
            self.failed_links.insert(link(a, b));
        }
        log::debug!("link {} <-> {} is {}", a, b, if up { "up" } else { "down" });
    }

    fn bind(&mut self, endpoint: Endpoint) -> Result<(), TransportError> {
        if !self.bound.insert(endpoint) {
            return Err(TransportError::AddressInUse {
                port: endpoint.port(),
            });
        }
        Ok(())
    }

    fn connect(&mut self, from: Ipv4Addr, peer: Endpoint) -> Result<(), TransportError> {
        if !self.nodes.contains(peer.ip()) {
            return Err(TransportError::UnknownDestination { peer });
        }
        self.channels.insert((from, peer));
        Ok(())
    }

    fn send(&mut self, from: Endpoint, to: Endpoint, bytes: Vec<u8>) -> Result<(), TransportError> {
        if !self.channels.contains(&(*from.ip(), to)) {
            return Err(TransportError::NotConnected { peer: to });
        }
        if !self.is_link_up(*from.ip(), *to.ip()) {
            return Err(TransportError::ChannelDown { peer: to });
        }

        self.stats.sent += 1;
        if self.drop_probability > 0.0 && self.rng.gen_bool(self.drop_probability) {
            self.stats.dropped += 1;
            log::trace!("lost {} bytes from {} to {}", bytes.len(), from, to);
            return Ok(());
        }

        let jitter = if self.max_jitter.is_zero() {
            Duration::ZERO
        } else {
            let max_jitter_nanos = u64::try_from(self.max_jitter.as_nanos()).unwrap_or(u64::MAX);
            Duration::from_nanos(self.rng.gen_range(0, max_jitter_nanos.saturating_add(1)))
        };
        let arrival = self.now + self.link_delay + jitter;
        self.queue.push(arrival, SimEvent::Deliver { from, to, bytes });
        Ok(())
    }
}

// Links are undirected.
fn link(a: Ipv4Addr, b: Ipv4Addr) -> (Ipv4Addr, Ipv4Addr) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// A node's handle on the simulated network and clock.
///
/// Implements both [`Transport`] and [`Scheduler`]; the simulation hands each node two clones of the
/// same handle.
#[derive(Clone)]
pub struct SimHandle {
    core: Rc<RefCell<SimCore>>,
    address: Ipv4Addr,
    port: Option<u16>,
}

impl SimHandle {
    pub(crate) fn new(core: Rc<RefCell<SimCore>>, address: Ipv4Addr) -> Self {
        Self {
            core,
            address,
            port: None,
        }
    }

    /// The address of the node that owns this handle.
    pub fn address(&self) -> Ipv4Addr {
        self.address
    }

    // Nodes bind a single port. Datagrams they send come from it.
    fn local_endpoint(&self) -> Endpoint {
        Endpoint::new(self.address, self.port.unwrap_or(0))
    }
}

impl Transport for SimHandle {
    fn bind(&mut self, port: u16) -> Result<(), TransportError> {
        self.core
            .borrow_mut()
            .bind(Endpoint::new(self.address, port))?;
        self.port = Some(port);
        Ok(())
    }

    fn connect(&mut self, peer: Endpoint) -> Result<(), TransportError> {
        self.core.borrow_mut().connect(self.address, peer)
    }

    fn send(&mut self, peer: Endpoint, bytes: Vec<u8>) -> Result<(), TransportError> {
        let from = self.local_endpoint();
        self.core.borrow_mut().send(from, peer, bytes)
    }
}

impl Scheduler for SimHandle {
    fn now(&self) -> Duration {
        self.core.borrow().now
    }

    fn schedule_after(&mut self, delay: Duration, timer: Timer) {
        let mut core = self.core.borrow_mut();
        let time = core.now + delay;
        core.queue.push(
            time,
            SimEvent::Timer {
                node: self.address,
                timer,
            },
        );
    }

    fn stop(&mut self) {
        self.core.borrow_mut().stop_requested = true;
    }
}
