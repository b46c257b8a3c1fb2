/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The [`Simulation`] run loop and the nodes it hosts.

use std::{
    cell::RefCell,
    collections::BTreeMap,
    net::Ipv4Addr,
    rc::Rc,
    sync::mpsc::{self, Receiver, Sender},
    time::Duration,
};

use crate::{
    config::{ControllerConfiguration, SwitchConfiguration},
    controller::{Controller, ControllerError},
    event_bus::EventHandlers,
    events::Event,
    networking::transport::Endpoint,
    scheduling::Timer,
    switch::{types::ViolationReport, Switch, SwitchError, ViolationTally},
    types::data_types::{ControllerID, SwitchID},
};

use super::{
    event_queue::SimEvent,
    layout::{ControlPlaneLayout, InstalledControlPlane},
    network::{NetworkStats, SimCore, SimHandle},
    EndReason, SimulationConfiguration, SimulationError, SimulationOutcome,
};

pub type SimController = Controller<SimHandle, SimHandle>;

pub type SimSwitch = Switch<SimHandle, SimHandle>;

enum SimNode {
    Controller(SimController),
    Switch(SimSwitch),
}

/// A discrete-event simulation of a control plane. See the [module documentation](super).
pub struct Simulation {
    config: SimulationConfiguration,
    core: Rc<RefCell<SimCore>>,
    nodes: BTreeMap<Ipv4Addr, SimNode>,
    tally: ViolationTally,
    handlers: EventHandlers,
    event_publisher: Sender<Event>,
    event_subscriber: Receiver<Event>,
    violations: Vec<ViolationReport>,
    next_host: u32,
}

impl Simulation {
    /// Create an empty simulation at virtual time 0.
    pub fn new(config: SimulationConfiguration) -> Result<Self, SimulationError> {
        config.validate()?;
        let core = Rc::new(RefCell::new(SimCore::new(&config)));
        let (event_publisher, event_subscriber) = mpsc::channel();
        Ok(Self {
            handlers: EventHandlers::new(config.log_events),
            config,
            core,
            nodes: BTreeMap::new(),
            tally: ViolationTally::new(),
            event_publisher,
            event_subscriber,
            violations: Vec::new(),
            next_host: 1,
        })
    }

    /// Get the handlers fired for every protocol event, to register more of them.
    pub fn handlers_mut(&mut self) -> &mut EventHandlers {
        &mut self.handlers
    }

    /// Get an address in 10.0.0.0/8 that no node owns yet.
    pub fn allocate_address(&mut self) -> Ipv4Addr {
        loop {
            let address = Ipv4Addr::from(u32::from(Ipv4Addr::new(10, 0, 0, 0)) + self.next_host);
            self.next_host += 1;
            if !self.nodes.contains_key(&address) {
                return address;
            }
        }
    }

    /// Add a controller at `address`. It is initialized at the current virtual time once the simulation
    /// runs.
    pub fn add_controller(
        &mut self,
        address: Ipv4Addr,
        config: ControllerConfiguration,
    ) -> Result<(), SimulationError> {
        let handle = self.register(address)?;
        let controller = Controller::new(
            config,
            handle.clone(),
            handle,
            Some(self.event_publisher.clone()),
        )?;
        self.nodes.insert(address, SimNode::Controller(controller));
        self.schedule_start(address);
        Ok(())
    }

    /// Add a switch at `address`. It is initialized at the current virtual time once the simulation runs.
    pub fn add_switch(
        &mut self,
        address: Ipv4Addr,
        config: SwitchConfiguration,
    ) -> Result<(), SimulationError> {
        let handle = self.register(address)?;
        let switch = Switch::new(
            config,
            handle.clone(),
            handle,
            self.tally.clone(),
            Some(self.event_publisher.clone()),
        )?;
        self.nodes.insert(address, SimNode::Switch(switch));
        self.schedule_start(address);
        Ok(())
    }

    /// Add every controller and switch of `layout`, each at a freshly allocated address. Switches are added
    /// first, then controllers.
    pub fn install(
        &mut self,
        layout: &ControlPlaneLayout,
    ) -> Result<InstalledControlPlane, SimulationError> {
        let switches: Vec<(SwitchID, Ipv4Addr)> = (0..layout.switches)
            .map(|i| (SwitchID::new(layout.first_switch_id + i), self.allocate_address()))
            .collect();
        let controllers: Vec<(ControllerID, Ipv4Addr)> = (0..layout.controllers)
            .map(|i| {
                (
                    ControllerID::new(layout.first_controller_id + i),
                    self.allocate_address(),
                )
            })
            .collect();

        for (id, address) in &switches {
            self.add_switch(*address, layout.switch_configuration(*id))?;
        }
        for (address, config) in layout.controller_configurations(&controllers, &switches) {
            self.add_controller(address, config)?;
        }

        log::info!(
            "installed {} controllers and {} switches",
            controllers.len(),
            switches.len()
        );
        Ok(InstalledControlPlane {
            controllers,
            switches,
        })
    }

    /// Bring the link between `a` and `b` down now. Datagrams already in flight on it are lost.
    pub fn fail_link(&mut self, a: Ipv4Addr, b: Ipv4Addr) {
        self.core.borrow_mut().set_link(a, b, false)
    }

    /// Bring the link between `a` and `b` back up now.
    pub fn restore_link(&mut self, a: Ipv4Addr, b: Ipv4Addr) {
        self.core.borrow_mut().set_link(a, b, true)
    }

    /// Bring the link between `a` and `b` down at virtual time `time`.
    pub fn fail_link_at(&mut self, time: Duration, a: Ipv4Addr, b: Ipv4Addr) {
        self.core
            .borrow_mut()
            .queue
            .push(time, SimEvent::SetLink { a, b, up: false })
    }

    /// Bring the link between `a` and `b` back up at virtual time `time`.
    pub fn restore_link_at(&mut self, time: Duration, a: Ipv4Addr, b: Ipv4Addr) {
        self.core
            .borrow_mut()
            .queue
            .push(time, SimEvent::SetLink { a, b, up: true })
    }

    /// Bring down every link between a node of `side_a` and a node of `side_b` at virtual time `time`.
    pub fn partition_at(&mut self, time: Duration, side_a: &[Ipv4Addr], side_b: &[Ipv4Addr]) {
        for a in side_a {
            for b in side_b {
                self.fail_link_at(time, *a, *b);
            }
        }
    }

    /// Run until a controller asks to stop, no events are left, the configured time limit is reached, or,
    /// if configured, a switch reports a violation.
    pub fn run(&mut self) -> SimulationOutcome {
        let end_reason = loop {
            if self.core.borrow().stop_requested {
                break EndReason::Stopped;
            }

            let next = self.core.borrow_mut().queue.pop_until(self.config.until);
            let (time, event) = match next {
                Some(next) => next,
                None if self.core.borrow().queue.is_empty() => break EndReason::Idle,
                None => break EndReason::TimeLimit,
            };
            self.core.borrow_mut().now = time;

            let violation = self.dispatch(event);
            self.handlers.drain(&self.event_subscriber);

            if let Some(report) = violation {
                self.violations.push(report.clone());
                if self.config.abort_on_violation {
                    break EndReason::ControlPlaneViolation(report);
                }
            }
        };

        let outcome = SimulationOutcome {
            end_time: self.now(),
            end_reason,
            violations: self.violations.clone(),
            switches_in_violation: self.tally.count(),
        };
        log::info!(
            "simulation ended at {:?}: {:?}, {} violations reported",
            outcome.end_time,
            outcome.end_reason,
            outcome.violations.len()
        );
        outcome
    }

    pub fn now(&self) -> Duration {
        self.core.borrow().now
    }

    pub fn controller(&self, address: Ipv4Addr) -> Option<&SimController> {
        match self.nodes.get(&address) {
            Some(SimNode::Controller(controller)) => Some(controller),
            _ => None,
        }
    }

    pub fn switch(&self, address: Ipv4Addr) -> Option<&SimSwitch> {
        match self.nodes.get(&address) {
            Some(SimNode::Switch(switch)) => Some(switch),
            _ => None,
        }
    }

    /// The tally shared by every switch of this simulation.
    pub fn tally(&self) -> &ViolationTally {
        &self.tally
    }

    pub fn network_stats(&self) -> NetworkStats {
        self.core.borrow().stats
    }

    fn register(&mut self, address: Ipv4Addr) -> Result<SimHandle, SimulationError> {
        if self.nodes.contains_key(&address) || !self.core.borrow_mut().add_node(address) {
            return Err(SimulationError::DuplicateAddress(address));
        }
        Ok(SimHandle::new(self.core.clone(), address))
    }

    fn schedule_start(&mut self, node: Ipv4Addr) {
        let mut core = self.core.borrow_mut();
        let now = core.now;
        core.queue.push(now, SimEvent::Start { node });
    }

    // Hand one event to the node it concerns. Returns the violation reported while handling it, if any.
    fn dispatch(&mut self, event: SimEvent) -> Option<ViolationReport> {
        match event {
            SimEvent::Start { node } => match self.nodes.get_mut(&node) {
                Some(SimNode::Controller(controller)) => {
                    if let Err(err) = controller.initialize() {
                        log::error!("controller at {} failed to start: {}", node, err);
                    }
                    None
                }
                Some(SimNode::Switch(switch)) => {
                    if let Err(err) = switch.initialize() {
                        log::error!("switch at {} failed to start: {}", node, err);
                    }
                    None
                }
                None => None,
            },

            SimEvent::Timer { node, timer } => self.fire_timer(node, timer),

            SimEvent::Deliver { from, to, bytes } => self.deliver(from, to, bytes),

            SimEvent::SetLink { a, b, up } => {
                self.core.borrow_mut().set_link(a, b, up);
                None
            }
        }
    }

    fn fire_timer(&mut self, node: Ipv4Addr, timer: Timer) -> Option<ViolationReport> {
        match self.nodes.get_mut(&node) {
            Some(SimNode::Controller(controller)) => {
                log_controller_error(controller.on_timer(timer));
                None
            }
            Some(SimNode::Switch(switch)) => handle_switch_result(switch.on_timer(timer)),
            None => None,
        }
    }

    fn deliver(&mut self, from: Endpoint, to: Endpoint, bytes: Vec<u8>) -> Option<ViolationReport> {
        {
            let mut core = self.core.borrow_mut();
            if !core.is_link_up(*from.ip(), *to.ip()) {
                core.stats.dropped += 1;
                log::trace!("link down, lost {} bytes from {} to {}", bytes.len(), from, to);
                return None;
            }
            if !core.is_bound(&to) {
                core.stats.unclaimed += 1;
                log::trace!("nothing bound at {}, lost {} bytes from {}", to, bytes.len(), from);
                return None;
            }
            core.stats.delivered += 1;
        }

        match self.nodes.get_mut(to.ip()) {
            Some(SimNode::Controller(controller)) => {
                log_controller_error(controller.on_receive(&bytes, from));
                None
            }
            Some(SimNode::Switch(switch)) => handle_switch_result(switch.on_receive(&bytes, from)),
            None => None,
        }
    }
}

fn log_controller_error(result: Result<(), ControllerError>) {
    match result {
        Ok(()) => {}
        // Each failed send was already logged when it happened.
        Err(ControllerError::SendFailures(failures)) => {
            log::debug!("{} sends failed", failures.len())
        }
        Err(err) => log::warn!("controller error: {}", err),
    }
}

fn handle_switch_result(result: Result<(), SwitchError>) -> Option<ViolationReport> {
    match result {
        Ok(()) => None,
        Err(SwitchError::ControlPlaneViolation(report)) => Some(report),
        Err(err) => {
            log::warn!("switch error: {}", err);
            None
        }
    }
}
