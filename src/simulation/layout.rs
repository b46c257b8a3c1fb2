/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Shape of a control plane to install into a [`Simulation`](super::Simulation).

use std::{net::Ipv4Addr, time::Duration};

use typed_builder::TypedBuilder;

use crate::{
    config::*,
    networking::transport::Endpoint,
    switch::types::{StabilityCheck, ViolationPolicy},
    types::data_types::{BufferSize, ControllerID, Epoch, SwitchID, ViolationCount},
};

/// A control plane of `controllers` controllers, fully meshed with each other and each connected to all
/// `switches` switches. Controllers get consecutive IDs from `first_controller_id`, switches from
/// `first_switch_id`, and every node shares the same parameters.
#[derive(Clone, Debug, TypedBuilder)]
#[builder(builder_method(doc = "
    Create a builder for building a [ControlPlaneLayout]. On the builder call the following methods to construct a valid [ControlPlaneLayout].

    Required:
    - `.controllers(...)`
    - `.switches(...)`

    Optional:
    - `.first_controller_id(...)`
    - `.first_switch_id(...)`
    - `.controller_port(...)`
    - `.switch_port(...)`
    - `.ping_controllers_interval(...)`
    - `.ping_switches_interval(...)`
    - `.max_epoch(...)`
    - `.msg_buffer_capacity(...)`
    - `.window_duration(...)`
    - `.max_violation_count(...)`
    - `.violation_policy(...)`
    - `.stability_check(...)`
    - `.echo_responses(...)`
"))]
pub struct ControlPlaneLayout {
    #[builder(setter(doc = "Set the number of controllers. Required."))]
    pub controllers: u32,
    #[builder(setter(doc = "Set the number of switches. Required."))]
    pub switches: u32,
    #[builder(default = 1, setter(doc = "Set the ID of the first controller. Optional."))]
    pub first_controller_id: u32,
    #[builder(default = 1001, setter(doc = "Set the ID of the first switch. Optional."))]
    pub first_switch_id: u32,
    #[builder(default = DEFAULT_CONTROLLER_PORT, setter(doc = "Set the port every controller listens on. Optional."))]
    pub controller_port: u16,
    #[builder(default = DEFAULT_SWITCH_PORT, setter(doc = "Set the port every switch listens on. Optional."))]
    pub switch_port: u16,
    #[builder(default = DEFAULT_PING_CONTROLLERS_INTERVAL, setter(doc = "Set the period of pinging peer controllers. Optional."))]
    pub ping_controllers_interval: Duration,
    #[builder(default = DEFAULT_PING_SWITCHES_INTERVAL, setter(doc = "Set the period of pinging switches. Optional."))]
    pub ping_switches_interval: Duration,
    #[builder(default = DEFAULT_MAX_EPOCH, setter(doc = "Set the last epoch in which controllers ping their peers. Optional."))]
    pub max_epoch: u32,
    #[builder(default = DEFAULT_MSG_BUFFER_CAPACITY, setter(doc = "Set the capacity of each controller's future-epoch buffer. Optional."))]
    pub msg_buffer_capacity: u64,
    #[builder(default = DEFAULT_WINDOW_DURATION, setter(doc = "Set the duration of each switch's observation window. Optional."))]
    pub window_duration: Duration,
    #[builder(default = DEFAULT_MAX_VIOLATION_COUNT, setter(doc = "Set the violation threshold of every switch. Optional."))]
    pub max_violation_count: u8,
    #[builder(default, setter(doc = "Set what switches do after reporting a violation. Optional."))]
    pub violation_policy: ViolationPolicy,
    #[builder(default, setter(doc = "Set how switches compare consecutive windows. Optional."))]
    pub stability_check: StabilityCheck,
    #[builder(default = true, setter(doc = "Set whether switches reply to pings. Optional."))]
    pub echo_responses: bool,
}

impl ControlPlaneLayout {
    /// Build the configuration of every controller, given the address of each controller and switch.
    pub(crate) fn controller_configurations(
        &self,
        controller_addresses: &[(ControllerID, Ipv4Addr)],
        switch_addresses: &[(SwitchID, Ipv4Addr)],
    ) -> Vec<(Ipv4Addr, ControllerConfiguration)> {
        let peer_switches: Vec<_> = switch_addresses
            .iter()
            .map(|(_, address)| Endpoint::new(*address, self.switch_port))
            .collect();

        controller_addresses
            .iter()
            .map(|(id, address)| {
                let peer_controllers = controller_addresses
                    .iter()
                    .filter(|(peer_id, _)| peer_id != id)
                    .map(|(_, peer_address)| {
                        Endpoint::new(*peer_address, self.controller_port)
                    })
                    .collect();
                let config = ControllerConfiguration::builder()
                    .id(*id)
                    .port(self.controller_port)
                    .peer_controllers(peer_controllers)
                    .peer_switches(peer_switches.clone())
                    .ping_controllers_interval(self.ping_controllers_interval)
                    .ping_switches_interval(self.ping_switches_interval)
                    .max_epoch(Epoch::new(self.max_epoch))
                    .msg_buffer_capacity(BufferSize::new(self.msg_buffer_capacity))
                    .build();
                (*address, config)
            })
            .collect()
    }

    pub(crate) fn switch_configuration(&self, id: SwitchID) -> SwitchConfiguration {
        SwitchConfiguration::builder()
            .id(id)
            .port(self.switch_port)
            .window_duration(self.window_duration)
            .max_violation_count(ViolationCount::new(self.max_violation_count))
            .violation_policy(self.violation_policy)
            .stability_check(self.stability_check)
            .echo_responses(self.echo_responses)
            .build()
    }
}

/// Where [`Simulation::install`](super::Simulation::install) put each node.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InstalledControlPlane {
    pub controllers: Vec<(ControllerID, Ipv4Addr)>,
    pub switches: Vec<(SwitchID, Ipv4Addr)>,
}

impl InstalledControlPlane {
    pub fn controller_address(&self, id: ControllerID) -> Option<Ipv4Addr> {
        self.controllers
            .iter()
            .find(|(controller, _)| *controller == id)
            .map(|(_, address)| *address)
    }

    pub fn controller_addresses(&self) -> Vec<Ipv4Addr> {
        self.controllers.iter().map(|(_, address)| *address).collect()
    }

    pub fn switch_addresses(&self) -> Vec<Ipv4Addr> {
        self.switches.iter().map(|(_, address)| *address).collect()
    }
}
