//! Leader election among the controllers of a distributed SDN control plane, and detection of
//! split-brain by the switches they manage.
//!
//! The protocol itself lives in [`controller`] and [`switch`]. Both are driven entirely by a host
//! through the [`Transport`](networking::transport::Transport) and
//! [`Scheduler`](scheduling::Scheduler) traits; [`simulation`] provides a deterministic host.

pub mod config;

pub mod controller;

pub mod event_bus;

pub mod events;

pub mod logging;

pub mod messages;

pub mod networking;

pub mod scheduling;

pub mod simulation;

pub mod switch;

pub mod types;
