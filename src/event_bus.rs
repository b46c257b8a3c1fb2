//! Dispatch of [events](crate::events) to registered handlers.
//!
//! Nodes publish events into a channel. The host owns the receiving end and calls
//! [`EventHandlers::drain`] between callbacks, so handlers run in the same virtual-time order as the
//! events they observe.

use crate::events::*;
use crate::logging::Logger;
use std::sync::mpsc::Receiver;

pub(crate) type HandlerPtr<T> = Box<dyn Fn(&T) + Send>;

/// Lists of handlers, one list per kind of event.
#[derive(Default)]
pub struct EventHandlers {
    pub(crate) ping_controllers_handlers: Vec<HandlerPtr<PingControllersEvent>>,
    pub(crate) ping_switches_handlers: Vec<HandlerPtr<PingSwitchesEvent>>,
    pub(crate) select_leader_handlers: Vec<HandlerPtr<SelectLeaderEvent>>,
    pub(crate) receive_control_message_handlers: Vec<HandlerPtr<ReceiveControlMessageEvent>>,
    pub(crate) buffer_message_handlers: Vec<HandlerPtr<BufferMessageEvent>>,
    pub(crate) discard_message_handlers: Vec<HandlerPtr<DiscardMessageEvent>>,
    pub(crate) reach_max_epoch_handlers: Vec<HandlerPtr<ReachMaxEpochEvent>>,
    pub(crate) receive_switch_ping_handlers: Vec<HandlerPtr<ReceiveSwitchPingEvent>>,
    pub(crate) close_window_handlers: Vec<HandlerPtr<CloseWindowEvent>>,
    pub(crate) report_violation_handlers: Vec<HandlerPtr<ReportViolationEvent>>,
}

impl EventHandlers {
    /// Create a set of event handlers. If `log_events` is true, the default [logging](crate::logging)
    /// handler is registered for every kind of event.
    pub fn new(log_events: bool) -> Self {
        let mut handlers = Self::default();
        if log_events {
            handlers.ping_controllers_handlers.push(PingControllersEvent::get_logger());
            handlers.ping_switches_handlers.push(PingSwitchesEvent::get_logger());
            handlers.select_leader_handlers.push(SelectLeaderEvent::get_logger());
            handlers
                .receive_control_message_handlers
                .push(ReceiveControlMessageEvent::get_logger());
            handlers.buffer_message_handlers.push(BufferMessageEvent::get_logger());
            handlers.discard_message_handlers.push(DiscardMessageEvent::get_logger());
            handlers.reach_max_epoch_handlers.push(ReachMaxEpochEvent::get_logger());
            handlers
                .receive_switch_ping_handlers
                .push(ReceiveSwitchPingEvent::get_logger());
            handlers.close_window_handlers.push(CloseWindowEvent::get_logger());
            handlers.report_violation_handlers.push(ReportViolationEvent::get_logger());
        }
        handlers
    }

    pub fn on_ping_controllers(&mut self, handler: impl Fn(&PingControllersEvent) + Send + 'static) {
        self.ping_controllers_handlers.push(Box::new(handler))
    }

    pub fn on_ping_switches(&mut self, handler: impl Fn(&PingSwitchesEvent) + Send + 'static) {
        self.ping_switches_handlers.push(Box::new(handler))
    }

    pub fn on_select_leader(&mut self, handler: impl Fn(&SelectLeaderEvent) + Send + 'static) {
        self.select_leader_handlers.push(Box::new(handler))
    }

    pub fn on_receive_control_message(
        &mut self,
        handler: impl Fn(&ReceiveControlMessageEvent) + Send + 'static,
    ) {
        self.receive_control_message_handlers.push(Box::new(handler))
    }

    pub fn on_buffer_message(&mut self, handler: impl Fn(&BufferMessageEvent) + Send + 'static) {
        self.buffer_message_handlers.push(Box::new(handler))
    }

    pub fn on_discard_message(&mut self, handler: impl Fn(&DiscardMessageEvent) + Send + 'static) {
        self.discard_message_handlers.push(Box::new(handler))
    }

    pub fn on_reach_max_epoch(&mut self, handler: impl Fn(&ReachMaxEpochEvent) + Send + 'static) {
        self.reach_max_epoch_handlers.push(Box::new(handler))
    }

    pub fn on_receive_switch_ping(
        &mut self,
        handler: impl Fn(&ReceiveSwitchPingEvent) + Send + 'static,
    ) {
        self.receive_switch_ping_handlers.push(Box::new(handler))
    }

    pub fn on_close_window(&mut self, handler: impl Fn(&CloseWindowEvent) + Send + 'static) {
        self.close_window_handlers.push(Box::new(handler))
    }

    pub fn on_report_violation(&mut self, handler: impl Fn(&ReportViolationEvent) + Send + 'static) {
        self.report_violation_handlers.push(Box::new(handler))
    }

    pub fn fire_handlers(&self, event: Event) {
        match event {
            Event::PingControllers(ping_controllers_event) =>
                self.ping_controllers_handlers.iter().for_each(|handler| handler(&ping_controllers_event)),

            Event::PingSwitches(ping_switches_event) =>
                self.ping_switches_handlers.iter().for_each(|handler| handler(&ping_switches_event)),

            Event::SelectLeader(select_leader_event) =>
                self.select_leader_handlers.iter().for_each(|handler| handler(&select_leader_event)),

            Event::ReceiveControlMessage(receive_control_message_event) =>
                self.receive_control_message_handlers.iter().for_each(|handler| handler(&receive_control_message_event)),

            Event::BufferMessage(buffer_message_event) =>
                self.buffer_message_handlers.iter().for_each(|handler| handler(&buffer_message_event)),

            Event::DiscardMessage(discard_message_event) =>
                self.discard_message_handlers.iter().for_each(|handler| handler(&discard_message_event)),

            Event::ReachMaxEpoch(reach_max_epoch_event) =>
                self.reach_max_epoch_handlers.iter().for_each(|handler| handler(&reach_max_epoch_event)),

            Event::ReceiveSwitchPing(receive_switch_ping_event) =>
                self.receive_switch_ping_handlers.iter().for_each(|handler| handler(&receive_switch_ping_event)),

            Event::CloseWindow(close_window_event) =>
                self.close_window_handlers.iter().for_each(|handler| handler(&close_window_event)),

            Event::ReportViolation(report_violation_event) =>
                self.report_violation_handlers.iter().for_each(|handler| handler(&report_violation_event)),
        }
    }

    /// Fire the handlers of every event waiting in `event_subscriber`, in publication order.
    pub fn drain(&self, event_subscriber: &Receiver<Event>) {
        while let Ok(event) = event_subscriber.try_recv() {
            self.fire_handlers(event)
        }
    }
}
