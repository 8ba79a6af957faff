//! Timer events: INIT, START, STOP, DISCARD, HEARTBEAT.
//!
//! Every event except INIT carries the span id it refers to.

use super::{kind_mismatch, EventData, EventMessage, TimerEvent};
use crate::chrono::TimePoint;
use crate::core::Result;
use crate::metrics::{MetricKind, SpanId, Timer};

pub fn create_init_event(name: impl Into<String>, timestamp: TimePoint) -> EventMessage {
    EventMessage::new(name, timestamp, EventData::Timer(TimerEvent::Init))
}

pub fn create_start_event(name: impl Into<String>, id: SpanId, timestamp: TimePoint) -> EventMessage {
    EventMessage::new(name, timestamp, EventData::Timer(TimerEvent::Start(id)))
}

pub fn create_stop_event(name: impl Into<String>, id: SpanId, timestamp: TimePoint) -> EventMessage {
    EventMessage::new(name, timestamp, EventData::Timer(TimerEvent::Stop(id)))
}

pub fn create_discard_event(name: impl Into<String>, id: SpanId, timestamp: TimePoint) -> EventMessage {
    EventMessage::new(name, timestamp, EventData::Timer(TimerEvent::Discard(id)))
}

pub fn create_heartbeat_event(name: impl Into<String>, id: SpanId, timestamp: TimePoint) -> EventMessage {
    EventMessage::new(name, timestamp, EventData::Timer(TimerEvent::Heartbeat(id)))
}

pub fn process_event(timer: &mut Timer, message: &EventMessage) -> Result<()> {
    let EventData::Timer(event) = message.data() else {
        return Err(kind_mismatch(MetricKind::Timer, message));
    };

    let timestamp = message.timestamp();
    match *event {
        TimerEvent::Init => {},
        TimerEvent::Start(id) => {
            timer.start(id, timestamp);
        },
        TimerEvent::Stop(id) => {
            timer.stop(id, timestamp)?;
        },
        TimerEvent::Discard(id) => {
            timer.discard(id);
        },
        TimerEvent::Heartbeat(id) => {
            timer.heartbeat(id, timestamp);
        },
    }
    Ok(())
}
