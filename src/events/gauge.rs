//! Gauge events: INIT, SET.

use super::{kind_mismatch, EventData, EventMessage, GaugeEvent};
use crate::chrono::TimePoint;
use crate::core::Result;
use crate::metrics::{Gauge, MetricKind};

pub fn create_init_event(name: impl Into<String>, value: f64, timestamp: TimePoint) -> EventMessage {
    EventMessage::new(name, timestamp, EventData::Gauge(GaugeEvent::Init(value)))
}

pub fn create_set_event(name: impl Into<String>, value: f64, timestamp: TimePoint) -> EventMessage {
    EventMessage::new(name, timestamp, EventData::Gauge(GaugeEvent::Set(value)))
}

pub fn process_event(gauge: &mut Gauge, message: &EventMessage) -> Result<()> {
    let EventData::Gauge(event) = message.data() else {
        return Err(kind_mismatch(MetricKind::Gauge, message));
    };

    match *event {
        GaugeEvent::Init(value) => gauge.init(value, message.timestamp()),
        GaugeEvent::Set(value) => gauge.set(value, message.timestamp()),
    }
}
