//! Attribute events: SET.

use super::{kind_mismatch, AttributeEvent, EventData, EventMessage};
use crate::chrono::TimePoint;
use crate::core::Result;
use crate::metrics::{Attribute, AttributeValue, MetricKind};

pub fn create_set_event(
    name: impl Into<String>,
    value: impl Into<AttributeValue>,
    timestamp: TimePoint,
) -> EventMessage {
    EventMessage::new(name, timestamp, EventData::Attribute(AttributeEvent::Set(value.into())))
}

pub fn process_event(attribute: &mut Attribute, message: &EventMessage) -> Result<()> {
    let EventData::Attribute(AttributeEvent::Set(value)) = message.data() else {
        return Err(kind_mismatch(MetricKind::Attribute, message));
    };
    attribute.set(value.clone(), message.timestamp());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_set_wins() {
        let mut attribute = Attribute::new();
        let now = TimePoint::default();
        process_event(&mut attribute, &create_set_event("build", "a1", now)).unwrap();
        process_event(&mut attribute, &create_set_event("build", "b2", now)).unwrap();

        assert_eq!(attribute.value(), Some(&AttributeValue::from("b2")));
    }
}
