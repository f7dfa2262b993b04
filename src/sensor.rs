//! sensor.rs
//! Per-sensor re-emission (§4.3): one process per `sensor_id`, subscribing
//! to the generator bus filtered on its own id string and re-publishing
//! under the fixed routing key `"event"`.

use crate::model::{now_epoch_secs, Event};

/// The fixed outgoing routing key every sensor process re-publishes under,
/// regardless of its own sensor id (the receiver fans in on this key).
pub const EVENT_ROUTING_KEY: &str = "event";

/// Stamps `profiler.sensor_received_ts` on an event freshly received from
/// the generator bus, ready for re-emission toward the receiver.
pub fn stamp_received(mut event: Event) -> Event {
    event.profiler.sensor_received_ts = Some(now_epoch_secs());
    event
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stamping_sets_only_the_sensor_received_field() {
        let event = Event::new(1, 0, 80.0, 0);
        let stamped = stamp_received(event);
        assert!(stamped.profiler.sensor_received_ts.is_some());
        assert!(stamped.profiler.receiver_ts.is_none());
    }
}
