//! receiver.rs
//! Fan-in from every sensor process into one stream (§4.4): binds a PULL
//! socket and re-publishes each event unchanged, with no filtering, on its
//! XPUB fan-out.

use crate::model::{now_epoch_secs, Event};

/// Stamps `profiler.receiver_ts`; the receiver forwards the routing key it
/// was given (always `"event"` from a well-behaved sensor) unchanged.
pub fn stamp_received(mut event: Event) -> Event {
    event.profiler.receiver_ts = Some(now_epoch_secs());
    event
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stamping_sets_receiver_ts() {
        let event = Event::new(1, 0, 80.0, 0);
        let stamped = stamp_received(event);
        assert!(stamped.profiler.receiver_ts.is_some());
    }
}
