//! controller.rs
//! The tee between the data sink and the CEP engine (§4.5): subscribes to
//! the receiver's `"event"` stream and forwards each event on two
//! independent PUSH sockets. The source stamps this stage into the same
//! `receiver_ts` field the receiver itself uses rather than adding a new
//! one; preserved here rather than introducing a field the data model
//! doesn't otherwise have.
//!
//! The two downstream sends are independent: a slow CEP engine must not
//! block the data-sink branch beyond ordinary transport backpressure (§4.5,
//! §5), so callers send on both PUSH sockets rather than awaiting one
//! before starting the other.

use crate::model::{now_epoch_secs, Event};

pub const SUBSCRIBE_FILTER: &str = "event";

pub fn stamp_forwarded(mut event: Event) -> Event {
    event.profiler.receiver_ts = Some(now_epoch_secs());
    event
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stamping_does_not_clobber_an_earlier_receiver_ts() {
        let mut event = Event::new(1, 0, 80.0, 0);
        event.profiler.receiver_ts = Some(1.0);
        let stamped = stamp_forwarded(event);
        assert!(stamped.profiler.receiver_ts.unwrap() > 1.0);
    }
}
