//! model.rs
//! Wire data model for the traffic CEP pipeline.
//!
//! Replaces the source's duck-typed message dict with a tagged struct: a
//! strongly-typed `Profiler` sub-record and an optional `Notification` that
//! is only present once an event has passed through the CEP engine.
//! JSON shape is preserved field-for-field so every stage can deserialize
//! what the previous stage produced.

use serde::{Deserialize, Serialize};

use crate::notification::Notification;

/// Sensor identifiers are small non-negative integers in the trace, but the
/// aggregator's synthetic EXCEPTION_AGG events use `-1` as a sentinel
/// ("synthetic", not a real sensor), so the wire type is signed.
pub type SensorId = i64;

/// Per-stage wall-clock timestamps, appended to exactly once per stage.
///
/// Fields are epoch seconds as floating point (matching `time.time()` in the
/// source); later stages only ever set the field that belongs to them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Profiler {
    pub created_ts: Option<f64>,
    pub sensor_received_ts: Option<f64>,
    pub receiver_ts: Option<f64>,
    pub data_ts: Option<f64>,
    pub aggregator_ts: Option<f64>,
}

impl Profiler {
    pub fn with_created_now() -> Self {
        Self {
            created_ts: Some(now_epoch_secs()),
            ..Default::default()
        }
    }
}

/// Current epoch time in seconds, matching Python's `time.time()` precision.
pub fn now_epoch_secs() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

/// The unit flowing through every stage of the pipeline.
///
/// `sensor_id` is never mutated after the generator emits it; `event_ts` is
/// set once by the generator. `sensor_ids` and `event_ts_upper` are only
/// populated on synthetic EXCEPTION_AGG events emitted by the aggregator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub sensor_id: SensorId,
    pub event_id: u64,
    pub speed: f64,
    pub event_ts: i64,
    pub profiler: Profiler,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_ts_upper: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensor_ids: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification: Option<Notification>,
}

impl Event {
    pub fn new(sensor_id: SensorId, event_id: u64, speed: f64, event_ts: i64) -> Self {
        Self {
            sensor_id,
            event_id,
            speed,
            event_ts,
            profiler: Profiler::with_created_now(),
            event_ts_upper: None,
            sensor_ids: None,
            notification: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_round_trips_through_json() {
        let mut event = Event::new(42, 7, 88.3, 1_700_000_000);
        event.profiler.sensor_received_ts = Some(1_700_000_001.5);

        let encoded = serde_json::to_vec(&event).expect("serialize");
        let decoded: Event = serde_json::from_slice(&encoded).expect("deserialize");

        assert_eq!(decoded.sensor_id, event.sensor_id);
        assert_eq!(decoded.event_id, event.event_id);
        assert!((decoded.speed - event.speed).abs() < 1e-9);
        assert_eq!(decoded.event_ts, event.event_ts);
        assert_eq!(decoded.profiler, event.profiler);
        assert_eq!(decoded.notification, event.notification);
    }

    #[test]
    fn notification_omitted_when_absent() {
        let event = Event::new(1, 1, 50.0, 0);
        let encoded = serde_json::to_string(&event).expect("serialize");
        assert!(!encoded.contains("notification"));
    }
}
