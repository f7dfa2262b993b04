//! aggregator.rs
//! Spatial-adjacency aggregation (§4.7): groups sensor readings that arrive
//! within the same time bucket and emits a synthetic EXCEPTION_AGG event for
//! every maximal run of consecutive sensor ids of length ≥ 2.
//!
//! `ts_base` advances on strict `>` (source semantics, preserved as-is per
//! §9): an event whose bucket equals the current `ts_base` still
//! accumulates into the open bucket, but one whose bucket falls *behind*
//! `ts_base` is silently dropped rather than reopening an already-finalized
//! bucket. This is a known quirk of the original system, not a bug fix
//! opportunity.

use std::collections::{BTreeMap, BTreeSet};

use crate::model::{Event, Profiler};
use crate::notification::{Notification, NotificationLevel};
use crate::stats::get_consecutive;

/// Bucket width in epoch seconds.
pub const BUCKET_WIDTH_SECS: i64 = 3600;

pub fn bucket_of(event_ts: i64, width: i64) -> i64 {
    event_ts - event_ts.rem_euclid(width)
}

pub struct AggregatorState {
    buckets: BTreeMap<i64, BTreeSet<i64>>,
    ts_base: Option<i64>,
    next_event_id: u64,
    bucket_width: i64,
}

impl AggregatorState {
    pub fn new(bucket_width: i64) -> Self {
        Self {
            buckets: BTreeMap::new(),
            ts_base: None,
            next_event_id: 0,
            bucket_width,
        }
    }

    /// Inserts one sensor reading and returns any synthetic events finalized
    /// as a side effect (usually none).
    pub fn ingest(&mut self, sensor_id: i64, event_ts: i64) -> Vec<Event> {
        let bucket = bucket_of(event_ts, self.bucket_width);

        let ts_base = *self.ts_base.get_or_insert(bucket);

        let mut emitted = Vec::new();
        if bucket > ts_base {
            emitted.extend(self.finalize(ts_base));
            self.ts_base = Some(bucket);
            self.buckets.entry(bucket).or_default().insert(sensor_id);
        } else if bucket == ts_base {
            self.buckets.entry(bucket).or_default().insert(sensor_id);
        }
        // bucket < ts_base: the bucket was already finalized and cleared;
        // the reading is dropped, matching source semantics.

        emitted
    }

    /// Finalizes every remaining open bucket, in ascending order. Called on
    /// graceful shutdown so no accumulated run is lost.
    pub fn finalize_remaining(&mut self) -> Vec<Event> {
        let bucket_keys: Vec<i64> = self.buckets.keys().copied().collect();
        let mut emitted = Vec::new();
        for bucket in bucket_keys {
            emitted.extend(self.finalize(bucket));
        }
        self.ts_base = None;
        emitted
    }

    fn finalize(&mut self, bucket: i64) -> Vec<Event> {
        let Some(ids) = self.buckets.remove(&bucket) else {
            return Vec::new();
        };
        let sorted: Vec<i64> = ids.into_iter().collect();
        let runs = get_consecutive(&sorted);

        runs.into_iter()
            .filter(|run| run.len() >= 2)
            .map(|run| self.make_synthetic_event(bucket, run))
            .collect()
    }

    fn make_synthetic_event(&mut self, bucket: i64, run: Vec<i64>) -> Event {
        let event_id = self.next_event_id;
        self.next_event_id += 1;

        let sensor_ids: Vec<String> = run.iter().map(|id| id.to_string()).collect();
        let notification = Notification::new(NotificationLevel::ExceptionAgg, 0.0);

        Event {
            sensor_id: -1,
            event_id,
            speed: 0.0,
            event_ts: bucket,
            profiler: Profiler {
                aggregator_ts: Some(crate::model::now_epoch_secs()),
                ..Default::default()
            },
            event_ts_upper: Some(bucket + self.bucket_width),
            sensor_ids: Some(sensor_ids),
            notification: Some(notification),
        }
    }
}
