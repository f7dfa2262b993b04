//! cep.rs
//! Wiring between the per-sensor [`ClassifierState`] pool and the action
//! dispatch table (§4.6): turns one inbound [`Event`] into the notification
//! records that belong on it and the routing keys it should be published
//! under.

use dashmap::DashMap;

use crate::classifier::ClassifierState;
use crate::config::PipelineConfig;
use crate::model::{Event, SensorId};
use crate::notification::{Action, ActionWhitelist, Notification};

/// One classifier per sensor id, so the engine generalizes beyond the
/// single shared stream the source processes (§4.6, §9). Keyed by a
/// `DashMap` rather than a plain `HashMap` behind a lock: `process` takes
/// `&self`, so several event-processing tasks can classify different
/// sensors' readings concurrently without contending on one mutex.
pub struct CepEngine {
    classifiers: DashMap<SensorId, ClassifierState>,
    whitelist: ActionWhitelist,
    window_size: usize,
    max_length: usize,
    warmup: usize,
}

/// A classification ready to be dispatched: the event it was produced on,
/// carrying its own `notification`, plus which downstream actions fire.
pub struct Dispatch {
    pub event: Event,
    pub send_event: bool,
    pub cep_agg: bool,
}

impl CepEngine {
    /// Builds an engine with the fixed classifier constants. Prefer
    /// [`with_config`](Self::with_config) in a running binary.
    pub fn new(whitelist: ActionWhitelist) -> Self {
        Self::with_config(whitelist, &PipelineConfig::default())
    }

    /// Builds an engine whose per-sensor classifiers are seeded from a
    /// loaded [`PipelineConfig`] rather than the classifier module's
    /// constants (§4.10).
    pub fn with_config(whitelist: ActionWhitelist, config: &PipelineConfig) -> Self {
        Self {
            classifiers: DashMap::new(),
            whitelist,
            window_size: config.window_size,
            max_length: config.max_length,
            warmup: config.warmup,
        }
    }

    /// Classifies `event.speed` against that sensor's rolling state and
    /// returns one [`Dispatch`] per yielded classification level (§4.6
    /// implementer's note: a single event may yield more than one level).
    pub fn process(&self, event: Event) -> Vec<Dispatch> {
        let mut classifier = self
            .classifiers
            .entry(event.sensor_id)
            .or_insert_with(|| ClassifierState::with_limits(self.window_size, self.max_length, self.warmup));
        let classifications = classifier.classify(event.speed);

        classifications
            .into_iter()
            .map(|classification| {
                let mut dispatched = event.clone();
                dispatched.notification = Some(Notification::new(classification.level, classification.percentage_variation));
                Dispatch {
                    send_event: self.whitelist.allows(Action::SendEvent, classification.level),
                    cep_agg: self.whitelist.allows(Action::CepAgg, classification.level),
                    event: dispatched,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Event;
    use crate::notification::NotificationLevel;

    #[test]
    fn each_sensor_gets_independent_classifier_state() {
        let engine = CepEngine::new(ActionWhitelist::default_policy());

        for _ in 0..500 {
            engine.process(Event::new(1, 0, 80.0, 0));
        }
        // sensor 2 has seen nothing yet; a single reading falls back to the
        // plain mean (itself), so variation is 0 and it's classified IGNORE
        let dispatches = engine.process(Event::new(2, 0, 3.0, 0));
        assert_eq!(dispatches.len(), 2);
        assert_eq!(dispatches[0].event.notification.unwrap().level, NotificationLevel::ExceptionMin);
        assert_eq!(dispatches[1].event.notification.unwrap().level, NotificationLevel::Ignore);

        // sensor 1's 501st reading still uses its own warmed-up history
        let dispatches = engine.process(Event::new(1, 0, 3.0, 0));
        assert_eq!(dispatches[1].event.notification.unwrap().level, NotificationLevel::Exception);
    }

    #[test]
    fn dispatch_flags_follow_the_whitelist() {
        let engine = CepEngine::new(ActionWhitelist::default_policy());
        let dispatches = engine.process(Event::new(9, 0, 3.0, 0));
        let exception_min = &dispatches[0];
        assert!(exception_min.send_event);
        assert!(exception_min.cep_agg);
    }
}
