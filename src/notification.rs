//! notification.rs
//! The closed notification taxonomy emitted by the CEP engine and aggregator,
//! plus the action whitelist that gates what a notification is allowed to
//! trigger downstream.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::config::PipelineConfig;

/// Fixed notify ids, matching the source's `cep_tools` table rather than its
/// raw enum values: the source's own ids (0..6) are an internal detail the
/// generator and receiver never see, this is what goes on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationLevel {
    Recovery,
    Ignore,
    Warning,
    Critical,
    Exception,
    ExceptionMin,
    ExceptionMax,
    ExceptionAgg,
}

impl NotificationLevel {
    /// The wire `notify_id`, fixed by the spec's taxonomy table.
    pub fn notify_id(self) -> i8 {
        match self {
            NotificationLevel::Recovery => -1,
            NotificationLevel::Ignore => 0,
            NotificationLevel::Warning => 1,
            NotificationLevel::Critical => 2,
            NotificationLevel::Exception => 3,
            NotificationLevel::ExceptionMin => 4,
            NotificationLevel::ExceptionMax => 5,
            NotificationLevel::ExceptionAgg => 10,
        }
    }

    /// Inverse of [`notify_id`](Self::notify_id); `None` for an id outside
    /// the closed taxonomy (e.g. a stray value from a hand-edited config).
    pub fn from_notify_id(notify_id: i8) -> Option<Self> {
        match notify_id {
            -1 => Some(NotificationLevel::Recovery),
            0 => Some(NotificationLevel::Ignore),
            1 => Some(NotificationLevel::Warning),
            2 => Some(NotificationLevel::Critical),
            3 => Some(NotificationLevel::Exception),
            4 => Some(NotificationLevel::ExceptionMin),
            5 => Some(NotificationLevel::ExceptionMax),
            10 => Some(NotificationLevel::ExceptionAgg),
            _ => None,
        }
    }

    /// The outgoing routing key used both for `send_event` publishes and
    /// for the data sink's CSV `type` column, fixed by the taxonomy table.
    pub fn routing_key(self) -> &'static str {
        match self {
            NotificationLevel::Recovery => "recovery.avg",
            NotificationLevel::Ignore => "ignore.avg",
            NotificationLevel::Warning => "warning.avg",
            NotificationLevel::Critical => "critical.avg",
            NotificationLevel::Exception => "exception.avg",
            NotificationLevel::ExceptionMin => "exception.min",
            NotificationLevel::ExceptionMax => "exception.max",
            NotificationLevel::ExceptionAgg => "exception.agg",
        }
    }
}

/// What a notification, once classified, is permitted to trigger. Mirrors
/// the source's `functions = {'send_event': ..., 'cep_agg': ...}` dispatch
/// map, keyed by a per-deployment whitelist rather than hardcoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    SendEvent,
    CepAgg,
}

/// A classification result attached to an event once it clears the CEP
/// engine. `level` is always present; `IGNORE` notifications still carry one
/// so the generator-side consumer doesn't need to special-case a missing
/// field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub notify_id: i8,
    pub percentage_variation: f64,
}

impl Notification {
    pub fn new(level: NotificationLevel, percentage_variation: f64) -> Self {
        Self {
            level,
            notify_id: level.notify_id(),
            percentage_variation,
        }
    }
}

/// Which actions a given notification level is configured to trigger.
///
/// The source guards every dispatch with `conf.cep['events'][action]`, a
/// deployment-configured whitelist of levels allowed to fire each action;
/// this is that whitelist, built from the classifier/aggregator config.
#[derive(Debug, Clone, Default)]
pub struct ActionWhitelist {
    send_event: HashSet<NotificationLevel>,
    cep_agg: HashSet<NotificationLevel>,
}

impl ActionWhitelist {
    pub fn new(send_event: HashSet<NotificationLevel>, cep_agg: HashSet<NotificationLevel>) -> Self {
        Self { send_event, cep_agg }
    }

    /// The notify ids eligible for `send_event` in the fixed deployment
    /// default: every non-IGNORE level.
    pub fn default_send_event_ids() -> Vec<i8> {
        use NotificationLevel::*;
        [Recovery, Warning, Critical, Exception, ExceptionMin, ExceptionMax, ExceptionAgg]
            .into_iter()
            .map(NotificationLevel::notify_id)
            .collect()
    }

    /// The notify ids eligible for `cep_agg` in the fixed deployment
    /// default: CRITICAL, EXCEPTION, and EXCEPTION_MIN.
    pub fn default_cep_agg_ids() -> Vec<i8> {
        use NotificationLevel::*;
        [Critical, Exception, ExceptionMin].into_iter().map(NotificationLevel::notify_id).collect()
    }

    /// The fixed deployment default, matching the notify_id/action table.
    /// Equivalent to `from_config(&PipelineConfig::default())`.
    pub fn default_policy() -> Self {
        Self::from_ids(&Self::default_send_event_ids(), &Self::default_cep_agg_ids())
    }

    /// Builds the whitelist from a loaded [`PipelineConfig`]'s per-action
    /// notify-id lists (§4.10), rather than the hardcoded default.
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::from_ids(&config.send_event_notify_ids, &config.cep_agg_notify_ids)
    }

    fn from_ids(send_event_ids: &[i8], cep_agg_ids: &[i8]) -> Self {
        let to_set = |ids: &[i8]| ids.iter().filter_map(|&id| NotificationLevel::from_notify_id(id)).collect();
        Self {
            send_event: to_set(send_event_ids),
            cep_agg: to_set(cep_agg_ids),
        }
    }

    pub fn allows(&self, action: Action, level: NotificationLevel) -> bool {
        match action {
            Action::SendEvent => self.send_event.contains(&level),
            Action::CepAgg => self.cep_agg.contains(&level),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notify_ids_match_the_fixed_taxonomy() {
        assert_eq!(NotificationLevel::Recovery.notify_id(), -1);
        assert_eq!(NotificationLevel::Ignore.notify_id(), 0);
        assert_eq!(NotificationLevel::Warning.notify_id(), 1);
        assert_eq!(NotificationLevel::Critical.notify_id(), 2);
        assert_eq!(NotificationLevel::Exception.notify_id(), 3);
        assert_eq!(NotificationLevel::ExceptionMin.notify_id(), 4);
        assert_eq!(NotificationLevel::ExceptionMax.notify_id(), 5);
        assert_eq!(NotificationLevel::ExceptionAgg.notify_id(), 10);
    }

    #[test]
    fn default_policy_gates_ignore_out_of_everything() {
        let policy = ActionWhitelist::default_policy();
        assert!(!policy.allows(Action::SendEvent, NotificationLevel::Ignore));
        assert!(!policy.allows(Action::CepAgg, NotificationLevel::Ignore));
        assert!(policy.allows(Action::SendEvent, NotificationLevel::Recovery));
        assert!(!policy.allows(Action::CepAgg, NotificationLevel::Recovery));
        assert!(policy.allows(Action::CepAgg, NotificationLevel::Critical));
        assert!(policy.allows(Action::CepAgg, NotificationLevel::ExceptionMin));
        assert!(!policy.allows(Action::CepAgg, NotificationLevel::ExceptionMax));
    }

    #[test]
    fn routing_keys_match_the_fixed_taxonomy() {
        assert_eq!(NotificationLevel::Recovery.routing_key(), "recovery.avg");
        assert_eq!(NotificationLevel::ExceptionMin.routing_key(), "exception.min");
        assert_eq!(NotificationLevel::ExceptionAgg.routing_key(), "exception.agg");
    }

    #[test]
    fn notification_serializes_with_screaming_snake_level() {
        let n = Notification::new(NotificationLevel::ExceptionMax, 42.5);
        let encoded = serde_json::to_string(&n).unwrap();
        assert!(encoded.contains("\"EXCEPTION_MAX\""));
        assert!(encoded.contains("\"notify_id\":5"));
    }

    #[test]
    fn from_config_matches_default_policy_on_default_config() {
        let from_config = ActionWhitelist::from_config(&PipelineConfig::default());
        for level in [
            NotificationLevel::Recovery,
            NotificationLevel::Ignore,
            NotificationLevel::Warning,
            NotificationLevel::Critical,
            NotificationLevel::Exception,
            NotificationLevel::ExceptionMin,
            NotificationLevel::ExceptionMax,
            NotificationLevel::ExceptionAgg,
        ] {
            assert_eq!(
                from_config.allows(Action::SendEvent, level),
                ActionWhitelist::default_policy().allows(Action::SendEvent, level)
            );
            assert_eq!(
                from_config.allows(Action::CepAgg, level),
                ActionWhitelist::default_policy().allows(Action::CepAgg, level)
            );
        }
    }

    #[test]
    fn from_config_honors_a_trimmed_whitelist() {
        let mut config = PipelineConfig::default();
        config.cep_agg_notify_ids = vec![NotificationLevel::Exception.notify_id()];
        let whitelist = ActionWhitelist::from_config(&config);
        assert!(whitelist.allows(Action::CepAgg, NotificationLevel::Exception));
        assert!(!whitelist.allows(Action::CepAgg, NotificationLevel::Critical));
    }
}
