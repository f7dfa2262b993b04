//! config.rs
//! Layered pipeline configuration: built-in defaults, overridable by an
//! optional TOML file (`--config`), overridable in turn by `TRAFFIC_CEP_*`
//! environment variables. Per-binary transport-address flags (§6) are
//! parsed separately via `clap` in each `src/bin/*.rs` and layered on top
//! of this.

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Shared tunables every processor may need, independent of which
/// transport addresses it binds or connects to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub window_size: usize,
    pub max_length: usize,
    pub warmup: usize,
    pub bucket_width_secs: i64,

    /// Notify ids (§3) permitted to trigger `send_event`; see
    /// `ActionWhitelist::from_config`.
    pub send_event_notify_ids: Vec<i8>,

    /// Notify ids (§3) permitted to trigger `cep_agg`; see
    /// `ActionWhitelist::from_config`.
    pub cep_agg_notify_ids: Vec<i8>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            window_size: crate::classifier::WINDOW_SIZE,
            max_length: crate::classifier::MAX_LENGTH,
            warmup: crate::classifier::WARMUP,
            bucket_width_secs: crate::aggregator::BUCKET_WIDTH_SECS,
            send_event_notify_ids: crate::notification::ActionWhitelist::default_send_event_ids(),
            cep_agg_notify_ids: crate::notification::ActionWhitelist::default_cep_agg_ids(),
        }
    }
}

impl PipelineConfig {
    /// Loads defaults, then merges an optional TOML file, then environment
    /// variables prefixed `TRAFFIC_CEP_` (e.g. `TRAFFIC_CEP_WINDOW_SIZE`),
    /// in that precedence order.
    pub fn load(config_path: Option<&str>) -> Result<Self, PipelineError> {
        let defaults = PipelineConfig::default();

        let mut builder = config::Config::builder().add_source(
            config::Config::try_from(&defaults).map_err(|e| PipelineError::fatal(ConfigLoadError(e.to_string())))?,
        );

        if let Some(path) = config_path {
            builder = builder.add_source(config::File::from(std::path::Path::new(path)));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("TRAFFIC_CEP")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("send_event_notify_ids")
                .with_list_parse_key("cep_agg_notify_ids"),
        );

        let merged = builder
            .build()
            .map_err(|e| PipelineError::fatal(ConfigLoadError(e.to_string())))?;

        merged
            .try_deserialize()
            .map_err(|e| PipelineError::fatal(ConfigLoadError(e.to_string())))
    }
}

#[derive(Debug, thiserror::Error)]
#[error("configuration error: {0}")]
struct ConfigLoadError(String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_classifier_and_aggregator_constants() {
        let cfg = PipelineConfig::default();
        assert_eq!(cfg.window_size, 500);
        assert_eq!(cfg.max_length, 500_000);
        assert_eq!(cfg.warmup, 425);
        assert_eq!(cfg.bucket_width_secs, 3600);
        assert_eq!(cfg.send_event_notify_ids.len(), 7);
        assert_eq!(cfg.cep_agg_notify_ids, vec![2, 3, 4]);
    }

    #[test]
    fn load_with_no_file_falls_back_to_defaults() {
        let cfg = PipelineConfig::load(None).expect("defaults-only load should succeed");
        assert_eq!(cfg.window_size, 500);
    }

    #[test]
    fn load_with_a_toml_file_overrides_defaults() {
        let dir = std::env::temp_dir().join(format!("traffic_cep_config_test_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("pipeline.toml");
        std::fs::write(&path, "window_size = 50\nwarmup = 10\n").unwrap();

        let cfg = PipelineConfig::load(Some(path.to_str().unwrap())).expect("file-backed load should succeed");
        assert_eq!(cfg.window_size, 50);
        assert_eq!(cfg.warmup, 10);
        // fields not present in the file keep their defaults
        assert_eq!(cfg.max_length, 500_000);

        std::fs::remove_dir_all(&dir).ok();
    }
}
