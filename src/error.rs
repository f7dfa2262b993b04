//! error.rs
//! The three error kinds every processor in the pipeline deals with (§7):
//! transient transport hiccups, bad data on the wire, and fatal setup
//! failures. Modeled as a typed enum rather than the teacher's
//! `Box<dyn Error>`, since each kind gets a distinct recovery policy in the
//! caller (retry silently, log-and-skip, or propagate-and-exit).

use thiserror::Error;

/// A transport- or data-level failure observed while running one of the
/// seven processors.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Transport hiccup or a transient peer absence. The caller's loop
    /// continues; the transport layer owns reconnection, there is no
    /// explicit retry here.
    #[error("transient transport error: {0}")]
    Transient(#[source] std::io::Error),

    /// Malformed payload: bad JSON, a missing required field, or an
    /// unrecognized routing key. Always recoverable by dropping the single
    /// offending message; never fatal to the process.
    #[error("data error on routing key {routing_key:?}: {reason}")]
    Data { routing_key: String, reason: String },

    /// Unrecoverable: a malformed CSV row in the generator's input, a
    /// socket bind failure, or any other condition the process cannot run
    /// without. Propagated to `main`, which exits non-zero.
    #[error("fatal error: {0}")]
    Fatal(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl PipelineError {
    pub fn data(routing_key: impl Into<String>, reason: impl Into<String>) -> Self {
        PipelineError::Data {
            routing_key: routing_key.into(),
            reason: reason.into(),
        }
    }

    pub fn fatal(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        PipelineError::Fatal(Box::new(err))
    }

    /// True for [`PipelineError::Transient`] and [`PipelineError::Data`]:
    /// both are recoverable within the current loop iteration.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, PipelineError::Fatal(_))
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        PipelineError::Transient(err)
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_and_transient_are_recoverable_fatal_is_not() {
        let data = PipelineError::data("agg", "missing sensor_id");
        assert!(data.is_recoverable());

        let transient: PipelineError = std::io::Error::new(std::io::ErrorKind::WouldBlock, "x").into();
        assert!(transient.is_recoverable());

        let fatal = PipelineError::fatal(std::io::Error::new(std::io::ErrorKind::AddrInUse, "bind failed"));
        assert!(!fatal.is_recoverable());
    }

    #[test]
    fn data_error_message_includes_routing_key() {
        let err = PipelineError::data("mystery.key", "unrecognized routing key");
        assert!(err.to_string().contains("mystery.key"));
    }
}
