use thiserror::Error;

/// Errors raised while configuring or preparing a pod status check.
///
/// Failures of the query itself are never surfaced as errors; they turn into a
/// negative check result instead.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConditionError {
    /// The expected status is not one of the recognized labels.
    #[error("unknown pod status {0:?}, expected one of RUNNING, COMPLETED")]
    UnknownStatus(String),
    /// The pod name was empty once its placeholders were resolved.
    #[error("pod name is empty after resolving placeholders")]
    EmptyPodName,
}
