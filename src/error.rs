use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by blocking and cancellable operations.
///
/// Contention (`LockUnavailable`) and business-rule refusals
/// (`InsufficientFunds`) are not errors; see [`crate::WithdrawResult`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The operation observed a cancelled [`crate::CancellationToken`] and stopped.
    #[error("operation cancelled")]
    Cancelled,

    /// A bounded wait for a lock ran out.
    #[error("lock not acquired within {waited:?}")]
    Timeout { waited: Duration },

    /// Withdrawals must be for a positive amount.
    #[error("withdrawal amount must be positive")]
    InvalidAmount,

    /// A worker thread panicked before reaching its terminal state.
    #[error("worker {name} panicked")]
    WorkerPanicked { name: String },

    /// The OS refused to spawn a worker thread.
    #[error("failed to spawn worker {name}: {reason}")]
    Spawn { name: String, reason: String },
}

pub type Result<T> = std::result::Result<T, Error>;
