//! # Scheduler Errors
//!
//! Every error is returned synchronously from a configuration or lifecycle
//! call. Runtime anomalies (task overruns) are counted, not raised.

use core::fmt;

/// Failure of a registration or lifecycle call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerError {
    /// The task table already holds its fixed capacity.
    CapacityExceeded,
    /// The task action is unset or an interval is out of range.
    InvalidArgument,
    /// The scheduler has not been initialized.
    NotConfigured,
    /// `start()` was called while the scheduler is already running.
    AlreadyRunning,
    /// The table is frozen: the scheduler is running or has been started.
    SchedulerRunning,
    /// `stop()` was called while the scheduler is not running.
    NotRunning,
}

impl fmt::Display for SchedulerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            SchedulerError::CapacityExceeded => "task table is full",
            SchedulerError::InvalidArgument => "invalid task action, offset or period",
            SchedulerError::NotConfigured => "scheduler is not initialized",
            SchedulerError::AlreadyRunning => "scheduler is already running",
            SchedulerError::SchedulerRunning => "task table is frozen once the scheduler has started",
            SchedulerError::NotRunning => "scheduler is not running",
        };
        f.write_str(msg)
    }
}
