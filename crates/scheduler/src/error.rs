use packwise_storage::GatewayError;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReminderError {
    /// The user refused notifications. Nothing in the batch was scheduled.
    #[error("notification permission denied")]
    PermissionDenied,

    #[error("failed to request notification permission: {0}")]
    Permission(#[source] GatewayError),

    #[error("failed to list scheduled notifications: {0}")]
    Query(#[source] GatewayError),

    #[error("failed to cancel reminders for trip {trip_id}: {source}")]
    Cancel {
        trip_id: String,
        #[source]
        source: GatewayError,
    },

    /// Per-reminder failure. Recorded in the batch report, never returned from
    /// a batch call.
    #[error("failed to schedule reminder {reminder_id}: {source}")]
    Scheduling {
        reminder_id: String,
        #[source]
        source: GatewayError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduleFailure {
    pub reminder_id: String,
    pub reason: String,
}
