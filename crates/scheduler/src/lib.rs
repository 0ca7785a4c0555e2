mod error;

use std::sync::Arc;

use packwise_core::{
    generate_smart_reminders, Clock, ReminderSettings, SmartReminder, SubscriptionTier,
    SystemClock, Trip,
};
use packwise_observability::ReminderMetrics;
use packwise_storage::{NotificationContent, NotificationGateway};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

pub use error::{ReminderError, ScheduleFailure};

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub scheduled: Vec<String>,
    pub failed: Vec<ScheduleFailure>,
    pub skipped_past: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncOutcome {
    pub trip_id: String,
    pub enabled: bool,
    pub cancelled: usize,
    pub generated: usize,
    pub scheduled: Vec<String>,
    pub failed: Vec<ScheduleFailure>,
    pub skipped_past: usize,
}

/// Keeps a trip's notifications in the gateway in line with its current
/// packing state. Holds no reminder state of its own: every call re-queries
/// the gateway and reconciles by cancel-then-create.
pub struct ReminderScheduler<G, C = SystemClock>
where
    G: NotificationGateway,
    C: Clock,
{
    gateway: Arc<G>,
    clock: C,
    metrics: Arc<ReminderMetrics>,
}

impl<G> ReminderScheduler<G, SystemClock>
where
    G: NotificationGateway,
{
    pub fn new(gateway: Arc<G>, metrics: Arc<ReminderMetrics>) -> Self {
        Self::with_clock(gateway, SystemClock, metrics)
    }
}

impl<G, C> ReminderScheduler<G, C>
where
    G: NotificationGateway,
    C: Clock,
{
    pub fn with_clock(gateway: Arc<G>, clock: C, metrics: Arc<ReminderMetrics>) -> Self {
        Self {
            gateway,
            clock,
            metrics,
        }
    }

    pub fn gateway(&self) -> &Arc<G> {
        &self.gateway
    }

    pub fn metrics(&self) -> &Arc<ReminderMetrics> {
        &self.metrics
    }

    /// Pure: no gateway access.
    pub fn generate_smart_reminders(
        &self,
        trip: &Trip,
        settings: &ReminderSettings,
        is_premium: bool,
    ) -> Vec<SmartReminder> {
        generate_smart_reminders(
            trip,
            settings,
            SubscriptionTier::from_premium(is_premium),
            self.clock.now(),
        )
    }

    pub async fn schedule_reminders(
        &self,
        reminders: &[SmartReminder],
    ) -> Result<Vec<String>, ReminderError> {
        self.schedule_all(reminders)
            .await
            .map(|report| report.scheduled)
    }

    /// Asks for permission once, then schedules reminders one at a time. A
    /// failing reminder is recorded and the batch carries on.
    #[instrument(skip_all, fields(batch = reminders.len()))]
    pub async fn schedule_all(
        &self,
        reminders: &[SmartReminder],
    ) -> Result<BatchReport, ReminderError> {
        let granted = self
            .gateway
            .request_permission()
            .await
            .map_err(ReminderError::Permission)?;
        if !granted {
            self.metrics.inc_permission_denied();
            warn!("notification permission denied, batch aborted");
            return Err(ReminderError::PermissionDenied);
        }

        let mut report = BatchReport::default();
        for reminder in reminders {
            if reminder.scheduled_for <= self.clock.now() {
                report.skipped_past += 1;
                debug!(reminder_id = %reminder.id, "skipping reminder already in the past");
                continue;
            }

            let content = NotificationContent {
                title: reminder.title.clone(),
                body: reminder.body.clone(),
                data: reminder.payload(),
            };

            match self
                .gateway
                .schedule(&reminder.id, content, reminder.scheduled_for)
                .await
            {
                Ok(id) => {
                    self.metrics.inc_scheduled();
                    report.scheduled.push(id);
                }
                Err(source) => {
                    let err = ReminderError::Scheduling {
                        reminder_id: reminder.id.clone(),
                        source,
                    };
                    self.metrics.inc_schedule_failure();
                    warn!(error = %err, "reminder not scheduled");
                    report.failed.push(ScheduleFailure {
                        reminder_id: reminder.id.clone(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        info!(
            scheduled = report.scheduled.len(),
            failed = report.failed.len(),
            skipped_past = report.skipped_past,
            "reminder batch finished"
        );
        Ok(report)
    }

    /// Cancels every gateway entry tagged with `trip_id`. Returns how many
    /// were cancelled; zero matches is not an error.
    #[instrument(skip(self))]
    pub async fn cancel_reminders_for_trip(&self, trip_id: &str) -> Result<usize, ReminderError> {
        let scheduled = self
            .gateway
            .get_all_scheduled()
            .await
            .map_err(ReminderError::Query)?;

        let ids = scheduled
            .iter()
            .filter(|notification| notification.trip_id() == Some(trip_id))
            .map(|notification| notification.id.clone())
            .collect::<Vec<_>>();

        if ids.is_empty() {
            debug!("no reminders to cancel");
            return Ok(0);
        }

        self.gateway
            .cancel(&ids)
            .await
            .map_err(|source| ReminderError::Cancel {
                trip_id: trip_id.to_string(),
                source,
            })?;

        self.metrics.add_cancelled(ids.len());
        info!(cancelled = ids.len(), "cancelled trip reminders");
        Ok(ids.len())
    }

    /// Single entry point for trip edits: cancel whatever the trip had, then
    /// schedule the freshly generated set unless reminders are disabled.
    #[instrument(skip(self, trip, settings), fields(trip_id = %trip.id))]
    pub async fn update_reminders_for_trip(
        &self,
        trip: &Trip,
        settings: &ReminderSettings,
        is_premium: bool,
    ) -> Result<SyncOutcome, ReminderError> {
        self.metrics.inc_sync();
        let cancelled = self.cancel_reminders_for_trip(&trip.id).await?;

        let mut outcome = SyncOutcome {
            trip_id: trip.id.clone(),
            enabled: settings.enabled,
            cancelled,
            generated: 0,
            scheduled: Vec::new(),
            failed: Vec::new(),
            skipped_past: 0,
        };

        if !settings.enabled {
            info!("reminders disabled, nothing scheduled");
            return Ok(outcome);
        }

        let reminders = self.generate_smart_reminders(trip, settings, is_premium);
        self.metrics.add_generated(reminders.len());
        outcome.generated = reminders.len();

        // No permission prompt when there is nothing to deliver.
        if reminders.is_empty() {
            info!("no reminders generated");
            return Ok(outcome);
        }

        let report = self.schedule_all(&reminders).await?;
        outcome.scheduled = report.scheduled;
        outcome.failed = report.failed;
        outcome.skipped_past = report.skipped_past;
        Ok(outcome)
    }
}
