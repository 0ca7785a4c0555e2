use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use once_cell::sync::OnceCell;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

static TRACING_INIT: OnceCell<()> = OnceCell::new();

#[derive(Debug, Default)]
pub struct ReminderMetrics {
    syncs_total: AtomicU64,
    generated_total: AtomicU64,
    scheduled_total: AtomicU64,
    schedule_failures_total: AtomicU64,
    cancelled_total: AtomicU64,
    permission_denied_total: AtomicU64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub syncs_total: u64,
    pub generated_total: u64,
    pub scheduled_total: u64,
    pub schedule_failures_total: u64,
    pub cancelled_total: u64,
    pub permission_denied_total: u64,
}

impl ReminderMetrics {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn inc_sync(&self) {
        self.syncs_total.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("packwise_reminder_syncs_total").increment(1);
    }

    pub fn add_generated(&self, count: usize) {
        self.generated_total
            .fetch_add(count as u64, Ordering::Relaxed);
        metrics::counter!("packwise_reminders_generated_total").increment(count as u64);
    }

    pub fn inc_scheduled(&self) {
        self.scheduled_total.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("packwise_reminders_scheduled_total").increment(1);
    }

    pub fn inc_schedule_failure(&self) {
        self.schedule_failures_total.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("packwise_reminder_schedule_failures_total").increment(1);
    }

    pub fn add_cancelled(&self, count: usize) {
        self.cancelled_total
            .fetch_add(count as u64, Ordering::Relaxed);
        metrics::counter!("packwise_reminders_cancelled_total").increment(count as u64);
    }

    pub fn inc_permission_denied(&self) {
        self.permission_denied_total.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("packwise_reminder_permission_denied_total").increment(1);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            syncs_total: self.syncs_total.load(Ordering::Relaxed),
            generated_total: self.generated_total.load(Ordering::Relaxed),
            scheduled_total: self.scheduled_total.load(Ordering::Relaxed),
            schedule_failures_total: self.schedule_failures_total.load(Ordering::Relaxed),
            cancelled_total: self.cancelled_total.load(Ordering::Relaxed),
            permission_denied_total: self.permission_denied_total.load(Ordering::Relaxed),
        }
    }
}

pub fn init_tracing(service_name: &str) {
    TRACING_INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}=info,packwise_scheduler=info,packwise_api=info",
                service_name
            ))
        });

        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(true)
            .with_span_list(true)
            .init();
    });
}
