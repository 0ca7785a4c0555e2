use std::sync::Arc;

use chrono::{Days, NaiveDate, NaiveDateTime};
use packwise_core::{FixedClock, PackingItem, ReminderSettings, ReminderType, Trip};
use packwise_observability::ReminderMetrics;
use packwise_scheduler::ReminderScheduler;
use packwise_storage::{NotificationGateway, Store, TripProvider};

fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 9, 1)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
}

fn trip() -> Trip {
    let start = now().date().checked_add_days(Days::new(10)).unwrap();
    let item = |id: &str, name: &str, category: &str, essential: bool| PackingItem {
        id: id.to_string(),
        name: name.to_string(),
        category: category.to_string(),
        packed: false,
        essential,
    };

    Trip {
        id: "amalfi".to_string(),
        name: "Amalfi coast".to_string(),
        destination: "Positano".to_string(),
        start_date: start,
        end_date: start.checked_add_days(Days::new(6)).unwrap(),
        packing_list: vec![
            item("1", "Swimsuit", "Clothing", false),
            item("2", "Linen shirt", "Clothing", false),
            item("3", "Sunscreen", "Toiletries", false),
            item("4", "Sunglasses", "Accessories", false),
            item("5", "Passport", "Documents", true),
        ],
    }
}

async fn scheduler() -> ReminderScheduler<Store, FixedClock> {
    let store = Store::sqlite("sqlite::memory:").await.expect("sqlite store");
    ReminderScheduler::with_clock(
        Arc::new(store),
        FixedClock(now()),
        ReminderMetrics::shared(),
    )
}

#[tokio::test]
async fn premium_ten_day_trip_is_scheduled_into_sqlite() {
    let scheduler = scheduler().await;
    let trip = trip();
    scheduler.gateway().upsert_trip(&trip).await.unwrap();

    let loaded = scheduler.gateway().load_trip("amalfi").await.unwrap().unwrap();
    let outcome = scheduler
        .update_reminders_for_trip(&loaded, &ReminderSettings::default(), true)
        .await
        .unwrap();
    assert_eq!(outcome.generated, 5);

    let scheduled = scheduler.gateway().get_all_scheduled().await.unwrap();
    let layout = scheduled
        .iter()
        .map(|entry| {
            (
                (trip.start_date - entry.trigger_at.date()).num_days(),
                entry.data["reminder_type"].clone(),
            )
        })
        .collect::<Vec<_>>();

    assert_eq!(
        layout,
        vec![
            (7, serde_json::json!(ReminderType::Packing)),
            (5, serde_json::json!(ReminderType::Weather)),
            (3, serde_json::json!(ReminderType::Essentials)),
            (1, serde_json::json!(ReminderType::FinalCheck)),
            (1, serde_json::json!(ReminderType::FinalCheck)),
        ]
    );
    assert_eq!(
        scheduled[3..]
            .iter()
            .map(|entry| entry.id.as_str())
            .collect::<Vec<_>>(),
        vec!["amalfi-final-check-3", "amalfi-final-check-4"]
    );
    assert_eq!(
        scheduled.last().unwrap().trigger_at.time(),
        chrono::NaiveTime::from_hms_opt(20, 0, 0).unwrap()
    );
}

#[tokio::test]
async fn cancel_leaves_foreign_notifications_alone() {
    let scheduler = scheduler().await;
    let trip = trip();

    let other = Trip {
        id: "dolomites".to_string(),
        ..trip.clone()
    };

    scheduler
        .update_reminders_for_trip(&trip, &ReminderSettings::default(), false)
        .await
        .unwrap();
    scheduler
        .update_reminders_for_trip(&other, &ReminderSettings::default(), false)
        .await
        .unwrap();

    let cancelled = scheduler.cancel_reminders_for_trip("amalfi").await.unwrap();
    assert_eq!(cancelled, 2);

    let remaining = scheduler.gateway().get_all_scheduled().await.unwrap();
    assert_eq!(remaining.len(), 2);
    assert!(remaining
        .iter()
        .all(|entry| entry.trip_id() == Some("dolomites")));

    let due = scheduler
        .gateway()
        .take_due(now().checked_add_days(Days::new(30)).unwrap())
        .await
        .unwrap();
    assert_eq!(due.len(), 2);
    assert!(scheduler.gateway().get_all_scheduled().await.unwrap().is_empty());
}
