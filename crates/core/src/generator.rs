use chrono::{Days, NaiveDateTime};

use crate::grouping::{group_unpacked_by_category, CategoryGroup};
use crate::models::{ReminderSettings, SmartReminder, SubscriptionTier, Trip};
use crate::policy::{ReminderPolicyEngine, ScheduleSlot, SlotKind};

const MAX_LISTED_ITEMS: usize = 3;

/// Builds the reminder set for a trip as of `now`.
///
/// Never fails: a trip that already started, an empty packing list or
/// disabled settings all produce an empty list. Output is ordered by policy
/// slot and contains no past-dated reminders. Ids are unique per slot.
pub fn generate_smart_reminders(
    trip: &Trip,
    settings: &ReminderSettings,
    tier: SubscriptionTier,
    now: NaiveDateTime,
) -> Vec<SmartReminder> {
    if !settings.enabled {
        return Vec::new();
    }

    let engine = ReminderPolicyEngine::new(tier, settings.include_essential_only);
    let slots = engine.slots(trip.days_until(now.date()));
    if slots.is_empty() {
        return Vec::new();
    }

    let groups = group_unpacked_by_category(&trip.packing_list);
    let essentials = trip
        .unpacked_essentials()
        .map(|item| item.name.clone())
        .collect::<Vec<_>>();

    let mut builder = ReminderBuilder {
        trip,
        settings,
        groups: &groups,
        essentials: &essentials,
        next_group: 0,
    };

    slots
        .iter()
        .enumerate()
        .filter_map(|(index, slot)| builder.build(index, slot))
        .filter(|reminder| reminder.scheduled_for > now)
        .collect()
}

/// Deterministic reminder id: trip, reminder type and position in the policy
/// schedule.
pub fn reminder_id(trip_id: &str, kind: SlotKind, slot_index: usize) -> String {
    format!(
        "{}-{}-{}",
        trip_id,
        kind.reminder_type().as_code(),
        slot_index
    )
}

struct ReminderBuilder<'a> {
    trip: &'a Trip,
    settings: &'a ReminderSettings,
    groups: &'a [CategoryGroup],
    essentials: &'a [String],
    next_group: usize,
}

impl ReminderBuilder<'_> {
    fn build(&mut self, index: usize, slot: &ScheduleSlot) -> Option<SmartReminder> {
        let scheduled_for = self.fire_time(slot)?;

        let (title, body, items) = match slot.kind {
            SlotKind::CategoryFocus => {
                // Slot N takes the Nth largest category; extra slots are dropped.
                let group = self.groups.get(self.next_group)?;
                self.next_group += 1;
                let names = group
                    .items
                    .iter()
                    .map(|item| item.name.clone())
                    .collect::<Vec<_>>();
                (
                    format!("Pack your {}", group.category.to_lowercase()),
                    format!(
                        "{} still to pack for {}: {}",
                        group.category,
                        self.trip.name,
                        list_items(&names)
                    ),
                    Some(names),
                )
            }
            SlotKind::WeatherCheck => {
                if !self.settings.include_weather_reminders {
                    return None;
                }
                (
                    format!("Check the weather in {}", self.trip.destination),
                    format!(
                        "Look at the forecast for {} and adjust your packing list for {}.",
                        self.trip.destination, self.trip.name
                    ),
                    None,
                )
            }
            SlotKind::Essentials => {
                if self.essentials.is_empty() {
                    return None;
                }
                (
                    "Don't forget your essentials".to_string(),
                    format!("Still unpacked: {}", list_items(self.essentials)),
                    Some(self.essentials.to_vec()),
                )
            }
            SlotKind::FinalCheck => {
                let body = match self.trip.packed_percent() {
                    Some(percent) => format!(
                        "You're {}% packed for {}. Do a last walk-through before you leave.",
                        percent, self.trip.name
                    ),
                    None => format!(
                        "Your packing list for {} is empty. Do a last walk-through before you leave.",
                        self.trip.name
                    ),
                };
                (format!("Final check: {}", self.trip.name), body, None)
            }
        };

        Some(SmartReminder {
            id: reminder_id(&self.trip.id, slot.kind, index),
            trip_id: self.trip.id.clone(),
            title,
            body,
            scheduled_for,
            reminder_type: slot.kind.reminder_type(),
            items,
            priority: slot.priority,
        })
    }

    fn fire_time(&self, slot: &ScheduleSlot) -> Option<NaiveDateTime> {
        let offset = u64::try_from(slot.days_before_trip).ok()?;
        let day = self.trip.start_date.checked_sub_days(Days::new(offset))?;
        let time = slot
            .kind
            .pinned_time()
            .unwrap_or(self.settings.time_of_day)
            .to_naive_time();
        Some(day.and_time(time))
    }
}

fn list_items(names: &[String]) -> String {
    let listed = names
        .iter()
        .take(MAX_LISTED_ITEMS)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");

    if names.len() > MAX_LISTED_ITEMS {
        format!("{listed}…")
    } else {
        listed
    }
}
