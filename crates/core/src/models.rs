use std::collections::BTreeSet;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;

/// Payload key every scheduled notification carries so it can be traced back
/// to the trip that produced it.
pub const TRIP_ID_TAG: &str = "trip_id";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackingItem {
    pub id: String,
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub packed: bool,
    #[serde(default)]
    pub essential: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trip {
    pub id: String,
    pub name: String,
    pub destination: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub packing_list: Vec<PackingItem>,
}

impl Trip {
    pub fn unpacked_items(&self) -> impl Iterator<Item = &PackingItem> {
        self.packing_list.iter().filter(|item| !item.packed)
    }

    pub fn unpacked_essentials(&self) -> impl Iterator<Item = &PackingItem> {
        self.unpacked_items().filter(|item| item.essential)
    }

    /// Whole-percent share of packed items, `None` for an empty list.
    pub fn packed_percent(&self) -> Option<u32> {
        let total = self.packing_list.len();
        if total == 0 {
            return None;
        }

        let packed = self.packing_list.iter().filter(|item| item.packed).count();
        Some(((packed * 100) as f64 / total as f64).round() as u32)
    }

    /// Calendar days between `today` and departure. Negative once the trip
    /// has started.
    pub fn days_until(&self, today: NaiveDate) -> i64 {
        (self.start_date - today).num_days()
    }
}

/// Wall-clock reminder time. Always holds a valid hour and minute; the wire
/// form `{"hour": .., "minute": ..}` is checked on deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawTimeOfDay", into = "RawTimeOfDay")]
pub struct TimeOfDay {
    hour: u32,
    minute: u32,
}

impl TimeOfDay {
    pub const FINAL_CHECK: TimeOfDay = TimeOfDay {
        hour: 20,
        minute: 0,
    };

    pub fn new(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(|_| Self { hour, minute })
    }

    pub fn to_naive_time(self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.hour, self.minute, 0).unwrap_or_default()
    }
}

impl Default for TimeOfDay {
    fn default() -> Self {
        Self { hour: 9, minute: 0 }
    }
}

#[derive(Serialize, Deserialize)]
struct RawTimeOfDay {
    hour: u32,
    minute: u32,
}

impl TryFrom<RawTimeOfDay> for TimeOfDay {
    type Error = TimeOfDayParseError;

    fn try_from(raw: RawTimeOfDay) -> Result<Self, Self::Error> {
        Self::new(raw.hour, raw.minute)
            .ok_or_else(|| TimeOfDayParseError(format!("{}:{}", raw.hour, raw.minute)))
    }
}

impl From<TimeOfDay> for RawTimeOfDay {
    fn from(time: TimeOfDay) -> Self {
        Self {
            hour: time.hour,
            minute: time.minute,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid time of day `{0}`, expected HH:MM")]
pub struct TimeOfDayParseError(pub String);

impl FromStr for TimeOfDay {
    type Err = TimeOfDayParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || TimeOfDayParseError(value.to_string());
        let (hour, minute) = value.trim().split_once(':').ok_or_else(invalid)?;
        let hour = hour.parse::<u32>().map_err(|_| invalid())?;
        let minute = minute.parse::<u32>().map_err(|_| invalid())?;
        Self::new(hour, minute).ok_or_else(invalid)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReminderSettings {
    pub enabled: bool,
    /// Informational only. The policy engine picks its own offsets.
    pub days_before_trip: BTreeSet<u32>,
    pub time_of_day: TimeOfDay,
    pub include_weather_reminders: bool,
    pub include_essential_only: bool,
}

impl Default for ReminderSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            days_before_trip: BTreeSet::from([7, 3, 1]),
            time_of_day: TimeOfDay::default(),
            include_weather_reminders: true,
            include_essential_only: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionTier {
    Free,
    Premium,
}

impl SubscriptionTier {
    pub fn from_premium(is_premium: bool) -> Self {
        if is_premium {
            Self::Premium
        } else {
            Self::Free
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReminderType {
    Packing,
    Weather,
    Essentials,
    FinalCheck,
}

impl ReminderType {
    pub fn as_code(self) -> &'static str {
        match self {
            Self::Packing => "packing",
            Self::Weather => "weather",
            Self::Essentials => "essentials",
            Self::FinalCheck => "final-check",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderPriority {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmartReminder {
    pub id: String,
    pub trip_id: String,
    pub title: String,
    pub body: String,
    pub scheduled_for: NaiveDateTime,
    #[serde(rename = "type")]
    pub reminder_type: ReminderType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<String>>,
    pub priority: ReminderPriority,
}

impl SmartReminder {
    /// Notification payload. Always carries [`TRIP_ID_TAG`] so the reminder can
    /// be found again when the trip is re-synced.
    pub fn payload(&self) -> Map<String, Value> {
        let mut data = Map::new();
        data.insert(TRIP_ID_TAG.to_string(), json!(self.trip_id));
        data.insert("reminder_type".to_string(), json!(self.reminder_type));
        data.insert("priority".to_string(), json!(self.priority));
        if let Some(items) = &self.items {
            data.insert("items".to_string(), json!(items));
        }
        data
    }
}
