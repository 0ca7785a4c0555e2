pub mod clock;
pub mod generator;
pub mod grouping;
pub mod models;
pub mod policy;

pub use clock::{Clock, FixedClock, SystemClock};
pub use generator::{generate_smart_reminders, reminder_id};
pub use grouping::{group_unpacked_by_category, CategoryGroup};
pub use models::*;
pub use policy::{ReminderPolicyEngine, ScheduleSlot, SlotKind};
