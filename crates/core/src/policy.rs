use serde::{Deserialize, Serialize};

use crate::models::{ReminderPriority, ReminderType, SubscriptionTier, TimeOfDay};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SlotKind {
    CategoryFocus,
    WeatherCheck,
    Essentials,
    FinalCheck,
}

impl SlotKind {
    pub fn reminder_type(self) -> ReminderType {
        match self {
            Self::CategoryFocus => ReminderType::Packing,
            Self::WeatherCheck => ReminderType::Weather,
            Self::Essentials => ReminderType::Essentials,
            Self::FinalCheck => ReminderType::FinalCheck,
        }
    }

    /// Final checks fire at a fixed evening hour instead of the user's time.
    pub fn pinned_time(self) -> Option<TimeOfDay> {
        match self {
            Self::FinalCheck => Some(TimeOfDay::FINAL_CHECK),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleSlot {
    pub days_before_trip: i64,
    pub kind: SlotKind,
    pub priority: ReminderPriority,
}

const ESSENTIAL_OFFSETS: [i64; 2] = [3, 1];

#[derive(Debug, Clone, Copy)]
pub struct ReminderPolicyEngine {
    tier: SubscriptionTier,
    essential_only: bool,
}

impl ReminderPolicyEngine {
    pub fn new(tier: SubscriptionTier, essential_only: bool) -> Self {
        Self {
            tier,
            essential_only,
        }
    }

    pub fn slots(&self, days_until_trip: i64) -> Vec<ScheduleSlot> {
        if days_until_trip <= 0 {
            return Vec::new();
        }

        if self.tier == SubscriptionTier::Free || self.essential_only {
            return ESSENTIAL_OFFSETS
                .iter()
                .filter(|offset| **offset <= days_until_trip)
                .map(|offset| slot(*offset, SlotKind::Essentials, ReminderPriority::High))
                .collect();
        }

        let tiered = if days_until_trip >= 7 {
            vec![
                slot(7, SlotKind::CategoryFocus, ReminderPriority::Medium),
                slot(5, SlotKind::WeatherCheck, ReminderPriority::Low),
                slot(3, SlotKind::Essentials, ReminderPriority::High),
                slot(1, SlotKind::FinalCheck, ReminderPriority::High),
            ]
        } else if days_until_trip >= 3 {
            vec![
                slot(
                    (days_until_trip - 2).max(1),
                    SlotKind::CategoryFocus,
                    ReminderPriority::Medium,
                ),
                slot(1, SlotKind::Essentials, ReminderPriority::High),
            ]
        } else {
            vec![slot(1, SlotKind::Essentials, ReminderPriority::High)]
        };

        let mut slots = tiered
            .into_iter()
            .filter(|slot| slot.days_before_trip > 0 && slot.days_before_trip <= days_until_trip)
            .collect::<Vec<_>>();

        // days_until_trip >= 1 holds here.
        slots.push(slot(1, SlotKind::FinalCheck, ReminderPriority::High));
        slots
    }
}

fn slot(days_before_trip: i64, kind: SlotKind, priority: ReminderPriority) -> ScheduleSlot {
    ScheduleSlot {
        days_before_trip,
        kind,
        priority,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(slots: &[ScheduleSlot]) -> Vec<(i64, SlotKind)> {
        slots
            .iter()
            .map(|slot| (slot.days_before_trip, slot.kind))
            .collect()
    }

    #[test]
    fn nothing_once_the_trip_has_started() {
        for tier in [SubscriptionTier::Free, SubscriptionTier::Premium] {
            let engine = ReminderPolicyEngine::new(tier, false);
            assert!(engine.slots(0).is_empty());
            assert!(engine.slots(-4).is_empty());
        }
    }

    #[test]
    fn free_tier_gets_essentials_only() {
        let engine = ReminderPolicyEngine::new(SubscriptionTier::Free, false);
        assert_eq!(
            kinds(&engine.slots(10)),
            vec![(3, SlotKind::Essentials), (1, SlotKind::Essentials)]
        );
        assert_eq!(kinds(&engine.slots(2)), vec![(1, SlotKind::Essentials)]);
        assert!(engine
            .slots(10)
            .iter()
            .all(|slot| slot.priority == ReminderPriority::High));
    }

    #[test]
    fn essential_only_overrides_premium() {
        let engine = ReminderPolicyEngine::new(SubscriptionTier::Premium, true);
        assert_eq!(
            kinds(&engine.slots(14)),
            vec![(3, SlotKind::Essentials), (1, SlotKind::Essentials)]
        );
    }

    #[test]
    fn premium_long_lead_uses_full_ladder() {
        let engine = ReminderPolicyEngine::new(SubscriptionTier::Premium, false);
        assert_eq!(
            kinds(&engine.slots(10)),
            vec![
                (7, SlotKind::CategoryFocus),
                (5, SlotKind::WeatherCheck),
                (3, SlotKind::Essentials),
                (1, SlotKind::FinalCheck),
                (1, SlotKind::FinalCheck),
            ]
        );
    }

    #[test]
    fn premium_mid_lead_shifts_category_focus() {
        let engine = ReminderPolicyEngine::new(SubscriptionTier::Premium, false);
        assert_eq!(
            kinds(&engine.slots(5)),
            vec![
                (3, SlotKind::CategoryFocus),
                (1, SlotKind::Essentials),
                (1, SlotKind::FinalCheck),
            ]
        );
        assert_eq!(kinds(&engine.slots(3))[0], (1, SlotKind::CategoryFocus));
    }

    #[test]
    fn premium_short_lead() {
        let engine = ReminderPolicyEngine::new(SubscriptionTier::Premium, false);
        assert_eq!(
            kinds(&engine.slots(1)),
            vec![(1, SlotKind::Essentials), (1, SlotKind::FinalCheck)]
        );
    }
}
