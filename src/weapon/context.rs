use std::time::Instant;

use crate::domain::{SlotId, Team, UNMATCHED_SENTINEL};

/// Mutable state threaded through successive `process(frame, …)` calls for a
/// single battle (§4.3). Owned by `WeaponRecognitionService`, not the
/// capture loop, so a recognition task can update it without fighting the
/// caller's borrow.
#[derive(Debug, Clone, Default)]
pub struct WeaponRecognitionContext {
    pub battle_started_at: Option<Instant>,
    pub weapon_detection_attempts: u32,
    pub weapon_detection_done: bool,
    pub finalize_started: bool,
    pub allies: [Option<String>; 4],
    pub enemies: [Option<String>; 4],
}

impl WeaponRecognitionContext {
    pub fn reset(&mut self, battle_started_at: Instant) {
        *self = Self { battle_started_at: Some(battle_started_at), ..Default::default() };
    }

    pub fn slot(&self, slot_id: SlotId) -> &Option<String> {
        match slot_id.team {
            Team::Ally => &self.allies[(slot_id.index - 1) as usize],
            Team::Enemy => &self.enemies[(slot_id.index - 1) as usize],
        }
    }

    pub fn set_slot(&mut self, slot_id: SlotId, weapon: String) {
        let slot = match slot_id.team {
            Team::Ally => &mut self.allies[(slot_id.index - 1) as usize],
            Team::Enemy => &mut self.enemies[(slot_id.index - 1) as usize],
        };
        *slot = Some(weapon);
    }

    /// Slots not yet matched — what a subsequent recognition call targets.
    pub fn unmatched_slots(&self) -> Vec<SlotId> {
        SlotId::ALL.into_iter().filter(|s| self.slot(*s).is_none()).collect()
    }

    pub fn is_fully_matched(&self) -> bool {
        self.allies.iter().all(Option::is_some) && self.enemies.iter().all(Option::is_some)
    }

    /// Fills every still-unmatched slot with the "unmatched" sentinel, used
    /// only by the finalize path so a stalled recognition still yields a
    /// complete 8-slot result.
    pub fn fill_unmatched(&mut self) {
        for slot in self.allies.iter_mut().chain(self.enemies.iter_mut()) {
            if slot.is_none() {
                *slot = Some(UNMATCHED_SENTINEL.to_string());
            }
        }
    }
}

/// Published once metadata changes; `is_final` marks the event the
/// orchestrator should persist as the session's weapon lineup (§4.3).
#[derive(Debug, Clone)]
pub struct BattleWeaponsDetected {
    pub allies: [Option<String>; 4],
    pub enemies: [Option<String>; 4],
    pub is_final: bool,
}

impl BattleWeaponsDetected {
    pub fn from_context(ctx: &WeaponRecognitionContext, is_final: bool) -> Self {
        Self { allies: ctx.allies.clone(), enemies: ctx.enemies.clone(), is_final }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unmatched_slots_starts_with_all_eight() {
        let ctx = WeaponRecognitionContext::default();
        assert_eq!(ctx.unmatched_slots().len(), 8);
    }

    #[test]
    fn set_slot_then_unmatched_slots_shrinks() {
        let mut ctx = WeaponRecognitionContext::default();
        ctx.set_slot(SlotId { team: Team::Ally, index: 1 }, "Splattershot".to_string());
        assert_eq!(ctx.unmatched_slots().len(), 7);
        assert!(!ctx.is_fully_matched());
    }

    #[test]
    fn fill_unmatched_marks_remaining_as_sentinel() {
        let mut ctx = WeaponRecognitionContext::default();
        ctx.fill_unmatched();
        assert!(ctx.is_fully_matched());
        assert_eq!(ctx.allies[0].as_deref(), Some(UNMATCHED_SENTINEL));
    }
}
