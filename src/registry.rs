use crate::{
    Error,
    Result,
    animator::RandomDisplayAnimator,
    dice::DieKind,
    protocol::RollId,
    tray::DieVisual,
};
use std::collections::HashMap;
use tracing::debug;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RollPhase {
    /// Spinning, waiting for the authoritative result.
    Animating,
    /// Result received and animation cancelled; final values not yet painted.
    Settling,
    /// Final values painted; waiting for eviction.
    Revealed,
}

#[derive(Debug)]
pub struct PendingRoll {
    pub roll_id: RollId,
    pub die: DieKind,
    pub visuals: Vec<DieVisual>,
    pub animator: RandomDisplayAnimator,
    pub phase: RollPhase,
}

/// In-flight rolls of this session, keyed by roll identifier.
#[derive(Debug, Default)]
pub struct PendingRollRegistry {
    entries: HashMap<RollId, PendingRoll>,
}

impl PendingRollRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        roll_id: RollId,
        die: DieKind,
        visuals: Vec<DieVisual>,
        animator: RandomDisplayAnimator,
    ) -> Result<()> {
        if self.entries.contains_key(&roll_id) {
            return Err(Error::DuplicateRoll(roll_id));
        }
        debug!(%roll_id, %die, dice = visuals.len(), "registered pending roll");
        self.entries.insert(
            roll_id.clone(),
            PendingRoll {
                roll_id,
                die,
                visuals,
                animator,
                phase: RollPhase::Animating,
            },
        );
        Ok(())
    }

    pub fn get(&self, roll_id: &RollId) -> Option<&PendingRoll> {
        self.entries.get(roll_id)
    }

    pub fn get_mut(&mut self, roll_id: &RollId) -> Option<&mut PendingRoll> {
        self.entries.get_mut(roll_id)
    }

    pub fn contains(&self, roll_id: &RollId) -> bool {
        self.entries.contains_key(roll_id)
    }

    /// Cancels the animator and moves an animating roll to `Settling`.
    /// Returns `false` when no entry exists.
    pub fn cancel_and_clear(&mut self, roll_id: &RollId) -> bool {
        let Some(entry) = self.entries.get_mut(roll_id) else {
            return false;
        };
        entry.animator.cancel();
        if entry.phase == RollPhase::Animating {
            entry.phase = RollPhase::Settling;
        }
        true
    }

    pub fn mark_revealed(&mut self, roll_id: &RollId) {
        if let Some(entry) = self.entries.get_mut(roll_id) {
            entry.phase = RollPhase::Revealed;
        }
    }

    /// Removes a revealed roll. Rolls still animating or settling are kept.
    pub fn evict(&mut self, roll_id: &RollId) -> Option<PendingRoll> {
        let revealed = self
            .entries
            .get(roll_id)
            .is_some_and(|entry| entry.phase == RollPhase::Revealed);
        if !revealed {
            return None;
        }
        debug!(%roll_id, "evicted revealed roll");
        self.entries.remove(roll_id)
    }

    /// Error path: cancels and removes immediately, whatever the phase.
    pub fn discard(&mut self, roll_id: &RollId) -> Option<PendingRoll> {
        let mut entry = self.entries.remove(roll_id)?;
        entry.animator.cancel();
        debug!(%roll_id, "discarded pending roll");
        Some(entry)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
