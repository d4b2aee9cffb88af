//! Timed reveal of authoritative roll results.
//!
//! Every roll walks `Animating -> Settling -> Revealed -> Evicted`. Each
//! delay is a task on one [`Timeline`]; nothing here sleeps. The owner calls
//! [`ResultRevealSequencer::advance`] with the current instant and waits
//! until [`ResultRevealSequencer::next_deadline`] in between.
use crate::{
    animator::{
        RandomDisplayAnimator,
        Tick,
    },
    dice::PercentileRoll,
    history::HistoryView,
    protocol::{
        RollError,
        RollId,
        RollResult,
    },
    registry::{
        PendingRollRegistry,
        RollPhase,
    },
    timeline::Timeline,
    tray::{
        DiceTray,
        DieVisual,
    },
};
use rand::Rng;
use std::time::{
    Duration,
    Instant,
};
use tracing::{
    debug,
    info,
    warn,
};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct RevealTimings {
    pub frame_interval: Duration,
    pub frames: u32,
    /// Pause between receiving a result and painting it.
    pub settle_delay: Duration,
    /// Pause between the paint and the history entry.
    pub history_delay: Duration,
    /// Pause between the paint and dropping the pending entry.
    pub eviction_delay: Duration,
}

impl Default for RevealTimings {
    fn default() -> Self {
        Self {
            frame_interval: RandomDisplayAnimator::frame_interval(),
            frames: RandomDisplayAnimator::default_frames(),
            settle_delay: Duration::from_millis(1500),
            history_delay: Duration::from_millis(500),
            eviction_delay: Duration::from_secs(3),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum RevealTask {
    Frame(RollId),
    Reveal { roll_id: RollId, result: RollResult },
    Forward(RollResult),
    Evict(RollId),
}

impl RevealTask {
    fn roll_id(&self) -> Option<&RollId> {
        match self {
            RevealTask::Frame(id) | RevealTask::Evict(id) => Some(id),
            RevealTask::Reveal { roll_id, .. } => Some(roll_id),
            RevealTask::Forward(_) => None,
        }
    }
}

/// What happened to an incoming result.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ResultDisposition {
    /// Hidden roll seen outside GM mode; dropped.
    Filtered,
    /// Matched an animating roll; reveal scheduled.
    Settling,
    /// No animating roll to reveal on; went straight to history.
    Forwarded,
}

#[derive(Debug, Default)]
pub struct ResultRevealSequencer {
    timings: RevealTimings,
    timeline: Timeline<RevealTask>,
}

impl ResultRevealSequencer {
    pub fn new(timings: RevealTimings) -> Self {
        Self {
            timings,
            timeline: Timeline::new(),
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.timeline.next_deadline()
    }

    pub fn pending_tasks(&self) -> usize {
        self.timeline.len()
    }

    /// Starts the frame clock of a freshly dispatched roll.
    pub fn on_dispatched(&mut self, roll_id: RollId, now: Instant) {
        self.timeline
            .schedule(now + self.timings.frame_interval, RevealTask::Frame(roll_id));
    }

    pub fn on_result(
        &mut self,
        result: RollResult,
        now: Instant,
        registry: &mut PendingRollRegistry,
        history: &mut HistoryView,
        gm_active: bool,
    ) -> ResultDisposition {
        if result.is_hidden && !gm_active {
            debug!(roll_id = ?result.roll_id, "dropping hidden result outside GM mode");
            return ResultDisposition::Filtered;
        }
        let animating = result
            .roll_id
            .as_ref()
            .filter(|id| {
                registry
                    .get(id)
                    .is_some_and(|entry| entry.phase == RollPhase::Animating)
            })
            .cloned();
        let Some(roll_id) = animating else {
            debug!(roll_id = ?result.roll_id, "unmatched result, forwarding to history");
            history.prepend(&result, gm_active);
            return ResultDisposition::Forwarded;
        };
        registry.cancel_and_clear(&roll_id);
        self.timeline
            .retain(|task| !matches!(task, RevealTask::Frame(id) if *id == roll_id));
        info!(%roll_id, result = result.result, "result received, settling");
        self.timeline.schedule(
            now + self.timings.settle_delay,
            RevealTask::Reveal { roll_id, result },
        );
        ResultDisposition::Settling
    }

    /// Drops the roll a `dice_error` refers to. Returns whether one was pending.
    pub fn on_error(&mut self, error: &RollError, registry: &mut PendingRollRegistry) -> bool {
        warn!(roll_id = ?error.roll_id, message = %error.message, "server rejected roll");
        let Some(roll_id) = &error.roll_id else {
            return false;
        };
        self.timeline
            .retain(|task| task.roll_id() != Some(roll_id));
        registry.discard(roll_id).is_some()
    }

    /// Runs every task due at `now`. Returns how many ran.
    pub fn advance<R: Rng + ?Sized>(
        &mut self,
        now: Instant,
        tray: &mut DiceTray,
        registry: &mut PendingRollRegistry,
        history: &mut HistoryView,
        rng: &mut R,
        gm_active: bool,
    ) -> usize {
        let mut ran = 0;
        while let Some((at, task)) = self.timeline.pop_due(now) {
            ran += 1;
            match task {
                RevealTask::Frame(roll_id) => {
                    let Some(entry) = registry.get_mut(&roll_id) else {
                        continue;
                    };
                    if entry.animator.tick(tray, rng) == Tick::Continue {
                        self.timeline
                            .schedule(at + self.timings.frame_interval, RevealTask::Frame(roll_id));
                    }
                }
                RevealTask::Reveal { roll_id, result } => {
                    let Some(entry) = registry.get(&roll_id) else {
                        continue;
                    };
                    paint_result(tray, &entry.visuals, &result);
                    registry.mark_revealed(&roll_id);
                    debug!(%roll_id, "revealed");
                    self.timeline
                        .schedule(at + self.timings.history_delay, RevealTask::Forward(result));
                    self.timeline
                        .schedule(at + self.timings.eviction_delay, RevealTask::Evict(roll_id));
                }
                RevealTask::Forward(result) => {
                    history.prepend(&result, gm_active);
                }
                RevealTask::Evict(roll_id) => {
                    registry.evict(&roll_id);
                }
            }
        }
        ran
    }
}

/// Paints final values onto a roll's faces.
///
/// `dice_results[i]` goes onto visual `i`. The first percentile pair prefers
/// the server's `tens_die`/`ones_die`; when no per-die values were sent the
/// overall `result` lands on the first visual.
pub fn paint_result(tray: &mut DiceTray, visuals: &[DieVisual], result: &RollResult) {
    let values = result.individual_results();
    for (i, visual) in visuals.iter().enumerate() {
        let value = values
            .get(i)
            .copied()
            .or_else(|| (i == 0).then_some(result.result));
        match *visual {
            DieVisual::Single(handle) => match value {
                Some(value) => {
                    tray.settle(handle, value.to_string());
                }
                None => tray.stop(handle),
            },
            DieVisual::Percentile { tens, ones } => {
                let digits = (i == 0)
                    .then(|| result.percentile())
                    .flatten()
                    .or_else(|| value.map(PercentileRoll::from_value));
                match digits {
                    Some(digits) => {
                        tray.settle(tens, digits.tens_label());
                        tray.settle(ones, digits.ones_label());
                    }
                    None => {
                        tray.stop(tens);
                        tray.stop(ones);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use crate::tray::FaceRole;
    use serde_json::json;

    fn result(value: serde_json::Value) -> RollResult {
        serde_json::from_value(value).unwrap()
    }

    fn labels(tray: &DiceTray) -> Vec<&str> {
        tray.faces().iter().map(|f| f.label.as_str()).collect()
    }

    #[test]
    fn paint_result__d100_uses_server_digits() {
        let mut tray = DiceTray::new();
        let visual = DieVisual::Percentile {
            tens: tray.spawn(FaceRole::Tens),
            ones: tray.spawn(FaceRole::Ones),
        };

        paint_result(
            &mut tray,
            &[visual],
            &result(json!({"dice_type": "d100", "result": 47, "tens_die": 4, "ones_die": 7})),
        );

        assert_eq!(labels(&tray), vec!["40", "7"]);
        assert!(tray.faces().iter().all(|f| f.settled && !f.rolling));
    }

    #[test]
    fn paint_result__second_d100_pair_splits_its_value() {
        let mut tray = DiceTray::new();
        let visuals: Vec<_> = (0..2)
            .map(|_| DieVisual::Percentile {
                tens: tray.spawn(FaceRole::Tens),
                ones: tray.spawn(FaceRole::Ones),
            })
            .collect();

        paint_result(
            &mut tray,
            &visuals,
            &result(json!({
                "dice_type": "d100", "result": 5, "tens_die": 0, "ones_die": 5,
                "dice_results": [{"result": 5}, {"result": 100}]
            })),
        );

        assert_eq!(labels(&tray), vec!["00", "5", "00", "0"]);
    }

    #[test]
    fn paint_result__falls_back_to_overall_result() {
        let mut tray = DiceTray::new();
        let visuals: Vec<_> = (0..2)
            .map(|_| DieVisual::Single(tray.spawn(FaceRole::Standard { faces: 6 })))
            .collect();

        paint_result(
            &mut tray,
            &visuals,
            &result(json!({"dice_type": "d6", "result": 9})),
        );

        assert_eq!(labels(&tray), vec!["9", ""]);
        assert!(tray.faces()[0].settled);
        assert!(!tray.faces()[1].settled);
        assert!(!tray.faces()[1].rolling);
    }

    #[test]
    fn on_result__hidden_outside_gm_mode_touches_nothing() {
        // given
        let mut sequencer = ResultRevealSequencer::default();
        let mut registry = PendingRollRegistry::new();
        let mut history = HistoryView::new();
        let now = Instant::now();

        // when
        let disposition = sequencer.on_result(
            result(json!({"dice_type": "d20", "result": 3, "is_hidden": true, "roll_id": "x"})),
            now,
            &mut registry,
            &mut history,
            false,
        );

        // then
        assert_eq!(disposition, ResultDisposition::Filtered);
        assert!(history.is_empty());
        assert_eq!(sequencer.pending_tasks(), 0);
    }

    #[test]
    fn on_result__unknown_roll_goes_straight_to_history() {
        let mut sequencer = ResultRevealSequencer::default();
        let mut registry = PendingRollRegistry::new();
        let mut history = HistoryView::new();

        let disposition = sequencer.on_result(
            result(json!({"dice_type": "d8", "result": 5, "character": "Bram", "roll_id": "nope"})),
            Instant::now(),
            &mut registry,
            &mut history,
            false,
        );

        assert_eq!(disposition, ResultDisposition::Forwarded);
        assert_eq!(history.head().unwrap().headline, "Bram rolled 5 on d8");
    }

    #[test]
    fn on_error__without_roll_id_is_ignored() {
        let mut sequencer = ResultRevealSequencer::default();
        let mut registry = PendingRollRegistry::new();
        let error = RollError {
            roll_id: None,
            message: "bad request".into(),
        };
        assert!(!sequencer.on_error(&error, &mut registry));
    }
}
