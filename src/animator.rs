use crate::{
    dice::DieSpec,
    tray::{
        DiceTray,
        DieVisual,
    },
};
use rand::Rng;
use std::time::Duration;

pub const FRAMES_PER_SECOND: u32 = 15;
pub const ANIMATION_DURATION: Duration = Duration::from_secs(2);
const MAX_JITTER_DEGREES: f32 = 10.0;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum AnimatorState {
    Running,
    Finished,
    Cancelled,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Tick {
    Continue,
    Stopped,
}

/// Spins the faces of one roll through random values until it finishes or
/// is cancelled.
#[derive(Clone, Debug)]
pub struct RandomDisplayAnimator {
    spec: DieSpec,
    visuals: Vec<DieVisual>,
    frame: u32,
    total_frames: u32,
    state: AnimatorState,
}

impl RandomDisplayAnimator {
    pub fn new(spec: DieSpec, visuals: Vec<DieVisual>, total_frames: u32) -> Self {
        Self {
            spec,
            visuals,
            frame: 0,
            total_frames: total_frames.max(1),
            state: AnimatorState::Running,
        }
    }

    pub fn frame_interval() -> Duration {
        Duration::from_millis(1000 / FRAMES_PER_SECOND as u64)
    }

    pub fn default_frames() -> u32 {
        (ANIMATION_DURATION.as_millis() as u32 * FRAMES_PER_SECOND) / 1000
    }

    pub fn state(&self) -> AnimatorState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == AnimatorState::Running
    }

    pub fn frame(&self) -> u32 {
        self.frame
    }

    /// Advances one frame. A stopped animator never touches the tray.
    pub fn tick<R: Rng + ?Sized>(&mut self, tray: &mut DiceTray, rng: &mut R) -> Tick {
        if self.state != AnimatorState::Running {
            return Tick::Stopped;
        }
        self.frame += 1;
        if self.paints(self.frame) {
            self.paint_random(tray, rng);
        }
        if self.frame >= self.total_frames {
            self.state = AnimatorState::Finished;
            for handle in self.visuals.iter().flat_map(DieVisual::handles) {
                tray.stop(handle);
            }
            return Tick::Stopped;
        }
        Tick::Continue
    }

    /// Stops the animation for good. Returns `true` only for the call that
    /// actually cancelled a running animator.
    pub fn cancel(&mut self) -> bool {
        if self.state == AnimatorState::Running {
            self.state = AnimatorState::Cancelled;
            true
        } else {
            false
        }
    }

    // Past 80% of the run only every 2nd frame paints, past 90% every 3rd.
    fn paints(&self, frame: u32) -> bool {
        let scaled = frame as u64 * 10;
        let total = self.total_frames as u64;
        if scaled > total * 9 {
            frame % 3 == 0
        } else if scaled > total * 8 {
            frame % 2 == 0
        } else {
            true
        }
    }

    fn paint_random<R: Rng + ?Sized>(&self, tray: &mut DiceTray, rng: &mut R) {
        for visual in &self.visuals {
            match (*visual, self.spec) {
                (DieVisual::Single(handle), DieSpec::Simple { faces }) => {
                    let value = rng.random_range(1..=faces as u32);
                    tray.paint(handle, value.to_string(), jitter(rng));
                }
                (DieVisual::Percentile { tens, ones }, _) => {
                    let tens_digit = rng.random_range(0..10u32);
                    let ones_digit = rng.random_range(0..10u32);
                    tray.paint(tens, tens_digit.to_string(), jitter(rng));
                    tray.paint(ones, ones_digit.to_string(), jitter(rng));
                }
                (DieVisual::Single(handle), DieSpec::Percentile) => {
                    let value = rng.random_range(1..=100u32);
                    tray.paint(handle, value.to_string(), jitter(rng));
                }
            }
        }
    }
}

fn jitter<R: Rng + ?Sized>(rng: &mut R) -> f32 {
    rng.random_range(-MAX_JITTER_DEGREES..MAX_JITTER_DEGREES)
}
