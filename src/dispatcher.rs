use crate::{
    Result,
    animator::RandomDisplayAnimator,
    dice::{
        DieKind,
        DieSpec,
    },
    protocol::{
        ClientEvent,
        RollId,
        RollRequest,
    },
    registry::PendingRollRegistry,
    theme::Theme,
    transport::Publisher,
    tray::{
        DiceTray,
        DieVisual,
        FaceRole,
    },
};
use chrono::Utc;
use rand::Rng;
use tracing::{
    info,
    warn,
};

pub const MAX_DICE_PER_ROLL: u32 = 10;
pub const ANONYMOUS: &str = "Anonymous";
pub const GAME_MASTER: &str = "Game Master";
pub const GM_ROLL_LABEL: &str = "GM Roll";

/// What the user asked to roll.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RollOrder {
    pub die: DieKind,
    pub count: u32,
    pub label: Option<String>,
    pub is_gm_roll: bool,
    pub is_hidden: bool,
}

impl RollOrder {
    pub fn new(die: DieKind, count: u32) -> Self {
        Self {
            die,
            count,
            label: None,
            is_gm_roll: false,
            is_hidden: false,
        }
    }

    pub fn labelled(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// A single-die Game Master roll, optionally hidden from players.
    pub fn game_master(die: DieKind, is_hidden: bool) -> Self {
        Self {
            die,
            count: 1,
            label: Some(GM_ROLL_LABEL.to_string()),
            is_gm_roll: true,
            is_hidden,
        }
    }

    fn clamped_count(&self) -> u32 {
        self.count.clamp(1, MAX_DICE_PER_ROLL)
    }
}

/// Name sent with a roll: trimmed, `Anonymous` when blank, and always
/// `Game Master` for GM rolls.
pub fn requester_name(raw: &str, is_gm_roll: bool) -> String {
    if is_gm_roll {
        return GAME_MASTER.to_string();
    }
    match raw.trim() {
        "" => ANONYMOUS.to_string(),
        name => name.to_string(),
    }
}

/// Allocates a `{millis}{suffix}` id not used by any pending roll.
pub fn fresh_roll_id<R: Rng + ?Sized>(rng: &mut R, pending: &PendingRollRegistry) -> RollId {
    let millis = Utc::now().timestamp_millis().max(0) as u64;
    loop {
        let suffix: u16 = rng.random();
        let candidate = RollId::new(format!("{millis:x}{suffix:04x}"));
        if !pending.contains(&candidate) {
            return candidate;
        }
    }
}

/// Builds roll requests, puts their dice on the tray and registers them.
#[derive(Clone, Debug)]
pub struct RollRequestDispatcher {
    animation_frames: u32,
}

impl Default for RollRequestDispatcher {
    fn default() -> Self {
        Self::new(RandomDisplayAnimator::default_frames())
    }
}

impl RollRequestDispatcher {
    pub fn new(animation_frames: u32) -> Self {
        Self { animation_frames }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn dispatch<P, R>(
        &self,
        order: &RollOrder,
        requester: &str,
        theme: Theme,
        tray: &mut DiceTray,
        registry: &mut PendingRollRegistry,
        rng: &mut R,
        publisher: &P,
    ) -> Result<RollId>
    where
        P: Publisher + ?Sized,
        R: Rng + ?Sized,
    {
        let roll_id = fresh_roll_id(rng, registry);
        let count = order.clamped_count();

        tray.clear();
        let visuals = spawn_visuals(tray, order.die, count);
        let animator =
            RandomDisplayAnimator::new(order.die.spec(), visuals.clone(), self.animation_frames);
        registry.register(roll_id.clone(), order.die, visuals, animator)?;

        let request = RollRequest {
            dice_type: order.die,
            character: requester_name(requester, order.is_gm_roll),
            roll_type: order.label.clone().filter(|l| !l.trim().is_empty()),
            theme,
            roll_id: roll_id.clone(),
            count,
            is_gm_roll: order.is_gm_roll,
            is_hidden: order.is_hidden,
        };
        info!(
            %roll_id,
            die = %order.die,
            count,
            gm = order.is_gm_roll,
            hidden = order.is_hidden,
            "dispatching roll"
        );
        if let Err(err) = publisher.publish(ClientEvent::RollDice(request)) {
            warn!(%roll_id, error = %err, "roll request not sent");
            registry.discard(&roll_id);
            return Err(err);
        }
        Ok(roll_id)
    }
}

fn spawn_visuals(tray: &mut DiceTray, die: DieKind, count: u32) -> Vec<DieVisual> {
    (0..count)
        .map(|_| match die.spec() {
            DieSpec::Simple { faces } => DieVisual::Single(tray.spawn(FaceRole::Standard { faces })),
            DieSpec::Percentile => DieVisual::Percentile {
                tens: tray.spawn(FaceRole::Tens),
                ones: tray.spawn(FaceRole::Ones),
            },
        })
        .collect()
}
