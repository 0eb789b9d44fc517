use serde::{Deserialize, Serialize};

use crate::constants::{ACTION_QUANT_SCALE, TAPE_BYTES_PER_TICK};
use crate::error::{EpisodeRule, ScenarioError};
use crate::events::ContactKind;
use crate::geometry::{Aabb, Pose, Sphere, Vec3};
use crate::reward::{RewardBreakdown, RewardEvent};
use crate::scenario::Scenario;
use crate::schedule::EpisodeId;
use crate::sensing::Observation;
use crate::target::TargetId;
use crate::waypoint::Guidance;

mod episode;

use episode::Episode;

/// Two continuous controls, each in [-1, 1].
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionPair {
    pub forward: f32,
    pub turn: f32,
}

impl ActionPair {
    pub const IDLE: Self = Self {
        forward: 0.0,
        turn: 0.0,
    };

    /// Clamps both axes; NaN becomes 0.
    pub fn new(forward: f32, turn: f32) -> Self {
        Self {
            forward: clamp_axis(forward),
            turn: clamp_axis(turn),
        }
    }

    pub fn encode(self) -> [u8; 2] {
        [quantize_axis(self.forward), quantize_axis(self.turn)]
    }

    pub fn decode(bytes: [u8; 2]) -> Self {
        Self {
            forward: dequantize_axis(bytes[0]),
            turn: dequantize_axis(bytes[1]),
        }
    }

    /// The action exactly as a tape would replay it.
    pub fn quantized(self) -> Self {
        Self::decode(self.encode())
    }
}

#[inline]
fn clamp_axis(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(-1.0, 1.0)
    }
}

#[inline]
fn quantize_axis(value: f32) -> u8 {
    // Clamped to +-127, so the reserved -128 is never produced.
    (clamp_axis(value) * ACTION_QUANT_SCALE).round() as i8 as u8
}

#[inline]
fn dequantize_axis(byte: u8) -> f32 {
    (byte as i8).max(-127) as f32 / ACTION_QUANT_SCALE
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalCause {
    Hazard,
    Wall,
    TargetsCleared,
    TimeLimit,
}

impl TerminalCause {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hazard => "hazard",
            Self::Wall => "wall",
            Self::TargetsCleared => "targets_cleared",
            Self::TimeLimit => "time_limit",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct StepOutcome {
    pub observation: Observation,
    pub reward: f32,
    pub reward_milli: i64,
    pub done: bool,
    /// Ended by the tick limit rather than a terminal event.
    pub truncated: bool,
    pub cause: Option<TerminalCause>,
    pub events: Vec<RewardEvent>,
}

/// Lets an external timer finish a deferred target removal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RemovalTicket {
    pub episode: EpisodeId,
    pub target: TargetId,
}

/// Read-only view handed to policies each tick.
#[derive(Clone, Debug, PartialEq)]
pub struct EpisodeSnapshot {
    pub episode: EpisodeId,
    pub tick: u32,
    pub pose: Pose,
    pub done: bool,
    pub expected_target: Option<(TargetId, Vec3)>,
    pub alive_targets: Vec<(TargetId, Vec3)>,
    pub active_checkpoints: Vec<(usize, Vec3)>,
    pub open_group: Option<usize>,
    pub waypoint: Option<Guidance>,
    pub hazards: Vec<Sphere>,
    pub walls: Vec<Aabb>,
    pub observation: Observation,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EpisodeSummary {
    pub episode: EpisodeId,
    pub ticks: u32,
    pub reward_milli: i64,
    pub reward: f32,
    pub breakdown: RewardBreakdown,
    pub checkpoints_passed: u32,
    pub targets_eliminated: u32,
    pub waypoints_reached: u32,
    pub done: bool,
    pub truncated: bool,
    pub cause: Option<TerminalCause>,
}

impl EpisodeSummary {
    /// Tape footer progress word: checkpoints in the low half, targets in the high half.
    pub fn progress_word(&self) -> u32 {
        pack_progress(self.checkpoints_passed, self.targets_eliminated)
    }

    pub fn reward_milli_i32(&self) -> i32 {
        self.reward_milli.clamp(i32::MIN as i64, i32::MAX as i64) as i32
    }
}

pub fn pack_progress(checkpoints: u32, targets: u32) -> u32 {
    checkpoints.min(0xFFFF) | (targets.min(0xFFFF) << 16)
}

pub fn unpack_progress(word: u32) -> (u32, u32) {
    (word & 0xFFFF, word >> 16)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReplayViolation {
    pub tick: u32,
    pub rule: EpisodeRule,
}

/// Steps every recorded action pair in order. Trailing odd bytes are ignored.
pub fn replay(mut episode: LiveEpisode, actions: &[u8]) -> EpisodeSummary {
    for pair in actions.chunks_exact(TAPE_BYTES_PER_TICK) {
        episode.step_encoded([pair[0], pair[1]]);
    }
    episode.summary()
}

/// Like [`replay`], but checks every invariant before the first tick and after each one.
pub fn replay_strict(
    mut episode: LiveEpisode,
    actions: &[u8],
) -> Result<EpisodeSummary, ReplayViolation> {
    episode.validate().map_err(|rule| ReplayViolation {
        tick: episode.tick(),
        rule,
    })?;

    for pair in actions.chunks_exact(TAPE_BYTES_PER_TICK) {
        episode.step_encoded([pair[0], pair[1]]);
        episode.validate().map_err(|rule| ReplayViolation {
            tick: episode.tick(),
            rule,
        })?;
    }

    Ok(episode.summary())
}

/// Owns one run through a scenario. `reset` starts a new episode in place.
#[derive(Clone, Debug)]
pub struct LiveEpisode {
    episode: Episode,
}

impl LiveEpisode {
    pub fn new(scenario: Scenario) -> Result<Self, ScenarioError> {
        Ok(Self {
            episode: Episode::new(scenario)?,
        })
    }

    pub fn reset(&mut self) -> Observation {
        self.episode.reset();
        self.episode.observe()
    }

    pub fn step(&mut self, action: ActionPair) -> StepOutcome {
        self.episode.step(ActionPair::new(action.forward, action.turn))
    }

    #[inline]
    pub fn step_encoded(&mut self, bytes: [u8; 2]) -> StepOutcome {
        self.episode.step(ActionPair::decode(bytes))
    }

    /// Steps, then reports the first broken invariant instead of the outcome.
    pub fn step_checked(&mut self, action: ActionPair) -> Result<StepOutcome, EpisodeRule> {
        let outcome = self.step(action);
        self.episode.validate()?;
        Ok(outcome)
    }

    /// Queues a contact from an external engine binding; it is handled on the next step.
    pub fn push_contact(&mut self, contact: ContactKind) {
        self.episode.push_contact(contact);
    }

    pub fn removal_ticket(&self, target: TargetId) -> RemovalTicket {
        RemovalTicket {
            episode: self.episode.id(),
            target,
        }
    }

    /// Returns false, without touching state, for a ticket from another episode.
    pub fn complete_removal(&mut self, ticket: RemovalTicket) -> bool {
        self.episode.complete_removal(ticket)
    }

    #[inline]
    pub fn observe(&self) -> Observation {
        self.episode.observe()
    }

    pub fn snapshot(&self) -> EpisodeSnapshot {
        self.episode.snapshot()
    }

    pub fn summary(&self) -> EpisodeSummary {
        self.episode.summary()
    }

    #[inline]
    pub fn validate(&self) -> Result<(), EpisodeRule> {
        self.episode.validate()
    }

    pub fn id(&self) -> EpisodeId {
        self.episode.id()
    }

    pub fn tick(&self) -> u32 {
        self.episode.tick()
    }

    pub fn is_done(&self) -> bool {
        self.episode.is_done()
    }

    pub fn scenario(&self) -> &Scenario {
        self.episode.scenario()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actions_clamp_and_quantize() {
        let action = ActionPair::new(3.0, f32::NAN);
        assert_eq!(action, ActionPair::new(1.0, 0.0));
        assert_eq!(action.encode(), [127, 0]);
        assert_eq!(ActionPair::new(-1.0, -0.5).encode(), [0x81, (-64i8) as u8]);
        assert_eq!(ActionPair::decode([127, 0x81]), ActionPair::new(1.0, -1.0));
    }

    #[test]
    fn quantized_action_is_stable() {
        for raw in [-1.0f32, -0.37, 0.0, 0.004, 0.5, 0.999] {
            let once = ActionPair::new(raw, -raw).quantized();
            assert_eq!(once.quantized(), once);
            assert!(!once.encode().contains(&0x80));
        }
    }

    #[test]
    fn progress_word_packs_both_counts() {
        let word = pack_progress(7, 3);
        assert_eq!(word, 0x0003_0007);
        assert_eq!(unpack_progress(word), (7, 3));
        assert_eq!(unpack_progress(pack_progress(70_000, 1)), (0xFFFF, 1));
    }
}
