//! Reward shaping.
//!
//! Values are configured as `f32` but shaped and accumulated in integer
//! thousandths, so a tick's total does not depend on the order its events
//! were applied in.

use serde::{Deserialize, Serialize};

use crate::constants::{
    REWARD_CHECKPOINT_PASS, REWARD_CHECKPOINT_WRONG, REWARD_HAZARD_CONTACT, REWARD_MILLI_SCALE,
    REWARD_STEP_COST, REWARD_TARGET_HIT, REWARD_TARGET_OUT_OF_ORDER, REWARD_WALL_CONTACT,
};
use crate::target::TargetId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "event")]
pub enum RewardEvent {
    CheckpointPassed { index: usize },
    CheckpointRejected { index: usize },
    TargetEliminated { target: TargetId, in_order: bool },
    WallContact,
    HazardContact,
    WaypointReached { index: usize },
    TargetsCleared,
    Step,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardPolicy {
    pub target_hit: f32,
    pub target_out_of_order: f32,
    pub checkpoint_pass: f32,
    pub checkpoint_wrong: f32,
    pub wall_contact: f32,
    pub wall_terminates: bool,
    pub hazard_contact: f32,
    pub hazard_terminates: bool,
    pub step_cost: f32,
    pub waypoint_reached: f32,
    pub end_on_clear: bool,
}

impl Default for RewardPolicy {
    fn default() -> Self {
        Self {
            target_hit: REWARD_TARGET_HIT,
            target_out_of_order: REWARD_TARGET_OUT_OF_ORDER,
            checkpoint_pass: REWARD_CHECKPOINT_PASS,
            checkpoint_wrong: REWARD_CHECKPOINT_WRONG,
            wall_contact: REWARD_WALL_CONTACT,
            wall_terminates: false,
            hazard_contact: REWARD_HAZARD_CONTACT,
            hazard_terminates: true,
            step_cost: REWARD_STEP_COST,
            waypoint_reached: 0.0,
            end_on_clear: true,
        }
    }
}

impl RewardPolicy {
    pub(crate) fn write_digest_bytes(&self, out: &mut Vec<u8>) {
        for milli in [
            to_milli(self.target_hit),
            to_milli(self.target_out_of_order),
            to_milli(self.checkpoint_pass),
            to_milli(self.checkpoint_wrong),
            to_milli(self.wall_contact),
            to_milli(self.hazard_contact),
            to_milli(self.step_cost),
            to_milli(self.waypoint_reached),
        ] {
            out.extend_from_slice(&milli.to_le_bytes());
        }
        out.push(self.wall_terminates as u8);
        out.push(self.hazard_terminates as u8);
        out.push(self.end_on_clear as u8);
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RewardDelta {
    pub milli: i32,
    pub terminal: bool,
}

#[inline]
pub fn to_milli(value: f32) -> i32 {
    (value * REWARD_MILLI_SCALE).round() as i32
}

#[inline]
pub fn from_milli(milli: i64) -> f32 {
    milli as f32 / REWARD_MILLI_SCALE
}

pub fn shape(event: &RewardEvent, policy: &RewardPolicy) -> RewardDelta {
    let (value, terminal) = match event {
        RewardEvent::CheckpointPassed { .. } => (policy.checkpoint_pass, false),
        RewardEvent::CheckpointRejected { .. } => (policy.checkpoint_wrong, false),
        RewardEvent::TargetEliminated { in_order: true, .. } => (policy.target_hit, false),
        RewardEvent::TargetEliminated {
            in_order: false, ..
        } => (policy.target_out_of_order, false),
        RewardEvent::WallContact => (policy.wall_contact, policy.wall_terminates),
        RewardEvent::HazardContact => (policy.hazard_contact, policy.hazard_terminates),
        RewardEvent::WaypointReached { .. } => (policy.waypoint_reached, false),
        RewardEvent::TargetsCleared => (0.0, policy.end_on_clear),
        RewardEvent::Step => (policy.step_cost, false),
    };
    RewardDelta {
        milli: to_milli(value),
        terminal,
    }
}

/// Sum of one tick's reward deltas.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickReward {
    milli: i64,
    terminal: bool,
}

impl TickReward {
    pub fn add(&mut self, delta: RewardDelta) {
        self.milli += delta.milli as i64;
        self.terminal |= delta.terminal;
    }

    pub fn milli(&self) -> i64 {
        self.milli
    }

    pub fn value(&self) -> f32 {
        from_milli(self.milli)
    }

    pub fn is_terminal(&self) -> bool {
        self.terminal
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardBreakdown {
    pub targets: i64,
    pub checkpoints: i64,
    pub walls: i64,
    pub hazards: i64,
    pub waypoints: i64,
    pub steps: i64,
}

/// Episode-long reward accounting.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RewardLedger {
    total_milli: i64,
    breakdown: RewardBreakdown,
}

impl RewardLedger {
    pub fn record(&mut self, event: &RewardEvent, delta: RewardDelta) {
        let milli = delta.milli as i64;
        self.total_milli += milli;
        let bucket = match event {
            RewardEvent::CheckpointPassed { .. } | RewardEvent::CheckpointRejected { .. } => {
                &mut self.breakdown.checkpoints
            }
            RewardEvent::TargetEliminated { .. } | RewardEvent::TargetsCleared => {
                &mut self.breakdown.targets
            }
            RewardEvent::WallContact => &mut self.breakdown.walls,
            RewardEvent::HazardContact => &mut self.breakdown.hazards,
            RewardEvent::WaypointReached { .. } => &mut self.breakdown.waypoints,
            RewardEvent::Step => &mut self.breakdown.steps,
        };
        *bucket += milli;
    }

    pub fn total_milli(&self) -> i64 {
        self.total_milli
    }

    /// Total clamped into the tape footer's i32 field.
    pub fn total_milli_i32(&self) -> i32 {
        self.total_milli.clamp(i32::MIN as i64, i32::MAX as i64) as i32
    }

    pub fn total(&self) -> f32 {
        from_milli(self.total_milli)
    }

    pub fn breakdown(&self) -> RewardBreakdown {
        self.breakdown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_table() {
        let policy = RewardPolicy::default();
        let hit = shape(
            &RewardEvent::TargetEliminated {
                target: TargetId(0),
                in_order: true,
            },
            &policy,
        );
        assert_eq!(hit, RewardDelta { milli: 10_000, terminal: false });
        assert_eq!(
            shape(&RewardEvent::CheckpointRejected { index: 3 }, &policy),
            RewardDelta { milli: -500, terminal: false }
        );
        assert_eq!(
            shape(&RewardEvent::CheckpointPassed { index: 0 }, &policy),
            RewardDelta { milli: 1_000, terminal: false }
        );
        assert_eq!(
            shape(&RewardEvent::WallContact, &policy),
            RewardDelta { milli: -1_000, terminal: false }
        );
        assert_eq!(
            shape(&RewardEvent::HazardContact, &policy),
            RewardDelta { milli: -5_000, terminal: true }
        );
        assert_eq!(
            shape(&RewardEvent::Step, &policy),
            RewardDelta { milli: -10, terminal: false }
        );
        assert!(shape(&RewardEvent::TargetsCleared, &policy).terminal);
    }

    #[test]
    fn tick_accumulation_is_order_independent() {
        let policy = RewardPolicy::default();
        let hazard = shape(&RewardEvent::HazardContact, &policy);
        let step = shape(&RewardEvent::Step, &policy);
        let wrong = shape(&RewardEvent::CheckpointRejected { index: 1 }, &policy);

        let mut forward = TickReward::default();
        for delta in [hazard, step, wrong] {
            forward.add(delta);
        }
        let mut backward = TickReward::default();
        for delta in [wrong, step, hazard] {
            backward.add(delta);
        }

        assert_eq!(forward, backward);
        assert_eq!(forward.milli(), -5_510);
        assert!(forward.is_terminal());
    }

    #[test]
    fn disabled_step_cost_shapes_to_zero() {
        let policy = RewardPolicy {
            step_cost: 0.0,
            ..RewardPolicy::default()
        };
        assert_eq!(shape(&RewardEvent::Step, &policy).milli, 0);
    }

    #[test]
    fn ledger_tracks_breakdown() {
        let policy = RewardPolicy::default();
        let mut ledger = RewardLedger::default();
        for event in [
            RewardEvent::CheckpointPassed { index: 0 },
            RewardEvent::Step,
            RewardEvent::Step,
            RewardEvent::WallContact,
        ] {
            ledger.record(&event, shape(&event, &policy));
        }
        assert_eq!(ledger.total_milli(), 1_000 - 20 - 1_000);
        assert_eq!(ledger.breakdown().steps, -20);
        assert_eq!(ledger.breakdown().checkpoints, 1_000);
        assert!((ledger.total() + 0.02).abs() < 1e-6);
    }

    #[test]
    fn policy_json_fills_missing_fields_with_defaults() {
        let policy: RewardPolicy =
            serde_json::from_str(r#"{"target_hit": 20.0, "wall_terminates": true}"#)
                .expect("policy json");
        assert_eq!(policy.target_hit, 20.0);
        assert!(policy.wall_terminates);
        assert_eq!(policy.hazard_contact, REWARD_HAZARD_CONTACT);
    }
}
