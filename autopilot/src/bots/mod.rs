use serde::Serialize;
use soldier_core::constants::{AGENT_TURN_RATE_DEG, TICK_SECONDS};
use soldier_core::geometry::{yaw_delta_to, Vec3};
use soldier_core::rng::SeededRng;
use soldier_core::sim::{ActionPair, EpisodeSnapshot};
use soldier_core::tape::parse_tape;
use std::fs;
use std::path::PathBuf;
use tracing::warn;

mod roster;

pub use roster::{bot_fingerprint, bot_ids, bot_manifest_entries, create_bot, describe_bots};

/// Prefix for bots that play back a recorded tape, e.g. `replay:runs/best.tape`.
pub const REPLAY_PREFIX: &str = "replay:";

const TURN_PER_TICK_DEG: f32 = AGENT_TURN_RATE_DEG * TICK_SECONDS;

pub trait AutopilotBot: Send {
    fn id(&self) -> &str;
    fn description(&self) -> &str;
    fn reset(&mut self, seed: u32);
    fn next_action(&mut self, snapshot: &EpisodeSnapshot) -> ActionPair;
}

#[derive(Clone, Debug, Serialize)]
pub struct BotManifestEntry {
    pub id: String,
    pub family: String,
    pub description: String,
    pub config_hash: String,
    pub config: serde_json::Value,
}

/// What a seeker chases, in priority order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum GoalOrder {
    WaypointsThenTargets,
    TargetsThenWaypoints,
    CheckpointsThenTargets,
}

#[derive(Clone, Copy, Serialize)]
struct SeekerConfig {
    id: &'static str,
    description: &'static str,
    goal_order: GoalOrder,
    cruise_speed: f32,
    slow_speed: f32,
    /// Heading error (degrees) above which the bot slows down to turn.
    slow_turn_deg: f32,
    turn_gain: f32,
    hazard_clearance: f32,
    hazard_weight: f32,
    wall_margin: f32,
    wall_weight: f32,
}

#[derive(Clone, Copy, Serialize)]
struct RandomWalkConfig {
    id: &'static str,
    description: &'static str,
    salt: u32,
    hold_ticks_min: u32,
    hold_ticks_max: u32,
    forward_bias: f32,
    turn_span: f32,
}

#[derive(Clone, Copy, Serialize)]
struct IdleConfig {
    id: &'static str,
    description: &'static str,
}

struct IdleBot {
    cfg: IdleConfig,
}

impl AutopilotBot for IdleBot {
    fn id(&self) -> &str {
        self.cfg.id
    }

    fn description(&self) -> &str {
        self.cfg.description
    }

    fn reset(&mut self, _seed: u32) {}

    fn next_action(&mut self, _snapshot: &EpisodeSnapshot) -> ActionPair {
        ActionPair::IDLE
    }
}

struct RandomWalkBot {
    cfg: RandomWalkConfig,
    rng: SeededRng,
    current: ActionPair,
    hold: u32,
}

impl RandomWalkBot {
    fn new(cfg: RandomWalkConfig) -> Self {
        Self {
            cfg,
            rng: SeededRng::new(cfg.salt),
            current: ActionPair::IDLE,
            hold: 0,
        }
    }

    fn pick(&mut self) {
        let span = self
            .cfg
            .hold_ticks_max
            .saturating_sub(self.cfg.hold_ticks_min)
            .saturating_add(1);
        // Every pick is played for at least one tick.
        self.hold = self
            .cfg
            .hold_ticks_min
            .saturating_add(self.rng.next_int(span))
            .max(1);
        let forward = self.cfg.forward_bias + self.rng.next_jitter(1.0 - self.cfg.forward_bias);
        let turn = self.rng.next_jitter(self.cfg.turn_span);
        self.current = ActionPair::new(forward, turn);
    }
}

impl AutopilotBot for RandomWalkBot {
    fn id(&self) -> &str {
        self.cfg.id
    }

    fn description(&self) -> &str {
        self.cfg.description
    }

    fn reset(&mut self, seed: u32) {
        self.rng = SeededRng::new(seed ^ self.cfg.salt);
        self.current = ActionPair::IDLE;
        self.hold = 0;
    }

    fn next_action(&mut self, _snapshot: &EpisodeSnapshot) -> ActionPair {
        if self.hold == 0 {
            self.pick();
        }
        self.hold -= 1;
        self.current
    }
}

struct SeekerBot {
    cfg: SeekerConfig,
}

impl SeekerBot {
    fn goal(&self, snapshot: &EpisodeSnapshot) -> Option<Vec3> {
        let target = snapshot.expected_target.map(|(_, position)| position);
        let waypoint = snapshot.waypoint.map(|g| g.waypoint);
        match self.cfg.goal_order {
            GoalOrder::WaypointsThenTargets => waypoint.or(target),
            GoalOrder::TargetsThenWaypoints => target.or(waypoint),
            GoalOrder::CheckpointsThenTargets => {
                nearest_checkpoint(snapshot).or(target).or(waypoint)
            }
        }
    }

    /// Goal attraction plus repulsion from nearby hazards and walls, on the ground plane.
    /// Hazards ahead push sideways only, so the bot skirts them instead of backing off.
    fn steering(&self, snapshot: &EpisodeSnapshot, goal: Vec3) -> Vec3 {
        let position = flatten(snapshot.pose.position);
        let heading = flatten(goal - position).normalized();
        let mut steer = heading;

        if self.cfg.hazard_weight > 0.0 {
            for hazard in &snapshot.hazards {
                let away = position - flatten(hazard.center);
                let gap = away.length() - hazard.radius;
                if gap >= self.cfg.hazard_clearance || away.dot(heading) > 0.0 {
                    continue;
                }
                let mut side = (away - heading * away.dot(heading)).normalized();
                if side == Vec3::ZERO {
                    // Dead ahead: pick a fixed side.
                    side = Vec3::new(heading.z, 0.0, -heading.x);
                }
                let push = 1.0 - (gap / self.cfg.hazard_clearance).max(0.0);
                steer = steer + side * (push * self.cfg.hazard_weight);
            }
        }

        if self.cfg.wall_weight > 0.0 {
            for wall in &snapshot.walls {
                let away = position - flatten(wall.closest_point(position));
                let gap = away.length();
                if gap < self.cfg.wall_margin {
                    let push = 1.0 - gap / self.cfg.wall_margin;
                    steer = steer + away.normalized() * (push * self.cfg.wall_weight);
                }
            }
        }

        steer
    }
}

impl AutopilotBot for SeekerBot {
    fn id(&self) -> &str {
        self.cfg.id
    }

    fn description(&self) -> &str {
        self.cfg.description
    }

    fn reset(&mut self, _seed: u32) {}

    fn next_action(&mut self, snapshot: &EpisodeSnapshot) -> ActionPair {
        let Some(goal) = self.goal(snapshot) else {
            return ActionPair::IDLE;
        };
        let steer = self.steering(snapshot, goal);
        let delta = yaw_delta_to(snapshot.pose.yaw_deg, steer);
        let forward = if delta.abs() > self.cfg.slow_turn_deg {
            self.cfg.slow_speed
        } else {
            self.cfg.cruise_speed
        };
        ActionPair::new(forward, delta / TURN_PER_TICK_DEG * self.cfg.turn_gain)
    }
}

/// Plays back the action pairs of a tape recorded on the same seed.
struct ReplayBot {
    id: String,
    path: PathBuf,
    actions: Vec<u8>,
    cursor: usize,
}

impl ReplayBot {
    fn new(id: &str, path: &str) -> Self {
        Self {
            id: id.to_string(),
            path: PathBuf::from(path),
            actions: Vec::new(),
            cursor: 0,
        }
    }
}

impl AutopilotBot for ReplayBot {
    fn id(&self) -> &str {
        &self.id
    }

    fn description(&self) -> &str {
        "Replays the action pairs of a recorded tape."
    }

    fn reset(&mut self, seed: u32) {
        self.cursor = 0;
        self.actions.clear();

        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(path = %self.path.display(), %err, "replay tape unreadable; idling");
                return;
            }
        };
        let view = match parse_tape(&bytes, u32::MAX) {
            Ok(view) => view,
            Err(err) => {
                warn!(path = %self.path.display(), %err, "replay tape rejected; idling");
                return;
            }
        };
        if view.header.seed != seed {
            warn!(
                path = %self.path.display(),
                tape_seed = view.header.seed,
                seed,
                "replay tape recorded on another seed; idling"
            );
            return;
        }
        self.actions = view.actions.to_vec();
    }

    fn next_action(&mut self, _snapshot: &EpisodeSnapshot) -> ActionPair {
        let Some(pair) = self.actions.get(self.cursor..self.cursor + 2) else {
            return ActionPair::IDLE;
        };
        self.cursor += 2;
        ActionPair::decode([pair[0], pair[1]])
    }
}

fn nearest_checkpoint(snapshot: &EpisodeSnapshot) -> Option<Vec3> {
    let position = snapshot.pose.position;
    snapshot
        .active_checkpoints
        .iter()
        .map(|(_, checkpoint)| *checkpoint)
        .min_by(|a, b| a.distance(position).total_cmp(&b.distance(position)))
}

#[inline]
fn flatten(v: Vec3) -> Vec3 {
    Vec3::new(v.x, 0.0, v.z)
}

#[cfg(test)]
mod tests {
    use super::*;
    use soldier_core::geometry::{Pose, Sphere};
    use soldier_core::sim::LiveEpisode;
    use soldier_core::Scenario;

    fn snapshot_with(hazards: Vec<Sphere>, targets: Vec<Vec3>) -> EpisodeSnapshot {
        let scenario = Scenario {
            start: Pose::new(Vec3::ZERO, 0.0),
            targets,
            hazards,
            ..Scenario::default()
        };
        LiveEpisode::new(scenario).expect("scenario").snapshot()
    }

    #[test]
    fn hunter_turns_toward_target_on_the_right() {
        let mut bot = create_bot("hunter").expect("hunter");
        let snapshot = snapshot_with(Vec::new(), vec![Vec3::new(10.0, 0.0, 0.0)]);
        let action = bot.next_action(&snapshot);
        assert!(action.turn > 0.0, "{action:?}");
        assert!(action.forward < 1.0, "large heading error should slow down");
    }

    #[test]
    fn hunter_steers_around_hazard_in_its_path() {
        let mut bot = create_bot("hunter").expect("hunter");
        let hazard = Sphere {
            center: Vec3::new(0.3, 0.0, 2.5),
            radius: 1.0,
        };
        let snapshot = snapshot_with(vec![hazard], vec![Vec3::new(0.0, 0.0, 20.0)]);
        let action = bot.next_action(&snapshot);
        assert!(action.turn < 0.0, "should veer away from the hazard: {action:?}");
    }

    #[test]
    fn random_walk_with_zero_hold_still_steps() {
        let mut bot = RandomWalkBot::new(RandomWalkConfig {
            id: "jitter",
            description: "Picks a fresh action every tick.",
            salt: 0x0BAD_5EED,
            hold_ticks_min: 0,
            hold_ticks_max: 0,
            forward_bias: 0.5,
            turn_span: 1.0,
        });
        bot.reset(1);
        let snapshot = snapshot_with(Vec::new(), Vec::new());
        for _ in 0..32 {
            bot.next_action(&snapshot);
            assert_eq!(bot.hold, 0);
        }
    }

    #[test]
    fn random_walk_is_deterministic_per_seed() {
        let snapshot = snapshot_with(Vec::new(), Vec::new());
        let mut a = create_bot("random-walk").expect("random-walk");
        let mut b = create_bot("random-walk").expect("random-walk");
        a.reset(99);
        b.reset(99);
        for _ in 0..64 {
            assert_eq!(a.next_action(&snapshot), b.next_action(&snapshot));
        }
    }

    #[test]
    fn replay_of_missing_tape_idles() {
        let mut bot = create_bot("replay:/nonexistent/run.tape").expect("replay bot");
        bot.reset(1);
        let snapshot = snapshot_with(Vec::new(), Vec::new());
        assert_eq!(bot.next_action(&snapshot), ActionPair::IDLE);
        assert_eq!(bot.id(), "replay:/nonexistent/run.tape");
    }
}
