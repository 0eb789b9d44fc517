//! Injected course description: entity lists plus rules.

use serde::{Deserialize, Serialize};

use crate::constants::{CHECKPOINT_RADIUS, MAX_TARGETS, TARGET_RADIUS};
use crate::error::ScenarioError;
use crate::geometry::{Aabb, Pose, Sphere, Vec3};
use crate::rng::SeededRng;
use crate::rules::EpisodeRules;
use crate::tape::crc32;

/// In JSON only `start` is required; every other field has a default.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default = "default_name")]
    pub name: String,
    pub start: Pose,
    #[serde(default)]
    pub checkpoints: Vec<Vec3>,
    #[serde(default = "default_checkpoint_radius")]
    pub checkpoint_radius: f32,
    #[serde(default)]
    pub main_path: Vec<Vec3>,
    #[serde(default)]
    pub branch_path: Vec<Vec3>,
    #[serde(default)]
    pub targets: Vec<Vec3>,
    #[serde(default = "default_target_radius")]
    pub target_radius: f32,
    #[serde(default)]
    pub hazards: Vec<Sphere>,
    #[serde(default)]
    pub walls: Vec<Aabb>,
    #[serde(default)]
    pub rules: EpisodeRules,
}

fn default_name() -> String {
    String::from("empty")
}

fn default_checkpoint_radius() -> f32 {
    CHECKPOINT_RADIUS
}

fn default_target_radius() -> f32 {
    TARGET_RADIUS
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            name: default_name(),
            start: Pose::default(),
            checkpoints: Vec::new(),
            checkpoint_radius: default_checkpoint_radius(),
            main_path: Vec::new(),
            branch_path: Vec::new(),
            targets: Vec::new(),
            target_radius: default_target_radius(),
            hazards: Vec::new(),
            walls: Vec::new(),
            rules: EpisodeRules::default(),
        }
    }
}

// Training range footprint. The agent starts at the origin facing +z.
const RANGE_HALF_WIDTH: f32 = 20.0;
const RANGE_NEAR_Z: f32 = -6.0;
const RANGE_FAR_Z: f32 = 96.0;
const WALL_THICKNESS: f32 = 1.0;
const WALL_HEIGHT: f32 = 3.0;
const HAZARD_RADIUS: f32 = 1.5;

impl Scenario {
    /// Seeded course: walled lane, nine checkpoints, four targets, two hazards.
    pub fn training_range(seed: u32) -> Self {
        let mut rng = SeededRng::new(seed);

        let checkpoints = (0..9)
            .map(|i| Vec3::new(rng.next_jitter(4.0), 0.0, 8.0 + i as f32 * 9.0))
            .collect();
        let main_path = (0..6)
            .map(|i| Vec3::new(rng.next_jitter(3.0), 0.0, 12.0 + i as f32 * 13.0))
            .collect();
        let branch_path = [-10.0, -4.0, 4.0, 10.0]
            .iter()
            .map(|x| Vec3::new(*x, 0.0, 86.0 + rng.next_jitter(2.0)))
            .collect();
        let targets = (0..4)
            .map(|i| Vec3::new(rng.next_jitter(8.0), 0.0, 22.0 + i as f32 * 20.0))
            .collect();
        let hazards = [(-15.0, 35.0), (15.0, 68.0)]
            .iter()
            .map(|(x, z)| Sphere {
                center: Vec3::new(*x + rng.next_jitter(1.5), 0.0, *z + rng.next_jitter(6.0)),
                radius: HAZARD_RADIUS,
            })
            .collect();

        Self {
            name: format!("training-range-{seed:08x}"),
            start: Pose::new(Vec3::ZERO, 0.0),
            checkpoints,
            main_path,
            branch_path,
            targets,
            hazards,
            walls: perimeter_walls(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ScenarioError> {
        if !self.start.is_finite() {
            return Err(ScenarioError::NonFiniteStartPose);
        }
        check_positions("checkpoint", &self.checkpoints)?;
        check_positions("main waypoint", &self.main_path)?;
        check_positions("branch waypoint", &self.branch_path)?;
        check_positions("target", &self.targets)?;
        for (index, hazard) in self.hazards.iter().enumerate() {
            if !hazard.center.is_finite() {
                return Err(ScenarioError::NonFinitePosition {
                    entity: "hazard",
                    index,
                });
            }
            if !(hazard.radius > 0.0) {
                return Err(ScenarioError::NonPositiveRadius { entity: "hazard" });
            }
        }
        if let Some(index) = self.walls.iter().position(|wall| !wall.is_valid()) {
            return Err(ScenarioError::InvalidWall { index });
        }

        if self.rules.group_size == 0 {
            return Err(ScenarioError::ZeroGroupSize);
        }
        // `!(r > 0)` also rejects NaN.
        if !(self.checkpoint_radius > 0.0) {
            return Err(ScenarioError::NonPositiveRadius {
                entity: "checkpoint",
            });
        }
        if !(self.target_radius > 0.0) {
            return Err(ScenarioError::NonPositiveRadius { entity: "target" });
        }
        if !(self.rules.arrival_radius > 0.0) {
            return Err(ScenarioError::NonPositiveRadius { entity: "waypoint" });
        }
        if self.targets.len() > MAX_TARGETS {
            return Err(ScenarioError::TooManyTargets {
                count: self.targets.len(),
                max: MAX_TARGETS,
            });
        }
        if self.rules.max_ticks == 0 {
            return Err(ScenarioError::ZeroMaxTicks);
        }
        Ok(())
    }

    /// CRC-32 over the geometry. The name and rules are not included.
    pub fn digest(&self) -> u32 {
        let mut bytes = Vec::new();
        push_vec3(&mut bytes, self.start.position);
        push_f32(&mut bytes, self.start.yaw_deg);
        for list in [
            &self.checkpoints,
            &self.main_path,
            &self.branch_path,
            &self.targets,
        ] {
            bytes.extend_from_slice(&(list.len() as u32).to_le_bytes());
            for point in list {
                push_vec3(&mut bytes, *point);
            }
        }
        push_f32(&mut bytes, self.checkpoint_radius);
        push_f32(&mut bytes, self.target_radius);

        bytes.extend_from_slice(&(self.hazards.len() as u32).to_le_bytes());
        for hazard in &self.hazards {
            push_vec3(&mut bytes, hazard.center);
            push_f32(&mut bytes, hazard.radius);
        }
        bytes.extend_from_slice(&(self.walls.len() as u32).to_le_bytes());
        for wall in &self.walls {
            push_vec3(&mut bytes, wall.min);
            push_vec3(&mut bytes, wall.max);
        }
        crc32(&bytes)
    }

    pub fn with_rules(mut self, rules: EpisodeRules) -> Self {
        self.rules = rules;
        self
    }
}

fn check_positions(entity: &'static str, points: &[Vec3]) -> Result<(), ScenarioError> {
    match points.iter().position(|p| !p.is_finite()) {
        Some(index) => Err(ScenarioError::NonFinitePosition { entity, index }),
        None => Ok(()),
    }
}

fn perimeter_walls() -> Vec<Aabb> {
    let w = RANGE_HALF_WIDTH;
    let t = WALL_THICKNESS;
    let h = WALL_HEIGHT;
    vec![
        // left, right
        Aabb {
            min: Vec3::new(-w - t, -1.0, RANGE_NEAR_Z),
            max: Vec3::new(-w, h, RANGE_FAR_Z),
        },
        Aabb {
            min: Vec3::new(w, -1.0, RANGE_NEAR_Z),
            max: Vec3::new(w + t, h, RANGE_FAR_Z),
        },
        // back, front
        Aabb {
            min: Vec3::new(-w - t, -1.0, RANGE_NEAR_Z - t),
            max: Vec3::new(w + t, h, RANGE_NEAR_Z),
        },
        Aabb {
            min: Vec3::new(-w - t, -1.0, RANGE_FAR_Z),
            max: Vec3::new(w + t, h, RANGE_FAR_Z + t),
        },
    ]
}

fn push_f32(out: &mut Vec<u8>, value: f32) {
    out.extend_from_slice(&value.to_bits().to_le_bytes());
}

fn push_vec3(out: &mut Vec<u8>, v: Vec3) {
    push_f32(out, v.x);
    push_f32(out, v.y);
    push_f32(out, v.z);
}
