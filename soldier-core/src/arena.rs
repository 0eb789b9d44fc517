//! Headless stand-in for the engine: kinematics, trigger contacts and the forward ray.

use std::collections::BTreeSet;

use crate::checkpoint::{CheckpointRegistry, CheckpointStatus};
use crate::constants::{AGENT_RADIUS, AGENT_SPEED, AGENT_TURN_RATE_DEG, RAY_LENGTH, TICK_SECONDS};
use crate::events::{ContactKind, EventQueue};
use crate::geometry::{ray_aabb, ray_sphere, wrap_degrees, Aabb, Pose, Sphere, Vec3};
use crate::sensing::{HitCategory, RayHit};
use crate::target::TargetTracker;

#[derive(Clone, Debug)]
pub struct Arena {
    walls: Vec<Aabb>,
    hazards: Vec<Sphere>,
    touching: BTreeSet<ContactKind>,
}

impl Arena {
    pub fn new(walls: Vec<Aabb>, hazards: Vec<Sphere>) -> Self {
        Self {
            walls,
            hazards,
            touching: BTreeSet::new(),
        }
    }

    pub fn reset(&mut self) {
        self.touching.clear();
    }

    /// Turns, then moves along the new heading. Inputs are expected in [-1, 1].
    ///
    /// A move that would overlap a wall is rejected; the index of the first
    /// blocking wall is returned and the position is left unchanged.
    pub fn integrate(&self, pose: &mut Pose, forward: f32, turn: f32) -> Option<usize> {
        pose.yaw_deg = wrap_degrees(pose.yaw_deg + turn * AGENT_TURN_RATE_DEG * TICK_SECONDS);
        if forward == 0.0 {
            return None;
        }

        let candidate = pose.position + pose.forward() * (forward * AGENT_SPEED * TICK_SECONDS);
        match self
            .walls
            .iter()
            .position(|wall| wall.overlaps_sphere(candidate, AGENT_RADIUS))
        {
            Some(index) => Some(index),
            None => {
                pose.position = candidate;
                None
            }
        }
    }

    /// Queues contacts that began this tick. Contacts that persist from the
    /// previous tick are not repeated.
    pub fn sense(
        &mut self,
        position: Vec3,
        blocked_by: Option<usize>,
        checkpoints: &CheckpointRegistry,
        targets: &TargetTracker,
        queue: &mut EventQueue,
    ) -> usize {
        let mut now = BTreeSet::new();

        if let Some(wall) = blocked_by {
            now.insert(ContactKind::Wall(wall));
        }
        for (index, wall) in self.walls.iter().enumerate() {
            if wall.overlaps_sphere(position, AGENT_RADIUS) {
                now.insert(ContactKind::Wall(index));
            }
        }
        for (index, hazard) in self.hazards.iter().enumerate() {
            if hazard.overlaps_sphere(position, AGENT_RADIUS) {
                now.insert(ContactKind::Hazard(index));
            }
        }
        let cp_radius = checkpoints.radius();
        for cp in checkpoints.checkpoints() {
            if cp.status != CheckpointStatus::Passed
                && cp.position.distance(position) <= cp_radius + AGENT_RADIUS
            {
                now.insert(ContactKind::Checkpoint(cp.index));
            }
        }
        let target_radius = targets.radius();
        for target in targets.contactable() {
            if target.position.distance(position) <= target_radius + AGENT_RADIUS {
                now.insert(ContactKind::Target(target.id));
            }
        }

        let mut entered = 0;
        for contact in now.difference(&self.touching) {
            queue.push(*contact);
            entered += 1;
        }
        self.touching = now;
        entered
    }

    /// Nearest thing along the agent's heading within the ray length.
    pub fn cast_ray(
        &self,
        pose: &Pose,
        checkpoints: &CheckpointRegistry,
        targets: &TargetTracker,
    ) -> Option<RayHit> {
        let origin = pose.position;
        let dir = pose.forward();
        let mut best: Option<(f32, HitCategory)> = None;
        let mut consider = |hit: Option<f32>, category: HitCategory| {
            if let Some(t) = hit {
                if best.is_none_or(|(d, _)| t < d) {
                    best = Some((t, category));
                }
            }
        };

        for wall in &self.walls {
            consider(ray_aabb(origin, dir, wall, RAY_LENGTH), HitCategory::Obstacle);
        }
        for hazard in &self.hazards {
            consider(ray_sphere(origin, dir, hazard, RAY_LENGTH), HitCategory::Hazard);
        }
        for target in targets.alive() {
            let sphere = Sphere {
                center: target.position,
                radius: targets.radius(),
            };
            consider(ray_sphere(origin, dir, &sphere, RAY_LENGTH), HitCategory::Target);
        }
        for cp in checkpoints.checkpoints() {
            if cp.status == CheckpointStatus::Passed {
                continue;
            }
            let sphere = Sphere {
                center: cp.position,
                radius: checkpoints.radius(),
            };
            consider(
                ray_sphere(origin, dir, &sphere, RAY_LENGTH),
                HitCategory::Checkpoint,
            );
        }

        best.map(|(distance, category)| RayHit {
            category,
            point: origin + dir * distance,
            distance,
        })
    }

    pub fn walls(&self) -> &[Aabb] {
        &self.walls
    }

    pub fn hazards(&self) -> &[Sphere] {
        &self.hazards
    }
}
