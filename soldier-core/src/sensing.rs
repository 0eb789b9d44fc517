//! Structured sensor readout and its flat training vector.

use serde::{Deserialize, Serialize};

use crate::constants::OBSERVATION_SIZE;
use crate::geometry::Vec3;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HitCategory {
    Target,
    Hazard,
    Obstacle,
    Checkpoint,
}

impl HitCategory {
    pub const ALL: [HitCategory; 4] = [
        HitCategory::Target,
        HitCategory::Hazard,
        HitCategory::Obstacle,
        HitCategory::Checkpoint,
    ];

    fn slot(self) -> usize {
        match self {
            Self::Target => 0,
            Self::Hazard => 1,
            Self::Obstacle => 2,
            Self::Checkpoint => 3,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RayHit {
    pub category: HitCategory,
    pub point: Vec3,
    pub distance: f32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub position: Vec3,
    pub heading_sin: f32,
    pub heading_cos: f32,
    pub ray: Option<RayHit>,
    pub expected_target: Option<(Vec3, f32)>,
    /// Unit direction and distance to the current waypoint.
    pub waypoint: Option<(Vec3, f32)>,
    pub nearest_checkpoint: Option<(Vec3, f32)>,
    pub open_group: Option<usize>,
    pub targets_remaining: f32,
}

impl Observation {
    /// Flattens to the fixed training layout. Absent readings are zeros, except
    /// the open group which is -1 once every group is done.
    pub fn to_array(&self) -> [f32; OBSERVATION_SIZE] {
        let mut out = [0.0f32; OBSERVATION_SIZE];
        let mut at = 0;
        let mut put = |values: &[f32]| {
            out[at..at + values.len()].copy_from_slice(values);
            at += values.len();
        };

        put(&self.position.to_array());
        put(&[self.heading_sin, self.heading_cos]);

        let mut one_hot = [0.0f32; 4];
        let (hit_point, hit_distance) = match self.ray {
            Some(hit) => {
                one_hot[hit.category.slot()] = 1.0;
                (hit.point, hit.distance)
            }
            None => (Vec3::ZERO, 0.0),
        };
        put(&one_hot);
        put(&hit_point.to_array());
        put(&[hit_distance]);

        for reading in [self.expected_target, self.waypoint, self.nearest_checkpoint] {
            let (v, d) = reading.unwrap_or((Vec3::ZERO, 0.0));
            put(&v.to_array());
            put(&[d]);
        }

        put(&[
            self.open_group.map(|g| g as f32).unwrap_or(-1.0),
            self.targets_remaining,
        ]);
        out
    }

    pub fn to_vec(&self) -> Vec<f32> {
        self.to_array().to_vec()
    }
}
