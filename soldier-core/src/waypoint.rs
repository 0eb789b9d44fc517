use serde::{Deserialize, Serialize};

use crate::error::EpisodeRule;
use crate::geometry::Vec3;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathLeg {
    Main,
    Branch,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Guidance {
    pub leg: PathLeg,
    /// Cursor over main-then-branch.
    pub index: usize,
    pub waypoint: Vec3,
    pub direction: Vec3,
    pub distance: f32,
}

/// Walks the main path, then the branch path, in list order.
#[derive(Clone, Debug)]
pub struct WaypointSequencer {
    main: Vec<Vec3>,
    branch: Vec<Vec3>,
    cursor: usize,
    arrival_radius: f32,
}

impl WaypointSequencer {
    pub fn new(main: Vec<Vec3>, branch: Vec<Vec3>, arrival_radius: f32) -> Self {
        Self {
            main,
            branch,
            cursor: 0,
            arrival_radius,
        }
    }

    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    pub fn len(&self) -> usize {
        self.main.len() + self.branch.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_terminal(&self) -> bool {
        self.cursor >= self.len()
    }

    pub fn current(&self) -> Option<(PathLeg, Vec3)> {
        self.at(self.cursor)
    }

    fn at(&self, cursor: usize) -> Option<(PathLeg, Vec3)> {
        if let Some(point) = self.main.get(cursor) {
            return Some((PathLeg::Main, *point));
        }
        self.branch
            .get(cursor - self.main.len())
            .map(|point| (PathLeg::Branch, *point))
    }

    pub fn guidance(&self, from: Vec3) -> Option<Guidance> {
        let (leg, waypoint) = self.current()?;
        let delta = waypoint - from;
        Some(Guidance {
            leg,
            index: self.cursor,
            waypoint,
            direction: delta.normalized(),
            distance: delta.length(),
        })
    }

    /// Moves to the next waypoint and returns it; saturates once every waypoint is consumed.
    pub fn advance(&mut self) -> Option<(PathLeg, Vec3)> {
        if !self.is_terminal() {
            self.cursor += 1;
        }
        self.current()
    }

    /// Advances at most once when `position` is inside the arrival radius.
    /// Returns the index of the waypoint that was reached.
    pub fn update(&mut self, position: Vec3) -> Option<usize> {
        let guidance = self.guidance(position)?;
        if guidance.distance < self.arrival_radius {
            self.advance();
            Some(guidance.index)
        } else {
            None
        }
    }

    pub fn main_path(&self) -> &[Vec3] {
        &self.main
    }

    pub fn branch_path(&self) -> &[Vec3] {
        &self.branch
    }

    pub fn validate(&self) -> Result<(), EpisodeRule> {
        if self.cursor > self.len() {
            return Err(EpisodeRule::WaypointCursorRange);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(count: usize, x: f32) -> Vec<Vec3> {
        (0..count)
            .map(|i| Vec3::new(x, 0.0, i as f32 * 10.0))
            .collect()
    }

    #[test]
    fn main_path_is_exhausted_before_branch() {
        let mut seq = WaypointSequencer::new(line(3, 0.0), line(2, 50.0), 2.0);
        let mut legs = vec![seq.current().map(|(leg, _)| leg)];
        while !seq.is_terminal() {
            legs.push(seq.advance().map(|(leg, _)| leg));
        }
        assert_eq!(
            legs,
            vec![
                Some(PathLeg::Main),
                Some(PathLeg::Main),
                Some(PathLeg::Main),
                Some(PathLeg::Branch),
                Some(PathLeg::Branch),
                None
            ]
        );
    }

    #[test]
    fn first_branch_point_follows_last_main_point() {
        let branch = line(2, 50.0);
        let mut seq = WaypointSequencer::new(line(2, 0.0), branch.clone(), 2.0);
        seq.advance();
        assert_eq!(seq.advance(), Some((PathLeg::Branch, branch[0])));
    }

    #[test]
    fn cursor_never_decreases_and_saturates() {
        let mut seq = WaypointSequencer::new(line(2, 0.0), Vec::new(), 2.0);
        let mut last = seq.cursor();
        for _ in 0..10 {
            seq.advance();
            assert!(seq.cursor() >= last);
            last = seq.cursor();
        }
        assert_eq!(seq.cursor(), 2);
        assert!(seq.is_terminal());
        assert!(seq.guidance(Vec3::ZERO).is_none());
        assert_eq!(seq.validate(), Ok(()));
    }

    #[test]
    fn update_advances_only_inside_arrival_radius() {
        let mut seq = WaypointSequencer::new(line(3, 0.0), Vec::new(), 2.0);
        // Standing on waypoint 0 reaches it, but only one advance per call.
        assert_eq!(seq.update(Vec3::new(0.0, 0.0, 0.5)), Some(0));
        assert_eq!(seq.cursor(), 1);
        assert_eq!(seq.update(Vec3::new(0.0, 0.0, 7.0)), None);
        assert_eq!(seq.update(Vec3::new(0.0, 0.0, 8.5)), Some(1));
    }

    #[test]
    fn guidance_reports_direction_and_distance() {
        let seq = WaypointSequencer::new(vec![Vec3::new(3.0, 0.0, 4.0)], Vec::new(), 2.0);
        let g = seq.guidance(Vec3::ZERO).expect("guidance");
        assert!((g.distance - 5.0).abs() < 1e-6);
        assert!((g.direction.x - 0.6).abs() < 1e-6);
        assert!((g.direction.z - 0.8).abs() < 1e-6);
        assert_eq!(g.leg, PathLeg::Main);
    }

    #[test]
    fn branch_only_sequence_starts_on_branch() {
        let seq = WaypointSequencer::new(Vec::new(), line(1, 5.0), 2.0);
        assert_eq!(seq.current().map(|(leg, _)| leg), Some(PathLeg::Branch));
    }

    #[test]
    fn reset_mid_sequence_returns_to_start() {
        let mut seq = WaypointSequencer::new(line(6, 0.0), line(4, 20.0), 2.0);
        for _ in 0..5 {
            seq.advance();
        }
        assert_eq!(seq.cursor(), 5);
        seq.reset();
        assert_eq!(seq.cursor(), 0);
    }
}
