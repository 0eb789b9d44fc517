//! Checkpoints processed in fixed-size groups.
//!
//! Exactly one group is open at a time. Only checkpoints of the open group are
//! `Active`; passing the last active one opens the next group.

use core::ops::Range;

use crate::error::EpisodeRule;
use crate::geometry::Vec3;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CheckpointStatus {
    Dormant,
    Active,
    Passed,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Checkpoint {
    pub index: usize,
    pub position: Vec3,
    pub status: CheckpointStatus,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PassOutcome {
    Accepted {
        remaining_in_group: usize,
        opened: Option<Range<usize>>,
    },
    AlreadyPassed,
    NotOpen,
    OutOfRange,
}

#[derive(Clone, Debug)]
pub struct CheckpointRegistry {
    checkpoints: Vec<Checkpoint>,
    radius: f32,
    group_size: usize,
    open_group: usize,
}

impl CheckpointRegistry {
    pub fn new(positions: &[Vec3], radius: f32, group_size: usize) -> Self {
        let checkpoints = positions
            .iter()
            .enumerate()
            .map(|(index, position)| Checkpoint {
                index,
                position: *position,
                status: CheckpointStatus::Dormant,
            })
            .collect();
        let mut registry = Self {
            checkpoints,
            radius,
            group_size: group_size.max(1),
            open_group: 0,
        };
        registry.reset();
        registry
    }

    pub fn reset(&mut self) {
        for checkpoint in &mut self.checkpoints {
            checkpoint.status = CheckpointStatus::Dormant;
        }
        self.open_group = 0;
        self.activate(self.group_range(0));
    }

    /// Marks the dormant checkpoints in `range` active, clamped to registry bounds.
    pub fn activate(&mut self, range: Range<usize>) -> usize {
        let len = self.checkpoints.len();
        let start = range.start.min(len);
        let end = range.end.min(len);

        let mut activated = 0;
        for checkpoint in &mut self.checkpoints[start..end.max(start)] {
            if checkpoint.status == CheckpointStatus::Dormant {
                checkpoint.status = CheckpointStatus::Active;
                activated += 1;
            }
        }
        activated
    }

    pub fn pass(&mut self, index: usize) -> PassOutcome {
        let Some(checkpoint) = self.checkpoints.get_mut(index) else {
            return PassOutcome::OutOfRange;
        };

        match checkpoint.status {
            CheckpointStatus::Passed => PassOutcome::AlreadyPassed,
            CheckpointStatus::Dormant => PassOutcome::NotOpen,
            CheckpointStatus::Active => {
                checkpoint.status = CheckpointStatus::Passed;
                let remaining_in_group = self.remaining_in_open_group();
                let opened = if remaining_in_group == 0 {
                    self.open_next_group()
                } else {
                    None
                };
                PassOutcome::Accepted {
                    remaining_in_group,
                    opened,
                }
            }
        }
    }

    /// Closes the open group early (its active checkpoints go back to dormant) and opens
    /// the next one.
    pub fn force_advance(&mut self) -> Option<Range<usize>> {
        let current = self.open_range()?;
        for checkpoint in &mut self.checkpoints[current] {
            if checkpoint.status == CheckpointStatus::Active {
                checkpoint.status = CheckpointStatus::Dormant;
            }
        }
        self.open_next_group()
    }

    fn open_next_group(&mut self) -> Option<Range<usize>> {
        self.open_group += 1;
        let range = self.open_range()?;
        self.activate(range.clone());
        Some(range)
    }

    fn remaining_in_open_group(&self) -> usize {
        self.open_range()
            .map(|range| {
                self.checkpoints[range]
                    .iter()
                    .filter(|cp| cp.status == CheckpointStatus::Active)
                    .count()
            })
            .unwrap_or(0)
    }

    pub fn group_range(&self, group: usize) -> Range<usize> {
        let len = self.checkpoints.len();
        let start = group.saturating_mul(self.group_size).min(len);
        let end = start.saturating_add(self.group_size).min(len);
        start..end
    }

    pub fn open_range(&self) -> Option<Range<usize>> {
        if self.is_exhausted() {
            None
        } else {
            Some(self.group_range(self.open_group))
        }
    }

    pub fn open_group(&self) -> Option<usize> {
        (!self.is_exhausted()).then_some(self.open_group)
    }

    pub fn group_of(&self, index: usize) -> usize {
        index / self.group_size
    }

    pub fn group_count(&self) -> usize {
        self.checkpoints.len().div_ceil(self.group_size)
    }

    pub fn is_exhausted(&self) -> bool {
        self.open_group.saturating_mul(self.group_size) >= self.checkpoints.len()
    }

    pub fn any_active(&self) -> bool {
        self.remaining_in_open_group() > 0
    }

    pub fn status(&self, index: usize) -> Option<CheckpointStatus> {
        self.checkpoints.get(index).map(|cp| cp.status)
    }

    pub fn checkpoints(&self) -> &[Checkpoint] {
        &self.checkpoints
    }

    pub fn active(&self) -> impl Iterator<Item = &Checkpoint> {
        self.checkpoints
            .iter()
            .filter(|cp| cp.status == CheckpointStatus::Active)
    }

    pub fn passed_count(&self) -> usize {
        self.checkpoints
            .iter()
            .filter(|cp| cp.status == CheckpointStatus::Passed)
            .count()
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn len(&self) -> usize {
        self.checkpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checkpoints.is_empty()
    }

    pub fn validate(&self) -> Result<(), EpisodeRule> {
        let open = self.open_range();
        let open_end = open.as_ref().map(|r| r.end).unwrap_or(self.checkpoints.len());

        for checkpoint in &self.checkpoints {
            let in_open = open
                .as_ref()
                .is_some_and(|range| range.contains(&checkpoint.index));
            match checkpoint.status {
                CheckpointStatus::Active if !in_open => {
                    return Err(EpisodeRule::CheckpointActiveOutsideGroup);
                }
                CheckpointStatus::Passed if checkpoint.index >= open_end => {
                    return Err(EpisodeRule::CheckpointPassedAhead);
                }
                _ => {}
            }
        }

        if open.is_some() && !self.any_active() {
            return Err(EpisodeRule::CheckpointOpenGroup);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(len: usize, group_size: usize) -> CheckpointRegistry {
        let positions: Vec<Vec3> = (0..len)
            .map(|i| Vec3::new(0.0, 0.0, i as f32 * 5.0))
            .collect();
        CheckpointRegistry::new(&positions, 1.5, group_size)
    }

    fn statuses(reg: &CheckpointRegistry) -> Vec<CheckpointStatus> {
        reg.checkpoints().iter().map(|cp| cp.status).collect()
    }

    #[test]
    fn passing_first_group_opens_second() {
        use CheckpointStatus::*;
        let mut reg = registry(9, 3);
        assert_eq!(reg.open_range(), Some(0..3));

        assert_eq!(
            reg.pass(0),
            PassOutcome::Accepted {
                remaining_in_group: 2,
                opened: None
            }
        );
        reg.pass(1);
        assert_eq!(
            reg.pass(2),
            PassOutcome::Accepted {
                remaining_in_group: 0,
                opened: Some(3..6)
            }
        );

        assert_eq!(
            statuses(&reg),
            vec![Passed, Passed, Passed, Active, Active, Active, Dormant, Dormant, Dormant]
        );
        assert_eq!(reg.validate(), Ok(()));
    }

    #[test]
    fn last_group_opens_nothing() {
        let mut reg = registry(8, 3);
        for i in 0..6 {
            reg.pass(i);
        }
        assert_eq!(reg.open_range(), Some(6..8));
        reg.pass(6);
        assert_eq!(
            reg.pass(7),
            PassOutcome::Accepted {
                remaining_in_group: 0,
                opened: None
            }
        );
        assert!(reg.is_exhausted());
        assert_eq!(reg.open_group(), None);
        assert_eq!(reg.active().count(), 0);
        assert_eq!(reg.validate(), Ok(()));
    }

    #[test]
    fn every_group_opens_exactly_the_next() {
        for group_size in 1..=5 {
            for len in 0..=13 {
                let mut reg = registry(len, group_size);
                let mut group = 0;
                while let Some(range) = reg.open_range() {
                    assert_eq!(range, reg.group_range(group));
                    let active: Vec<usize> = reg.active().map(|cp| cp.index).collect();
                    assert_eq!(active, range.clone().collect::<Vec<_>>());
                    for index in range {
                        reg.pass(index);
                    }
                    reg.validate().expect("registry invariants");
                    group += 1;
                }
                assert_eq!(group, reg.group_count(), "len={len} group_size={group_size}");
                assert_eq!(reg.passed_count(), len);
            }
        }
    }

    #[test]
    fn wrong_order_and_duplicates_are_reported() {
        let mut reg = registry(6, 3);
        assert_eq!(reg.pass(4), PassOutcome::NotOpen);
        reg.pass(0);
        assert_eq!(reg.pass(0), PassOutcome::AlreadyPassed);
        assert_eq!(reg.pass(99), PassOutcome::OutOfRange);
        assert_eq!(reg.status(4), Some(CheckpointStatus::Dormant));
    }

    #[test]
    fn activation_is_clamped_to_bounds() {
        let mut reg = registry(4, 3);
        assert_eq!(reg.activate(10..20), 0);
        assert_eq!(reg.activate(3..50), 1);
        assert_eq!(reg.status(3), Some(CheckpointStatus::Active));
        #[allow(clippy::reversed_empty_ranges)]
        let reversed = 3..1;
        assert_eq!(reg.activate(reversed), 0);
    }

    #[test]
    fn force_advance_closes_open_group() {
        use CheckpointStatus::*;
        let mut reg = registry(9, 3);
        reg.pass(0);
        assert_eq!(reg.force_advance(), Some(3..6));
        assert_eq!(
            statuses(&reg),
            vec![Passed, Dormant, Dormant, Active, Active, Active, Dormant, Dormant, Dormant]
        );
        assert_eq!(reg.pass(1), PassOutcome::NotOpen);
        assert_eq!(reg.validate(), Ok(()));
    }

    #[test]
    fn empty_registry_is_exhausted_from_the_start() {
        let reg = registry(0, 3);
        assert!(reg.is_exhausted());
        assert_eq!(reg.open_range(), None);
        assert_eq!(reg.validate(), Ok(()));
    }

    #[test]
    fn reset_reopens_first_group() {
        let mut reg = registry(9, 3);
        for i in 0..5 {
            reg.pass(i);
        }
        reg.reset();
        assert_eq!(reg.open_range(), Some(0..3));
        assert_eq!(reg.passed_count(), 0);
        assert_eq!(reg.active().count(), 3);
    }
}
