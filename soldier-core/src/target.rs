use serde::{Deserialize, Serialize};

use crate::error::EpisodeRule;
use crate::geometry::Vec3;

/// Slot of a target in scenario order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetId(pub u16);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TargetStatus {
    Alive,
    /// Out of play; final removal is still pending.
    Disabled,
    Removed,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Target {
    pub id: TargetId,
    pub position: Vec3,
    pub status: TargetStatus,
}

/// Which contacts count as an elimination.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactPolicy {
    /// Only the expected target; anything else is ignored.
    #[default]
    Strict,
    /// Any live target; out-of-order hits are flagged.
    Lenient,
}

impl ContactPolicy {
    pub fn tag(self) -> u8 {
        match self {
            Self::Strict => 1,
            Self::Lenient => 2,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(Self::Strict),
            2 => Some(Self::Lenient),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Lenient => "lenient",
        }
    }
}

impl core::str::FromStr for ContactPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "lenient" => Ok(Self::Lenient),
            other => Err(format!("unknown contact policy '{other}' (strict|lenient)")),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContactOutcome {
    Eliminated {
        target: TargetId,
        in_order: bool,
        exhausted: bool,
    },
    Ignored,
}

#[derive(Clone, Debug)]
pub struct TargetTracker {
    targets: Vec<Target>,
    radius: f32,
    next: usize,
    policy: ContactPolicy,
}

impl TargetTracker {
    pub fn new(positions: &[Vec3], radius: f32, policy: ContactPolicy) -> Self {
        let targets = positions
            .iter()
            .enumerate()
            .map(|(slot, position)| Target {
                id: TargetId(slot as u16),
                position: *position,
                status: TargetStatus::Alive,
            })
            .collect();
        Self {
            targets,
            radius,
            next: 0,
            policy,
        }
    }

    pub fn reset(&mut self) {
        for target in &mut self.targets {
            target.status = TargetStatus::Alive;
        }
        self.next = 0;
    }

    pub fn on_contact(&mut self, id: TargetId) -> ContactOutcome {
        let slot = id.0 as usize;
        let Some(target) = self.targets.get(slot) else {
            return ContactOutcome::Ignored;
        };
        if target.status != TargetStatus::Alive {
            return ContactOutcome::Ignored;
        }

        let in_order = slot == self.next;
        if !in_order && self.policy == ContactPolicy::Strict {
            return ContactOutcome::Ignored;
        }

        self.targets[slot].status = TargetStatus::Disabled;
        while self
            .targets
            .get(self.next)
            .is_some_and(|t| t.status != TargetStatus::Alive)
        {
            self.next += 1;
        }

        ContactOutcome::Eliminated {
            target: id,
            in_order,
            exhausted: self.is_exhausted(),
        }
    }

    /// Completes a deferred removal. Only a disabled target can be removed.
    pub fn finalize_removal(&mut self, id: TargetId) -> bool {
        match self.targets.get_mut(id.0 as usize) {
            Some(target) if target.status == TargetStatus::Disabled => {
                target.status = TargetStatus::Removed;
                true
            }
            _ => false,
        }
    }

    pub fn expected(&self) -> Option<&Target> {
        self.targets.get(self.next)
    }

    pub fn pointer(&self) -> usize {
        self.next
    }

    pub fn is_exhausted(&self) -> bool {
        self.next >= self.targets.len()
    }

    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    pub fn alive(&self) -> impl Iterator<Item = &Target> {
        self.targets
            .iter()
            .filter(|t| t.status == TargetStatus::Alive)
    }

    /// Targets a contact could eliminate right now. Under `Strict` that is
    /// only the expected target, so standing inside a later target reports
    /// it once it becomes expected.
    pub fn contactable(&self) -> impl Iterator<Item = &Target> {
        let strict = self.policy == ContactPolicy::Strict;
        let expected = self.expected().map(|t| t.id);
        self.alive()
            .filter(move |t| !strict || Some(t.id) == expected)
    }

    pub fn eliminated_count(&self) -> usize {
        self.targets.len() - self.alive().count()
    }

    pub fn policy(&self) -> ContactPolicy {
        self.policy
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn validate(&self) -> Result<(), EpisodeRule> {
        if self.next > self.targets.len() {
            return Err(EpisodeRule::TargetPointerRange);
        }
        if self.targets[..self.next]
            .iter()
            .any(|t| t.status == TargetStatus::Alive)
        {
            return Err(EpisodeRule::TargetPointerBehindAlive);
        }
        Ok(())
    }
}
