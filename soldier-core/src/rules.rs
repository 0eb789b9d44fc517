use serde::{Deserialize, Serialize};

use crate::constants::{
    CHECKPOINT_GROUP_SIZE, MAX_TICKS_DEFAULT, TARGET_REMOVAL_DELAY_TICKS, WAYPOINT_ARRIVAL_RADIUS,
};
use crate::reward::RewardPolicy;
use crate::tape::crc32;
use crate::target::ContactPolicy;

/// What opens the next checkpoint group.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupAdvance {
    /// Only passing every checkpoint of the open group.
    #[default]
    Cleared,
    /// Also every target elimination, which closes the open group early.
    Elimination,
}

/// Per-run rule knobs. Missing JSON fields take the built-in defaults.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EpisodeRules {
    pub reward: RewardPolicy,
    pub contact_policy: ContactPolicy,
    pub group_advance: GroupAdvance,
    pub group_size: usize,
    pub arrival_radius: f32,
    pub removal_delay_ticks: u32,
    pub max_ticks: u32,
}

impl Default for EpisodeRules {
    fn default() -> Self {
        Self {
            reward: RewardPolicy::default(),
            contact_policy: ContactPolicy::Strict,
            group_advance: GroupAdvance::Cleared,
            group_size: CHECKPOINT_GROUP_SIZE,
            arrival_radius: WAYPOINT_ARRIVAL_RADIUS,
            removal_delay_ticks: TARGET_REMOVAL_DELAY_TICKS,
            max_ticks: MAX_TICKS_DEFAULT,
        }
    }
}

impl EpisodeRules {
    /// Fingerprint of everything that changes replay results.
    pub fn digest(&self) -> u32 {
        let mut bytes = Vec::with_capacity(64);
        self.reward.write_digest_bytes(&mut bytes);
        bytes.push(self.contact_policy.tag());
        bytes.push(match self.group_advance {
            GroupAdvance::Cleared => 0,
            GroupAdvance::Elimination => 1,
        });
        bytes.extend_from_slice(&(self.group_size as u32).to_le_bytes());
        bytes.extend_from_slice(&self.arrival_radius.to_bits().to_le_bytes());
        bytes.extend_from_slice(&self.removal_delay_ticks.to_le_bytes());
        bytes.extend_from_slice(&self.max_ticks.to_le_bytes());
        crc32(&bytes)
    }
}
