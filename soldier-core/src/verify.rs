use serde::{Deserialize, Serialize};

use crate::error::VerifyError;
use crate::scenario::Scenario;
use crate::sim::{replay_strict, unpack_progress, LiveEpisode, TerminalCause};
use crate::tape::parse_tape;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VerificationJournal {
    pub seed: u32,
    pub scenario: String,
    pub tick_count: u32,
    pub reward_milli: i32,
    pub checkpoints_passed: u32,
    pub targets_eliminated: u32,
    pub cause: Option<TerminalCause>,
    pub tape_checksum: u32,
    pub scenario_digest: u32,
    pub rules_digest: u32,
}

/// Checks a tape against the scenario it claims to be recorded on, then replays
/// it with every invariant enforced and compares the claimed results.
pub fn verify_tape(
    bytes: &[u8],
    scenario: &Scenario,
    max_ticks: u32,
) -> Result<VerificationJournal, VerifyError> {
    let tape = parse_tape(bytes, max_ticks)?;
    scenario.validate()?;

    let scenario_digest = scenario.digest();
    if tape.header.scenario_digest != scenario_digest {
        return Err(VerifyError::ScenarioDigestMismatch {
            tape: tape.header.scenario_digest,
            scenario: scenario_digest,
        });
    }
    let rules_digest = scenario.rules.digest();
    if tape.header.rules_digest != rules_digest {
        return Err(VerifyError::RulesDigestMismatch {
            tape: tape.header.rules_digest,
            scenario: rules_digest,
        });
    }

    let episode = LiveEpisode::new(scenario.clone())?;
    let summary =
        replay_strict(episode, tape.actions).map_err(|err| VerifyError::RuleViolation {
            tick: err.tick,
            rule: err.rule,
        })?;

    if summary.ticks != tape.header.tick_count {
        return Err(VerifyError::TickCountMismatch {
            claimed: tape.header.tick_count,
            computed: summary.ticks,
        });
    }
    let reward_milli = summary.reward_milli_i32();
    if reward_milli != tape.footer.reward_milli {
        return Err(VerifyError::RewardMismatch {
            claimed: tape.footer.reward_milli,
            computed: reward_milli,
        });
    }
    let progress = summary.progress_word();
    if progress != tape.footer.progress {
        return Err(VerifyError::ProgressMismatch {
            claimed: tape.footer.progress,
            computed: progress,
        });
    }

    let (checkpoints_passed, targets_eliminated) = unpack_progress(progress);
    Ok(VerificationJournal {
        seed: tape.header.seed,
        scenario: scenario.name.clone(),
        tick_count: summary.ticks,
        reward_milli,
        checkpoints_passed,
        targets_eliminated,
        cause: summary.cause,
        tape_checksum: tape.footer.checksum,
        scenario_digest,
        rules_digest,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{MAX_TICKS_DEFAULT, TAPE_BYTES_PER_TICK, TAPE_HEADER_SIZE};
    use crate::geometry::{Sphere, Vec3};
    use crate::sim::{replay, ActionPair};
    use crate::tape::{crc32, serialize_tape};
    use crate::target::ContactPolicy;

    fn forward_actions(ticks: usize) -> Vec<u8> {
        ActionPair::new(1.0, 0.0).encode().repeat(ticks)
    }

    fn valid_tape(seed: u32, scenario: &Scenario, actions: &[u8]) -> Vec<u8> {
        let episode = LiveEpisode::new(scenario.clone()).expect("scenario");
        let summary = replay(episode, actions);
        serialize_tape(
            seed,
            scenario,
            actions,
            summary.reward_milli_i32(),
            summary.progress_word(),
        )
    }

    fn rewrite_footer(bytes: &mut [u8], ticks: usize, reward_milli: i32, progress: u32) {
        let offset = TAPE_HEADER_SIZE + ticks * TAPE_BYTES_PER_TICK;
        let checksum = crc32(&bytes[..offset]);
        bytes[offset..offset + 4].copy_from_slice(&reward_milli.to_le_bytes());
        bytes[offset + 4..offset + 8].copy_from_slice(&progress.to_le_bytes());
        bytes[offset + 8..offset + 12].copy_from_slice(&checksum.to_le_bytes());
    }

    #[test]
    fn accepts_recorded_run() {
        let scenario = Scenario::training_range(11);
        let actions = forward_actions(300);
        let tape = valid_tape(11, &scenario, &actions);

        let journal = verify_tape(&tape, &scenario, MAX_TICKS_DEFAULT).expect("valid tape");
        assert_eq!(journal.seed, 11);
        assert_eq!(journal.tick_count, 300);
        assert_eq!(journal.scenario_digest, scenario.digest());

        let summary = replay(LiveEpisode::new(scenario).expect("scenario"), &actions);
        assert_eq!(journal.reward_milli as i64, summary.reward_milli);
        assert_eq!(journal.checkpoints_passed, summary.checkpoints_passed);
    }

    #[test]
    fn detects_reward_tampering() {
        let scenario = Scenario::training_range(5);
        let actions = forward_actions(120);
        let mut tape = valid_tape(5, &scenario, &actions);
        let journal = verify_tape(&tape, &scenario, MAX_TICKS_DEFAULT).expect("valid tape");

        rewrite_footer(
            &mut tape,
            120,
            journal.reward_milli + 1_000,
            crate::sim::pack_progress(journal.checkpoints_passed, journal.targets_eliminated),
        );
        assert!(matches!(
            verify_tape(&tape, &scenario, MAX_TICKS_DEFAULT),
            Err(VerifyError::RewardMismatch { .. })
        ));
    }

    #[test]
    fn detects_progress_tampering() {
        let scenario = Scenario::training_range(5);
        let actions = forward_actions(120);
        let mut tape = valid_tape(5, &scenario, &actions);
        let journal = verify_tape(&tape, &scenario, MAX_TICKS_DEFAULT).expect("valid tape");

        rewrite_footer(&mut tape, 120, journal.reward_milli, 0xFFFF_FFFF);
        assert!(matches!(
            verify_tape(&tape, &scenario, MAX_TICKS_DEFAULT),
            Err(VerifyError::ProgressMismatch { .. })
        ));
    }

    #[test]
    fn rejects_tape_for_another_scenario_or_rule_set() {
        let scenario = Scenario::training_range(21);
        let tape = valid_tape(21, &scenario, &forward_actions(10));

        let other = Scenario::training_range(22);
        assert!(matches!(
            verify_tape(&tape, &other, MAX_TICKS_DEFAULT),
            Err(VerifyError::ScenarioDigestMismatch { .. })
        ));

        let mut lenient = scenario.clone();
        lenient.rules.contact_policy = ContactPolicy::Lenient;
        assert!(matches!(
            verify_tape(&tape, &lenient, MAX_TICKS_DEFAULT),
            Err(VerifyError::RulesDigestMismatch { .. })
        ));
    }

    #[test]
    fn actions_past_the_end_are_a_tick_count_mismatch() {
        let scenario = Scenario {
            hazards: vec![Sphere {
                center: Vec3::new(0.0, 0.0, 3.0),
                radius: 1.0,
            }],
            ..Scenario::default()
        };
        // The hazard ends the run at tick 8; the tape claims 20 ticks.
        let tape = valid_tape(0, &scenario, &forward_actions(20));
        assert_eq!(
            verify_tape(&tape, &scenario, MAX_TICKS_DEFAULT),
            Err(VerifyError::TickCountMismatch {
                claimed: 20,
                computed: 8
            })
        );
    }

    #[test]
    fn invalid_scenario_is_reported() {
        let mut scenario = Scenario::training_range(1);
        let tape = valid_tape(1, &scenario, &forward_actions(4));
        scenario.target_radius = -1.0;
        assert!(matches!(
            verify_tape(&tape, &scenario, MAX_TICKS_DEFAULT),
            Err(VerifyError::InvalidScenario(_))
        ));
    }
}
