use crate::bots::{bot_fingerprint, create_bot, AutopilotBot};
use crate::config::RunConfig;
use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use soldier_core::reward::{RewardBreakdown, RewardEvent};
use soldier_core::sim::{LiveEpisode, TerminalCause};
use soldier_core::tape::{read_tape_header, serialize_tape};
use soldier_core::{verify_tape, Scenario, VerificationJournal};
use std::fs;
use std::path::Path;
use tracing::debug;

#[derive(Clone, Debug, Serialize)]
pub struct RunMetrics {
    pub bot_id: String,
    pub bot_fingerprint: String,
    pub seed: u32,
    pub scenario: String,
    pub max_ticks: u32,
    pub tick_count: u32,
    pub reward_milli: i64,
    pub reward: f32,
    pub breakdown: RewardBreakdown,
    pub checkpoints_passed: u32,
    pub targets_eliminated: u32,
    pub waypoints_reached: u32,
    pub done: bool,
    pub truncated: bool,
    pub cause: Option<TerminalCause>,
    pub scenario_digest: u32,
    pub rules_digest: u32,
    pub moving_ticks: u32,
    pub reversing_ticks: u32,
    pub turning_ticks: u32,
}

#[derive(Clone, Debug)]
pub struct RunArtifact {
    pub metrics: RunMetrics,
    /// Encoded action pairs, two bytes per tick.
    pub actions: Vec<u8>,
    pub tape: Vec<u8>,
}

/// Runs a roster bot on the seeded training range.
pub fn run_bot(bot_id: &str, seed: u32, max_ticks: u32) -> Result<RunArtifact> {
    run_bot_on(bot_id, seed, Scenario::training_range(seed), max_ticks)
}

pub fn run_bot_on(
    bot_id: &str,
    seed: u32,
    scenario: Scenario,
    max_ticks: u32,
) -> Result<RunArtifact> {
    if max_ticks == 0 {
        return Err(anyhow!("max_ticks must be > 0"));
    }

    let mut bot = create_bot(bot_id).ok_or_else(|| anyhow!("unknown bot '{bot_id}'"))?;
    run_bot_instance(bot.as_mut(), seed, scenario, max_ticks)
}

pub fn run_bot_instance(
    bot: &mut dyn AutopilotBot,
    seed: u32,
    scenario: Scenario,
    max_ticks: u32,
) -> Result<RunArtifact> {
    if max_ticks == 0 {
        return Err(anyhow!("max_ticks must be > 0"));
    }

    bot.reset(seed);

    let mut episode = LiveEpisode::new(scenario.clone())
        .with_context(|| format!("scenario '{}' rejected", scenario.name))?;
    episode
        .validate()
        .map_err(|rule| anyhow!("initial invariant failure: {rule}"))?;

    let mut actions = Vec::with_capacity(max_ticks as usize * 2);
    while episode.tick() < max_ticks && !episode.is_done() {
        let snapshot = episode.snapshot();
        // Step exactly what the tape will replay.
        let action = bot.next_action(&snapshot).quantized();
        actions.extend_from_slice(&action.encode());

        let outcome = episode
            .step_checked(action)
            .map_err(|rule| anyhow!("invariant failure at tick {}: {rule}", episode.tick()))?;
        for event in &outcome.events {
            match event {
                RewardEvent::Step => {}
                RewardEvent::TargetEliminated { target, in_order } => debug!(
                    bot = bot.id(),
                    tick = episode.tick(),
                    target = target.0,
                    in_order,
                    "target eliminated"
                ),
                other => debug!(bot = bot.id(), tick = episode.tick(), event = ?other, "episode event"),
            }
        }
        if let Some(cause) = outcome.cause.filter(|_| outcome.done) {
            debug!(bot = bot.id(), tick = episode.tick(), cause = cause.as_str(), "episode ended");
        }
    }

    let summary = episode.summary();
    let tape = serialize_tape(
        seed,
        &scenario,
        &actions,
        summary.reward_milli_i32(),
        summary.progress_word(),
    );
    let journal = verify_tape(&tape, &scenario, max_ticks.max(summary.ticks).max(1))
        .map_err(|err| anyhow!("generated tape failed verification: {err}"))?;

    let mut moving_ticks = 0u32;
    let mut reversing_ticks = 0u32;
    let mut turning_ticks = 0u32;
    for pair in actions.chunks_exact(2) {
        let forward = pair[0] as i8;
        if forward > 0 {
            moving_ticks += 1;
        } else if forward < 0 {
            reversing_ticks += 1;
        }
        if pair[1] != 0 {
            turning_ticks += 1;
        }
    }

    Ok(RunArtifact {
        metrics: RunMetrics {
            bot_id: bot.id().to_string(),
            bot_fingerprint: bot_fingerprint(bot.id()).unwrap_or_else(|| "unknown".to_string()),
            seed,
            scenario: scenario.name.clone(),
            max_ticks,
            tick_count: summary.ticks,
            reward_milli: summary.reward_milli,
            reward: summary.reward,
            breakdown: summary.breakdown,
            checkpoints_passed: summary.checkpoints_passed,
            targets_eliminated: summary.targets_eliminated,
            waypoints_reached: summary.waypoints_reached,
            done: summary.done,
            truncated: summary.truncated,
            cause: summary.cause,
            scenario_digest: journal.scenario_digest,
            rules_digest: journal.rules_digest,
            moving_ticks,
            reversing_ticks,
            turning_ticks,
        },
        actions,
        tape,
    })
}

pub fn write_tape(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed creating directory {}", parent.display()))?;
    }
    fs::write(path, bytes).with_context(|| format!("failed writing {}", path.display()))
}

/// Verifies a tape file under the overrides recorded in its header. `max_ticks`
/// replaces the recorded tick limit; `scenario` replaces the seeded training range.
pub fn verify_tape_file(
    path: &Path,
    max_ticks: Option<u32>,
    scenario: Option<&Scenario>,
) -> Result<VerificationJournal> {
    let bytes = fs::read(path).with_context(|| format!("failed reading {}", path.display()))?;
    let header = read_tape_header(&bytes)
        .with_context(|| format!("{} is not a tape", path.display()))?;
    let config = RunConfig::for_tape(&header).with_max_ticks(max_ticks);
    let scenario = config.scenario_for(header.seed, scenario);
    verify_tape(&bytes, &scenario, config.max_ticks)
        .with_context(|| format!("tape {} failed verification", path.display()))
}
