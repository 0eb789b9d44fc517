use anyhow::Result;
use soldier_autopilot::benchmark::{run_benchmark, BenchmarkConfig, Objective};
use soldier_autopilot::bots::bot_ids;
use soldier_autopilot::config::RunConfig;
use soldier_autopilot::runner::{run_bot, run_bot_on, verify_tape_file, write_tape};
use soldier_core::constants::{TAPE_FOOTER_SIZE, TAPE_HEADER_SIZE};
use soldier_core::sim::TerminalCause;
use soldier_core::tape::parse_tape;
use soldier_core::target::ContactPolicy;
use soldier_core::{verify_tape, Scenario};

#[test]
fn all_bots_generate_verifiable_tapes_on_smoke_seed() -> Result<()> {
    let seed = 0xDEAD_BEEF;
    for bot in bot_ids() {
        // Keep this light: it runs every `cargo test` and touches every bot.
        let artifact = run_bot(bot, seed, 400)?;
        let metrics = &artifact.metrics;
        assert!(metrics.tick_count > 0, "bot={bot}");
        assert_eq!(metrics.bot_id, bot, "bot id mismatch for {bot}");
        assert_eq!(
            artifact.tape.len(),
            TAPE_HEADER_SIZE + artifact.actions.len() + TAPE_FOOTER_SIZE,
            "tape size for {bot}"
        );

        let journal = verify_tape(&artifact.tape, &Scenario::training_range(seed), 400)?;
        assert_eq!(journal.tick_count, metrics.tick_count, "bot={bot}");
        assert_eq!(journal.reward_milli as i64, metrics.reward_milli, "bot={bot}");
    }
    Ok(())
}

#[test]
fn idle_bot_runs_into_the_time_limit() -> Result<()> {
    let artifact = run_bot("idle", 0xC0FF_EE11, 50)?;
    let metrics = &artifact.metrics;
    assert_eq!(metrics.tick_count, 50);
    assert_eq!(metrics.moving_ticks, 0);
    assert_eq!(metrics.reward_milli, -500, "step cost only");
    // The runner stopped at its own bound, before the rules' tick limit.
    assert!(!metrics.done);
    Ok(())
}

#[test]
fn hunter_eliminates_targets_on_several_seeds() -> Result<()> {
    let mut total = 0;
    for seed in [0xDEAD_BEEF, 0xC0FF_EE11, 0x1234_5678] {
        let artifact = run_bot("hunter", seed, 3_000)?;
        assert_ne!(
            artifact.metrics.cause,
            Some(TerminalCause::Wall),
            "seed={seed:#x}"
        );
        total += artifact.metrics.targets_eliminated;
    }
    assert!(total >= 3, "hunter eliminated only {total} targets");
    Ok(())
}

#[test]
fn replay_bot_reproduces_a_recorded_tape() -> Result<()> {
    let seed = 0x1234_5678;
    let original = run_bot("checkpoint-runner", seed, 600)?;

    let tmp = tempfile::tempdir()?;
    let path = tmp.path().join("runs/recorded.tape");
    write_tape(&path, &original.tape)?;

    let replay_id = format!("replay:{}", path.display());
    let replayed = run_bot(&replay_id, seed, 600)?;
    assert_eq!(replayed.metrics.bot_id, replay_id);
    assert_eq!(replayed.actions, original.actions);
    assert_eq!(replayed.metrics.reward_milli, original.metrics.reward_milli);

    // On another seed the replay bot idles instead of replaying foreign actions.
    let foreign = run_bot(&replay_id, seed ^ 1, 20)?;
    assert_eq!(foreign.metrics.moving_ticks, 0);
    Ok(())
}

#[test]
fn env_style_overrides_flow_into_the_tape_header() -> Result<()> {
    let config = RunConfig {
        max_ticks: 300,
        contact_policy: ContactPolicy::Lenient,
        step_cost_disabled: true,
    };
    let seed = 77;
    let scenario = config.scenario_for(seed, None);
    let artifact = run_bot_on("hunter", seed, scenario.clone(), config.max_ticks)?;

    let view = parse_tape(&artifact.tape, config.max_ticks)?;
    assert_eq!(view.header.policy, ContactPolicy::Lenient);
    assert_eq!(view.header.rules_digest, scenario.rules.digest());
    assert_eq!(artifact.metrics.breakdown.steps, 0);

    // The default rules do not match this tape.
    assert!(verify_tape(&artifact.tape, &Scenario::training_range(seed), 300).is_err());
    Ok(())
}

#[test]
fn tape_written_with_overrides_verifies_without_flags() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let config = RunConfig {
        max_ticks: 300,
        step_cost_disabled: true,
        ..RunConfig::default()
    };
    let seed = 7;
    let artifact = run_bot_on("hunter", seed, config.scenario_for(seed, None), config.max_ticks)?;
    let path = tmp.path().join("hunter-short.tape");
    write_tape(&path, &artifact.tape)?;

    let journal = verify_tape_file(&path, None, None)?;
    assert_eq!(journal.tick_count, artifact.metrics.tick_count);
    assert_eq!(journal.reward_milli as i64, artifact.metrics.reward_milli);
    assert_eq!(journal.rules_digest, artifact.metrics.rules_digest);

    // An explicit limit that differs from the recorded one changes the rules.
    assert!(verify_tape_file(&path, Some(3_000), None).is_err());
    Ok(())
}

#[test]
fn benchmark_smoke_outputs_expected_metadata() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let run = RunConfig {
        max_ticks: 600,
        ..RunConfig::default()
    };
    let report = run_benchmark(BenchmarkConfig {
        bots: vec!["hunter".to_string(), "waypoint-follower".to_string()],
        seeds: vec![0xDEAD_BEEF, 0xC0FF_EE11],
        run,
        scenario: None,
        objective: Objective::Hybrid,
        out_dir: tmp.path().to_path_buf(),
        save_top: 1,
        jobs: Some(2),
    })?;

    assert_eq!(report.run_count, 4);
    assert_eq!(report.bot_rankings.len(), 2);
    assert_eq!(report.saved_tapes.len(), 3);
    assert!(tmp.path().join("summary.json").exists());
    assert!(tmp.path().join("runs.csv").exists());
    assert!(tmp.path().join("rankings.csv").exists());
    assert!(tmp.path().join("top-objective").is_dir());

    let runs_csv = std::fs::read_to_string(tmp.path().join("runs.csv"))?;
    assert_eq!(runs_csv.lines().count(), 5);

    for saved in &report.saved_tapes {
        let bytes = std::fs::read(&saved.path)?;
        verify_tape(&bytes, &run.scenario_for(saved.seed, None), run.max_ticks)?;
    }
    Ok(())
}
