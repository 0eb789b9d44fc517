use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand, ValueEnum};
use soldier_autopilot::benchmark::{resolve_bots, run_benchmark, BenchmarkConfig, Objective};
use soldier_autopilot::bots::{bot_ids, bot_manifest_entries, create_bot, describe_bots};
use soldier_autopilot::config::{load_scenario, RunConfig};
use soldier_autopilot::runner::{run_bot_on, verify_tape_file, write_tape};
use soldier_autopilot::util::{parse_seed, resolve_seeds, seed_to_hex, timestamp_suffix};
use std::fs;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "soldier-autopilot")]
#[command(about = "Scripted soldier policies: deterministic episode tapes, verification, benchmarks")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List available bots
    ListBots,
    /// Export full bot manifest (including config fingerprints)
    RosterManifest {
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Run one bot on one seed and write a verified tape
    Generate {
        #[arg(long)]
        bot: String,
        #[arg(long)]
        seed: String,
        /// Defaults to SOLDIER_MAX_TICKS, then the built-in limit
        #[arg(long)]
        max_ticks: Option<u32>,
        /// Scenario JSON; the seeded training range when omitted
        #[arg(long)]
        scenario: Option<PathBuf>,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Replay a tape with every invariant enforced and check its claims
    VerifyTape {
        #[arg(long)]
        input: PathBuf,
        /// Overrides the tick limit recorded in the tape
        #[arg(long)]
        max_ticks: Option<u32>,
        /// Scenario JSON; otherwise the training range for the tape's seed
        #[arg(long)]
        scenario: Option<PathBuf>,
    },
    /// Run multi-seed benchmark across one or more bots
    Benchmark {
        #[arg(long)]
        bots: Option<String>,
        #[arg(long)]
        seeds: Option<String>,
        #[arg(long)]
        seed_file: Option<PathBuf>,
        #[arg(long)]
        seed_start: Option<String>,
        #[arg(long, default_value_t = 12)]
        seed_count: u32,
        #[arg(long)]
        max_ticks: Option<u32>,
        #[arg(long)]
        scenario: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = CliObjective::Hybrid)]
        objective: CliObjective,
        #[arg(long)]
        out_dir: Option<PathBuf>,
        #[arg(long, default_value_t = 4)]
        save_top: usize,
        #[arg(long)]
        jobs: Option<usize>,
    },
    /// Print the scenario a seed (or file) resolves to, with overrides applied
    InspectScenario {
        #[arg(long, default_value = "0x50d10001")]
        seed: String,
        #[arg(long)]
        scenario: Option<PathBuf>,
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum CliObjective {
    Reward,
    Progress,
    Hybrid,
}

impl From<CliObjective> for Objective {
    fn from(value: CliObjective) -> Self {
        match value {
            CliObjective::Reward => Objective::Reward,
            CliObjective::Progress => Objective::Progress,
            CliObjective::Hybrid => Objective::Hybrid,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::filter::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let Cli { command } = Cli::parse();
    let env_config = RunConfig::from_env();

    match command {
        Commands::ListBots => {
            for (id, description) in describe_bots() {
                println!("{id:20} {description}");
            }
            println!("{:20} Replays a recorded tape on its own seed.", "replay:<path>");
        }
        Commands::RosterManifest { output } => {
            let manifest = bot_manifest_entries();
            let encoded = serde_json::to_vec_pretty(&manifest)?;
            if let Some(path) = output {
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::write(&path, encoded)?;
                println!("wrote={}", path.display());
                println!("bots={}", manifest.len());
            } else {
                println!("{}", String::from_utf8_lossy(&encoded));
            }
        }
        Commands::Generate {
            bot,
            seed,
            max_ticks,
            scenario,
            output,
        } => {
            if create_bot(&bot).is_none() {
                let available = bot_ids().join(", ");
                return Err(anyhow!(
                    "unknown bot '{bot}'. available: {available}, replay:<path>"
                ));
            }
            let seed = parse_seed(&seed)?;
            let config = env_config.with_max_ticks(max_ticks);
            let file = scenario.as_deref().map(load_scenario).transpose()?;
            let scenario = config.scenario_for(seed, file.as_ref());

            let artifact = run_bot_on(&bot, seed, scenario, config.max_ticks)?;
            let metrics = &artifact.metrics;
            let output_path = output.unwrap_or_else(|| {
                let safe_bot: String = bot
                    .chars()
                    .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '-' })
                    .collect();
                PathBuf::from(format!(
                    "tapes/{}-{}-reward{}-ticks{}.tape",
                    safe_bot,
                    seed_to_hex(seed).replace("0x", "seed"),
                    metrics.reward_milli,
                    metrics.tick_count
                ))
            });
            write_tape(&output_path, &artifact.tape)?;
            info!(
                bot = %metrics.bot_id,
                seed = %seed_to_hex(seed),
                ticks = metrics.tick_count,
                reward_milli = metrics.reward_milli,
                "tape generated"
            );

            println!("bot={}", metrics.bot_id);
            println!("bot_fingerprint={}", metrics.bot_fingerprint);
            println!("seed={}", seed_to_hex(seed));
            println!("scenario={}", metrics.scenario);
            println!("ticks={}", metrics.tick_count);
            println!("reward={:.3}", metrics.reward_milli as f64 / 1_000.0);
            println!("checkpoints={}", metrics.checkpoints_passed);
            println!("targets={}", metrics.targets_eliminated);
            println!("waypoints={}", metrics.waypoints_reached);
            println!(
                "cause={}",
                metrics.cause.map(|cause| cause.as_str()).unwrap_or("running")
            );
            println!("scenario_digest={:#010x}", metrics.scenario_digest);
            println!("rules_digest={:#010x}", metrics.rules_digest);
            println!("output={}", output_path.display());
        }
        Commands::VerifyTape {
            input,
            max_ticks,
            scenario,
        } => {
            let file = scenario.as_deref().map(load_scenario).transpose()?;
            let journal = verify_tape_file(&input, max_ticks, file.as_ref())?;
            info!(input = %input.display(), ticks = journal.tick_count, "tape verified");

            println!("input={}", input.display());
            println!("seed={}", seed_to_hex(journal.seed));
            println!("scenario={}", journal.scenario);
            println!("tick_count={}", journal.tick_count);
            println!("reward={:.3}", journal.reward_milli as f64 / 1_000.0);
            println!("checkpoints={}", journal.checkpoints_passed);
            println!("targets={}", journal.targets_eliminated);
            println!(
                "cause={}",
                journal.cause.map(|cause| cause.as_str()).unwrap_or("running")
            );
            println!("checksum={:#010x}", journal.tape_checksum);
            println!("rules_digest={:#010x}", journal.rules_digest);
        }
        Commands::Benchmark {
            bots,
            seeds,
            seed_file,
            seed_start,
            seed_count,
            max_ticks,
            scenario,
            objective,
            out_dir,
            save_top,
            jobs,
        } => {
            let bots = resolve_bots(bots.as_deref())?;
            let seeds = resolve_seeds(
                seeds.as_deref(),
                seed_file.as_deref(),
                seed_start.as_deref(),
                seed_count,
            )?;
            let objective: Objective = objective.into();
            let scenario = scenario.as_deref().map(load_scenario).transpose()?;

            let out_dir = out_dir.unwrap_or_else(|| {
                PathBuf::from(format!(
                    "benchmarks/{}-{}",
                    objective.as_str(),
                    timestamp_suffix()
                ))
            });

            let report = run_benchmark(BenchmarkConfig {
                bots,
                seeds,
                run: env_config.with_max_ticks(max_ticks),
                scenario,
                objective,
                out_dir: out_dir.clone(),
                save_top,
                jobs,
            })?;

            println!("objective={}", objective.as_str());
            println!("runs={}", report.run_count);
            println!(
                "jobs={}",
                report
                    .jobs
                    .map(|value| value.to_string())
                    .unwrap_or_else(|| "auto".to_string())
            );
            println!("out_dir={}", out_dir.display());
            println!("top bots:");
            for (idx, bot) in report.bot_rankings.iter().take(5).enumerate() {
                println!(
                    "  {}. {}  objective={:.2} avg_reward={:.2} avg_ticks={:.1} checkpoints={:.1} targets={:.2} clear={:.0}% hazard={:.0}%",
                    idx + 1,
                    bot.bot_id,
                    bot.objective_value,
                    bot.avg_reward,
                    bot.avg_ticks,
                    bot.avg_checkpoints,
                    bot.avg_targets,
                    bot.clear_rate * 100.0,
                    bot.hazard_rate * 100.0,
                );
            }

            println!("saved tapes:");
            for tape in report.saved_tapes.iter().take(10) {
                println!(
                    "  [{} #{:02}] {} {} reward_milli={} ticks={} targets={}",
                    tape.metric,
                    tape.rank,
                    tape.bot_id,
                    tape.seed_hex,
                    tape.reward_milli,
                    tape.ticks,
                    tape.targets,
                );
            }
        }
        Commands::InspectScenario {
            seed,
            scenario,
            output,
        } => {
            let seed = parse_seed(&seed)?;
            let file = scenario.as_deref().map(load_scenario).transpose()?;
            let scenario = env_config.scenario_for(seed, file.as_ref());
            let encoded = serde_json::to_vec_pretty(&scenario)?;
            if let Some(path) = output {
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::write(&path, encoded)?;
                println!("wrote={}", path.display());
                println!("scenario_digest={:#010x}", scenario.digest());
                println!("rules_digest={:#010x}", scenario.rules.digest());
            } else {
                println!("{}", String::from_utf8_lossy(&encoded));
            }
        }
    }

    Ok(())
}
