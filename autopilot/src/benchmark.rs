use crate::bots::bot_ids;
use crate::config::RunConfig;
use crate::runner::{run_bot_on, RunMetrics};
use crate::util::seed_to_hex;
use anyhow::{anyhow, Context, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use soldier_core::sim::TerminalCause;
use soldier_core::Scenario;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    Reward,
    Progress,
    Hybrid,
}

impl Objective {
    pub fn run_value(self, metrics: &RunMetrics) -> f64 {
        let reward = metrics.reward_milli as f64 / 1_000.0;
        let checkpoints = metrics.checkpoints_passed as f64;
        let targets = metrics.targets_eliminated as f64;
        let waypoints = metrics.waypoints_reached as f64;
        match self {
            Self::Reward => reward + targets * 0.5,
            Self::Progress => {
                targets * 25.0 + checkpoints * 10.0 + waypoints * 4.0 + reward * 0.1
            }
            Self::Hybrid => {
                reward * 0.6 + targets * 12.0 + checkpoints * 5.0 + waypoints * 2.0
                    - metrics.tick_count as f64 * 0.001
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Reward => "reward",
            Self::Progress => "progress",
            Self::Hybrid => "hybrid",
        }
    }
}

#[derive(Clone, Debug)]
pub struct BenchmarkConfig {
    pub bots: Vec<String>,
    pub seeds: Vec<u32>,
    pub run: RunConfig,
    /// Fixed course for every seed; the seeded training range when absent.
    pub scenario: Option<Scenario>,
    pub objective: Objective,
    pub out_dir: PathBuf,
    pub save_top: usize,
    pub jobs: Option<usize>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunRecord {
    pub bot_id: String,
    pub bot_fingerprint: String,
    pub seed: u32,
    pub seed_hex: String,
    pub tick_count: u32,
    pub reward_milli: i64,
    pub checkpoints_passed: u32,
    pub targets_eliminated: u32,
    pub waypoints_reached: u32,
    pub truncated: bool,
    pub cause: Option<TerminalCause>,
    pub objective_value: f64,
    pub moving_ticks: u32,
    pub turning_ticks: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BotAggregate {
    pub bot_id: String,
    pub bot_fingerprint: String,
    pub runs: usize,
    pub avg_reward: f64,
    pub max_reward: f64,
    pub avg_ticks: f64,
    pub avg_checkpoints: f64,
    pub avg_targets: f64,
    pub avg_waypoints: f64,
    pub clear_rate: f64,
    pub hazard_rate: f64,
    pub objective_value: f64,
    pub avg_moving_ticks: f64,
    pub avg_turning_ticks: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SavedTapeRecord {
    pub rank: usize,
    pub metric: String,
    pub bot_id: String,
    pub bot_fingerprint: String,
    pub seed: u32,
    pub seed_hex: String,
    pub reward_milli: i64,
    pub ticks: u32,
    pub targets: u32,
    pub path: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BenchmarkReport {
    pub generated_unix_s: u64,
    pub objective: Objective,
    pub max_ticks: u32,
    pub jobs: Option<usize>,
    pub bots: Vec<String>,
    pub seeds: Vec<u32>,
    pub run_count: usize,
    pub bot_rankings: Vec<BotAggregate>,
    pub runs: Vec<RunRecord>,
    pub saved_tapes: Vec<SavedTapeRecord>,
}

#[derive(Clone, Debug)]
struct InternalRun {
    metrics: RunMetrics,
    objective_value: f64,
    tape: Vec<u8>,
}

pub fn resolve_bots(input: Option<&str>) -> Result<Vec<String>> {
    match input {
        None => Ok(bot_ids().iter().map(|id| (*id).to_string()).collect()),
        Some(raw) => {
            let bots: Vec<String> = raw
                .split(',')
                .map(str::trim)
                .filter(|token| !token.is_empty())
                .map(str::to_string)
                .collect();
            if bots.is_empty() {
                return Err(anyhow!("--bots resolved to empty list"));
            }
            Ok(bots)
        }
    }
}

pub fn run_benchmark(config: BenchmarkConfig) -> Result<BenchmarkReport> {
    if config.seeds.is_empty() {
        return Err(anyhow!("benchmark requires at least one seed"));
    }
    if config.bots.is_empty() {
        return Err(anyhow!("benchmark requires at least one bot"));
    }
    if config.jobs == Some(0) {
        return Err(anyhow!("benchmark --jobs must be >= 1 when provided"));
    }
    fs::create_dir_all(&config.out_dir)
        .with_context(|| format!("failed creating {}", config.out_dir.display()))?;

    let run_jobs: Vec<(String, u32)> = config
        .bots
        .iter()
        .flat_map(|bot| config.seeds.iter().map(move |seed| (bot.clone(), *seed)))
        .collect();
    info!(
        runs = run_jobs.len(),
        objective = config.objective.as_str(),
        max_ticks = config.run.max_ticks,
        "benchmark started"
    );

    // Each run owns its episode, so runs share nothing but the read-only config.
    let run_one = |(bot_id, seed): &(String, u32)| -> Result<InternalRun> {
        let scenario = config.run.scenario_for(*seed, config.scenario.as_ref());
        let artifact = run_bot_on(bot_id, *seed, scenario, config.run.max_ticks)
            .with_context(|| format!("benchmark run failed for bot={bot_id} seed={seed:#x}"))?;
        let objective_value = config.objective.run_value(&artifact.metrics);
        Ok(InternalRun {
            metrics: artifact.metrics,
            objective_value,
            tape: artifact.tape,
        })
    };

    let run_results: Vec<Result<InternalRun>> = if let Some(jobs) = config.jobs {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build()
            .context("failed to build rayon threadpool")?;
        pool.install(|| run_jobs.par_iter().map(run_one).collect())
    } else {
        run_jobs.par_iter().map(run_one).collect()
    };
    let runs = run_results.into_iter().collect::<Result<Vec<_>>>()?;

    let mut rankings = aggregate(&runs);
    rankings.sort_by(|a, b| {
        b.objective_value
            .total_cmp(&a.objective_value)
            .then_with(|| b.avg_reward.total_cmp(&a.avg_reward))
            .then_with(|| a.avg_ticks.total_cmp(&b.avg_ticks))
            .then_with(|| a.bot_id.cmp(&b.bot_id))
    });

    let mut run_records: Vec<RunRecord> = runs
        .iter()
        .map(|run| RunRecord {
            bot_id: run.metrics.bot_id.clone(),
            bot_fingerprint: run.metrics.bot_fingerprint.clone(),
            seed: run.metrics.seed,
            seed_hex: seed_to_hex(run.metrics.seed),
            tick_count: run.metrics.tick_count,
            reward_milli: run.metrics.reward_milli,
            checkpoints_passed: run.metrics.checkpoints_passed,
            targets_eliminated: run.metrics.targets_eliminated,
            waypoints_reached: run.metrics.waypoints_reached,
            truncated: run.metrics.truncated,
            cause: run.metrics.cause,
            objective_value: run.objective_value,
            moving_ticks: run.metrics.moving_ticks,
            turning_ticks: run.metrics.turning_ticks,
        })
        .collect();
    run_records.sort_by(|a, b| {
        b.objective_value
            .total_cmp(&a.objective_value)
            .then_with(|| b.reward_milli.cmp(&a.reward_milli))
            .then_with(|| a.tick_count.cmp(&b.tick_count))
    });

    let mut saved_tapes = Vec::new();
    if config.save_top > 0 {
        save_top_tapes(
            &config.out_dir,
            &runs,
            "objective",
            config.save_top,
            |run| run.objective_value,
            &mut saved_tapes,
        )?;
        save_top_tapes(
            &config.out_dir,
            &runs,
            "reward",
            config.save_top,
            |run| run.metrics.reward_milli as f64,
            &mut saved_tapes,
        )?;
        save_top_tapes(
            &config.out_dir,
            &runs,
            "progress",
            config.save_top,
            |run| Objective::Progress.run_value(&run.metrics),
            &mut saved_tapes,
        )?;
    }

    write_runs_csv(&config.out_dir.join("runs.csv"), &run_records)?;
    write_rankings_csv(&config.out_dir.join("rankings.csv"), &rankings)?;

    let report = BenchmarkReport {
        generated_unix_s: SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs(),
        objective: config.objective,
        max_ticks: config.run.max_ticks,
        jobs: config.jobs,
        bots: config.bots,
        seeds: config.seeds,
        run_count: run_records.len(),
        bot_rankings: rankings,
        runs: run_records,
        saved_tapes,
    };

    let report_path = config.out_dir.join("summary.json");
    fs::write(
        &report_path,
        serde_json::to_vec_pretty(&report).context("failed to serialize summary json")?,
    )
    .with_context(|| format!("failed writing {}", report_path.display()))?;

    if let Some(best) = report.bot_rankings.first() {
        info!(
            runs = report.run_count,
            best = %best.bot_id,
            objective_value = best.objective_value,
            "benchmark finished"
        );
    }

    Ok(report)
}

fn aggregate(runs: &[InternalRun]) -> Vec<BotAggregate> {
    let mut grouped: HashMap<&str, Vec<&InternalRun>> = HashMap::new();
    for run in runs {
        grouped
            .entry(run.metrics.bot_id.as_str())
            .or_default()
            .push(run);
    }

    grouped
        .into_iter()
        .map(|(bot_id, bot_runs)| {
            let n = bot_runs.len() as f64;
            let mean = |f: &dyn Fn(&InternalRun) -> f64| {
                bot_runs.iter().map(|r| f(*r)).sum::<f64>() / n
            };
            let rate = |f: &dyn Fn(&InternalRun) -> bool| {
                bot_runs.iter().filter(|r| f(**r)).count() as f64 / n
            };

            BotAggregate {
                bot_id: bot_id.to_string(),
                bot_fingerprint: bot_runs
                    .first()
                    .map(|r| r.metrics.bot_fingerprint.clone())
                    .unwrap_or_else(|| "unknown".to_string()),
                runs: bot_runs.len(),
                avg_reward: mean(&|r| r.metrics.reward_milli as f64 / 1_000.0),
                max_reward: bot_runs
                    .iter()
                    .map(|r| r.metrics.reward_milli as f64 / 1_000.0)
                    .fold(f64::NEG_INFINITY, f64::max),
                avg_ticks: mean(&|r| r.metrics.tick_count as f64),
                avg_checkpoints: mean(&|r| r.metrics.checkpoints_passed as f64),
                avg_targets: mean(&|r| r.metrics.targets_eliminated as f64),
                avg_waypoints: mean(&|r| r.metrics.waypoints_reached as f64),
                clear_rate: rate(&|r| r.metrics.cause == Some(TerminalCause::TargetsCleared)),
                hazard_rate: rate(&|r| r.metrics.cause == Some(TerminalCause::Hazard)),
                objective_value: mean(&|r| r.objective_value),
                avg_moving_ticks: mean(&|r| r.metrics.moving_ticks as f64),
                avg_turning_ticks: mean(&|r| r.metrics.turning_ticks as f64),
            }
        })
        .collect()
}

fn save_top_tapes<F>(
    out_dir: &Path,
    runs: &[InternalRun],
    metric_name: &str,
    count: usize,
    metric: F,
    saved_tapes: &mut Vec<SavedTapeRecord>,
) -> Result<()>
where
    F: Fn(&InternalRun) -> f64,
{
    let mut order: Vec<&InternalRun> = runs.iter().collect();
    order.sort_by(|a, b| {
        metric(b)
            .total_cmp(&metric(a))
            .then_with(|| b.metrics.reward_milli.cmp(&a.metrics.reward_milli))
            .then_with(|| a.metrics.tick_count.cmp(&b.metrics.tick_count))
    });

    let save_dir = out_dir.join(format!("top-{metric_name}"));
    fs::create_dir_all(&save_dir)
        .with_context(|| format!("failed creating {}", save_dir.display()))?;

    for (idx, run) in order.into_iter().take(count).enumerate() {
        let rank = idx + 1;
        let safe_bot: String = run
            .metrics
            .bot_id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '-' })
            .collect();
        let base = format!(
            "rank{rank:02}-{safe_bot}-seed{:08x}-reward{}-ticks{}",
            run.metrics.seed, run.metrics.reward_milli, run.metrics.tick_count
        );
        let tape_path = save_dir.join(format!("{base}.tape"));
        fs::write(&tape_path, &run.tape)
            .with_context(|| format!("failed writing {}", tape_path.display()))?;

        let meta = serde_json::json!({
            "rank": rank,
            "metric": metric_name,
            "objective_value": run.objective_value,
            "seed_hex": seed_to_hex(run.metrics.seed),
            "metrics": run.metrics,
        });
        let meta_path = save_dir.join(format!("{base}.json"));
        fs::write(
            &meta_path,
            serde_json::to_vec_pretty(&meta).context("failed to serialize top tape metadata")?,
        )
        .with_context(|| format!("failed writing {}", meta_path.display()))?;

        saved_tapes.push(SavedTapeRecord {
            rank,
            metric: metric_name.to_string(),
            bot_id: run.metrics.bot_id.clone(),
            bot_fingerprint: run.metrics.bot_fingerprint.clone(),
            seed: run.metrics.seed,
            seed_hex: seed_to_hex(run.metrics.seed),
            reward_milli: run.metrics.reward_milli,
            ticks: run.metrics.tick_count,
            targets: run.metrics.targets_eliminated,
            path: tape_path.to_string_lossy().into_owned(),
        });
    }

    Ok(())
}

fn cause_label(cause: Option<TerminalCause>) -> &'static str {
    cause.map(TerminalCause::as_str).unwrap_or("running")
}

fn write_runs_csv(path: &Path, rows: &[RunRecord]) -> Result<()> {
    let mut csv = String::from(
        "bot_id,bot_fingerprint,seed_hex,seed,tick_count,reward_milli,checkpoints_passed,targets_eliminated,waypoints_reached,truncated,cause,objective_value,moving_ticks,turning_ticks\n",
    );
    for row in rows {
        csv.push_str(&format!(
            "{},{},{},{},{},{},{},{},{},{},{},{:.4},{},{}\n",
            row.bot_id,
            row.bot_fingerprint,
            row.seed_hex,
            row.seed,
            row.tick_count,
            row.reward_milli,
            row.checkpoints_passed,
            row.targets_eliminated,
            row.waypoints_reached,
            row.truncated,
            cause_label(row.cause),
            row.objective_value,
            row.moving_ticks,
            row.turning_ticks
        ));
    }
    fs::write(path, csv).with_context(|| format!("failed writing {}", path.display()))
}

fn write_rankings_csv(path: &Path, rows: &[BotAggregate]) -> Result<()> {
    let mut csv = String::from(
        "rank,bot_id,bot_fingerprint,runs,avg_reward,max_reward,avg_ticks,avg_checkpoints,avg_targets,avg_waypoints,clear_rate,hazard_rate,objective_value,avg_moving_ticks,avg_turning_ticks\n",
    );
    for (idx, row) in rows.iter().enumerate() {
        csv.push_str(&format!(
            "{},{},{},{},{:.3},{:.3},{:.2},{:.2},{:.2},{:.2},{:.4},{:.4},{:.4},{:.2},{:.2}\n",
            idx + 1,
            row.bot_id,
            row.bot_fingerprint,
            row.runs,
            row.avg_reward,
            row.max_reward,
            row.avg_ticks,
            row.avg_checkpoints,
            row.avg_targets,
            row.avg_waypoints,
            row.clear_rate,
            row.hazard_rate,
            row.objective_value,
            row.avg_moving_ticks,
            row.avg_turning_ticks
        ));
    }
    fs::write(path, csv).with_context(|| format!("failed writing {}", path.display()))
}
