use anyhow::{Context, Result};
use soldier_core::constants::MAX_TICKS_DEFAULT;
use soldier_core::tape::TapeHeader;
use soldier_core::target::ContactPolicy;
use soldier_core::Scenario;
use std::env;
use std::fs;
use std::path::Path;
use tracing::warn;

pub const ENV_MAX_TICKS: &str = "SOLDIER_MAX_TICKS";
pub const ENV_CONTACT_POLICY: &str = "SOLDIER_CONTACT_POLICY";
pub const ENV_STEP_COST_DISABLED: &str = "SOLDIER_STEP_COST_DISABLED";

/// Rule overrides applied to every scenario a command runs.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RunConfig {
    pub max_ticks: u32,
    pub contact_policy: ContactPolicy,
    pub step_cost_disabled: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_ticks: MAX_TICKS_DEFAULT,
            contact_policy: ContactPolicy::Strict,
            step_cost_disabled: false,
        }
    }
}

impl RunConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_ticks: read_env_u32(ENV_MAX_TICKS, defaults.max_ticks),
            contact_policy: read_env_contact_policy(ENV_CONTACT_POLICY, defaults.contact_policy),
            step_cost_disabled: read_env_bool(ENV_STEP_COST_DISABLED, defaults.step_cost_disabled),
        }
    }

    /// The overrides a tape was recorded under. The environment is ignored.
    pub fn for_tape(header: &TapeHeader) -> Self {
        Self {
            max_ticks: header.max_ticks,
            contact_policy: header.policy,
            step_cost_disabled: header.step_cost_disabled,
        }
    }

    /// A CLI flag wins over the environment.
    pub fn with_max_ticks(mut self, max_ticks: Option<u32>) -> Self {
        if let Some(max_ticks) = max_ticks.filter(|value| *value > 0) {
            self.max_ticks = max_ticks;
        }
        self
    }

    pub fn apply(&self, mut scenario: Scenario) -> Scenario {
        scenario.rules.max_ticks = self.max_ticks;
        scenario.rules.contact_policy = self.contact_policy;
        if self.step_cost_disabled {
            scenario.rules.reward.step_cost = 0.0;
        }
        scenario
    }

    /// The seeded training range, or the scenario file when one is given.
    pub fn scenario_for(&self, seed: u32, file: Option<&Scenario>) -> Scenario {
        match file {
            Some(scenario) => self.apply(scenario.clone()),
            None => self.apply(Scenario::training_range(seed)),
        }
    }
}

/// Loads a scenario from JSON. Missing fields take the built-in defaults.
pub fn load_scenario(path: &Path) -> Result<Scenario> {
    let data =
        fs::read(path).with_context(|| format!("failed reading scenario {}", path.display()))?;
    let scenario: Scenario = serde_json::from_slice(&data)
        .with_context(|| format!("invalid scenario json in {}", path.display()))?;
    scenario
        .validate()
        .with_context(|| format!("scenario {} failed validation", path.display()))?;
    Ok(scenario)
}

pub(crate) fn read_env_u32(name: &str, default: u32) -> u32 {
    let Ok(raw) = env::var(name) else {
        return default;
    };
    match raw.trim().parse::<u32>() {
        Ok(value) if value > 0 => value,
        _ => {
            warn!("{name}={raw:?} is not a positive integer. Falling back to {default}.");
            default
        }
    }
}

pub(crate) fn read_env_bool(name: &str, default: bool) -> bool {
    let Ok(raw) = env::var(name) else {
        return default;
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => {
            warn!("{name}={raw:?} is not a boolean. Falling back to {default}.");
            default
        }
    }
}

fn read_env_contact_policy(name: &str, default: ContactPolicy) -> ContactPolicy {
    let Ok(raw) = env::var(name) else {
        return default;
    };
    raw.parse::<ContactPolicy>().unwrap_or_else(|err| {
        warn!("{name}: {err}. Falling back to {}.", default.as_str());
        default
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    // Each test owns its variable names; the process environment is shared across threads.

    #[test]
    fn invalid_env_values_fall_back_to_defaults() {
        env::set_var("SOLDIER_TEST_TICKS_BAD", "soon");
        env::set_var("SOLDIER_TEST_TICKS_ZERO", "0");
        env::set_var("SOLDIER_TEST_TICKS_OK", " 750 ");
        assert_eq!(read_env_u32("SOLDIER_TEST_TICKS_BAD", 10), 10);
        assert_eq!(read_env_u32("SOLDIER_TEST_TICKS_ZERO", 10), 10);
        assert_eq!(read_env_u32("SOLDIER_TEST_TICKS_OK", 10), 750);
        assert_eq!(read_env_u32("SOLDIER_TEST_TICKS_UNSET", 10), 10);

        env::set_var("SOLDIER_TEST_FLAG_ON", "Yes");
        env::set_var("SOLDIER_TEST_FLAG_BAD", "maybe");
        assert!(read_env_bool("SOLDIER_TEST_FLAG_ON", false));
        assert!(read_env_bool("SOLDIER_TEST_FLAG_BAD", true));

        env::set_var("SOLDIER_TEST_POLICY", "LENIENT");
        env::set_var("SOLDIER_TEST_POLICY_BAD", "loose");
        assert_eq!(
            read_env_contact_policy("SOLDIER_TEST_POLICY", ContactPolicy::Strict),
            ContactPolicy::Lenient
        );
        assert_eq!(
            read_env_contact_policy("SOLDIER_TEST_POLICY_BAD", ContactPolicy::Strict),
            ContactPolicy::Strict
        );
    }

    #[test]
    fn overrides_change_the_rules_digest() {
        let base = Scenario::training_range(4);
        let config = RunConfig {
            max_ticks: 900,
            contact_policy: ContactPolicy::Lenient,
            step_cost_disabled: true,
        };
        let applied = config.apply(base.clone());
        assert_eq!(applied.rules.max_ticks, 900);
        assert_eq!(applied.rules.reward.step_cost, 0.0);
        assert_eq!(applied.digest(), base.digest());
        assert_ne!(applied.rules.digest(), base.rules.digest());

        let cli = config.with_max_ticks(Some(120)).with_max_ticks(Some(0));
        assert_eq!(cli.max_ticks, 120);
    }

    #[test]
    fn tape_header_restores_the_recorded_overrides() {
        let config = RunConfig {
            max_ticks: 300,
            contact_policy: ContactPolicy::Lenient,
            step_cost_disabled: true,
        };
        let scenario = config.scenario_for(9, None);
        let tape = soldier_core::tape::serialize_tape(9, &scenario, &[127, 0], 0, 0);
        let header = soldier_core::tape::read_tape_header(&tape).expect("header");

        let restored = RunConfig::for_tape(&header);
        assert_eq!(restored, config);
        assert_eq!(
            restored.scenario_for(9, None).rules.digest(),
            scenario.rules.digest()
        );
    }

    #[test]
    fn loads_partial_scenario_json() -> Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        write!(
            file,
            r#"{{"name":"corridor","start":{{"position":{{"x":0.0,"y":0.0,"z":0.0}},"yaw_deg":0.0}},"targets":[{{"x":0.0,"y":0.0,"z":6.0}}],"rules":{{"max_ticks":300}}}}"#
        )?;
        let scenario = load_scenario(file.path())?;
        assert_eq!(scenario.name, "corridor");
        assert_eq!(scenario.targets.len(), 1);
        assert_eq!(scenario.rules.max_ticks, 300);
        assert_eq!(scenario.rules.group_size, Scenario::default().rules.group_size);
        Ok(())
    }

    #[test]
    fn rejects_invalid_scenario_file() -> Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        write!(
            file,
            r#"{{"start":{{"position":{{"x":0.0,"y":0.0,"z":0.0}},"yaw_deg":0.0}},"target_radius":-2.0}}"#
        )?;
        assert!(load_scenario(file.path()).is_err());
        Ok(())
    }

    #[test]
    fn scenario_file_without_start_pose_is_rejected() -> Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        write!(
            file,
            r#"{{"name":"no-start","targets":[{{"x":0.0,"y":0.0,"z":6.0}}]}}"#
        )?;
        let err = load_scenario(file.path()).expect_err("start pose is required");
        assert!(format!("{err:#}").contains("start"), "{err:#}");
        Ok(())
    }
}
