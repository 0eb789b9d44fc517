use super::*;
use soldier_core::tape::crc32;

fn idle_bot_configs() -> &'static [IdleConfig] {
    &[IdleConfig {
        id: "idle",
        description: "No input at all; baseline for step cost and time-limit truncation.",
    }]
}

fn random_walk_configs() -> &'static [RandomWalkConfig] {
    &[RandomWalkConfig {
        id: "random-walk",
        description: "Seeded random walk holding each action for a few ticks.",
        salt: 0x5EED_0A1C,
        hold_ticks_min: 8,
        hold_ticks_max: 40,
        forward_bias: 0.4,
        turn_span: 1.0,
    }]
}

fn seeker_configs() -> &'static [SeekerConfig] {
    &[
        SeekerConfig {
            id: "waypoint-follower",
            description: "Walks the main path then the branch path; hunts once the path is done.",
            goal_order: GoalOrder::WaypointsThenTargets,
            cruise_speed: 1.0,
            slow_speed: 0.25,
            slow_turn_deg: 55.0,
            turn_gain: 1.0,
            hazard_clearance: 0.0,
            hazard_weight: 0.0,
            wall_margin: 2.0,
            wall_weight: 0.8,
        },
        SeekerConfig {
            id: "hunter",
            description: "Heads straight for the expected target, skirting hazards on the way.",
            goal_order: GoalOrder::TargetsThenWaypoints,
            cruise_speed: 1.0,
            slow_speed: 0.2,
            slow_turn_deg: 50.0,
            turn_gain: 1.0,
            hazard_clearance: 4.0,
            hazard_weight: 2.0,
            wall_margin: 2.5,
            wall_weight: 1.0,
        },
        SeekerConfig {
            id: "checkpoint-runner",
            description: "Clears the open checkpoint group before going after targets.",
            goal_order: GoalOrder::CheckpointsThenTargets,
            cruise_speed: 0.9,
            slow_speed: 0.15,
            slow_turn_deg: 45.0,
            turn_gain: 1.2,
            hazard_clearance: 4.0,
            hazard_weight: 2.0,
            wall_margin: 2.5,
            wall_weight: 1.0,
        },
    ]
}

pub fn bot_ids() -> Vec<&'static str> {
    let mut ids: Vec<&'static str> = idle_bot_configs().iter().map(|cfg| cfg.id).collect();
    ids.extend(random_walk_configs().iter().map(|cfg| cfg.id));
    ids.extend(seeker_configs().iter().map(|cfg| cfg.id));
    ids
}

pub fn describe_bots() -> Vec<(&'static str, &'static str)> {
    let mut out: Vec<(&'static str, &'static str)> = idle_bot_configs()
        .iter()
        .map(|cfg| (cfg.id, cfg.description))
        .collect();
    out.extend(
        random_walk_configs()
            .iter()
            .map(|cfg| (cfg.id, cfg.description)),
    );
    out.extend(seeker_configs().iter().map(|cfg| (cfg.id, cfg.description)));
    out
}

/// Looks up a roster bot, or builds a replay bot for `replay:<path>`.
pub fn create_bot(id: &str) -> Option<Box<dyn AutopilotBot>> {
    if let Some(cfg) = idle_bot_configs().iter().find(|cfg| cfg.id == id) {
        return Some(Box::new(IdleBot { cfg: *cfg }));
    }
    if let Some(cfg) = random_walk_configs().iter().find(|cfg| cfg.id == id) {
        return Some(Box::new(RandomWalkBot::new(*cfg)));
    }
    if let Some(cfg) = seeker_configs().iter().find(|cfg| cfg.id == id) {
        return Some(Box::new(SeekerBot { cfg: *cfg }));
    }
    if let Some(path) = id.strip_prefix(REPLAY_PREFIX) {
        if !path.trim().is_empty() {
            return Some(Box::new(ReplayBot::new(id, path.trim())));
        }
    }
    None
}

fn hash_json(value: &serde_json::Value) -> String {
    // Serializing an in-memory Value cannot fail; fall back to an empty body anyway.
    let encoded = serde_json::to_vec(value).unwrap_or_default();
    let digest = crc32(&encoded);
    format!("crc32:{digest:08x}:len:{}", encoded.len())
}

fn manifest_entry<T: Serialize>(
    id: &str,
    family: &str,
    description: &str,
    cfg: &T,
) -> BotManifestEntry {
    let config = serde_json::to_value(cfg).unwrap_or(serde_json::Value::Null);
    BotManifestEntry {
        id: id.to_string(),
        family: family.to_string(),
        description: description.to_string(),
        config_hash: hash_json(&config),
        config,
    }
}

pub fn bot_manifest_entries() -> Vec<BotManifestEntry> {
    let mut out = Vec::new();

    for cfg in idle_bot_configs() {
        out.push(manifest_entry(cfg.id, "baseline", cfg.description, cfg));
    }
    for cfg in random_walk_configs() {
        out.push(manifest_entry(cfg.id, "random_walk", cfg.description, cfg));
    }
    for cfg in seeker_configs() {
        out.push(manifest_entry(cfg.id, "seeker", cfg.description, cfg));
    }

    out
}

/// Config hash for a bot id. Replay bots hash the tape path they play.
pub fn bot_fingerprint(id: &str) -> Option<String> {
    if let Some(path) = id.strip_prefix(REPLAY_PREFIX) {
        return Some(hash_json(&serde_json::json!({ "replay": path.trim() })));
    }
    bot_manifest_entries()
        .into_iter()
        .find(|entry| entry.id == id)
        .map(|entry| entry.config_hash)
}
