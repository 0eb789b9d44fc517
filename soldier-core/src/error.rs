use std::fmt;

/// Fatal configuration problems detected when a scenario is loaded.
#[derive(Clone, Debug, PartialEq)]
pub enum ScenarioError {
    NonFiniteStartPose,
    NonFinitePosition { entity: &'static str, index: usize },
    ZeroGroupSize,
    NonPositiveRadius { entity: &'static str },
    TooManyTargets { count: usize, max: usize },
    InvalidWall { index: usize },
    ZeroMaxTicks,
}

impl fmt::Display for ScenarioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonFiniteStartPose => write!(f, "start pose is non-finite"),
            Self::NonFinitePosition { entity, index } => {
                write!(f, "{entity} #{index} has a non-finite position")
            }
            Self::ZeroGroupSize => write!(f, "checkpoint group size must be >= 1"),
            Self::NonPositiveRadius { entity } => write!(f, "{entity} radius must be > 0"),
            Self::TooManyTargets { count, max } => {
                write!(f, "too many targets: {count} (max {max})")
            }
            Self::InvalidWall { index } => {
                write!(f, "wall #{index} has min > max or non-finite corners")
            }
            Self::ZeroMaxTicks => write!(f, "max_ticks must be >= 1"),
        }
    }
}

impl std::error::Error for ScenarioError {}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EpisodeRule {
    PoseNonFinite,
    CheckpointOpenGroup,
    CheckpointActiveOutsideGroup,
    CheckpointPassedAhead,
    WaypointCursorRange,
    TargetPointerRange,
    TargetPointerBehindAlive,
    TickLimitExceeded,
}

impl fmt::Display for EpisodeRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PoseNonFinite => write!(f, "POSE_NON_FINITE"),
            Self::CheckpointOpenGroup => write!(f, "CHECKPOINT_OPEN_GROUP"),
            Self::CheckpointActiveOutsideGroup => write!(f, "CHECKPOINT_ACTIVE_OUTSIDE_GROUP"),
            Self::CheckpointPassedAhead => write!(f, "CHECKPOINT_PASSED_AHEAD"),
            Self::WaypointCursorRange => write!(f, "WAYPOINT_CURSOR_RANGE"),
            Self::TargetPointerRange => write!(f, "TARGET_POINTER_RANGE"),
            Self::TargetPointerBehindAlive => write!(f, "TARGET_POINTER_BEHIND_ALIVE"),
            Self::TickLimitExceeded => write!(f, "TICK_LIMIT_EXCEEDED"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum VerifyError {
    TapeTooShort { actual: usize, min: usize },
    InvalidMagic { found: u32 },
    UnsupportedVersion { found: u8 },
    UnknownPolicyTag { found: u8 },
    HeaderReservedNonZero,
    TickCountOutOfRange { tick_count: u32, max_ticks: u32 },
    TapeLengthMismatch { expected: usize, actual: usize },
    ReservedActionByte { tick: u32 },
    CrcMismatch { stored: u32, computed: u32 },
    ScenarioDigestMismatch { tape: u32, scenario: u32 },
    RulesDigestMismatch { tape: u32, scenario: u32 },
    InvalidScenario(ScenarioError),
    RuleViolation { tick: u32, rule: EpisodeRule },
    TickCountMismatch { claimed: u32, computed: u32 },
    RewardMismatch { claimed: i32, computed: i32 },
    ProgressMismatch { claimed: u32, computed: u32 },
}

impl fmt::Display for VerifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TapeTooShort { actual, min } => {
                write!(f, "tape too short: got {actual} bytes, need at least {min}")
            }
            Self::InvalidMagic { found } => write!(f, "invalid tape magic: 0x{found:08x}"),
            Self::UnsupportedVersion { found } => write!(f, "unsupported tape version: {found}"),
            Self::UnknownPolicyTag { found } => write!(f, "unknown contact policy tag: {found}"),
            Self::HeaderReservedNonZero => write!(f, "header reserved bytes are non-zero"),
            Self::TickCountOutOfRange {
                tick_count,
                max_ticks,
            } => write!(
                f,
                "tick count out of range: {tick_count} (allowed 1..={max_ticks})"
            ),
            Self::TapeLengthMismatch { expected, actual } => write!(
                f,
                "tape length mismatch: expected {expected} bytes, got {actual}"
            ),
            Self::ReservedActionByte { tick } => {
                write!(f, "reserved action byte 0x80 at tick {tick}")
            }
            Self::CrcMismatch { stored, computed } => write!(
                f,
                "crc mismatch: stored=0x{stored:08x}, computed=0x{computed:08x}"
            ),
            Self::ScenarioDigestMismatch { tape, scenario } => write!(
                f,
                "scenario digest mismatch: tape=0x{tape:08x}, scenario=0x{scenario:08x}"
            ),
            Self::RulesDigestMismatch { tape, scenario } => write!(
                f,
                "rules digest mismatch: tape=0x{tape:08x}, scenario=0x{scenario:08x}"
            ),
            Self::InvalidScenario(err) => write!(f, "invalid scenario: {err}"),
            Self::RuleViolation { tick, rule } => {
                write!(f, "rule violation at tick {tick}: {rule}")
            }
            Self::TickCountMismatch { claimed, computed } => {
                write!(f, "tick-count mismatch: claimed={claimed}, computed={computed}")
            }
            Self::RewardMismatch { claimed, computed } => write!(
                f,
                "reward mismatch: claimed={claimed} milli, computed={computed} milli"
            ),
            Self::ProgressMismatch { claimed, computed } => write!(
                f,
                "progress mismatch: claimed=0x{claimed:08x}, computed=0x{computed:08x}"
            ),
        }
    }
}

impl std::error::Error for VerifyError {}

impl From<ScenarioError> for VerifyError {
    fn from(err: ScenarioError) -> Self {
        Self::InvalidScenario(err)
    }
}
