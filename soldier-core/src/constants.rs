// Simulation timing and agent kinematics.
pub const TICK_SECONDS: f32 = 0.02;
pub const AGENT_RADIUS: f32 = 0.5;
pub const AGENT_SPEED: f32 = 10.0;
pub const AGENT_TURN_RATE_DEG: f32 = 180.0;
pub const RAY_LENGTH: f32 = 60.0;

// Course bookkeeping.
pub const CHECKPOINT_GROUP_SIZE: usize = 3;
pub const CHECKPOINT_RADIUS: f32 = 1.5;
pub const TARGET_RADIUS: f32 = 1.0;
pub const WAYPOINT_ARRIVAL_RADIUS: f32 = 2.0;
pub const TARGET_REMOVAL_DELAY_TICKS: u32 = 25;
pub const MAX_TARGETS: usize = u16::MAX as usize;
pub const MAX_TICKS_DEFAULT: u32 = 5_000;

// Rewards are accumulated in thousandths so per-tick sums are exact.
pub const REWARD_MILLI_SCALE: f32 = 1_000.0;

pub const REWARD_TARGET_HIT: f32 = 10.0;
pub const REWARD_TARGET_OUT_OF_ORDER: f32 = 6.0;
pub const REWARD_CHECKPOINT_PASS: f32 = 1.0;
pub const REWARD_CHECKPOINT_WRONG: f32 = -0.5;
pub const REWARD_WALL_CONTACT: f32 = -1.0;
pub const REWARD_HAZARD_CONTACT: f32 = -5.0;
pub const REWARD_STEP_COST: f32 = -0.01;

// Action quantisation: each axis is a signed byte in [-127, 127]; -128 is reserved.
pub const ACTION_QUANT_SCALE: f32 = 127.0;
pub const ACTION_RESERVED_BYTE: u8 = 0x80;

pub const OBSERVATION_SIZE: usize = 27;

// Tape layout.
pub const TAPE_MAGIC: u32 = 0x5444_4C53; // "SLDT"
pub const TAPE_VERSION: u8 = 2;
pub const TAPE_HEADER_SIZE: usize = 28;
/// Header flag bit: the recorded run had no step cost.
pub const TAPE_FLAG_NO_STEP_COST: u8 = 0x01;
pub const TAPE_FOOTER_SIZE: usize = 12;
pub const TAPE_BYTES_PER_TICK: usize = 2;
