use serde::{Deserialize, Serialize};

use crate::constants::{
    ACTION_RESERVED_BYTE, TAPE_BYTES_PER_TICK, TAPE_FLAG_NO_STEP_COST, TAPE_FOOTER_SIZE,
    TAPE_HEADER_SIZE, TAPE_MAGIC, TAPE_VERSION,
};
use crate::error::VerifyError;
use crate::scenario::Scenario;
use crate::target::ContactPolicy;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TapeHeader {
    pub magic: u32,
    pub version: u8,
    pub policy: ContactPolicy,
    /// Set when the run's step cost was zero.
    pub step_cost_disabled: bool,
    pub seed: u32,
    pub scenario_digest: u32,
    pub rules_digest: u32,
    pub tick_count: u32,
    /// Tick limit of the recorded run.
    pub max_ticks: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TapeFooter {
    pub reward_milli: i32,
    pub progress: u32,
    pub checksum: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TapeView<'a> {
    pub header: TapeHeader,
    /// Two bytes per tick: forward, turn.
    pub actions: &'a [u8],
    pub footer: TapeFooter,
}

/// Decodes the fixed header without touching the body or checksum.
pub fn read_tape_header(bytes: &[u8]) -> Result<TapeHeader, VerifyError> {
    let min_len = TAPE_HEADER_SIZE + TAPE_FOOTER_SIZE;
    if bytes.len() < min_len {
        return Err(VerifyError::TapeTooShort {
            actual: bytes.len(),
            min: min_len,
        });
    }

    let magic = read_u32_le(bytes, 0);
    if magic != TAPE_MAGIC {
        return Err(VerifyError::InvalidMagic { found: magic });
    }

    let version = bytes[4];
    if version != TAPE_VERSION {
        return Err(VerifyError::UnsupportedVersion { found: version });
    }

    let policy = ContactPolicy::from_tag(bytes[5])
        .ok_or(VerifyError::UnknownPolicyTag { found: bytes[5] })?;
    let flags = bytes[6];
    if flags & !TAPE_FLAG_NO_STEP_COST != 0 || bytes[7] != 0 {
        return Err(VerifyError::HeaderReservedNonZero);
    }

    Ok(TapeHeader {
        magic,
        version,
        policy,
        step_cost_disabled: flags & TAPE_FLAG_NO_STEP_COST != 0,
        seed: read_u32_le(bytes, 8),
        scenario_digest: read_u32_le(bytes, 12),
        rules_digest: read_u32_le(bytes, 16),
        tick_count: read_u32_le(bytes, 20),
        max_ticks: read_u32_le(bytes, 24),
    })
}

/// Full structural check. The tick count must fit both `max_ticks` and the
/// limit recorded in the header.
pub fn parse_tape(bytes: &[u8], max_ticks: u32) -> Result<TapeView<'_>, VerifyError> {
    let header = read_tape_header(bytes)?;
    let tick_count = header.tick_count;
    let limit = max_ticks.min(header.max_ticks);
    if tick_count == 0 || tick_count > limit {
        return Err(VerifyError::TickCountOutOfRange {
            tick_count,
            max_ticks: limit,
        });
    }

    let body_len = tick_count as usize * TAPE_BYTES_PER_TICK;
    let expected_len = TAPE_HEADER_SIZE + body_len + TAPE_FOOTER_SIZE;
    if bytes.len() != expected_len {
        return Err(VerifyError::TapeLengthMismatch {
            expected: expected_len,
            actual: bytes.len(),
        });
    }

    let actions_start = TAPE_HEADER_SIZE;
    let actions_end = actions_start + body_len;

    let reward_milli = read_u32_le(bytes, actions_end) as i32;
    let progress = read_u32_le(bytes, actions_end + 4);
    let checksum = read_u32_le(bytes, actions_end + 8);

    let computed = crc32_and_validate_actions(bytes, actions_start, actions_end)?;
    if checksum != computed {
        return Err(VerifyError::CrcMismatch {
            stored: checksum,
            computed,
        });
    }

    Ok(TapeView {
        header,
        actions: &bytes[actions_start..actions_end],
        footer: TapeFooter {
            reward_milli,
            progress,
            checksum,
        },
    })
}

/// Writes a tape for a run through `scenario`. `actions` holds the encoded pairs.
pub fn serialize_tape(
    seed: u32,
    scenario: &Scenario,
    actions: &[u8],
    reward_milli: i32,
    progress: u32,
) -> Vec<u8> {
    let tick_count = (actions.len() / TAPE_BYTES_PER_TICK) as u32;
    let body_len = tick_count as usize * TAPE_BYTES_PER_TICK;
    let mut data = vec![0u8; TAPE_HEADER_SIZE + body_len + TAPE_FOOTER_SIZE];

    write_u32_le(&mut data, 0, TAPE_MAGIC);
    data[4] = TAPE_VERSION;
    data[5] = scenario.rules.contact_policy.tag();
    if scenario.rules.reward.step_cost == 0.0 {
        data[6] = TAPE_FLAG_NO_STEP_COST;
    }
    write_u32_le(&mut data, 8, seed);
    write_u32_le(&mut data, 12, scenario.digest());
    write_u32_le(&mut data, 16, scenario.rules.digest());
    write_u32_le(&mut data, 20, tick_count);
    write_u32_le(&mut data, 24, scenario.rules.max_ticks);

    let body_end = TAPE_HEADER_SIZE + body_len;
    data[TAPE_HEADER_SIZE..body_end].copy_from_slice(&actions[..body_len]);

    write_u32_le(&mut data, body_end, reward_milli as u32);
    write_u32_le(&mut data, body_end + 4, progress);

    let checksum = crc32(&data[..body_end]);
    write_u32_le(&mut data, body_end + 8, checksum);

    data
}

#[inline]
fn read_u32_le(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

#[inline]
fn write_u32_le(bytes: &mut [u8], offset: usize, value: u32) {
    bytes[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

const CRC_TABLE: [u32; 256] = build_crc_table();

const fn build_crc_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0;

    while i < 256 {
        let mut c = i as u32;
        let mut j = 0;
        while j < 8 {
            c = if (c & 1) != 0 {
                0xEDB8_8320u32 ^ (c >> 1)
            } else {
                c >> 1
            };
            j += 1;
        }
        table[i] = c;
        i += 1;
    }

    table
}

pub fn crc32(data: &[u8]) -> u32 {
    let mut crc = 0xFFFF_FFFFu32;
    for byte in data {
        let idx = ((crc ^ (*byte as u32)) & 0xFF) as usize;
        crc = CRC_TABLE[idx] ^ (crc >> 8);
    }
    crc ^ 0xFFFF_FFFFu32
}

fn crc32_and_validate_actions(
    bytes: &[u8],
    actions_start: usize,
    actions_end: usize,
) -> Result<u32, VerifyError> {
    let mut crc = 0xFFFF_FFFFu32;

    for (i, byte) in bytes[..actions_end].iter().enumerate() {
        if i >= actions_start && *byte == ACTION_RESERVED_BYTE {
            return Err(VerifyError::ReservedActionByte {
                tick: ((i - actions_start) / TAPE_BYTES_PER_TICK) as u32 + 1,
            });
        }
        let idx = ((crc ^ *byte as u32) & 0xFF) as usize;
        crc = CRC_TABLE[idx] ^ (crc >> 8);
    }

    Ok(crc ^ 0xFFFF_FFFFu32)
}
