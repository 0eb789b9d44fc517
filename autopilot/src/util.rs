use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

pub const DEFAULT_SEED_START: u32 = 0x50D1_0001;

/// Accepts `0x`-prefixed hex or plain decimal.
pub fn parse_seed(seed: &str) -> Result<u32> {
    let s = seed.trim();
    if s.is_empty() {
        return Err(anyhow!("empty seed"));
    }
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16).with_context(|| format!("invalid hex seed: {s}")),
        None => s
            .parse::<u32>()
            .with_context(|| format!("invalid decimal seed: {s}")),
    }
}

pub fn seed_to_hex(seed: u32) -> String {
    format!("0x{seed:08x}")
}

fn parse_seed_tokens<'a>(tokens: impl Iterator<Item = &'a str>) -> Result<Vec<u32>> {
    tokens
        .map(str::trim)
        .filter(|token| !token.is_empty() && !token.starts_with('#'))
        .map(parse_seed)
        .collect()
}

pub fn parse_seed_csv(input: &str) -> Result<Vec<u32>> {
    let seeds = parse_seed_tokens(input.split(','))?;
    if seeds.is_empty() {
        return Err(anyhow!("no seeds parsed from --seeds"));
    }
    Ok(seeds)
}

/// One seed per line; blank lines and `#` comments are skipped.
pub fn parse_seed_file(path: &Path) -> Result<Vec<u32>> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("failed reading seed file {}", path.display()))?;
    let seeds = parse_seed_tokens(data.lines())?;
    if seeds.is_empty() {
        return Err(anyhow!("seed file {} had no seeds", path.display()));
    }
    Ok(seeds)
}

/// `count` seeds from an LCG walk starting at `start`.
pub fn seed_sequence(start: u32, count: u32) -> Vec<u32> {
    let mut out = Vec::with_capacity(count as usize);
    let mut cur = start;
    for _ in 0..count {
        out.push(cur);
        cur = cur.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
    }
    out
}

/// Seed file first, then an explicit list, then a generated sequence.
pub fn resolve_seeds(
    seeds: Option<&str>,
    seed_file: Option<&Path>,
    seed_start: Option<&str>,
    seed_count: u32,
) -> Result<Vec<u32>> {
    if let Some(path) = seed_file {
        return parse_seed_file(path);
    }
    if let Some(csv) = seeds {
        return parse_seed_csv(csv);
    }

    let start = match seed_start {
        Some(start) => parse_seed(start)?,
        None => DEFAULT_SEED_START,
    };
    Ok(seed_sequence(start, seed_count))
}

pub fn timestamp_suffix() -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    format!("{now}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_hex_and_decimal_seeds() -> Result<()> {
        assert_eq!(parse_seed("0xDEADBEEF")?, 0xDEAD_BEEF);
        assert_eq!(parse_seed(" 42 ")?, 42);
        assert!(parse_seed("").is_err());
        assert!(parse_seed("0xZZ").is_err());
        assert_eq!(parse_seed_csv("1, 0x10,,3")?, vec![1, 16, 3]);
        assert!(parse_seed_csv(" , ").is_err());
        assert_eq!(seed_to_hex(0xAB), "0x000000ab");
        Ok(())
    }

    #[test]
    fn seed_file_skips_comments() -> Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        writeln!(file, "# warmup seeds")?;
        writeln!(file, "0x1")?;
        writeln!(file)?;
        writeln!(file, "7")?;
        assert_eq!(parse_seed_file(file.path())?, vec![1, 7]);
        Ok(())
    }

    #[test]
    fn generated_sequence_is_deterministic() -> Result<()> {
        let seeds = resolve_seeds(None, None, Some("0x10"), 4)?;
        assert_eq!(seeds.len(), 4);
        assert_eq!(seeds[0], 0x10);
        assert_eq!(seeds, seed_sequence(0x10, 4));
        assert_eq!(resolve_seeds(Some("5,6"), None, Some("0x10"), 4)?, vec![5, 6]);
        Ok(())
    }
}
