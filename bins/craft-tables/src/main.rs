//! craft-tables: constants for deploying the slowlock and its pool.
//!
//! `decay-factors` prints the per-power decay table in the form the contract
//! source embeds it; `sqrt-price` prints the initial pool price.

use alloy_primitives::U256;
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use craft_core::constants::{DECAY_TABLE_SIZE, SECONDS_PER_DAY};
use craft_decay::{decay_factors_x96, sqrt_ratio_x96};

#[derive(Parser)]
#[command(name = "craft-tables")]
#[command(version, about = "Generate X96 decay tables and initial pool prices.")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print decayFactorsX96[i] = floor(2^(-2^i / half_life) * 2^96).
    DecayFactors {
        /// Half-life in days.
        #[arg(long, conflicts_with = "half_life_seconds")]
        half_life_days: Option<u64>,

        /// Half-life in seconds.
        #[arg(long)]
        half_life_seconds: Option<u64>,

        /// Number of entries.
        #[arg(long, default_value_t = DECAY_TABLE_SIZE)]
        count: usize,
    },
    /// Print floor(sqrt(token1 / token0) * 2^96).
    SqrtPrice {
        /// Amount of token0 (decimal or 0x-hex).
        token0: U256,
        /// Amount of token1 (decimal or 0x-hex).
        token1: U256,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let lines = match cli.command {
        Commands::DecayFactors { half_life_days, half_life_seconds, count } => {
            let half_life = half_life(half_life_days, half_life_seconds)?;
            decay_factor_lines(half_life, count)?
        }
        Commands::SqrtPrice { token0, token1 } => {
            let ratio = sqrt_ratio_x96(token0, token1).context("Cannot compute price ratio")?;
            vec![ratio.to_string()]
        }
    };
    for line in lines {
        println!("{line}");
    }
    Ok(())
}

fn half_life(days: Option<u64>, seconds: Option<u64>) -> Result<u64> {
    match (days, seconds) {
        (Some(days), _) => days.checked_mul(SECONDS_PER_DAY).context("Half-life too long"),
        (None, Some(seconds)) => Ok(seconds),
        (None, None) => bail!("Pass --half-life-days or --half-life-seconds"),
    }
}

fn decay_factor_lines(half_life_seconds: u64, count: usize) -> Result<Vec<String>> {
    let factors = decay_factors_x96(half_life_seconds, count)
        .with_context(|| format!("Cannot build a {count}-entry table for a {half_life_seconds}s half-life"))?;
    Ok(factors
        .iter()
        .enumerate()
        .map(|(i, f)| format!("decayFactorsX96[{i}] = {f};"))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thirty_day_table_lines() {
        let lines = decay_factor_lines(half_life(Some(30), None).unwrap(), 32).unwrap();
        assert_eq!(lines.len(), 32);
        assert_eq!(lines[0], "decayFactorsX96[0] = 79228141327238826465593588720;");
        assert_eq!(lines[21], "decayFactorsX96[21] = 45218932159695465736903884781;");
        assert_eq!(lines[31], "decayFactorsX96[31] = 0;");
    }

    #[test]
    fn half_life_needs_a_unit() {
        assert!(half_life(None, None).is_err());
        assert_eq!(half_life(None, Some(60)).unwrap(), 60);
        assert!(half_life(Some(u64::MAX), None).is_err());
    }

    #[test]
    fn rejects_bad_count() {
        assert!(decay_factor_lines(2_592_000, 0).is_err());
        assert!(decay_factor_lines(2_592_000, 65).is_err());
    }

    #[test]
    fn parses_sqrt_price_args() {
        let cli = Cli::try_parse_from(["craft-tables", "sqrt-price", "1", "4"]).unwrap();
        let Commands::SqrtPrice { token0, token1 } = cli.command else { panic!("expected sqrt-price") };
        assert_eq!(sqrt_ratio_x96(token0, token1).unwrap(), U256::from(2u64) << 96);
    }
}
