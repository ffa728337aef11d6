use ethers::types::U256;
use ethers::utils::parse_units;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{CreatorError, DecimalError, Result};

pub const TICKS_PER_BLOCK: u64 = 1000;
pub const SECONDS_PER_BLOCK: u64 = 13;
pub const GAS_PER_SECOND: u64 = 100_000_000;
pub const GAS_PER_STEP: u64 = 5;

pub const FACTOR_DECIMALS: u32 = 18;

const MAX_WHOLE_DIGITS: usize = 50;

pub fn check_decimal(value: &str, max_fraction_digits: usize) -> std::result::Result<(), DecimalError> {
    let (whole, fraction) = match value.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (value, ""),
    };

    if value.starts_with('-') {
        return Err(DecimalError::Negative);
    }
    if !whole.chars().chain(fraction.chars()).all(|c| c.is_ascii_digit()) {
        return Err(DecimalError::Invalid);
    }
    if whole.is_empty() && fraction.is_empty() {
        return Err(DecimalError::NoDigits);
    }
    if fraction.len() > max_fraction_digits {
        return Err(DecimalError::TooPrecise(max_fraction_digits));
    }
    // keeps the scaled value well inside 256 bits
    if whole.trim_start_matches('0').len() > MAX_WHOLE_DIGITS {
        return Err(DecimalError::TooLarge);
    }
    Ok(())
}

/// CPU speed multiplier, held as an exact decimal scaled by 10^18.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CpuFactor {
    scaled: U256,
    approx: f64,
}

impl CpuFactor {
    pub fn scaled(&self) -> U256 {
        self.scaled
    }

    pub fn as_f64(&self) -> f64 {
        self.approx
    }
}

impl FromStr for CpuFactor {
    type Err = DecimalError;

    fn from_str(s: &str) -> std::result::Result<Self, DecimalError> {
        check_decimal(s, FACTOR_DECIMALS as usize)?;
        let scaled = parse_units(s, FACTOR_DECIMALS).map_err(|_| DecimalError::TooLarge)?;
        let approx = s.parse::<f64>().map_err(|_| DecimalError::Invalid)?;
        Ok(Self {
            scaled: U256::from(scaled),
            approx,
        })
    }
}

/// All fields are non-zero, which keeps every division in this module total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawConstants")]
pub struct NetworkConstants {
    ticks_per_block: u64,
    seconds_per_block: u64,
    gas_per_second: u64,
    gas_per_step: u64,
}

#[derive(Deserialize)]
struct RawConstants {
    ticks_per_block: u64,
    seconds_per_block: u64,
    gas_per_second: u64,
    gas_per_step: u64,
}

impl TryFrom<RawConstants> for NetworkConstants {
    type Error = CreatorError;

    fn try_from(raw: RawConstants) -> Result<Self> {
        Self::new(
            raw.ticks_per_block,
            raw.seconds_per_block,
            raw.gas_per_second,
            raw.gas_per_step,
        )
    }
}

impl Default for NetworkConstants {
    fn default() -> Self {
        Self {
            ticks_per_block: TICKS_PER_BLOCK,
            seconds_per_block: SECONDS_PER_BLOCK,
            gas_per_second: GAS_PER_SECOND,
            gas_per_step: GAS_PER_STEP,
        }
    }
}

impl NetworkConstants {
    pub fn new(
        ticks_per_block: u64,
        seconds_per_block: u64,
        gas_per_second: u64,
        gas_per_step: u64,
    ) -> Result<Self> {
        for (name, value) in [
            ("ticks_per_block", ticks_per_block),
            ("seconds_per_block", seconds_per_block),
            ("gas_per_second", gas_per_second),
            ("gas_per_step", gas_per_step),
        ] {
            if value == 0 {
                return Err(CreatorError::Config(format!("{} must be non-zero", name)));
            }
        }

        Ok(Self {
            ticks_per_block,
            seconds_per_block,
            gas_per_second,
            gas_per_step,
        })
    }

    pub fn ticks_per_block(&self) -> u64 {
        self.ticks_per_block
    }

    pub fn seconds_per_block(&self) -> u64 {
        self.seconds_per_block
    }

    pub fn gas_per_second(&self) -> u64 {
        self.gas_per_second
    }

    pub fn gas_per_step(&self) -> u64 {
        self.gas_per_step
    }

    pub fn with_seconds_per_block(mut self, seconds_per_block: u64) -> Result<Self> {
        self.seconds_per_block = seconds_per_block;
        Self::new(
            self.ticks_per_block,
            self.seconds_per_block,
            self.gas_per_second,
            self.gas_per_step,
        )
    }

    pub fn with_gas_per_step(mut self, gas_per_step: u64) -> Result<Self> {
        self.gas_per_step = gas_per_step;
        Self::new(
            self.ticks_per_block,
            self.seconds_per_block,
            self.gas_per_second,
            self.gas_per_step,
        )
    }

    pub fn blocks_to_ticks(&self, blocks: U256) -> Result<U256> {
        checked_mul(blocks, self.ticks_per_block, "blocks_to_ticks")
    }

    pub fn ticks_to_blocks(&self, ticks: U256) -> U256 {
        ticks / U256::from(self.ticks_per_block)
    }

    pub fn blocks_to_seconds(&self, blocks: U256) -> Result<U256> {
        checked_mul(blocks, self.seconds_per_block, "blocks_to_seconds")
    }

    pub fn seconds_to_blocks(&self, seconds: U256) -> U256 {
        seconds / U256::from(self.seconds_per_block)
    }

    /// Truncates to whole blocks before scaling, so sub-block remainders are dropped.
    pub fn seconds_to_ticks(&self, seconds: U256) -> Result<U256> {
        self.blocks_to_ticks(self.seconds_to_blocks(seconds))
    }

    pub fn ticks_to_seconds(&self, ticks: U256) -> Result<U256> {
        self.blocks_to_seconds(self.ticks_to_blocks(ticks))
    }

    pub fn cpu_factor_to_speed_limit_seconds(&self, factor: CpuFactor) -> Result<U256> {
        let gas = checked_mul(factor.scaled, self.gas_per_second, "cpu_factor_to_speed_limit_seconds")?;
        Ok(gas / U256::exp10(FACTOR_DECIMALS as usize))
    }

    pub fn assertion_time_to_steps(&self, seconds: U256, speed_limit_per_second: U256) -> Result<U256> {
        let gas = seconds
            .checked_mul(speed_limit_per_second)
            .ok_or_else(|| CreatorError::Overflow("assertion_time_to_steps".to_string()))?;
        Ok(gas / U256::from(self.gas_per_step))
    }
}

fn checked_mul(value: U256, factor: u64, op: &str) -> Result<U256> {
    value
        .checked_mul(U256::from(factor))
        .ok_or_else(|| CreatorError::Overflow(format!("{}: {} * {}", op, value, factor)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constants() -> NetworkConstants {
        NetworkConstants::default()
    }

    #[test]
    fn test_blocks_and_ticks() {
        let c = constants();
        assert_eq!(c.blocks_to_ticks(U256::one()).unwrap(), U256::from(1000));
        assert_eq!(c.ticks_to_blocks(U256::from(1999)), U256::one());
        assert_eq!(c.ticks_to_blocks(U256::from(2000)), U256::from(2));
    }

    #[test]
    fn test_seconds_to_blocks_truncates() {
        let c = constants();
        assert_eq!(c.seconds_to_blocks(U256::from(20)), U256::one());
        assert_eq!(c.seconds_to_blocks(U256::from(12)), U256::zero());
        assert_eq!(c.blocks_to_seconds(U256::from(3)).unwrap(), U256::from(39));
    }

    #[test]
    fn test_seconds_to_ticks_drops_partial_blocks() {
        let c = constants();
        // 600s / 13 = 46 whole blocks
        assert_eq!(c.seconds_to_ticks(U256::from(600)).unwrap(), U256::from(46_000));
        assert_eq!(c.ticks_to_seconds(U256::from(46_999)).unwrap(), U256::from(598));
    }

    fn factor(value: &str) -> CpuFactor {
        value.parse().unwrap()
    }

    #[test]
    fn test_cpu_factor() {
        let c = constants();
        assert_eq!(
            c.cpu_factor_to_speed_limit_seconds(factor("1.0")).unwrap(),
            U256::from(GAS_PER_SECOND)
        );
        assert_eq!(
            c.cpu_factor_to_speed_limit_seconds(factor("0.2")).unwrap(),
            U256::from(20_000_000u64)
        );
    }

    #[test]
    fn test_cpu_factor_is_exact_for_decimals() {
        let c = constants();
        for (value, expected) in [
            ("0.29", 29_000_000u64),
            ("0.57", 57_000_000),
            ("2.3", 230_000_000),
            ("4.35", 435_000_000),
            ("0.000000001", 0),
            ("0.00000001", 1),
        ] {
            assert_eq!(
                c.cpu_factor_to_speed_limit_seconds(factor(value)).unwrap(),
                U256::from(expected),
                "factor {}",
                value
            );
        }
    }

    #[test]
    fn test_cpu_factor_parsing() {
        assert_eq!(factor("0.1").as_f64(), 0.1);
        assert_eq!(factor("2.").scaled(), U256::from(2) * U256::exp10(18));
        assert_eq!(".".parse::<CpuFactor>(), Err(DecimalError::NoDigits));
        assert_eq!("-1".parse::<CpuFactor>(), Err(DecimalError::Negative));
        assert_eq!("inf".parse::<CpuFactor>(), Err(DecimalError::Invalid));
        assert_eq!("1e3".parse::<CpuFactor>(), Err(DecimalError::Invalid));
        assert_eq!(
            "0.0000000000000000001".parse::<CpuFactor>(),
            Err(DecimalError::TooPrecise(18))
        );
        assert_eq!("1".repeat(51).parse::<CpuFactor>(), Err(DecimalError::TooLarge));
    }

    #[test]
    fn test_assertion_time_to_steps() {
        let c = constants();
        let speed = c.cpu_factor_to_speed_limit_seconds(factor("0.2")).unwrap();
        assert_eq!(
            c.assertion_time_to_steps(U256::from(15), speed).unwrap(),
            U256::from(60_000_000u64)
        );
        // 7 gas at 5 gas/step floors to 1 step
        assert_eq!(
            c.assertion_time_to_steps(U256::one(), U256::from(7)).unwrap(),
            U256::one()
        );
    }

    #[test]
    fn test_overflow_is_reported() {
        let c = constants();
        let result = c.blocks_to_ticks(U256::MAX);
        assert!(matches!(result, Err(CreatorError::Overflow(_))));
        let result = c.assertion_time_to_steps(U256::MAX, U256::from(2));
        assert!(matches!(result, Err(CreatorError::Overflow(_))));
    }

    #[test]
    fn test_alternate_network_constants() {
        let c = NetworkConstants::new(1000, 15, 100_000_000, 5).unwrap();
        assert_eq!(c.seconds_to_ticks(U256::from(600)).unwrap(), U256::from(40_000));

        let c = constants().with_gas_per_step(10).unwrap();
        assert_eq!(
            c.assertion_time_to_steps(U256::from(15), U256::from(20_000_000u64)).unwrap(),
            U256::from(30_000_000u64)
        );
    }

    #[test]
    fn test_zero_constants_rejected() {
        assert!(NetworkConstants::new(0, 13, 1, 1).is_err());
        assert!(constants().with_seconds_per_block(0).is_err());
        let raw = r#"{"ticks_per_block":1000,"seconds_per_block":13,"gas_per_second":1,"gas_per_step":0}"#;
        assert!(serde_json::from_str::<NetworkConstants>(raw).is_err());
    }
}
