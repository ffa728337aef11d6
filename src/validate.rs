use ethers::types::U256;
use ethers::utils::parse_ether;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Bound, CreatorError, ParamError, Result, ValidationErrors};
use crate::metrics::Metrics;
use crate::params::{RollupField, RollupParams};
use crate::ticks::{check_decimal, CpuFactor, NetworkConstants};

const SECONDS_PER_MINUTE: u64 = 60;
const WEI_DECIMALS: usize = 18;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationLimits {
    pub min_stake_wei: U256,
    pub min_grace_period_minutes: u64,
    pub max_grace_period_minutes: u64,
    pub min_speed_limit_factor: f64,
    pub max_speed_limit_factor: f64,
    pub min_time_width_blocks: u64,
}

impl Default for ValidationLimits {
    fn default() -> Self {
        Self {
            // 1 gwei
            min_stake_wei: U256::from(1_000_000_000u64),
            min_grace_period_minutes: 2,
            // one week
            max_grace_period_minutes: 10_080,
            min_speed_limit_factor: 0.1,
            max_speed_limit_factor: 100.0,
            min_time_width_blocks: 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ValidationPolicy {
    #[default]
    FirstFailure,
    CollectAll,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeBoundsWidth {
    pub blocks: U256,
    pub seconds: U256,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollupDeployment {
    pub vm_hash: String,
    pub grace_period_ticks: U256,
    pub speed_limit_ticks: U256,
    pub max_steps: U256,
    pub stake_requirement_wei: U256,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_bounds: Option<TimeBoundsWidth>,
}

#[derive(Debug, Clone, Default)]
pub struct RollupValidator {
    pub constants: NetworkConstants,
    pub limits: ValidationLimits,
    pub policy: ValidationPolicy,
}

pub fn validate(params: &RollupParams) -> Result<RollupDeployment> {
    RollupValidator::default().validate(params)
}

impl RollupValidator {
    pub fn new(constants: NetworkConstants, limits: ValidationLimits) -> Self {
        Self {
            constants,
            limits,
            policy: ValidationPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: ValidationPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn validate(&self, params: &RollupParams) -> Result<RollupDeployment> {
        let result = self.check(params);

        match &result {
            Ok(deployment) => {
                debug!(
                    grace_period_ticks = %deployment.grace_period_ticks,
                    speed_limit_ticks = %deployment.speed_limit_ticks,
                    max_steps = %deployment.max_steps,
                    stake_requirement_wei = %deployment.stake_requirement_wei,
                    "rollup parameters accepted"
                );
                Metrics::record_validation(true, "ok");
            }
            Err(CreatorError::Validation(errors)) => {
                warn!(errors = %errors, "rollup parameters rejected");
                for kind in errors.kinds() {
                    Metrics::record_validation(false, &kind);
                }
            }
            Err(e) => {
                warn!(error = %e, "rollup parameter conversion failed");
                Metrics::record_validation(false, "internal");
            }
        }

        result
    }

    fn check(&self, params: &RollupParams) -> Result<RollupDeployment> {
        let mut report = Report::new(self.policy);

        let missing = params.missing_fields();
        if !missing.is_empty() {
            report.record(ParamError::MissingField { fields: missing })?;
        }

        let grace_period = report.field(params, RollupField::GracePeriod, parse_integer)?;
        let max_assertion_size = report.field(params, RollupField::MaxAssertionSize, parse_integer)?;
        let speed_limit_factor = report.field(params, RollupField::SpeedLimitFactor, parse_factor)?;
        let stake_wei = report.field(params, RollupField::StakeRequirement, parse_stake)?;
        let time_width = report.field(params, RollupField::MaxTimeWidth, parse_integer)?;
        let block_width = report.field(params, RollupField::MaxBlockWidth, parse_integer)?;
        let timestamp_width = report.field(params, RollupField::MaxTimestampWidth, parse_integer)?;

        let limits = &self.limits;
        let spb = self.constants.seconds_per_block();

        if let Some(stake) = stake_wei {
            if stake < limits.min_stake_wei {
                report.record(out_of_range(
                    RollupField::StakeRequirement,
                    format!("{} wei", stake),
                    Bound::AtLeast(format!("{} wei", limits.min_stake_wei)),
                ))?;
            }
        }

        if let Some(minutes) = grace_period {
            if minutes < limits.min_grace_period_minutes {
                report.record(out_of_range(
                    RollupField::GracePeriod,
                    minutes,
                    Bound::AtLeast(format!("{} minutes", limits.min_grace_period_minutes)),
                ))?;
            } else if minutes > limits.max_grace_period_minutes {
                report.record(out_of_range(
                    RollupField::GracePeriod,
                    minutes,
                    Bound::AtMost(format!("{} minutes", limits.max_grace_period_minutes)),
                ))?;
            }
        }

        if let Some(factor) = speed_limit_factor.map(|f| f.as_f64()) {
            if factor < limits.min_speed_limit_factor {
                report.record(out_of_range(
                    RollupField::SpeedLimitFactor,
                    factor,
                    Bound::AtLeast(limits.min_speed_limit_factor.to_string()),
                ))?;
            } else if factor > limits.max_speed_limit_factor {
                report.record(out_of_range(
                    RollupField::SpeedLimitFactor,
                    factor,
                    Bound::AtMost(limits.max_speed_limit_factor.to_string()),
                ))?;
            }
        }

        let grace_seconds = grace_period.map(|minutes| minutes as u128 * SECONDS_PER_MINUTE as u128);

        if let Some(seconds) = max_assertion_size {
            // half a block, compared without rounding
            if (seconds as u128) * 2 < spb as u128 {
                report.record(out_of_range(
                    RollupField::MaxAssertionSize,
                    seconds,
                    Bound::AtLeast(format!("{} seconds", spb as f64 / 2.0)),
                ))?;
            } else if let Some(grace) = grace_seconds {
                if (seconds as u128) * 4 > grace {
                    report.record(out_of_range(
                        RollupField::MaxAssertionSize,
                        seconds,
                        Bound::AtMost(format!("{} seconds", grace / 4)),
                    ))?;
                }
            }
        }

        let max_width_blocks = grace_seconds.map(|grace| self.constants.seconds_to_blocks(U256::from(grace)));
        for (field, width) in [
            (RollupField::MaxTimeWidth, time_width),
            (RollupField::MaxBlockWidth, block_width),
        ] {
            let Some(width) = width else { continue };
            if width < limits.min_time_width_blocks {
                report.record(out_of_range(
                    field,
                    width,
                    Bound::AtLeast(format!("{} blocks", limits.min_time_width_blocks)),
                ))?;
            } else if let Some(max) = max_width_blocks {
                if U256::from(width) > max {
                    report.record(out_of_range(field, width, Bound::AtMost(format!("{} blocks", max))))?;
                }
            }
        }

        if let Some(width) = timestamp_width {
            if width < spb {
                report.record(out_of_range(
                    RollupField::MaxTimestampWidth,
                    width,
                    Bound::AtLeast(format!("{} seconds", spb)),
                ))?;
            } else if let Some(grace) = grace_seconds {
                if width as u128 > grace {
                    report.record(out_of_range(
                        RollupField::MaxTimestampWidth,
                        width,
                        Bound::AtMost(format!("{} seconds", grace)),
                    ))?;
                }
            }
        }

        report.finish()?;

        // Every input parsed once the report is clean.
        let (Some(grace_seconds), Some(max_assertion_size), Some(factor), Some(stake_wei)) =
            (grace_seconds, max_assertion_size, speed_limit_factor, stake_wei)
        else {
            return Err(CreatorError::Internal(
                "validated rollup parameters are incomplete".to_string(),
            ));
        };

        let c = &self.constants;
        let speed_limit = c.cpu_factor_to_speed_limit_seconds(factor)?;
        let time_bounds = match (block_width.or(time_width), timestamp_width) {
            (Some(blocks), Some(seconds)) => Some(TimeBoundsWidth {
                blocks: U256::from(blocks),
                seconds: U256::from(seconds),
            }),
            (Some(blocks), None) => Some(TimeBoundsWidth {
                blocks: U256::from(blocks),
                seconds: c.blocks_to_seconds(U256::from(blocks))?,
            }),
            (None, Some(seconds)) => Some(TimeBoundsWidth {
                blocks: c.seconds_to_blocks(U256::from(seconds)),
                seconds: U256::from(seconds),
            }),
            (None, None) => None,
        };

        Ok(RollupDeployment {
            vm_hash: params.vm_hash.trim().to_string(),
            grace_period_ticks: c.seconds_to_ticks(U256::from(grace_seconds))?,
            speed_limit_ticks: c.seconds_to_ticks(speed_limit)?,
            max_steps: c.assertion_time_to_steps(U256::from(max_assertion_size), speed_limit)?,
            stake_requirement_wei: stake_wei,
            time_bounds,
        })
    }
}

struct Report {
    policy: ValidationPolicy,
    errors: Vec<ParamError>,
}

impl Report {
    fn new(policy: ValidationPolicy) -> Self {
        Self {
            policy,
            errors: Vec::new(),
        }
    }

    fn record(&mut self, error: ParamError) -> Result<()> {
        self.errors.push(error);
        match self.policy {
            ValidationPolicy::FirstFailure => self.finish(),
            ValidationPolicy::CollectAll => Ok(()),
        }
    }

    fn field<T>(
        &mut self,
        params: &RollupParams,
        field: RollupField,
        parse: fn(RollupField, &str) -> std::result::Result<T, ParamError>,
    ) -> Result<Option<T>> {
        match params.get(field).map(str::trim) {
            Some(value) if !value.is_empty() => match parse(field, value) {
                Ok(parsed) => Ok(Some(parsed)),
                Err(e) => self.record(e).map(|_| None),
            },
            _ => Ok(None),
        }
    }

    fn finish(&mut self) -> Result<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationErrors::new(std::mem::take(&mut self.errors)).into())
        }
    }
}

fn out_of_range(field: RollupField, value: impl ToString, bound: Bound) -> ParamError {
    ParamError::OutOfRange {
        field,
        value: value.to_string(),
        bound,
    }
}

fn parse_error(field: RollupField, value: &str, expected: &'static str, reason: impl ToString) -> ParamError {
    ParamError::Parse {
        field,
        value: value.to_string(),
        expected,
        reason: reason.to_string(),
    }
}

fn parse_integer(field: RollupField, value: &str) -> std::result::Result<u64, ParamError> {
    value
        .parse::<u64>()
        .map_err(|e| parse_error(field, value, "whole number", e))
}

fn parse_factor(field: RollupField, value: &str) -> std::result::Result<CpuFactor, ParamError> {
    value
        .parse::<CpuFactor>()
        .map_err(|e| parse_error(field, value, "decimal number", e))
}

fn parse_stake(field: RollupField, value: &str) -> std::result::Result<U256, ParamError> {
    // parse_ether accepts "." and drops sub-wei digits
    check_decimal(value, WEI_DECIMALS).map_err(|e| parse_error(field, value, "ETH amount", e))?;
    parse_ether(value).map_err(|e| parse_error(field, value, "ETH amount", e))
}
