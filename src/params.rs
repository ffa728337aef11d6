use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{CreatorError, Result};

/// Machine hash of the published ArbOS image.
pub const ARBOS_HASH: &str = "0x5bec2cc2daea1334022bfb3ec9da5912aafc7adf06ab29a3ba583ad6565d2c8e";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RollupField {
    GracePeriod,
    SpeedLimitFactor,
    MaxAssertionSize,
    MaxTimeWidth,
    MaxBlockWidth,
    MaxTimestampWidth,
    StakeRequirement,
    VmHash,
}

impl RollupField {
    pub const ALL: [RollupField; 8] = [
        RollupField::GracePeriod,
        RollupField::SpeedLimitFactor,
        RollupField::MaxAssertionSize,
        RollupField::MaxTimeWidth,
        RollupField::MaxBlockWidth,
        RollupField::MaxTimestampWidth,
        RollupField::StakeRequirement,
        RollupField::VmHash,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RollupField::GracePeriod => "gracePeriod",
            RollupField::SpeedLimitFactor => "speedLimitFactor",
            RollupField::MaxAssertionSize => "maxAssertionSize",
            RollupField::MaxTimeWidth => "maxTimeWidth",
            RollupField::MaxBlockWidth => "maxBlockWidth",
            RollupField::MaxTimestampWidth => "maxTimestampWidth",
            RollupField::StakeRequirement => "stakeRequirement",
            RollupField::VmHash => "vmHash",
        }
    }
}

impl fmt::Display for RollupField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RollupField {
    type Err = CreatorError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| CreatorError::Config(format!("Unknown rollup parameter {}", s)))
    }
}

/// Width fields are `None` when not part of the configuration, `Some("")` when left blank.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollupParams {
    #[serde(default)]
    pub grace_period: String,
    #[serde(default)]
    pub speed_limit_factor: String,
    #[serde(default)]
    pub max_assertion_size: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_time_width: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_block_width: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_timestamp_width: Option<String>,
    #[serde(default)]
    pub stake_requirement: String,
    #[serde(default)]
    pub vm_hash: String,
}

impl RollupParams {
    pub fn blank() -> Self {
        Self {
            max_block_width: Some(String::new()),
            max_timestamp_width: Some(String::new()),
            ..Default::default()
        }
    }

    pub fn local() -> Self {
        Self {
            grace_period: "10".into(),
            speed_limit_factor: "0.2".into(),
            max_assertion_size: "15".into(),
            max_time_width: None,
            max_block_width: Some("20".into()),
            max_timestamp_width: Some("600".into()),
            stake_requirement: "0.1".into(),
            vm_hash: String::new(),
        }
    }

    pub fn testnet() -> Self {
        Self {
            grace_period: "180".into(),
            speed_limit_factor: "1.0".into(),
            max_assertion_size: "50".into(),
            max_time_width: None,
            max_block_width: Some("20".into()),
            max_timestamp_width: Some("600".into()),
            stake_requirement: "1".into(),
            vm_hash: String::new(),
        }
    }

    /// Single block-width layout used by older factory deployments.
    pub fn local_legacy() -> Self {
        Self {
            max_time_width: Some("20".into()),
            max_block_width: None,
            max_timestamp_width: None,
            ..Self::local()
        }
    }

    pub fn testnet_legacy() -> Self {
        Self {
            max_time_width: Some("20".into()),
            max_block_width: None,
            max_timestamp_width: None,
            ..Self::testnet()
        }
    }

    pub fn with_vm_hash(mut self, vm_hash: impl Into<String>) -> Self {
        self.vm_hash = vm_hash.into();
        self
    }

    pub fn get(&self, field: RollupField) -> Option<&str> {
        match field {
            RollupField::GracePeriod => Some(&self.grace_period),
            RollupField::SpeedLimitFactor => Some(&self.speed_limit_factor),
            RollupField::MaxAssertionSize => Some(&self.max_assertion_size),
            RollupField::MaxTimeWidth => self.max_time_width.as_deref(),
            RollupField::MaxBlockWidth => self.max_block_width.as_deref(),
            RollupField::MaxTimestampWidth => self.max_timestamp_width.as_deref(),
            RollupField::StakeRequirement => Some(&self.stake_requirement),
            RollupField::VmHash => Some(&self.vm_hash),
        }
    }

    pub fn set(&mut self, field: RollupField, value: impl Into<String>) {
        let value = value.into();
        match field {
            RollupField::GracePeriod => self.grace_period = value,
            RollupField::SpeedLimitFactor => self.speed_limit_factor = value,
            RollupField::MaxAssertionSize => self.max_assertion_size = value,
            RollupField::MaxTimeWidth => self.max_time_width = Some(value),
            RollupField::MaxBlockWidth => self.max_block_width = Some(value),
            RollupField::MaxTimestampWidth => self.max_timestamp_width = Some(value),
            RollupField::StakeRequirement => self.stake_requirement = value,
            RollupField::VmHash => self.vm_hash = value,
        }
    }

    pub fn missing_fields(&self) -> Vec<RollupField> {
        RollupField::ALL
            .iter()
            .copied()
            .filter(|&field| matches!(self.get(field), Some(value) if value.trim().is_empty()))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Preset {
    Blank,
    Local,
    Testnet,
    LocalLegacy,
    TestnetLegacy,
}

impl Preset {
    pub fn params(&self) -> RollupParams {
        match self {
            Preset::Blank => RollupParams::blank(),
            Preset::Local => RollupParams::local(),
            Preset::Testnet => RollupParams::testnet(),
            Preset::LocalLegacy => RollupParams::local_legacy(),
            Preset::TestnetLegacy => RollupParams::testnet_legacy(),
        }
    }
}
