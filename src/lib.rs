pub mod error;
pub mod ticks;
pub mod params;
pub mod validate;
pub mod hash;
pub mod chain;
pub mod metrics;
pub mod retry;
pub mod contracts;
pub mod config;

pub use error::{Bound, CreatorError, DecimalError, ParamError, Result, ValidationErrors};
pub use ticks::{CpuFactor, NetworkConstants};
pub use params::{Preset, RollupField, RollupParams, ARBOS_HASH};
pub use validate::{validate, RollupDeployment, RollupValidator, TimeBoundsWidth, ValidationLimits, ValidationPolicy};
pub use hash::{contract_hash_from_files, ContractHasher, Keccak256Hasher};
pub use chain::{Network, NetworkRegistry};
pub use self::metrics::Metrics;
pub use retry::{with_retry, RetryConfig};
pub use contracts::{ArbFactoryClient, CreateRollupArgs, RollupCreation, RollupFactory};
pub use config::Config;
