use async_trait::async_trait;
use ethers::contract::parse_log;
use ethers::prelude::*;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

use crate::error::{CreatorError, Result};
use crate::metrics::{Metrics, Timer};
use crate::validate::RollupDeployment;

abigen!(
    ArbFactory,
    r#"[
        function createRollup(bytes32 vmState, uint128 gracePeriodTicks, uint128 arbGasSpeedLimitPerTick, uint64 maxExecutionSteps, uint64[2] maxTimeBoundsWidth, uint128 stakeRequirement, address owner) external
        event RollupCreated(address rollupAddress)
    ]"#
);

/// `createRollup` arguments at their ABI widths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRollupArgs {
    pub vm_state: [u8; 32],
    pub grace_period_ticks: u128,
    pub arb_gas_speed_limit_per_tick: u128,
    pub max_execution_steps: u64,
    pub max_time_bounds_width: [u64; 2],
    pub stake_requirement: u128,
    pub owner: Address,
}

impl CreateRollupArgs {
    pub fn from_deployment(deployment: &RollupDeployment, owner: Address) -> Result<Self> {
        let vm_state = H256::from_str(&deployment.vm_hash).map_err(|e| {
            CreatorError::Contract(format!("vmHash {} is not a bytes32 value: {}", deployment.vm_hash, e))
        })?;
        let time_bounds = deployment
            .time_bounds
            .ok_or_else(|| CreatorError::Contract("Missing time bounds width".to_string()))?;

        Ok(Self {
            vm_state: vm_state.to_fixed_bytes(),
            grace_period_ticks: to_u128(deployment.grace_period_ticks, "gracePeriodTicks")?,
            arb_gas_speed_limit_per_tick: to_u128(deployment.speed_limit_ticks, "arbGasSpeedLimitPerTick")?,
            max_execution_steps: to_u64(deployment.max_steps, "maxExecutionSteps")?,
            max_time_bounds_width: [
                to_u64(time_bounds.blocks, "maxTimeBoundsWidth[0]")?,
                to_u64(time_bounds.seconds, "maxTimeBoundsWidth[1]")?,
            ],
            stake_requirement: to_u128(deployment.stake_requirement_wei, "stakeRequirement")?,
            owner,
        })
    }
}

fn to_u128(value: U256, name: &str) -> Result<u128> {
    if value.bits() > 128 {
        return Err(CreatorError::Contract(format!("{} {} does not fit in uint128", name, value)));
    }
    Ok(value.as_u128())
}

fn to_u64(value: U256, name: &str) -> Result<u64> {
    if value.bits() > 64 {
        return Err(CreatorError::Contract(format!("{} {} does not fit in uint64", name, value)));
    }
    Ok(value.as_u64())
}

/// Outcome of a `createRollup` transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollupCreation {
    pub tx_hash: H256,
    /// Address from the `RollupCreated` event, if the transaction was mined and emitted one.
    pub rollup_address: Option<Address>,
}

#[async_trait]
pub trait RollupFactory: Send + Sync {
    fn address(&self) -> Address;

    async fn create_rollup(&self, deployment: &RollupDeployment, owner: Address) -> Result<RollupCreation>;
}

pub struct ArbFactoryClient<M> {
    factory: ArbFactory<M>,
    chain_id: u64,
    confirmations: usize,
}

impl<M: Middleware + 'static> ArbFactoryClient<M> {
    pub fn new(address: Address, client: Arc<M>, chain_id: u64) -> Self {
        Self {
            factory: ArbFactory::new(address, client),
            chain_id,
            confirmations: 1,
        }
    }

    pub fn with_confirmations(mut self, confirmations: usize) -> Self {
        self.confirmations = confirmations;
        self
    }

    pub fn create_rollup_call(&self, args: &CreateRollupArgs) -> ContractCall<M, ()> {
        self.factory
            .create_rollup(
                args.vm_state,
                args.grace_period_ticks,
                args.arb_gas_speed_limit_per_tick,
                args.max_execution_steps,
                args.max_time_bounds_width,
                args.stake_requirement,
                args.owner,
            )
            .from(args.owner)
    }
}

#[async_trait]
impl<M: Middleware + 'static> RollupFactory for ArbFactoryClient<M> {
    fn address(&self) -> Address {
        self.factory.address()
    }

    async fn create_rollup(&self, deployment: &RollupDeployment, owner: Address) -> Result<RollupCreation> {
        let args = CreateRollupArgs::from_deployment(deployment, owner)?;
        let call = self.create_rollup_call(&args);
        let timer = Timer::new();

        let pending = match call.send().await {
            Ok(pending) => pending,
            Err(e) => {
                Metrics::record_rollup_submission(self.chain_id, false, timer.elapsed());
                return Err(CreatorError::Contract(e.to_string()));
            }
        };
        let tx_hash = pending.tx_hash();
        info!(tx_hash = ?tx_hash, factory = ?self.factory.address(), "createRollup submitted");

        let receipt = pending
            .confirmations(self.confirmations)
            .await
            .map_err(|e| CreatorError::RPC(e.to_string()));
        Metrics::record_rollup_submission(self.chain_id, receipt.is_ok(), timer.elapsed());

        let rollup_address = receipt?.and_then(|receipt| {
            receipt
                .logs
                .into_iter()
                .find_map(|log| parse_log::<RollupCreatedFilter>(log).ok())
                .map(|event| event.rollup_address)
        });

        if let Some(address) = rollup_address {
            info!(rollup = ?address, "rollup chain created");
        }

        Ok(RollupCreation {
            tx_hash,
            rollup_address,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{RollupParams, ARBOS_HASH};
    use crate::validate::{validate, TimeBoundsWidth};
    use ethers::abi::AbiDecode;
    use ethers::utils::id;

    const TEST_FACTORY: &str = "0xd309F6Ba1B53CbDF9c0690eD1316A347eBb7adf9";

    fn deployment() -> RollupDeployment {
        validate(&RollupParams::local().with_vm_hash(ARBOS_HASH)).unwrap()
    }

    fn owner() -> Address {
        Address::repeat_byte(0x22)
    }

    #[test]
    fn test_args_from_deployment() {
        let args = CreateRollupArgs::from_deployment(&deployment(), owner()).unwrap();

        assert_eq!(H256::from(args.vm_state), H256::from_str(ARBOS_HASH).unwrap());
        assert_eq!(args.grace_period_ticks, 46_000);
        assert_eq!(args.arb_gas_speed_limit_per_tick, 1_538_461_000);
        assert_eq!(args.max_execution_steps, 60_000_000);
        assert_eq!(args.max_time_bounds_width, [20, 600]);
        assert_eq!(args.stake_requirement, 100_000_000_000_000_000);
        assert_eq!(args.owner, owner());
    }

    #[test]
    fn test_args_reject_short_vm_hash() {
        let mut deployment = deployment();
        deployment.vm_hash = "0xabc".to_string();
        let result = CreateRollupArgs::from_deployment(&deployment, owner());
        assert!(matches!(result, Err(CreatorError::Contract(_))));
    }

    #[test]
    fn test_args_require_time_bounds() {
        let mut deployment = deployment();
        deployment.time_bounds = None;
        assert!(CreateRollupArgs::from_deployment(&deployment, owner()).is_err());
    }

    #[test]
    fn test_args_reject_wide_values() {
        let mut deployment = deployment();
        deployment.time_bounds = Some(TimeBoundsWidth {
            blocks: U256::from(u64::MAX) + U256::one(),
            seconds: U256::from(600),
        });
        assert!(CreateRollupArgs::from_deployment(&deployment, owner()).is_err());
    }

    #[test]
    fn test_create_rollup_calldata() {
        let (provider, _mock) = Provider::mocked();
        let client = ArbFactoryClient::new(TEST_FACTORY.parse().unwrap(), Arc::new(provider), 1337);
        let args = CreateRollupArgs::from_deployment(&deployment(), owner()).unwrap();

        let calldata = client.create_rollup_call(&args).calldata().unwrap();
        let selector = id("createRollup(bytes32,uint128,uint128,uint64,uint64[2],uint128,address)");
        assert_eq!(&calldata[..4], &selector[..]);

        let decoded = CreateRollupCall::decode(&calldata).unwrap();
        assert_eq!(decoded.vm_state, args.vm_state);
        assert_eq!(decoded.grace_period_ticks, args.grace_period_ticks);
        assert_eq!(decoded.max_time_bounds_width, args.max_time_bounds_width);
        assert_eq!(decoded.stake_requirement, args.stake_requirement);
        assert_eq!(decoded.owner, owner());
        assert_eq!(client.address(), TEST_FACTORY.parse::<Address>().unwrap());
    }
}
