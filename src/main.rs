use anyhow::{anyhow, Context};
use clap::{Args, Parser, Subcommand};
use ethers::prelude::*;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use rollup_creator::{
    contract_hash_from_files, with_retry, ArbFactoryClient, Config, CreatorError, Keccak256Hasher,
    Metrics, Preset, RollupDeployment, RollupFactory, RollupField, RollupParams, RollupValidator,
    ValidationPolicy, ARBOS_HASH,
};

#[derive(Parser, Debug)]
#[command(
    name = "rollup-creator",
    version = env!("CARGO_PKG_VERSION"),
    about = "Validate Arbitrum rollup chain parameters and deploy them through the rollup factory"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate the parameters and print the derived on-chain values
    Validate(ParamArgs),
    /// Validate the parameters and call createRollup on the connected chain's factory
    Create(ParamArgs),
}

#[derive(Args, Debug)]
struct ParamArgs {
    /// Starting values for every field
    #[arg(long, value_enum, default_value = "blank")]
    preset: Preset,

    /// JSON file with rollup parameters, replaces the preset
    #[arg(long, value_name = "FILE")]
    params: Option<PathBuf>,

    /// Grace period in minutes
    #[arg(long)]
    grace_period: Option<String>,

    /// CPU speed multiplier
    #[arg(long)]
    speed_limit_factor: Option<String>,

    /// Maximum assertion size in seconds
    #[arg(long)]
    max_assertion_size: Option<String>,

    /// Maximum time bounds width in blocks (single-width factories)
    #[arg(long)]
    max_time_width: Option<String>,

    /// Maximum time bounds width in blocks
    #[arg(long)]
    max_block_width: Option<String>,

    /// Maximum time bounds width in seconds
    #[arg(long)]
    max_timestamp_width: Option<String>,

    /// Stake requirement in ETH
    #[arg(long)]
    stake_requirement: Option<String>,

    /// Machine hash of the rollup program
    #[arg(long, conflicts_with_all = ["contract", "arbos"])]
    vm_hash: Option<String>,

    /// Compiled .ao program to hash into vmHash
    #[arg(long, value_name = "FILE")]
    contract: Option<PathBuf>,

    /// Use the published ArbOS machine hash
    #[arg(long)]
    arbos: bool,

    /// Report every violated constraint instead of the first one
    #[arg(long)]
    collect_all: bool,
}

impl ParamArgs {
    fn rollup_params(&self) -> anyhow::Result<RollupParams> {
        let mut params = match &self.params {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("reading {}", path.display()))?;
                serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?
            }
            None => self.preset.params(),
        };

        for (field, value) in [
            (RollupField::GracePeriod, &self.grace_period),
            (RollupField::SpeedLimitFactor, &self.speed_limit_factor),
            (RollupField::MaxAssertionSize, &self.max_assertion_size),
            (RollupField::MaxTimeWidth, &self.max_time_width),
            (RollupField::MaxBlockWidth, &self.max_block_width),
            (RollupField::MaxTimestampWidth, &self.max_timestamp_width),
            (RollupField::StakeRequirement, &self.stake_requirement),
            (RollupField::VmHash, &self.vm_hash),
        ] {
            if let Some(value) = value {
                params.set(field, value.clone());
            }
        }

        if let Some(contract) = &self.contract {
            let hash = contract_hash_from_files(&[contract.clone()], &Keccak256Hasher)?;
            params.set(RollupField::VmHash, hash);
        } else if self.arbos {
            params.set(RollupField::VmHash, ARBOS_HASH);
        }

        Ok(params)
    }

    fn validator(&self, mut validator: RollupValidator) -> RollupValidator {
        if self.collect_all {
            validator.policy = ValidationPolicy::CollectAll;
        }
        validator
    }
}

/// Prints user input errors one per line and turns every error into an `anyhow` error.
fn report(error: CreatorError) -> anyhow::Error {
    if let CreatorError::Validation(errors) = &error {
        for e in errors.errors() {
            eprintln!("error[{}]: {}", e.kind(), e);
        }
        return anyhow!("{} invalid rollup parameter(s)", errors.len());
    }
    error.into()
}

fn print_deployment(deployment: &RollupDeployment) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(deployment)?);
    Ok(())
}

async fn run_create(args: &ParamArgs, config: &Config) -> anyhow::Result<()> {
    let params = args.rollup_params()?;
    let provider = config.get_provider()?;
    let rpc = &provider;

    let chain_id = with_retry(
        "eth_chainId",
        || async move {
            rpc.get_chainid()
                .await
                .map_err(|e| CreatorError::RPC(e.to_string()))
        },
        &config.retry,
    )
    .await?
    .as_u64();

    let network = config.networks.network(chain_id)?;
    info!(chain_id, network = %network.name, "connected");

    let validator = args.validator(
        RollupValidator::new(network.constants, config.limits.clone()).with_policy(config.policy),
    );
    let deployment = validator.validate(&params).map_err(report)?;
    print_deployment(&deployment)?;

    let factory_address = config.networks.factory_for(chain_id)?;

    let creation = if config.has_signer() {
        let wallet = config.get_signer(chain_id)?;
        let owner = wallet.address();
        let client = Arc::new(SignerMiddleware::new(provider.clone(), wallet));
        let factory = ArbFactoryClient::new(factory_address, client, chain_id);
        factory.create_rollup(&deployment, owner).await?
    } else {
        let accounts = with_retry(
            "eth_accounts",
            || async move {
                rpc.get_accounts()
                    .await
                    .map_err(|e| CreatorError::RPC(e.to_string()))
            },
            &config.retry,
        )
        .await?;
        let owner = *accounts.get(config.wallet_index).ok_or_else(|| {
            anyhow!(
                "node exposes {} account(s), wallet index {} is out of range",
                accounts.len(),
                config.wallet_index
            )
        })?;
        let factory = ArbFactoryClient::new(factory_address, Arc::new(provider.clone()), chain_id);
        factory.create_rollup(&deployment, owner).await?
    };

    info!(tx_hash = ?creation.tx_hash, "createRollup transaction sent");
    match creation.rollup_address {
        Some(address) => println!("rollup created at {:?}", address),
        None => println!("transaction {:?} mined without a RollupCreated event", creation.tx_hash),
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    if let Some(port) = config.metrics_port {
        Metrics::init(port)?;
        info!(port, "metrics exporter listening");
    }

    match &cli.command {
        Command::Validate(args) => {
            let params = args.rollup_params()?;
            let deployment = args
                .validator(config.validator())
                .validate(&params)
                .map_err(report)?;
            print_deployment(&deployment)
        }
        Command::Create(args) => run_create(args, &config).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_preset_with_overrides() {
        let cli = parse(&[
            "rollup-creator",
            "validate",
            "--preset",
            "local",
            "--grace-period",
            "20",
            "--arbos",
        ]);
        let Command::Validate(args) = cli.command else {
            panic!("expected validate");
        };

        let params = args.rollup_params().unwrap();
        assert_eq!(params.grace_period, "20");
        assert_eq!(params.vm_hash, ARBOS_HASH);
        assert_eq!(params.max_block_width.as_deref(), Some("20"));
    }

    #[test]
    fn test_collect_all_flag() {
        let cli = parse(&["rollup-creator", "validate", "--collect-all"]);
        let Command::Validate(args) = cli.command else {
            panic!("expected validate");
        };
        let validator = args.validator(RollupValidator::default());
        assert_eq!(validator.policy, ValidationPolicy::CollectAll);
    }

    #[test]
    fn test_vm_hash_conflicts_with_contract() {
        let result = Cli::try_parse_from([
            "rollup-creator",
            "validate",
            "--vm-hash",
            "0xabc",
            "--contract",
            "program.ao",
        ]);
        assert!(result.is_err());
    }
}
