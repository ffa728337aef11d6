use ethers::prelude::*;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::chain::local::LOCAL_CHAIN_ID;
use crate::chain::NetworkRegistry;
use crate::error::{CreatorError, Result};
use crate::retry::RetryConfig;
use crate::ticks::NetworkConstants;
use crate::validate::{RollupValidator, ValidationLimits, ValidationPolicy};

const ENV_PREFIX: &str = "ROLLUP";

/// Private key kept out of `Debug` output.
#[derive(Clone)]
pub struct PrivateKey(String);

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey(<redacted>)")
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub rpc_url: Option<String>,
    pub wallet_index: usize,
    pub constants: NetworkConstants,
    pub limits: ValidationLimits,
    pub policy: ValidationPolicy,
    pub networks: NetworkRegistry,
    pub retry: RetryConfig,
    pub metrics_port: Option<u16>,
    private_key: Option<PrivateKey>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rpc_url: None,
            wallet_index: 0,
            constants: NetworkConstants::default(),
            limits: ValidationLimits::default(),
            policy: ValidationPolicy::default(),
            networks: NetworkRegistry::builtin(),
            retry: RetryConfig::default(),
            metrics_port: None,
            private_key: None,
        }
    }
}

fn var_name(section: &str, key: &str) -> String {
    format!("{}_{}_{}", ENV_PREFIX, section, key)
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from `ROLLUP_<SECTION>_<KEY>` variables resolved by `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |section: &str, key: &str| {
            lookup(&var_name(section, key)).filter(|value| !value.trim().is_empty())
        };

        let mut config = Config::default();
        config.rpc_url = get("RPC", "URL");
        config.wallet_index = parse_or(&get, "WALLET", "INDEX", 0)?;
        config.private_key = get("KEYS", "PRIVATE_KEY").map(PrivateKey);

        let defaults = NetworkConstants::default();
        config.constants = NetworkConstants::new(
            parse_or(&get, "NETWORK", "TICKS_PER_BLOCK", defaults.ticks_per_block())?,
            parse_or(&get, "NETWORK", "SECONDS_PER_BLOCK", defaults.seconds_per_block())?,
            parse_or(&get, "NETWORK", "GAS_PER_SECOND", defaults.gas_per_second())?,
            parse_or(&get, "NETWORK", "GAS_PER_STEP", defaults.gas_per_step())?,
        )?;

        config.policy = match get("VALIDATION", "POLICY").as_deref() {
            None | Some("first-failure") => ValidationPolicy::FirstFailure,
            Some("collect-all") => ValidationPolicy::CollectAll,
            Some(other) => {
                return Err(CreatorError::Config(format!(
                    "Invalid ROLLUP_VALIDATION_POLICY {}, expected first-failure or collect-all",
                    other
                )))
            }
        };

        if let Some(address) = get("CONTRACTS", "FACTORY_ADDRESS") {
            let factory = Address::from_str(&address)
                .map_err(|e| CreatorError::Config(format!("Invalid rollup factory address: {}", e)))?;
            let chain_id = parse_or(&get, "CONTRACTS", "FACTORY_CHAIN_ID", LOCAL_CHAIN_ID)?;
            let network = config.networks.get_mut(chain_id).ok_or_else(|| {
                CreatorError::Config(format!("Unsupported chain id {} for rollup factory", chain_id))
            })?;
            network.rollup_factory = Some(factory);
        }

        config.networks.set_constants(config.constants);

        config.retry.max_attempts =
            parse_or(&get, "RETRY", "MAX_ATTEMPTS", config.retry.max_attempts)?;
        let initial_ms = config.retry.initial_interval.as_millis() as u64;
        let initial_ms = parse_or(&get, "RETRY", "INITIAL_INTERVAL_MS", initial_ms)?;
        config.retry.initial_interval = Duration::from_millis(initial_ms);

        config.metrics_port = match get("METRICS", "PORT") {
            Some(_) => Some(parse_or(&get, "METRICS", "PORT", 0u16)?),
            None => None,
        };

        Ok(config)
    }

    pub fn validator(&self) -> RollupValidator {
        RollupValidator::new(self.constants, self.limits.clone()).with_policy(self.policy)
    }

    pub fn get_rpc_url(&self) -> Result<&str> {
        self.rpc_url
            .as_deref()
            .ok_or_else(|| CreatorError::Config(format!("{} is not set", var_name("RPC", "URL"))))
    }

    pub fn get_provider(&self) -> Result<Provider<Http>> {
        let url = self.get_rpc_url()?;
        Provider::<Http>::try_from(url)
            .map_err(|e| CreatorError::Config(format!("Failed to create provider: {}", e)))
    }

    pub fn has_signer(&self) -> bool {
        self.private_key.is_some()
    }

    pub fn get_signer(&self, chain_id: u64) -> Result<LocalWallet> {
        let key = self.private_key.as_ref().ok_or_else(|| {
            CreatorError::Config(format!("{} is not set", var_name("KEYS", "PRIVATE_KEY")))
        })?;

        let wallet = LocalWallet::from_str(&key.0)
            .map_err(|e| CreatorError::Config(format!("Invalid private key: {}", e)))?;

        Ok(wallet.with_chain_id(chain_id))
    }
}

fn parse_or<G, T>(get: &G, section: &str, key: &str, default: T) -> Result<T>
where
    G: Fn(&str, &str) -> Option<String>,
    T: FromStr,
    T::Err: fmt::Display,
{
    match get(section, key) {
        Some(raw) => raw.trim().parse::<T>().map_err(|e| {
            CreatorError::Config(format!("Invalid {} {:?}: {}", var_name(section, key), raw, e))
        }),
        None => Ok(default),
    }
}
