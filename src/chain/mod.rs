use ethers::prelude::*;
use std::collections::HashMap;

use crate::error::{CreatorError, Result};
use crate::ticks::NetworkConstants;

pub mod kovan;
pub mod local;

/// A base chain the rollup factory can be reached on.
#[derive(Debug, Clone, PartialEq)]
pub struct Network {
    pub chain_id: u64,
    pub name: String,
    pub rollup_factory: Option<Address>,
    pub constants: NetworkConstants,
}

impl Network {
    pub fn with_rollup_factory(mut self, factory: Address) -> Self {
        self.rollup_factory = Some(factory);
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct NetworkRegistry {
    networks: HashMap<u64, Network>,
}

impl NetworkRegistry {
    /// Registry with every built-in network.
    pub fn builtin() -> Self {
        let mut registry = Self::default();
        registry.insert(kovan::create_kovan_network());
        registry.insert(local::create_local_network());
        registry
    }

    pub fn insert(&mut self, network: Network) {
        self.networks.insert(network.chain_id, network);
    }

    pub fn get(&self, chain_id: u64) -> Option<&Network> {
        self.networks.get(&chain_id)
    }

    pub fn get_mut(&mut self, chain_id: u64) -> Option<&mut Network> {
        self.networks.get_mut(&chain_id)
    }

    /// Applies the same block timing to every registered network.
    pub fn set_constants(&mut self, constants: NetworkConstants) {
        for network in self.networks.values_mut() {
            network.constants = constants;
        }
    }

    pub fn network(&self, chain_id: u64) -> Result<&Network> {
        self.get(chain_id)
            .ok_or_else(|| CreatorError::Config(format!("Unsupported chain id {}", chain_id)))
    }

    /// Address of the rollup factory deployed on `chain_id`.
    pub fn factory_for(&self, chain_id: u64) -> Result<Address> {
        let network = self.network(chain_id)?;
        network.rollup_factory.ok_or_else(|| {
            CreatorError::Config(format!(
                "No rollup factory deployed on {} (chain id {})",
                network.name, chain_id
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registry() {
        let registry = NetworkRegistry::builtin();
        assert_eq!(
            registry.factory_for(42).unwrap(),
            kovan::KOVAN_ROLLUP_FACTORY.parse::<Address>().unwrap()
        );
        // local networks need a configured factory
        assert!(registry.factory_for(local::LOCAL_CHAIN_ID).is_err());
        assert!(registry.network(3).is_err());
    }

    #[test]
    fn test_configured_factory() {
        let mut registry = NetworkRegistry::builtin();
        let factory: Address = "0xd309F6Ba1B53CbDF9c0690eD1316A347eBb7adf9".parse().unwrap();
        if let Some(network) = registry.get_mut(local::LOCAL_CHAIN_ID) {
            network.rollup_factory = Some(factory);
        }
        assert_eq!(registry.factory_for(local::LOCAL_CHAIN_ID).unwrap(), factory);
    }
}
