use super::Network;
use crate::ticks::NetworkConstants;

/// Chain id of a local development node.
pub const LOCAL_CHAIN_ID: u64 = 1337;

pub fn create_local_network() -> Network {
    Network {
        chain_id: LOCAL_CHAIN_ID,
        name: "local".to_string(),
        rollup_factory: None,
        constants: NetworkConstants::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::types::Address;

    #[test]
    fn test_local_network() {
        let factory = Address::repeat_byte(0x11);
        let network = create_local_network().with_rollup_factory(factory);
        assert_eq!(network.chain_id, LOCAL_CHAIN_ID);
        assert_eq!(network.rollup_factory, Some(factory));
    }
}
