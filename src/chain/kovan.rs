use ethers::prelude::*;

use super::Network;
use crate::ticks::NetworkConstants;

pub const KOVAN_CHAIN_ID: u64 = 42;
pub const KOVAN_ROLLUP_FACTORY: &str = "0xee1250962014364aCf506061E66e78e65b8bCEEC";

pub fn create_kovan_network() -> Network {
    Network {
        chain_id: KOVAN_CHAIN_ID,
        name: "kovan".to_string(),
        rollup_factory: KOVAN_ROLLUP_FACTORY.parse::<Address>().ok(),
        constants: NetworkConstants::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kovan_network() {
        let network = create_kovan_network();
        assert_eq!(network.chain_id, 42);
        assert!(network.rollup_factory.is_some());
        assert_eq!(network.constants.seconds_per_block(), 13);
    }
}
