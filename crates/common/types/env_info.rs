use ethereum_types::{Address, U256};
use serde::{Deserialize, Serialize};

/// Block-level environment shared by every frame of a transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvInfo {
    pub author: Address,
    pub number: i64,
    pub timestamp: i64,
    pub gas_limit: U256,
    pub difficulty: U256,
}
