use bytes::Bytes;
use extvm_common::{Address, H256, U256, types::EnvInfo};

/// Everything a frame knows about itself. Built once per frame and never
/// modified; the host only hands out shared references to it.
#[derive(Debug, Clone)]
pub struct ExecutionContext<'a> {
    pub env_info: &'a EnvInfo,
    /// Address of the executing account.
    pub my_address: Address,
    pub caller: Address,
    /// Sender of the transaction.
    pub origin: Address,
    pub value: U256,
    pub gas_price: U256,
    pub data: &'a [u8],
    pub code: Bytes,
    pub code_hash: H256,
    pub depth: u32,
    pub is_create: bool,
    pub is_static: bool,
}

impl<'a> ExecutionContext<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        env_info: &'a EnvInfo,
        my_address: Address,
        caller: Address,
        origin: Address,
        value: U256,
        gas_price: U256,
        data: &'a [u8],
        code: Bytes,
        code_hash: H256,
        depth: u32,
        is_create: bool,
        is_static: bool,
    ) -> Self {
        Self {
            env_info,
            my_address,
            caller,
            origin,
            value,
            gas_price,
            data,
            code,
            code_hash,
            depth,
            is_create,
            is_static,
        }
    }
}
