use crate::{abi::StatusCode, errors::LedgerError};
use bytes::Bytes;
use extvm_common::{Address, H256, U256};

pub mod in_memory;

pub use in_memory::InMemoryLedger;

/// Request for a nested message call.
///
/// `gas` is in/out: the ledger leaves the unspent gas in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallParameters<'a> {
    pub gas: u64,
    pub apparent_value: U256,
    pub value_transfer: U256,
    pub sender_address: Address,
    pub code_address: Address,
    /// Whose storage and balance the code runs against.
    pub receive_address: Address,
    pub data: &'a [u8],
    pub static_call: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateKind {
    Create,
    Create2,
}

/// Request for a nested contract creation.
///
/// `gas` is in/out: the ledger leaves the unspent gas in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateParameters<'a> {
    pub gas: u64,
    pub value: U256,
    pub sender: Address,
    pub init_code: &'a [u8],
    pub kind: CreateKind,
    /// Zero for [`CreateKind::Create`].
    pub salt: H256,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallResult {
    pub status: StatusCode,
    pub output: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateResult {
    pub status: StatusCode,
    /// Revert reason or error data when creation failed.
    pub output: Vec<u8>,
    /// Meaningful only on success.
    pub address: Address,
}

/// Account and storage backend the host delegates to.
///
/// Storage reads and writes go through `store`/`set_store`;
/// `original_storage_value` must answer from a transaction-scoped snapshot,
/// not from anything frame-local.
pub trait Ledger {
    fn exists(&self, address: Address) -> Result<bool, LedgerError>;
    fn store(&self, address: Address, key: H256) -> Result<U256, LedgerError>;
    fn set_store(&mut self, address: Address, key: H256, value: U256)
    -> Result<(), LedgerError>;
    fn original_storage_value(&self, address: Address, key: H256) -> Result<U256, LedgerError>;
    fn balance(&self, address: Address) -> Result<U256, LedgerError>;
    fn code_at(&self, address: Address) -> Result<Bytes, LedgerError>;
    fn code_hash_at(&self, address: Address) -> Result<H256, LedgerError>;
    fn code_size_at(&self, address: Address) -> Result<usize, LedgerError>;
    fn suicide(&mut self, address: Address, beneficiary: Address) -> Result<(), LedgerError>;
    fn log(&mut self, address: Address, topics: Vec<H256>, data: Bytes)
    -> Result<(), LedgerError>;
    fn block_hash(&self, number: i64) -> Result<H256, LedgerError>;
    /// Adds to the transaction's signed refund counter.
    fn add_refund(&mut self, delta: i64);
    fn call(&mut self, params: &mut CallParameters<'_>) -> Result<CallResult, LedgerError>;
    fn create(&mut self, params: &mut CreateParameters<'_>) -> Result<CreateResult, LedgerError>;
}
