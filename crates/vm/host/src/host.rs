//! # Host callbacks
//!
//! [`ExtHost`] answers the interpreter's callbacks for one frame:
//!   - account queries (`account_exists`, `get_balance`, `get_code_*`,
//!     `copy_code`)
//!   - storage (`get_storage`, `set_storage`)
//!   - side effects (`selfdestruct`, `emit_log`)
//!   - environment (`get_tx_context`, `get_block_hash`)
//!   - nested messages (`call`, covering CREATE and CREATE2 too)
//!
//! Callbacks that act on the frame's own account receive its address from
//! the interpreter and verify it.

use crate::{
    abi::{CallKind, StatusCode, StorageStatus, TxContext},
    context::ExecutionContext,
    errors::HostError,
    ledger::{CallParameters, CreateKind, CreateParameters, Ledger},
    message::Message,
    output::OwnedResult,
    storage_write::classify,
};
use bytes::Bytes;
use extvm_common::{Address, H256, U256, types::HostSchedule};
use tracing::{debug, error, trace, warn};

pub struct ExtHost<'a, L: Ledger> {
    context: ExecutionContext<'a>,
    ledger: &'a mut L,
    schedule: &'a HostSchedule,
}

impl<'a, L: Ledger> ExtHost<'a, L> {
    pub fn new(context: ExecutionContext<'a>, ledger: &'a mut L, schedule: &'a HostSchedule) -> Self {
        Self {
            context,
            ledger,
            schedule,
        }
    }

    pub fn context(&self) -> &ExecutionContext<'a> {
        &self.context
    }

    pub fn schedule(&self) -> &HostSchedule {
        self.schedule
    }

    pub fn ledger(&self) -> &L {
        &*self.ledger
    }

    fn ensure_own_address(&self, supplied: Address) -> Result<(), HostError> {
        let expected = self.context.my_address;
        if supplied != expected {
            warn!(%supplied, %expected, "Callback address does not match frame");
            return Err(HostError::AddressMismatch { supplied, expected });
        }
        Ok(())
    }

    pub fn account_exists(&self, address: Address) -> Result<bool, HostError> {
        Ok(self.ledger.exists(address)?)
    }

    pub fn get_storage(&self, address: Address, key: H256) -> Result<U256, HostError> {
        self.ensure_own_address(address)?;
        Ok(self.ledger.store(address, key)?)
    }

    /// Writes a slot and meters the refund for it.
    pub fn set_storage(
        &mut self,
        address: Address,
        key: H256,
        new_value: U256,
    ) -> Result<StorageStatus, HostError> {
        self.ensure_own_address(address)?;
        let current_value = self.ledger.store(address, key)?;
        let original_value = self.ledger.original_storage_value(address, key)?;

        let write = classify(new_value, current_value, original_value, self.schedule);
        trace!(
            %key,
            %current_value,
            %new_value,
            %original_value,
            status = %write.status,
            refund_delta = write.refund_delta,
            "SSTORE"
        );
        if write.refund_delta != 0 {
            self.ledger.add_refund(write.refund_delta);
        }
        self.ledger.set_store(address, key, new_value)?;
        Ok(write.status)
    }

    pub fn get_balance(&self, address: Address) -> Result<U256, HostError> {
        Ok(self.ledger.balance(address)?)
    }

    pub fn get_code_size(&self, address: Address) -> Result<usize, HostError> {
        Ok(self.ledger.code_size_at(address)?)
    }

    pub fn get_code_hash(&self, address: Address) -> Result<H256, HostError> {
        Ok(self.ledger.code_hash_at(address)?)
    }

    /// Copies code of `address` starting at `code_offset` into `buffer`.
    /// Returns the number of bytes copied.
    pub fn copy_code(
        &self,
        address: Address,
        code_offset: usize,
        buffer: &mut [u8],
    ) -> Result<usize, HostError> {
        let code = self.ledger.code_at(address)?;
        let Some(remaining) = code.get(code_offset..) else {
            return Ok(0);
        };
        let count = remaining.len().min(buffer.len());
        buffer[..count].copy_from_slice(&remaining[..count]);
        Ok(count)
    }

    pub fn selfdestruct(&mut self, address: Address, beneficiary: Address) -> Result<(), HostError> {
        self.ensure_own_address(address)?;
        debug!(%address, %beneficiary, "SELFDESTRUCT");
        Ok(self.ledger.suicide(address, beneficiary)?)
    }

    pub fn emit_log(&mut self, address: Address, data: &[u8], topics: &[H256]) -> Result<(), HostError> {
        self.ensure_own_address(address)?;
        trace!(%address, topics = topics.len(), data_len = data.len(), "LOG");
        Ok(self
            .ledger
            .log(address, topics.to_vec(), Bytes::copy_from_slice(data))?)
    }

    pub fn get_tx_context(&self) -> TxContext {
        let env = self.context.env_info;
        let gas_limit = env.gas_limit.min(U256::from(i64::MAX)).low_u64();
        TxContext {
            tx_gas_price: self.context.gas_price.into(),
            tx_origin: self.context.origin.into(),
            block_coinbase: env.author.into(),
            block_number: env.number,
            block_timestamp: env.timestamp,
            block_gas_limit: i64::try_from(gas_limit).unwrap_or(i64::MAX),
            block_difficulty: env.difficulty.into(),
        }
    }

    pub fn get_block_hash(&self, number: i64) -> Result<H256, HostError> {
        Ok(self.ledger.block_hash(number)?)
    }

    /// Dispatches a nested message. Never fails: errors become a result
    /// with [`StatusCode::InternalError`].
    pub fn call(&mut self, message: &Message<'_>) -> OwnedResult {
        match self.try_call(message) {
            Ok(result) => result,
            Err(err) => {
                if err.is_contract_violation() {
                    warn!(%err, kind = %message.kind, "Rejected nested message");
                } else {
                    error!(%err, kind = %message.kind, "Nested message failed");
                }
                OwnedResult::failure(err.status_code())
            }
        }
    }

    fn try_call(&mut self, message: &Message<'_>) -> Result<OwnedResult, HostError> {
        let gas = u64::try_from(message.gas).map_err(|_| HostError::NegativeGas(message.gas))?;

        if message.is_create() {
            return self.create(message, gas);
        }

        let mut params = CallParameters {
            gas,
            apparent_value: message.value,
            value_transfer: if message.kind == CallKind::DelegateCall {
                U256::zero()
            } else {
                message.value
            },
            sender_address: message.sender,
            code_address: message.destination,
            // CALLCODE and DELEGATECALL run foreign code against our own account.
            receive_address: if message.kind == CallKind::Call {
                message.destination
            } else {
                self.context.my_address
            },
            data: message.input,
            static_call: message.is_static(),
        };

        debug!(
            kind = %message.kind,
            code_address = %params.code_address,
            receive_address = %params.receive_address,
            gas,
            "Dispatching call"
        );
        let result = self.ledger.call(&mut params)?;

        // Output is handed over whatever the status; a revert reason is output too.
        Ok(OwnedResult::with_output(
            result.status,
            gas_left(params.gas, message.gas),
            result.output,
        ))
    }

    fn create(&mut self, message: &Message<'_>, gas: u64) -> Result<OwnedResult, HostError> {
        // The ledger creates on behalf of this frame.
        self.ensure_own_address(message.sender)?;

        let kind = match message.kind {
            CallKind::Create2 => CreateKind::Create2,
            _ => CreateKind::Create,
        };
        let mut params = CreateParameters {
            gas,
            value: message.value,
            sender: self.context.my_address,
            init_code: message.input,
            kind,
            salt: match kind {
                CreateKind::Create2 => message.salt,
                CreateKind::Create => H256::zero(),
            },
        };

        debug!(?kind, value = %params.value, gas, init_code_len = params.init_code.len(), "Dispatching create");
        let result = self.ledger.create(&mut params)?;
        let gas_left = gas_left(params.gas, message.gas);

        if result.status == StatusCode::Success {
            Ok(OwnedResult::created(gas_left, result.address))
        } else {
            Ok(OwnedResult::with_output(result.status, gas_left, result.output))
        }
    }
}

/// Gas the ledger left over, bounded by what was given to it.
fn gas_left(remaining: u64, given: i64) -> i64 {
    i64::try_from(remaining).map_or(given, |remaining| remaining.min(given))
}
