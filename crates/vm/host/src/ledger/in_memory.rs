use super::{CallParameters, CallResult, CreateKind, CreateParameters, CreateResult, Ledger};
use crate::{abi::StatusCode, errors::LedgerError};
use bytes::Bytes;
use extvm_common::{
    Address, H256, U256,
    constants::EMPTY_KECCACK_HASH,
    types::Log,
    utils::{calculate_create_address, calculate_create2_address, keccak},
};
use rustc_hash::FxHashMap;
use tracing::debug;

/// Runs `code` for a call (or init code for a creation) and reports how it
/// went. Stands in for a nested interpreter frame, which reaches state
/// through the ledger it is handed (typically by building its own host on
/// top of it).
///
/// The runner is not re-entered: calls made from inside a runner execute
/// no code.
pub type CodeRunner =
    Box<dyn FnMut(&mut InMemoryLedger, &mut CallParameters<'_>, &[u8]) -> CallResult>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerAccount {
    pub balance: U256,
    pub nonce: u64,
    pub code: Bytes,
    pub code_hash: H256,
    pub storage: FxHashMap<H256, U256>,
}

impl Default for LedgerAccount {
    fn default() -> Self {
        Self {
            balance: U256::zero(),
            nonce: 0,
            code: Bytes::new(),
            code_hash: EMPTY_KECCACK_HASH,
            storage: FxHashMap::default(),
        }
    }
}

impl LedgerAccount {
    pub fn with_balance(balance: U256) -> Self {
        Self {
            balance,
            ..Default::default()
        }
    }

    pub fn with_code(mut self, code: Bytes) -> Self {
        self.code_hash = keccak(&code);
        self.code = code;
        self
    }

    pub fn with_storage(mut self, key: H256, value: U256) -> Self {
        self.storage.insert(key, value);
        self
    }

    /// CREATE would collide with this account.
    pub fn is_occupied(&self) -> bool {
        self.nonce != 0 || !self.code.is_empty()
    }
}

/// Information accumulated during a transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Substate {
    /// Signed running refund counter. May be negative mid-transaction.
    pub refunds: i64,
    pub logs: Vec<Log>,
    /// Destroyed account -> beneficiary.
    pub selfdestructs: FxHashMap<Address, Address>,
}

/// Ledger kept entirely in memory.
#[derive(derive_more::Debug, Default)]
pub struct InMemoryLedger {
    accounts: FxHashMap<Address, LedgerAccount>,
    /// Slot values as of the start of the transaction, recorded on first write.
    original_storage: FxHashMap<(Address, H256), U256>,
    block_hashes: FxHashMap<i64, H256>,
    substate: Substate,
    #[debug(skip)]
    code_runner: Option<CodeRunner>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_code_runner(mut self, runner: CodeRunner) -> Self {
        self.code_runner = Some(runner);
        self
    }

    pub fn insert_account(&mut self, address: Address, account: LedgerAccount) {
        self.accounts.insert(address, account);
    }

    pub fn account(&self, address: Address) -> Option<&LedgerAccount> {
        self.accounts.get(&address)
    }

    pub fn set_block_hash(&mut self, number: i64, hash: H256) {
        self.block_hashes.insert(number, hash);
    }

    pub fn substate(&self) -> &Substate {
        &self.substate
    }

    /// Starts a new transaction: the current storage becomes the original
    /// storage and the substate is reset.
    pub fn begin_transaction(&mut self) {
        self.original_storage.clear();
        self.substate = Substate::default();
    }

    /// Refund to credit at the end of the transaction: the counter floored at
    /// zero and capped at `gas_used / max_refund_quotient`.
    pub fn finalize_refund(&self, gas_used: u64, max_refund_quotient: u64) -> u64 {
        let refunds = u64::try_from(self.substate.refunds).unwrap_or(0);
        refunds.min(gas_used / max_refund_quotient.max(1))
    }

    fn credit(&mut self, address: Address, value: U256) -> Result<(), LedgerError> {
        let account = self.accounts.entry(address).or_default();
        account.balance = account
            .balance
            .checked_add(value)
            .ok_or(LedgerError::BalanceOverflow(address))?;
        Ok(())
    }

    /// Hands `code` to the runner together with the ledger itself. `None`
    /// when no runner is installed or it is already running.
    fn run_code(&mut self, params: &mut CallParameters<'_>, code: &[u8]) -> Option<CallResult> {
        let mut runner = self.code_runner.take()?;
        let result = runner(self, params, code);
        self.code_runner = Some(runner);
        Some(result)
    }

    /// Moves `value` between accounts. `Ok(false)` if `from` cannot afford it.
    fn transfer(&mut self, from: Address, to: Address, value: U256) -> Result<bool, LedgerError> {
        let from_balance = self.balance(from)?;
        if from_balance < value {
            return Ok(false);
        }
        if value.is_zero() || from == to {
            return Ok(true);
        }
        self.accounts.entry(from).or_default().balance = from_balance - value;
        self.credit(to, value)?;
        Ok(true)
    }
}

impl Ledger for InMemoryLedger {
    fn exists(&self, address: Address) -> Result<bool, LedgerError> {
        Ok(self.accounts.contains_key(&address))
    }

    fn store(&self, address: Address, key: H256) -> Result<U256, LedgerError> {
        Ok(self
            .accounts
            .get(&address)
            .and_then(|account| account.storage.get(&key))
            .copied()
            .unwrap_or_default())
    }

    fn set_store(
        &mut self,
        address: Address,
        key: H256,
        value: U256,
    ) -> Result<(), LedgerError> {
        let current = self.store(address, key)?;
        self.original_storage
            .entry((address, key))
            .or_insert(current);

        let storage = &mut self.accounts.entry(address).or_default().storage;
        if value.is_zero() {
            storage.remove(&key);
        } else {
            storage.insert(key, value);
        }
        Ok(())
    }

    fn original_storage_value(&self, address: Address, key: H256) -> Result<U256, LedgerError> {
        match self.original_storage.get(&(address, key)) {
            Some(original) => Ok(*original),
            // Not written during this transaction.
            None => self.store(address, key),
        }
    }

    fn balance(&self, address: Address) -> Result<U256, LedgerError> {
        Ok(self
            .accounts
            .get(&address)
            .map(|account| account.balance)
            .unwrap_or_default())
    }

    fn code_at(&self, address: Address) -> Result<Bytes, LedgerError> {
        Ok(self
            .accounts
            .get(&address)
            .map(|account| account.code.clone())
            .unwrap_or_default())
    }

    fn code_hash_at(&self, address: Address) -> Result<H256, LedgerError> {
        Ok(self
            .accounts
            .get(&address)
            .map(|account| account.code_hash)
            .unwrap_or_default())
    }

    fn code_size_at(&self, address: Address) -> Result<usize, LedgerError> {
        Ok(self
            .accounts
            .get(&address)
            .map(|account| account.code.len())
            .unwrap_or_default())
    }

    fn suicide(&mut self, address: Address, beneficiary: Address) -> Result<(), LedgerError> {
        let balance = self.balance(address)?;
        if beneficiary != address {
            self.credit(beneficiary, balance)?;
            if let Some(account) = self.accounts.get_mut(&address) {
                account.balance = U256::zero();
            }
        }
        self.substate.selfdestructs.insert(address, beneficiary);
        Ok(())
    }

    fn log(&mut self, address: Address, topics: Vec<H256>, data: Bytes) -> Result<(), LedgerError> {
        self.substate.logs.push(Log {
            address,
            topics,
            data,
        });
        Ok(())
    }

    fn block_hash(&self, number: i64) -> Result<H256, LedgerError> {
        Ok(self
            .block_hashes
            .get(&number)
            .copied()
            .unwrap_or_default())
    }

    fn add_refund(&mut self, delta: i64) {
        self.substate.refunds = self.substate.refunds.saturating_add(delta);
    }

    fn call(&mut self, params: &mut CallParameters<'_>) -> Result<CallResult, LedgerError> {
        if !self.transfer(
            params.sender_address,
            params.receive_address,
            params.value_transfer,
        )? {
            debug!(sender = %params.sender_address, value = %params.value_transfer, "Insufficient balance for call");
            return Ok(CallResult {
                status: StatusCode::Failure,
                output: Vec::new(),
            });
        }

        let code = self.code_at(params.code_address)?;
        let result = if code.is_empty() {
            None
        } else {
            self.run_code(params, &code)
        }
        .unwrap_or(CallResult {
            status: StatusCode::Success,
            output: Vec::new(),
        });

        if !result.status.is_success() {
            // Undo the value transfer; the receiver holds at least `value` now.
            self.transfer(
                params.receive_address,
                params.sender_address,
                params.value_transfer,
            )?;
        }
        Ok(result)
    }

    fn create(&mut self, params: &mut CreateParameters<'_>) -> Result<CreateResult, LedgerError> {
        let sender = params.sender;
        if self.balance(sender)? < params.value {
            debug!(%sender, value = %params.value, "Insufficient balance for create");
            return Ok(CreateResult {
                status: StatusCode::Failure,
                output: Vec::new(),
                address: Address::zero(),
            });
        }

        let sender_account = self.accounts.entry(sender).or_default();
        let nonce = sender_account.nonce;
        sender_account.nonce = nonce
            .checked_add(1)
            .ok_or(LedgerError::NonceOverflow(sender))?;

        let address = match params.kind {
            CreateKind::Create => calculate_create_address(sender, nonce),
            CreateKind::Create2 => {
                calculate_create2_address(sender, params.init_code, params.salt)
            }
        };

        if self
            .accounts
            .get(&address)
            .is_some_and(LedgerAccount::is_occupied)
        {
            debug!(%address, "Create collision");
            params.gas = 0;
            return Ok(CreateResult {
                status: StatusCode::Failure,
                output: Vec::new(),
                address: Address::zero(),
            });
        }

        let previous = self.accounts.get(&address).cloned();
        self.accounts.entry(address).or_default().nonce = 1;
        self.transfer(sender, address, params.value)?;

        let mut init_call = CallParameters {
            gas: params.gas,
            apparent_value: params.value,
            value_transfer: params.value,
            sender_address: sender,
            code_address: address,
            receive_address: address,
            data: &[],
            static_call: false,
        };
        let result = if params.init_code.is_empty() {
            None
        } else {
            self.run_code(&mut init_call, params.init_code)
        }
        .unwrap_or(CallResult {
            status: StatusCode::Success,
            output: Vec::new(),
        });
        params.gas = init_call.gas;

        if !result.status.is_success() {
            self.credit(sender, params.value)?;
            match previous {
                Some(account) => self.accounts.insert(address, account),
                None => self.accounts.remove(&address),
            };
            return Ok(CreateResult {
                status: result.status,
                output: result.output,
                address: Address::zero(),
            });
        }

        let deployed = Bytes::from(result.output);
        let account = self.accounts.entry(address).or_default();
        account.code_hash = keccak(&deployed);
        account.code = deployed;
        debug!(%address, code_size = account.code.len(), "Contract created");

        Ok(CreateResult {
            status: StatusCode::Success,
            output: Vec::new(),
            address,
        })
    }
}
