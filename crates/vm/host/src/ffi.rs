//! `extern "C"` entry points handed to the interpreter.
//!
//! Every entry receives an opaque [`HostContext`] pointer that must point at
//! a live [`ExtHost`] for the matching ledger type. Entries never unwind:
//! errors and panics are logged and turned into a neutral answer.
//!
//! | Callback | Neutral answer |
//! |----------|----------------|
//! | `account_exists` | `false` |
//! | `get_storage`, `get_balance`, `get_code_hash`, `get_block_hash` | zero word |
//! | `set_storage` | [`StorageStatus::Unchanged`] |
//! | `get_code_size`, `copy_code` | `0` |
//! | `call` | result with [`StatusCode::InternalError`] |
//! | `get_tx_context` | all-zero context |
//! | `selfdestruct`, `emit_log` | nothing |

use crate::{
    abi::{HostAddress, HostBytes32, HostMessage, StatusCode, StorageStatus, TxContext},
    errors::HostError,
    host::ExtHost,
    ledger::Ledger,
    message::Message,
    output::{HostResult, OwnedResult},
};
use extvm_common::{H256, U256};
use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
    slice,
};
use tracing::{error, warn};

/// Opaque handle to an [`ExtHost`].
#[repr(C)]
pub struct HostContext {
    _private: [u8; 0],
}

pub type AccountExistsFn =
    unsafe extern "C" fn(context: *mut HostContext, address: *const HostAddress) -> bool;
pub type GetStorageFn = unsafe extern "C" fn(
    context: *mut HostContext,
    address: *const HostAddress,
    key: *const HostBytes32,
) -> HostBytes32;
pub type SetStorageFn = unsafe extern "C" fn(
    context: *mut HostContext,
    address: *const HostAddress,
    key: *const HostBytes32,
    value: *const HostBytes32,
) -> StorageStatus;
pub type GetBalanceFn =
    unsafe extern "C" fn(context: *mut HostContext, address: *const HostAddress) -> HostBytes32;
pub type GetCodeSizeFn =
    unsafe extern "C" fn(context: *mut HostContext, address: *const HostAddress) -> usize;
pub type GetCodeHashFn =
    unsafe extern "C" fn(context: *mut HostContext, address: *const HostAddress) -> HostBytes32;
pub type CopyCodeFn = unsafe extern "C" fn(
    context: *mut HostContext,
    address: *const HostAddress,
    code_offset: usize,
    buffer_data: *mut u8,
    buffer_size: usize,
) -> usize;
pub type SelfdestructFn = unsafe extern "C" fn(
    context: *mut HostContext,
    address: *const HostAddress,
    beneficiary: *const HostAddress,
);
pub type CallFn =
    unsafe extern "C" fn(context: *mut HostContext, message: *const HostMessage) -> HostResult;
pub type GetTxContextFn = unsafe extern "C" fn(context: *mut HostContext) -> TxContext;
pub type GetBlockHashFn =
    unsafe extern "C" fn(context: *mut HostContext, number: i64) -> HostBytes32;
pub type EmitLogFn = unsafe extern "C" fn(
    context: *mut HostContext,
    address: *const HostAddress,
    data: *const u8,
    data_size: usize,
    topics: *const HostBytes32,
    topics_count: usize,
);

/// Callback table in the order the interpreter expects it.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct HostInterface {
    pub account_exists: AccountExistsFn,
    pub get_storage: GetStorageFn,
    pub set_storage: SetStorageFn,
    pub get_balance: GetBalanceFn,
    pub get_code_size: GetCodeSizeFn,
    pub get_code_hash: GetCodeHashFn,
    pub copy_code: CopyCodeFn,
    pub selfdestruct: SelfdestructFn,
    pub call: CallFn,
    pub get_tx_context: GetTxContextFn,
    pub get_block_hash: GetBlockHashFn,
    pub emit_log: EmitLogFn,
}

/// Builds the callback table for hosts backed by `L`.
pub fn host_interface<L: Ledger>() -> HostInterface {
    HostInterface {
        account_exists: account_exists::<L>,
        get_storage: get_storage::<L>,
        set_storage: set_storage::<L>,
        get_balance: get_balance::<L>,
        get_code_size: get_code_size::<L>,
        get_code_hash: get_code_hash::<L>,
        copy_code: copy_code::<L>,
        selfdestruct: selfdestruct::<L>,
        call: call::<L>,
        get_tx_context: get_tx_context::<L>,
        get_block_hash: get_block_hash::<L>,
        emit_log: emit_log::<L>,
    }
}

/// The handle to pass along with [`host_interface`]. Valid while `host` is
/// neither moved nor dropped.
pub fn context_ptr<L: Ledger>(host: &mut ExtHost<'_, L>) -> *mut HostContext {
    (host as *mut ExtHost<'_, L>).cast()
}

/// # Safety
///
/// `context` must come from [`context_ptr`] for the same `L`, and the host
/// must not be borrowed elsewhere for `'h`.
unsafe fn host<'h, 'a, L: Ledger>(context: *mut HostContext) -> &'h mut ExtHost<'a, L> {
    // SAFETY: guaranteed by the caller.
    unsafe { &mut *context.cast::<ExtHost<'a, L>>() }
}

/// # Safety
///
/// `data` must be valid for reads of `len` elements, or be null.
unsafe fn raw_slice<'s, T>(data: *const T, len: usize) -> &'s [T] {
    if data.is_null() || len == 0 {
        return &[];
    }
    // SAFETY: guaranteed by the caller.
    unsafe { slice::from_raw_parts(data, len) }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}

/// Runs `body`, answering `fallback` if it fails or panics.
fn boundary<T>(
    callback: &'static str,
    fallback: T,
    body: impl FnOnce() -> Result<T, HostError>,
) -> T {
    match panic::catch_unwind(AssertUnwindSafe(body)) {
        Ok(Ok(value)) => value,
        Ok(Err(err)) => {
            if err.is_contract_violation() {
                warn!(callback, %err, "Host callback rejected");
            } else {
                error!(callback, %err, "Host callback failed");
            }
            fallback
        }
        Err(payload) => {
            error!(
                callback,
                panic = panic_message(&*payload),
                "Host callback panicked"
            );
            fallback
        }
    }
}

unsafe extern "C" fn account_exists<L: Ledger>(
    context: *mut HostContext,
    address: *const HostAddress,
) -> bool {
    boundary("account_exists", false, || {
        // SAFETY: the interpreter passes the context it was given and a
        // valid address.
        let (host, address) = unsafe { (host::<L>(context), *address) };
        host.account_exists(address.into())
    })
}

unsafe extern "C" fn get_storage<L: Ledger>(
    context: *mut HostContext,
    address: *const HostAddress,
    key: *const HostBytes32,
) -> HostBytes32 {
    boundary("get_storage", HostBytes32::default(), || {
        // SAFETY: see `account_exists`.
        let (host, address, key) = unsafe { (host::<L>(context), *address, *key) };
        Ok(host.get_storage(address.into(), key.into())?.into())
    })
}

unsafe extern "C" fn set_storage<L: Ledger>(
    context: *mut HostContext,
    address: *const HostAddress,
    key: *const HostBytes32,
    value: *const HostBytes32,
) -> StorageStatus {
    boundary("set_storage", StorageStatus::Unchanged, || {
        // SAFETY: see `account_exists`.
        let (host, address, key, value) =
            unsafe { (host::<L>(context), *address, *key, *value) };
        host.set_storage(address.into(), key.into(), U256::from(value))
    })
}

unsafe extern "C" fn get_balance<L: Ledger>(
    context: *mut HostContext,
    address: *const HostAddress,
) -> HostBytes32 {
    boundary("get_balance", HostBytes32::default(), || {
        // SAFETY: see `account_exists`.
        let (host, address) = unsafe { (host::<L>(context), *address) };
        Ok(host.get_balance(address.into())?.into())
    })
}

unsafe extern "C" fn get_code_size<L: Ledger>(
    context: *mut HostContext,
    address: *const HostAddress,
) -> usize {
    boundary("get_code_size", 0, || {
        // SAFETY: see `account_exists`.
        let (host, address) = unsafe { (host::<L>(context), *address) };
        host.get_code_size(address.into())
    })
}

unsafe extern "C" fn get_code_hash<L: Ledger>(
    context: *mut HostContext,
    address: *const HostAddress,
) -> HostBytes32 {
    boundary("get_code_hash", HostBytes32::default(), || {
        // SAFETY: see `account_exists`.
        let (host, address) = unsafe { (host::<L>(context), *address) };
        Ok(host.get_code_hash(address.into())?.into())
    })
}

unsafe extern "C" fn copy_code<L: Ledger>(
    context: *mut HostContext,
    address: *const HostAddress,
    code_offset: usize,
    buffer_data: *mut u8,
    buffer_size: usize,
) -> usize {
    boundary("copy_code", 0, || {
        // SAFETY: see `account_exists`.
        let (host, address) = unsafe { (host::<L>(context), *address) };
        if buffer_data.is_null() || buffer_size == 0 {
            return Ok(0);
        }
        // SAFETY: the interpreter owns `buffer_size` writable bytes at
        // `buffer_data` for the duration of the callback.
        let buffer = unsafe { slice::from_raw_parts_mut(buffer_data, buffer_size) };
        host.copy_code(address.into(), code_offset, buffer)
    })
}

unsafe extern "C" fn selfdestruct<L: Ledger>(
    context: *mut HostContext,
    address: *const HostAddress,
    beneficiary: *const HostAddress,
) {
    boundary("selfdestruct", (), || {
        // SAFETY: see `account_exists`.
        let (host, address, beneficiary) =
            unsafe { (host::<L>(context), *address, *beneficiary) };
        host.selfdestruct(address.into(), beneficiary.into())
    })
}

unsafe extern "C" fn call<L: Ledger>(
    context: *mut HostContext,
    message: *const HostMessage,
) -> HostResult {
    boundary(
        "call",
        OwnedResult::failure(StatusCode::InternalError).into_raw(),
        || {
            // SAFETY: the interpreter passes a valid message whose input
            // outlives the callback.
            let (host, message) = unsafe { (host::<L>(context), Message::from_raw(&*message)) };
            let result = match message {
                Ok(message) => host.call(&message),
                Err(err) => {
                    warn!(callback = "call", %err, "Malformed message");
                    OwnedResult::failure(err.status_code())
                }
            };
            Ok(result.into_raw())
        },
    )
}

unsafe extern "C" fn get_tx_context<L: Ledger>(context: *mut HostContext) -> TxContext {
    boundary("get_tx_context", TxContext::default(), || {
        // SAFETY: see `account_exists`.
        let host = unsafe { host::<L>(context) };
        Ok(host.get_tx_context())
    })
}

unsafe extern "C" fn get_block_hash<L: Ledger>(
    context: *mut HostContext,
    number: i64,
) -> HostBytes32 {
    boundary("get_block_hash", HostBytes32::default(), || {
        // SAFETY: see `account_exists`.
        let host = unsafe { host::<L>(context) };
        Ok(host.get_block_hash(number)?.into())
    })
}

unsafe extern "C" fn emit_log<L: Ledger>(
    context: *mut HostContext,
    address: *const HostAddress,
    data: *const u8,
    data_size: usize,
    topics: *const HostBytes32,
    topics_count: usize,
) {
    boundary("emit_log", (), || {
        // SAFETY: see `account_exists`. Data and topics are valid for their
        // sizes, and `H256` has the layout of `HostBytes32` (asserted in
        // `abi`), so the topics are read in place.
        let (host, address, data, topics) = unsafe {
            (
                host::<L>(context),
                *address,
                raw_slice(data, data_size),
                raw_slice(topics.cast::<H256>(), topics_count),
            )
        };
        host.emit_log(address.into(), data, topics)
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::{
        abi::{CallKind, STATIC_FLAG},
        context::ExecutionContext,
        errors::LedgerError,
        ledger::{
            CallParameters, CallResult, CreateParameters, CreateResult, InMemoryLedger,
            in_memory::LedgerAccount,
        },
    };
    use bytes::Bytes;
    use extvm_common::{
        Address, H160,
        types::{CONSTANTINOPLE_SCHEDULE, EnvInfo},
    };

    /// Fails every request by panicking.
    struct PanickingLedger;

    impl Ledger for PanickingLedger {
        fn exists(&self, _: Address) -> Result<bool, LedgerError> {
            panic!("exists")
        }
        fn store(&self, _: Address, _: H256) -> Result<U256, LedgerError> {
            panic!("store")
        }
        fn set_store(&mut self, _: Address, _: H256, _: U256) -> Result<(), LedgerError> {
            panic!("set_store")
        }
        fn original_storage_value(&self, _: Address, _: H256) -> Result<U256, LedgerError> {
            panic!("original_storage_value")
        }
        fn balance(&self, _: Address) -> Result<U256, LedgerError> {
            panic!("balance")
        }
        fn code_at(&self, _: Address) -> Result<Bytes, LedgerError> {
            panic!("code_at")
        }
        fn code_hash_at(&self, _: Address) -> Result<H256, LedgerError> {
            panic!("code_hash_at")
        }
        fn code_size_at(&self, _: Address) -> Result<usize, LedgerError> {
            panic!("code_size_at")
        }
        fn suicide(&mut self, _: Address, _: Address) -> Result<(), LedgerError> {
            panic!("suicide")
        }
        fn log(&mut self, _: Address, _: Vec<H256>, _: Bytes) -> Result<(), LedgerError> {
            panic!("log")
        }
        fn block_hash(&self, _: i64) -> Result<H256, LedgerError> {
            panic!("block_hash")
        }
        fn add_refund(&mut self, _: i64) {
            panic!("add_refund")
        }
        fn call(&mut self, _: &mut CallParameters<'_>) -> Result<CallResult, LedgerError> {
            panic!("call")
        }
        fn create(&mut self, _: &mut CreateParameters<'_>) -> Result<CreateResult, LedgerError> {
            panic!("create")
        }
    }

    const ME: Address = H160([0x0a; 20]);

    fn context(env_info: &EnvInfo) -> ExecutionContext<'_> {
        ExecutionContext::new(
            env_info,
            ME,
            Address::repeat_byte(0x0c),
            Address::repeat_byte(0x0c),
            U256::zero(),
            U256::from(1),
            &[],
            Bytes::new(),
            H256::zero(),
            0,
            false,
            false,
        )
    }

    fn message(kind: CallKind, gas: i64) -> HostMessage {
        HostMessage {
            kind: kind as i32,
            flags: STATIC_FLAG,
            depth: 1,
            gas,
            destination: Address::repeat_byte(0x0b).into(),
            sender: ME.into(),
            input_data: std::ptr::null(),
            input_size: 0,
            value: HostBytes32::default(),
            create2_salt: HostBytes32::default(),
        }
    }

    #[test]
    fn panics_become_neutral_answers() {
        let env_info = EnvInfo::default();
        let mut ledger = PanickingLedger;
        let mut host = ExtHost::new(context(&env_info), &mut ledger, &CONSTANTINOPLE_SCHEDULE);
        let ctx = context_ptr(&mut host);
        let table = host_interface::<PanickingLedger>();
        let me = HostAddress::from(ME);
        let key = HostBytes32::default();
        let one = HostBytes32::from(U256::one());

        // SAFETY: `ctx` points at a live host for `PanickingLedger`.
        unsafe {
            assert!(!(table.account_exists)(ctx, &me));
            assert_eq!((table.get_storage)(ctx, &me, &key), HostBytes32::default());
            assert_eq!(
                (table.set_storage)(ctx, &me, &key, &one),
                StorageStatus::Unchanged
            );
            assert_eq!((table.get_balance)(ctx, &me), HostBytes32::default());
            assert_eq!((table.get_code_size)(ctx, &me), 0);
            assert_eq!((table.get_block_hash)(ctx, 1), HostBytes32::default());
            (table.selfdestruct)(ctx, &me, &me);
            (table.emit_log)(ctx, &me, std::ptr::null(), 0, std::ptr::null(), 0);

            let result = OwnedResult::from_raw((table.call)(ctx, &message(CallKind::Call, 100)));
            assert_eq!(result.status_code(), StatusCode::InternalError);
            assert!(result.output().is_empty());
        }
    }

    #[test]
    fn contract_violations_become_neutral_answers() {
        let env_info = EnvInfo::default();
        let mut ledger = InMemoryLedger::new();
        let mut host = ExtHost::new(context(&env_info), &mut ledger, &CONSTANTINOPLE_SCHEDULE);
        let ctx = context_ptr(&mut host);
        let table = host_interface::<InMemoryLedger>();
        let stranger = HostAddress::from(Address::repeat_byte(0xee));
        let one = HostBytes32::from(U256::one());

        // SAFETY: `ctx` points at a live host for `InMemoryLedger`.
        unsafe {
            assert_eq!(
                (table.set_storage)(ctx, &stranger, &one, &one),
                StorageStatus::Unchanged
            );
            let result = OwnedResult::from_raw((table.call)(ctx, &message(CallKind::Call, -1)));
            assert_eq!(result.status_code(), StatusCode::InternalError);

            let mut malformed = message(CallKind::Call, 100);
            malformed.kind = 42;
            let result = OwnedResult::from_raw((table.call)(ctx, &malformed));
            assert_eq!(result.status_code(), StatusCode::Rejected);
        }
        assert!(host.ledger().account(Address::repeat_byte(0xee)).is_none());
    }

    #[test]
    fn table_reaches_the_host() {
        let env_info = EnvInfo {
            number: 12,
            ..Default::default()
        };
        let mut ledger = InMemoryLedger::new();
        ledger.insert_account(
            ME,
            LedgerAccount::with_balance(U256::from(10))
                .with_code(Bytes::from_static(&[0x60, 0x01, 0x60, 0x02])),
        );
        let mut host = ExtHost::new(context(&env_info), &mut ledger, &CONSTANTINOPLE_SCHEDULE);
        let ctx = context_ptr(&mut host);
        let table = host_interface::<InMemoryLedger>();
        let me = HostAddress::from(ME);
        let key = HostBytes32::from(U256::from(1));
        let value = HostBytes32::from(U256::from(0x2a));
        let topics = [HostBytes32 { bytes: [0x11; 32] }, HostBytes32 { bytes: [0x22; 32] }];
        let data = [0xca, 0xfe];
        let mut buffer = [0u8; 8];

        // SAFETY: `ctx` points at a live host for `InMemoryLedger`; every
        // pointer below is valid for its size.
        unsafe {
            assert!((table.account_exists)(ctx, &me));
            assert_eq!((table.set_storage)(ctx, &me, &key, &value), StorageStatus::Added);
            assert_eq!((table.get_storage)(ctx, &me, &key), value);
            assert_eq!(U256::from((table.get_balance)(ctx, &me)), U256::from(10));
            assert_eq!((table.get_code_size)(ctx, &me), 4);
            assert_eq!(
                (table.copy_code)(ctx, &me, 1, buffer.as_mut_ptr(), buffer.len()),
                3
            );
            assert_eq!((table.get_tx_context)(ctx).block_number, 12);
            (table.emit_log)(
                ctx,
                &me,
                data.as_ptr(),
                data.len(),
                topics.as_ptr(),
                topics.len(),
            );

            let raw = (table.call)(ctx, &message(CallKind::Call, 100));
            assert_eq!(raw.status_code, StatusCode::Success);
            let release = raw.release.unwrap();
            release(&raw);
        }
        assert_eq!(buffer[..3], [0x01, 0x60, 0x02]);

        let log = &host.ledger().substate().logs[0];
        assert_eq!(log.data.as_ref(), &data);
        assert_eq!(log.topics, vec![H256::repeat_byte(0x11), H256::repeat_byte(0x22)]);
    }
}
