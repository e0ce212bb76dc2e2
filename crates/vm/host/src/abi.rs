//! Binary types shared with the interpreter.
//!
//! Everything here is `#[repr(C)]` and mirrors the connector ABI. The host's
//! own `Address` and `H256` must be layout-compatible with their ABI
//! counterparts so that arrays of them can be reinterpreted in place.

use crate::errors::HostError;
use extvm_common::{Address, H256, U256};
use std::mem::{align_of, size_of};
use strum::Display;

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct HostAddress {
    pub bytes: [u8; 20],
}

/// Big-endian 256-bit word.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct HostBytes32 {
    pub bytes: [u8; 32],
}

const _: () = {
    assert!(
        size_of::<Address>() == size_of::<HostAddress>(),
        "Address types size mismatch"
    );
    assert!(
        align_of::<Address>() == align_of::<HostAddress>(),
        "Address types alignment mismatch"
    );
    assert!(
        size_of::<H256>() == size_of::<HostBytes32>(),
        "Hash types size mismatch"
    );
    assert!(
        align_of::<H256>() == align_of::<HostBytes32>(),
        "Hash types alignment mismatch"
    );
};

impl From<Address> for HostAddress {
    fn from(address: Address) -> Self {
        Self { bytes: address.0 }
    }
}

impl From<HostAddress> for Address {
    fn from(address: HostAddress) -> Self {
        Address::from(address.bytes)
    }
}

impl From<H256> for HostBytes32 {
    fn from(hash: H256) -> Self {
        Self { bytes: hash.0 }
    }
}

impl From<HostBytes32> for H256 {
    fn from(word: HostBytes32) -> Self {
        H256(word.bytes)
    }
}

impl From<U256> for HostBytes32 {
    fn from(value: U256) -> Self {
        Self {
            bytes: value.to_big_endian(),
        }
    }
}

impl From<HostBytes32> for U256 {
    fn from(word: HostBytes32) -> Self {
        U256::from_big_endian(&word.bytes)
    }
}

/// Outcome of an execution as reported across the boundary.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum StatusCode {
    Success = 0,
    Failure = 1,
    Revert = 2,
    OutOfGas = 3,
    InvalidInstruction = 4,
    UndefinedInstruction = 5,
    StackOverflow = 6,
    StackUnderflow = 7,
    BadJumpDestination = 8,
    InvalidMemoryAccess = 9,
    CallDepthExceeded = 10,
    StaticModeViolation = 11,
    PrecompileFailure = 12,
    ContractValidationFailure = 13,
    ArgumentOutOfRange = 14,
    InternalError = -1,
    Rejected = -2,
    OutOfMemory = -3,
}

impl StatusCode {
    pub fn is_success(self) -> bool {
        self == StatusCode::Success
    }
}

/// Effect of a storage write on the slot, relative to the transaction.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum StorageStatus {
    /// The value was not changed.
    Unchanged = 0,
    /// First change of a non-zero slot to another non-zero value.
    Modified = 1,
    /// The slot had already been changed earlier in the transaction.
    ModifiedAgain = 2,
    /// A zero slot was set to a non-zero value.
    Added = 3,
    /// A non-zero slot was set to zero.
    Deleted = 4,
}

#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum CallKind {
    Call = 0,
    DelegateCall = 1,
    CallCode = 2,
    Create = 3,
    Create2 = 4,
}

impl CallKind {
    pub fn is_create(self) -> bool {
        matches!(self, CallKind::Create | CallKind::Create2)
    }
}

impl TryFrom<i32> for CallKind {
    type Error = HostError;

    fn try_from(kind: i32) -> Result<Self, Self::Error> {
        match kind {
            0 => Ok(CallKind::Call),
            1 => Ok(CallKind::DelegateCall),
            2 => Ok(CallKind::CallCode),
            3 => Ok(CallKind::Create),
            4 => Ok(CallKind::Create2),
            other => Err(HostError::UnknownCallKind(other)),
        }
    }
}

/// Set in [`HostMessage::flags`] for calls executed in static mode.
pub const STATIC_FLAG: u32 = 1;

/// Inbound call or create message.
///
/// `kind` stays a raw discriminant until [`CallKind::try_from`] checks it.
/// `input_data` must point to `input_size` readable bytes, or be null when
/// `input_size` is zero.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct HostMessage {
    pub kind: i32,
    pub flags: u32,
    pub depth: i32,
    pub gas: i64,
    pub destination: HostAddress,
    pub sender: HostAddress,
    pub input_data: *const u8,
    pub input_size: usize,
    pub value: HostBytes32,
    pub create2_salt: HostBytes32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TxContext {
    pub tx_gas_price: HostBytes32,
    pub tx_origin: HostAddress,
    pub block_coinbase: HostAddress,
    pub block_number: i64,
    pub block_timestamp: i64,
    pub block_gas_limit: i64,
    pub block_difficulty: HostBytes32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn words_are_big_endian() {
        let word = HostBytes32::from(U256::from(0xabcdu64));
        assert_eq!(word.bytes[30..], [0xab, 0xcd]);
        assert!(word.bytes[..30].iter().all(|b| *b == 0));
        assert_eq!(U256::from(word), U256::from(0xabcdu64));
    }

    #[test]
    fn address_round_trips_through_abi() {
        let address = Address::from(hex!("00000000000000000000000000000000deadbeef"));
        let abi = HostAddress::from(address);
        assert_eq!(abi.bytes[16..], hex!("deadbeef"));
        assert_eq!(Address::from(abi), address);
    }

    #[test]
    fn abi_discriminants() {
        assert_eq!(StatusCode::InternalError as i32, -1);
        assert_eq!(StorageStatus::Deleted as i32, 4);
        assert_eq!(CallKind::Create2 as i32, 4);
        assert!(CallKind::Create.is_create());
        assert!(!CallKind::DelegateCall.is_create());
    }

    #[test]
    fn call_kind_from_raw_discriminant() {
        for kind in [
            CallKind::Call,
            CallKind::DelegateCall,
            CallKind::CallCode,
            CallKind::Create,
            CallKind::Create2,
        ] {
            assert_eq!(CallKind::try_from(kind as i32), Ok(kind));
        }
        assert_eq!(CallKind::try_from(5), Err(HostError::UnknownCallKind(5)));
        assert_eq!(CallKind::try_from(-1), Err(HostError::UnknownCallKind(-1)));
    }
}
