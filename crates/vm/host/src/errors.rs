use crate::abi::StatusCode;
use extvm_common::Address;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("Nonce overflow for account {0:#x}")]
    NonceOverflow(Address),
    #[error("Balance overflow for account {0:#x}")]
    BalanceOverflow(Address),
    #[error("Ledger error: {0}")]
    Custom(String),
}

/// Errors raised by host callbacks before they reach the boundary.
///
/// Address and gas mismatches mean the interpreter broke the calling
/// contract; they are reported, never repaired.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    #[error("Callback address {supplied:#x} does not match frame address {expected:#x}")]
    AddressMismatch { supplied: Address, expected: Address },
    #[error("Invalid gas value {0}")]
    NegativeGas(i64),
    #[error("Unknown call kind {0}")]
    UnknownCallKind(i32),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl HostError {
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            HostError::AddressMismatch { .. }
                | HostError::NegativeGas(_)
                | HostError::UnknownCallKind(_)
        )
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            HostError::UnknownCallKind(_) => StatusCode::Rejected,
            _ => StatusCode::InternalError,
        }
    }
}
