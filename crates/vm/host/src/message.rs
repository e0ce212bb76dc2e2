use crate::{
    abi::{CallKind, HostMessage, STATIC_FLAG},
    errors::HostError,
};
use extvm_common::{Address, H256, U256};
use std::slice;

/// Borrowed view of an inbound call or create message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Message<'a> {
    pub kind: CallKind,
    pub flags: u32,
    pub depth: i32,
    pub gas: i64,
    pub destination: Address,
    pub sender: Address,
    pub input: &'a [u8],
    pub value: U256,
    /// Only meaningful for [`CallKind::Create2`].
    pub salt: H256,
}

impl<'a> Message<'a> {
    pub fn is_static(&self) -> bool {
        self.flags & STATIC_FLAG != 0
    }

    pub fn is_create(&self) -> bool {
        self.kind.is_create()
    }

    /// Fails with [`HostError::UnknownCallKind`] for a kind outside the ABI.
    ///
    /// # Safety
    ///
    /// `raw.input_data` must be valid for reads of `raw.input_size` bytes for
    /// `'a`, or be null.
    pub unsafe fn from_raw(raw: &'a HostMessage) -> Result<Self, HostError> {
        let kind = CallKind::try_from(raw.kind)?;
        let input = if raw.input_data.is_null() || raw.input_size == 0 {
            &[]
        } else {
            // SAFETY: guaranteed by the caller.
            unsafe { slice::from_raw_parts(raw.input_data, raw.input_size) }
        };
        Ok(Self {
            kind,
            flags: raw.flags,
            depth: raw.depth,
            gas: raw.gas,
            destination: raw.destination.into(),
            sender: raw.sender.into(),
            input,
            value: raw.value.into(),
            salt: raw.create2_salt.into(),
        })
    }
}
