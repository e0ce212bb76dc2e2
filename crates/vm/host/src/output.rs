//! Results handed back to the interpreter.
//!
//! Output produced by the ledger is owned by a `Vec<u8>` allocated on the
//! host side. Instead of copying it into interpreter-owned memory, the
//! vector itself is moved into the reserved storage of the result (the
//! bytes otherwise holding the created address) and a release hook is
//! installed. `output_data`/`output_size` point into the vector's heap
//! buffer, which does not move when the vector does.
//!
//! Whoever holds the result must invoke the hook exactly once, after the
//! last read of the output. [`OwnedResult`] does that on drop; a raw
//! [`HostResult`] obtained from [`OwnedResult::into_raw`] shifts that duty to
//! the foreign side.

use crate::abi::{HostAddress, StatusCode};
use extvm_common::Address;
use std::{fmt, mem::ManuallyDrop, mem::size_of, ptr, slice};

pub type ReleaseFn = unsafe extern "C" fn(result: *const HostResult);

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CreateAddressSlot {
    pub address: HostAddress,
    pub padding: [u8; 4],
}

/// The created address, or an opaque slot owned by the release hook.
#[repr(C)]
#[derive(Clone, Copy)]
pub union ReservedStorage {
    pub create: CreateAddressSlot,
    pub bytes: [u8; 24],
}

const _: () = assert!(
    size_of::<Vec<u8>>() <= size_of::<ReservedStorage>(),
    "Vector is too big"
);

#[repr(C)]
pub struct HostResult {
    pub status_code: StatusCode,
    pub gas_left: i64,
    pub output_data: *const u8,
    pub output_size: usize,
    pub release: Option<ReleaseFn>,
    pub storage: ReservedStorage,
}

impl HostResult {
    fn empty(status_code: StatusCode, gas_left: i64) -> Self {
        Self {
            status_code,
            gas_left,
            output_data: ptr::null(),
            output_size: 0,
            release: None,
            storage: ReservedStorage { bytes: [0; 24] },
        }
    }
}

impl fmt::Debug for HostResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostResult")
            .field("status_code", &self.status_code)
            .field("gas_left", &self.gas_left)
            .field("output_size", &self.output_size)
            .field("has_release", &self.release.is_some())
            .finish()
    }
}

/// Drops the vector placed in the reserved storage by
/// [`OwnedResult::with_output`].
///
/// # Safety
///
/// `result` must come from `with_output` and must not have been released
/// before. The output bytes are dangling afterwards.
unsafe extern "C" fn release_output(result: *const HostResult) {
    // SAFETY: caller guarantees the slot still holds the vector written by
    // `with_output`. The slot is byte-aligned, hence the unaligned read.
    let output = unsafe { ptr::read_unaligned(ptr::addr_of!((*result).storage).cast::<Vec<u8>>()) };
    #[cfg(test)]
    tests::RELEASES.with(|count| count.set(count.get() + 1));
    drop(output);
}

/// A [`HostResult`] whose release hook runs exactly once, when it is dropped.
pub struct OwnedResult {
    raw: HostResult,
}

impl OwnedResult {
    /// Hands `output` over without copying it.
    pub fn with_output(status_code: StatusCode, gas_left: i64, output: Vec<u8>) -> Self {
        let mut raw = HostResult::empty(status_code, gas_left);
        // Point at the heap buffer first; moving the vector below keeps it.
        raw.output_data = output.as_ptr();
        raw.output_size = output.len();
        // SAFETY: the slot is large enough (checked above) and holds no live
        // value. Ownership of `output` moves into it.
        unsafe {
            ptr::write_unaligned(ptr::addr_of_mut!(raw.storage).cast::<Vec<u8>>(), output);
        }
        raw.release = Some(release_output);
        Self { raw }
    }

    pub fn created(gas_left: i64, address: Address) -> Self {
        let mut raw = HostResult::empty(StatusCode::Success, gas_left);
        raw.storage = ReservedStorage {
            create: CreateAddressSlot {
                address: address.into(),
                padding: [0; 4],
            },
        };
        Self { raw }
    }

    pub fn failure(status_code: StatusCode) -> Self {
        Self {
            raw: HostResult::empty(status_code, 0),
        }
    }

    /// Takes ownership of a result produced on the other side of the boundary.
    ///
    /// # Safety
    ///
    /// `output_data` must be valid for `output_size` bytes (or null with a
    /// zero size) until `release` is called, `release` must not have been
    /// called yet, and no other owner may call it.
    pub unsafe fn from_raw(raw: HostResult) -> Self {
        Self { raw }
    }

    /// Gives up ownership. The receiver must call the release hook, if any.
    pub fn into_raw(self) -> HostResult {
        let this = ManuallyDrop::new(self);
        // SAFETY: `this` is never dropped, so the result is moved out once.
        unsafe { ptr::read(&this.raw) }
    }

    pub fn as_raw(&self) -> &HostResult {
        &self.raw
    }

    pub fn status_code(&self) -> StatusCode {
        self.raw.status_code
    }

    pub fn gas_left(&self) -> i64 {
        self.raw.gas_left
    }

    pub fn output(&self) -> &[u8] {
        if self.raw.output_data.is_null() || self.raw.output_size == 0 {
            return &[];
        }
        // SAFETY: valid until release, which only happens in `drop`.
        unsafe { slice::from_raw_parts(self.raw.output_data, self.raw.output_size) }
    }

    /// The created address of a successful create.
    ///
    /// A result with a release hook is read as owning its reserved storage,
    /// so `None` is returned for it even on success. Results adopted through
    /// [`OwnedResult::from_raw`] that keep their own data elsewhere must
    /// leave `release` unset for the address to be visible.
    pub fn create_address(&self) -> Option<Address> {
        if self.raw.release.is_some() || !self.raw.status_code.is_success() {
            return None;
        }
        // SAFETY: without a release hook the slot holds plain address bytes.
        let slot = unsafe { self.raw.storage.create };
        Some(slot.address.into())
    }

    /// Runs the release hook. Equivalent to dropping the result.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for OwnedResult {
    fn drop(&mut self) {
        if let Some(release) = self.raw.release.take() {
            // SAFETY: the hook was taken out, so it cannot run twice.
            unsafe { release(&self.raw) };
        }
    }
}

impl fmt::Debug for OwnedResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OwnedResult")
            .field("status_code", &self.status_code())
            .field("gas_left", &self.gas_left())
            .field("output", &self.output())
            .field("create_address", &self.create_address())
            .finish()
    }
}
