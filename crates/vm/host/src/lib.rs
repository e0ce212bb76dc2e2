//! # extvm-host - host side of the EVM connector ABI
//!
//! An external interpreter drives execution and calls back into the host
//! for everything that touches state. This crate implements those callbacks
//! on top of an abstract [`ledger::Ledger`], without linking against any
//! concrete state implementation.
//!
//! ```text
//! ┌──────────────┐  extern "C"   ┌──────────────────────────────┐
//! │  Interpreter │ ────────────▶ │ ffi::HostInterface           │
//! └──────────────┘               │   └─▶ host::ExtHost          │
//!        ▲                       │        ├─ storage_write      │
//!        │  OwnedResult /        │        └─ call / create      │
//!        └── HostResult ──────── │             translation      │
//!                                └──────────────┬───────────────┘
//!                                               ▼
//!                                ┌──────────────────────────────┐
//!                                │        ledger::Ledger        │
//!                                └──────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`abi`] | `#[repr(C)]` types shared with the interpreter |
//! | [`context`] | Per-frame execution context |
//! | [`message`] | Safe view over an inbound call/create message |
//! | [`storage_write`] | SSTORE status classification and refunds |
//! | [`output`] | Result buffers handed over to the interpreter |
//! | [`host`] | The callback surface, [`host::ExtHost`] |
//! | [`ffi`] | No-unwind `extern "C"` callback table |
//! | [`ledger`] | The state backend interface and an in-memory ledger |
//! | [`errors`] | `HostError`, `LedgerError` |

pub mod abi;
pub mod context;
pub mod errors;
pub mod ffi;
pub mod host;
pub mod ledger;
pub mod message;
pub mod output;
pub mod storage_write;

pub use context::ExecutionContext;
pub use host::ExtHost;
pub use message::Message;
pub use output::OwnedResult;
