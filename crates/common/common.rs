pub use ethereum_types::*;
pub mod config;
pub mod constants;
pub mod errors;
pub mod types;
pub mod utils;
pub use bytes::Bytes;
