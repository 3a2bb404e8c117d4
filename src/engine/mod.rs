//! Transfer Engine module
//!
//! The algorithmic core: request validation, atomic mutation with
//! conflict retry, and stable result shaping.

mod outcome;
mod transfer;

pub use outcome::{ErrorKind, TransferFailure, TransferRequest, TransferResult};
pub use transfer::{RetryPolicy, TransferEngine};
