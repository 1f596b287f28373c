//! Builds and sorts transaction plans: the dependency resolver core.
#![forbid(unsafe_code)]

mod builder;
mod error;
mod sorter;
mod types;

pub use builder::{MAX_DEPTH, TransactionBuilder};
pub use error::Error;
pub use sorter::TransactionSorter;
pub use types::{Action, Transaction, TransactionEntry};
