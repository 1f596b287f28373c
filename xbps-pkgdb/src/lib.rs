//! The installed-package database: on-disk layout, indexes, and the mutation lock.
#![forbid(unsafe_code)]

mod db;
mod error;
mod lock;
mod record;

pub use db::PkgDB;
pub use error::Error;
pub use lock::LockGuard;
pub use record::{PackageRecord, PackageState};
