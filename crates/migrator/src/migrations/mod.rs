//! Migration System
//!
//! Loads changelog files, tracks applied versions in the remote ledger and
//! runs pending changesets.

pub mod definitions;
pub mod ledger;
pub mod loader;
pub mod runner;

pub use definitions::*;
pub use ledger::*;
pub use loader::*;
pub use runner::*;
