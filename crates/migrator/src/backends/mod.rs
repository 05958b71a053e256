//! Remote backend implementations

pub mod memory;

pub use memory::*;
