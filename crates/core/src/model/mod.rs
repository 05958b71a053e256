pub mod changeset;
pub mod collection;
pub mod operations;

pub use changeset::*;
pub use collection::*;
pub use operations::*;
