pub mod migrator_config;
pub mod validation;

pub use migrator_config::*;
pub use validation::*;
