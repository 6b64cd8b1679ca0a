//! Configuration models and environment loading.

pub mod env;
pub mod scheduler;

pub use env::{apply_overrides, load, EnvSettings};
pub use scheduler::{ClassConfig, ClaimConfig, ResourceConfig, SchedulerConfig, SecondaryConfig};
