//! Container and provider services

pub mod container;
pub mod provider;

pub use container::*;
pub use provider::*;
