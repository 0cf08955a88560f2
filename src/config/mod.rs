//! Persistence of settings snapshots

pub mod persistence;

pub use persistence::*;
