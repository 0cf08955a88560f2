//! Data models for the ModConf settings framework

pub mod definition;
pub mod group;
pub mod property;
pub mod session;
pub mod sort;
pub mod undo_redo;
pub mod value;
pub mod version;

pub use definition::*;
pub use group::*;
pub use property::*;
pub use session::*;
pub use sort::*;
pub use undo_redo::*;
pub use value::*;
pub use version::*;
