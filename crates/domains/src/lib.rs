//! forum-board/crates/domains/src/lib.rs
//!
//! The central domain model and port definitions for forum-board.
//! Nothing in here performs I/O: adapters implement the ports, services
//! orchestrate them.

pub mod errors;
pub mod models;
pub mod ports;
pub mod presets;
pub mod rules;

// Re-exporting for easier access in other crates
pub use errors::*;
pub use models::*;
pub use ports::*;
pub use rules::*;
