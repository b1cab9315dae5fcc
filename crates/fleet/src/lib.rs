//! Tank arena agent fleet library.

pub mod ai;
pub mod config;
pub mod connection;
pub mod error;
pub mod fleet;
pub mod geometry;
pub mod sweeper;
pub mod world;

// Re-export commonly used types
pub use config::Config;
pub use connection::Connection;
pub use error::FleetError;
pub use fleet::{Fleet, StopHandle};
pub use world::{PickupKind, SharedWorld, World};
