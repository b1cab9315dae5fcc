//! Fleet error types.

use protocol::ProtocolError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that stop a worker or prevent the fleet from starting.
#[derive(Debug, Error)]
pub enum FleetError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("Failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Failed to spawn thread {name}: {source}")]
    ThreadSpawn {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Worker thread {0} panicked")]
    WorkerPanicked(String),
}
