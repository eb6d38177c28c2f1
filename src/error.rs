use thiserror::Error;

use crate::domain::id::{HostId, SwitchId};

#[derive(Debug, Error)]
pub enum Error {
    #[error("File not found or could not be read: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse JSON: {0}")]
    DeserializationError(#[from] serde_json::Error),

    #[error("Host {0} is not bound to any attachment point")]
    UnknownHost(HostId),

    #[error("Switch {0} has no live control session")]
    UnreachableSwitch(SwitchId),

    #[error("No path from {src} to {dst} carrying at least {min_bandwidth} Mbps")]
    NoPathWithCapacity { src: SwitchId, dst: SwitchId, min_bandwidth: u64 },

    #[error("Link {from} -> {to} lost capacity between search and reserve")]
    InsufficientCapacity { from: SwitchId, to: SwitchId },

    #[error("No reservation found for ({0}, {1})")]
    ReservationNotFound(HostId, HostId),

    #[error("Dataplane rejected rule programming, reservation rolled back: {0}")]
    RuleInstallFailure(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

pub type Result<T> = std::result::Result<T, Error>;
