use crate::api::topology_dto::TopologySnapshotDto;
use crate::domain::id::{HostId, PortNo, SwitchId};

/// Everything the surrounding controller framework can tell the engine.
///
/// Transports and discovery feeds translate their framework-specific
/// notifications into these events; the engine never sees the framework
/// itself.
#[derive(Debug, Clone)]
pub enum NetworkEvent {
    /// Full link-state snapshot from topology discovery.
    TopologyUpdate(TopologySnapshotDto),

    /// The packet-learning path observed `host` entering at (`switch`, `port`).
    HostSeen { host: HostId, switch: SwitchId, port: PortNo, ip: Option<String> },

    /// A control session to `switch` came up.
    SwitchUp(SwitchId),

    /// The control session to `switch` went away.
    SwitchDown(SwitchId),
}

/// Receiver side of the event feed. Transports and discovery adapters hold
/// the engine through this trait, never the concrete type.
pub trait EventHandler: Send + Sync {
    fn handle_event(&self, event: NetworkEvent);
}
