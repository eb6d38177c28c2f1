use serde::{Deserialize, Serialize};

/// One directed link of the topology feed.
///
/// A bidirectional physical cable shows up as two `LinkDto` entries with
/// mirrored endpoints and the same nominal capacity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkDto {
    pub from: u64,
    pub to: u64,
    pub src_port: u32,
    pub dst_port: u32,
    /// Nominal bandwidth in Mbps.
    pub capacity: u64,
}

/// Full link-state snapshot as delivered by the topology discovery feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopologySnapshotDto {
    pub nodes: Vec<u64>,
    pub links: Vec<LinkDto>,
}

/// Static host provisioning entry (the runtime learning path produces the
/// same information from observed traffic).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostBindingDto {
    pub host: String,
    pub switch: u64,
    pub port: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
}

/// Startup provisioning file: topology plus any statically known hosts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisioningDto {
    pub topology: TopologySnapshotDto,
    #[serde(default)]
    pub hosts: Vec<HostBindingDto>,
}
