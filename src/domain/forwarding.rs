use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::id::{HostId, PortNo, SwitchId};
use crate::error::Result;

/// One forwarding rule to program into a switch.
///
/// Matches on the (source, destination) host pair; the first hop of a path
/// additionally matches the ingress port of the attached host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowRule {
    pub switch: SwitchId,
    pub match_src: HostId,
    pub match_dst: HostId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_port: Option<PortNo>,
    pub out_port: PortNo,
}

/// The dataplane collaborator programming switches.
///
/// Implementations may block on I/O toward the fabric; the admission engine
/// therefore never calls them while holding its state lock. An `install_rules`
/// failure after a reservation was committed is a fatal inconsistency the
/// caller must surface and roll back.
#[async_trait]
pub trait ForwardingPlane: std::fmt::Debug + Send + Sync {
    async fn install_rules(&self, rules: &[FlowRule]) -> Result<()>;

    async fn remove_rules(&self, rules: &[FlowRule]) -> Result<()>;
}

/// Default plane for running without a switch fabric: logs the command stream
/// and reports success. The actual OpenFlow programming lives outside this
/// engine.
#[derive(Debug, Clone, Default)]
pub struct LogOnlyPlane;

impl LogOnlyPlane {
    pub fn new() -> Self {
        LogOnlyPlane
    }
}

#[async_trait]
impl ForwardingPlane for LogOnlyPlane {
    async fn install_rules(&self, rules: &[FlowRule]) -> Result<()> {
        for rule in rules {
            log::info!(
                "install rule: switch={} match=({} -> {}) in_port={:?} out_port={}",
                rule.switch,
                rule.match_src,
                rule.match_dst,
                rule.in_port,
                rule.out_port
            );
        }
        Ok(())
    }

    async fn remove_rules(&self, rules: &[FlowRule]) -> Result<()> {
        for rule in rules {
            log::info!("remove rule: switch={} match=({} -> {})", rule.switch, rule.match_src, rule.match_dst);
        }
        Ok(())
    }
}
