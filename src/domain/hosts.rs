use std::collections::HashMap;

use crate::api::topology_dto::HostBindingDto;
use crate::domain::id::{HostId, PortNo, SwitchId};

/// Where a host hangs off the fabric.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub switch: SwitchId,
    pub port: PortNo,

    /// Last IP seen for the host, when the learning path captured one.
    pub ip: Option<String>,
}

/// MAC-to-attachment-point learning table.
///
/// Entries are created the first time a host is observed (or loaded from a
/// static provisioning snapshot) and overwritten when the host shows up at a
/// different attachment point. Entries are never deleted; a host that left
/// the network lingers until process restart.
#[derive(Debug, Default)]
pub struct HostBindings {
    bindings: HashMap<HostId, Attachment>,
}

impl HostBindings {
    pub fn new() -> Self {
        Self { bindings: HashMap::new() }
    }

    /// Records that `host` was observed at (`switch`, `port`).
    ///
    /// A re-observation at the same spot only refreshes the IP; a move is
    /// logged and rebinds the host.
    pub fn learn(&mut self, host: HostId, switch: SwitchId, port: PortNo, ip: Option<String>) {
        match self.bindings.get_mut(&host) {
            Some(existing) if existing.switch == switch && existing.port == port => {
                if ip.is_some() {
                    existing.ip = ip;
                }
            }
            Some(existing) => {
                log::info!("Host {} moved from {}:{} to {}:{}", host, existing.switch, existing.port, switch, port);
                *existing = Attachment { switch, port, ip: ip.or(existing.ip.take()) };
            }
            None => {
                log::info!("Learned host {} at {}:{}", host, switch, port);
                self.bindings.insert(host, Attachment { switch, port, ip });
            }
        }
    }

    /// Loads a static provisioning snapshot, one binding at a time.
    pub fn load(&mut self, bindings: &[HostBindingDto]) {
        for dto in bindings {
            self.learn(HostId::new(dto.host.clone()), SwitchId(dto.switch), PortNo(dto.port), dto.ip.clone());
        }
    }

    pub fn get(&self, host: &HostId) -> Option<&Attachment> {
        self.bindings.get(host)
    }

    pub fn contains(&self, host: &HostId) -> bool {
        self.bindings.contains_key(host)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relearning_at_a_new_attachment_point_rebinds() {
        let mut hosts = HostBindings::new();
        let mac = HostId::new("02:98:a0:f3:45:07");

        hosts.learn(mac.clone(), SwitchId(1), PortNo(1), Some("10.0.0.1".into()));
        hosts.learn(mac.clone(), SwitchId(3), PortNo(2), None);

        let binding = hosts.get(&mac).expect("binding expected");
        assert_eq!(binding.switch, SwitchId(3));
        assert_eq!(binding.port, PortNo(2));
        // The IP survives a move that did not carry one.
        assert_eq!(binding.ip.as_deref(), Some("10.0.0.1"));
    }

    #[test]
    fn reobservation_at_same_spot_refreshes_ip_only() {
        let mut hosts = HostBindings::new();
        let mac = HostId::new("e2:8d:18:27:c8:87");

        hosts.learn(mac.clone(), SwitchId(2), PortNo(4), None);
        hosts.learn(mac.clone(), SwitchId(2), PortNo(4), Some("10.0.0.2".into()));

        let binding = hosts.get(&mac).expect("binding expected");
        assert_eq!(binding.switch, SwitchId(2));
        assert_eq!(binding.ip.as_deref(), Some("10.0.0.2"));
        assert_eq!(hosts.len(), 1);
    }
}
