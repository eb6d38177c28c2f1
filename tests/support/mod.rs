#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use flow_allocator::api::topology_dto::{HostBindingDto, LinkDto, ProvisioningDto, TopologySnapshotDto};
use flow_allocator::domain::admission::{AdmissionConfig, AdmissionController};
use flow_allocator::domain::clock::ManualClock;
use flow_allocator::domain::forwarding::{FlowRule, ForwardingPlane};
use flow_allocator::domain::id::HostId;
use flow_allocator::error::{Error, Result};

/// Forwarding plane that records every command instead of programming
/// switches, with a switchable failure mode for rollback tests.
#[derive(Debug, Default)]
pub struct RecordingPlane {
    pub installed: Mutex<Vec<FlowRule>>,
    pub removed: Mutex<Vec<FlowRule>>,
    pub fail_install: AtomicBool,
}

impl RecordingPlane {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next_install(&self, fail: bool) {
        self.fail_install.store(fail, Ordering::SeqCst);
    }

    pub fn installed_rules(&self) -> Vec<FlowRule> {
        self.installed.lock().expect("lock poisoned").clone()
    }

    pub fn removed_rules(&self) -> Vec<FlowRule> {
        self.removed.lock().expect("lock poisoned").clone()
    }
}

#[async_trait]
impl ForwardingPlane for RecordingPlane {
    async fn install_rules(&self, rules: &[FlowRule]) -> Result<()> {
        if self.fail_install.load(Ordering::SeqCst) {
            return Err(Error::RuleInstallFailure("injected dataplane failure".to_string()));
        }
        self.installed.lock().expect("lock poisoned").extend_from_slice(rules);
        Ok(())
    }

    async fn remove_rules(&self, rules: &[FlowRule]) -> Result<()> {
        self.removed.lock().expect("lock poisoned").extend_from_slice(rules);
        Ok(())
    }
}

/// MACs of the four hosts of the diamond fixture, h1 through h4, attached to
/// switches 1 through 4 on port 1.
pub const HOST_MACS: [&str; 4] = ["02:98:a0:f3:45:07", "e2:8d:18:27:c8:87", "16:46:f6:62:b3:ab", "a6:0c:58:e9:86:2d"];

pub fn host(n: usize) -> HostId {
    HostId::new(HOST_MACS[n - 1])
}

fn bidirectional(from: u64, to: u64, capacity: u64) -> [LinkDto; 2] {
    // Inter-switch ports start at 10 so they never collide with host port 1.
    [
        LinkDto { from, to, src_port: 10 + to as u32, dst_port: 10 + from as u32, capacity },
        LinkDto { from: to, to: from, src_port: 10 + from as u32, dst_port: 10 + to as u32, capacity },
    ]
}

/// The diamond topology: 1-2 (5 Mbps), 2-4 (10 Mbps), 1-3 (7 Mbps),
/// 3-4 (5 Mbps), one host per switch.
pub fn diamond_provisioning() -> ProvisioningDto {
    let mut links = Vec::new();
    links.extend(bidirectional(1, 2, 5));
    links.extend(bidirectional(2, 4, 10));
    links.extend(bidirectional(1, 3, 7));
    links.extend(bidirectional(3, 4, 5));

    let hosts = HOST_MACS
        .iter()
        .enumerate()
        .map(|(i, mac)| HostBindingDto { host: mac.to_string(), switch: i as u64 + 1, port: 1, ip: Some(format!("10.0.0.{}", i + 1)) })
        .collect();

    ProvisioningDto { topology: TopologySnapshotDto { nodes: vec![1, 2, 3, 4], links }, hosts }
}

/// A single link 1-2 with the given capacity and `pairs` host pairs: the
/// n-th pair is (host "aa:..:nn" on switch 1, host "bb:..:nn" on switch 2).
pub fn single_link_provisioning(capacity: u64, pairs: usize) -> ProvisioningDto {
    let mut links = Vec::new();
    links.extend(bidirectional(1, 2, capacity));

    let mut hosts = Vec::new();
    for n in 0..pairs {
        hosts.push(HostBindingDto { host: format!("aa:aa:aa:aa:aa:{:02x}", n), switch: 1, port: 2 + n as u32, ip: None });
        hosts.push(HostBindingDto { host: format!("bb:bb:bb:bb:bb:{:02x}", n), switch: 2, port: 2 + n as u32, ip: None });
    }

    ProvisioningDto { topology: TopologySnapshotDto { nodes: vec![1, 2], links }, hosts }
}

pub struct TestEngine {
    pub controller: Arc<AdmissionController>,
    pub clock: Arc<ManualClock>,
    pub plane: Arc<RecordingPlane>,
}

/// Wires an engine against a manual clock (starting at t=100) and a recording
/// plane, provisioned with the given snapshot.
pub fn engine_with(provisioning: &ProvisioningDto) -> TestEngine {
    engine_with_config(provisioning, AdmissionConfig { reservation_ttl: 60, learning_timeout: Duration::from_millis(100) })
}

pub fn engine_with_config(provisioning: &ProvisioningDto, config: AdmissionConfig) -> TestEngine {
    let clock = Arc::new(ManualClock::new(100));
    let plane = Arc::new(RecordingPlane::new());
    let controller = Arc::new(AdmissionController::new(clock.clone(), plane.clone(), config));
    controller.load_provisioning(provisioning);
    TestEngine { controller, clock, plane }
}
