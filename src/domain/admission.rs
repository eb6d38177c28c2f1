use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::{Instant, timeout_at};

use crate::api::reservation_dto::ReservationViewDto;
use crate::api::topology_dto::ProvisioningDto;
use crate::domain::clock::Clock;
use crate::domain::events::{EventHandler, NetworkEvent};
use crate::domain::forwarding::{FlowRule, ForwardingPlane};
use crate::domain::graph::TopologyGraph;
use crate::domain::hosts::{Attachment, HostBindings};
use crate::domain::id::{HostId, PortNo, SwitchId};
use crate::domain::ledger::CapacityLedger;
use crate::domain::path_finder;
use crate::domain::reservation::{FlowKey, Reservation, ReservationTable};
use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct AdmissionConfig {
    /// Lifetime of an admitted reservation, in seconds.
    pub reservation_ttl: i64,

    /// How long an allocate waits for both endpoints to be learned before
    /// giving up with `UnknownHost`.
    pub learning_timeout: Duration,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self { reservation_ttl: 60, learning_timeout: Duration::from_secs(3) }
    }
}

/// What a successful allocate hands back to the caller.
#[derive(Debug, Clone)]
pub struct AdmissionOutcome {
    pub path: Vec<SwitchId>,
    pub bottleneck: u64,
}

/// Everything mutable the engine owns, guarded by one lock.
///
/// Admission correctness depends on path search and the matching reserve
/// happening under a single critical section; splitting these structures
/// across locks would reopen the double-admission race.
#[derive(Debug, Default)]
struct CoreState {
    graph: TopologyGraph,
    ledger: CapacityLedger,
    reservations: ReservationTable,
    hosts: HostBindings,

    /// Switches with a live control session. An attachment switch outside
    /// this set cannot be programmed and fails admission.
    live_switches: HashSet<SwitchId>,
}

/// The admission and path-allocation engine.
///
/// Owns topology, capacity and reservation state behind a single mutex and
/// orchestrates allocate/delete/expire/query against the forwarding-plane
/// collaborator. Dataplane calls are always issued after the state lock is
/// released; a slow switch never stalls unrelated admission decisions.
pub struct AdmissionController {
    state: Mutex<CoreState>,

    /// Signalled by every `HostSeen` event so pending allocates can re-check
    /// their endpoints instead of synthesizing fake traffic.
    host_learned: Notify,

    clock: Arc<dyn Clock>,
    plane: Arc<dyn ForwardingPlane>,
    config: AdmissionConfig,
}

impl std::fmt::Debug for AdmissionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdmissionController").field("config", &self.config).finish_non_exhaustive()
    }
}

impl AdmissionController {
    pub fn new(clock: Arc<dyn Clock>, plane: Arc<dyn ForwardingPlane>, config: AdmissionConfig) -> Self {
        Self { state: Mutex::new(CoreState::default()), host_learned: Notify::new(), clock, plane, config }
    }

    /// Loads a static provisioning snapshot: topology, host bindings, and the
    /// assumption that every provisioned switch is reachable. The runtime
    /// feeds (`TopologyUpdate`, `HostSeen`, `SwitchUp`/`SwitchDown`) overwrite
    /// all of this as real state arrives.
    pub fn load_provisioning(&self, dto: &ProvisioningDto) {
        let mut state = self.state.lock().expect("lock poisoned");
        state.graph.rebuild(&dto.topology);

        let graph_nodes: Vec<SwitchId> = dto.topology.nodes.iter().map(|n| SwitchId(*n)).collect();
        state.live_switches.extend(graph_nodes);
        for link in &dto.topology.links {
            state.live_switches.insert(SwitchId(link.from));
            state.live_switches.insert(SwitchId(link.to));
        }

        let CoreState { graph, ledger, hosts, .. } = &mut *state;
        ledger.resync(graph);
        hosts.load(&dto.hosts);

        log::info!("Provisioning loaded: {} switches, {} links, {} hosts", state.graph.node_count(), state.graph.link_count(), state.hosts.len());
        drop(state);

        self.host_learned.notify_waiters();
    }

    /// Admits a bandwidth-guaranteed flow between two hosts.
    ///
    /// Waits (bounded) for both endpoints to be learned, then, in one critical
    /// section: expires stale reservations, releases any previous reservation
    /// for the same host pair, finds the widest feasible path and reserves it.
    /// Forwarding rules are programmed after the lock is dropped; if the
    /// dataplane rejects them the reservation is rolled back and the failure
    /// surfaced as `RuleInstallFailure`.
    pub async fn allocate(&self, src: HostId, dst: HostId, bandwidth: u64) -> Result<AdmissionOutcome> {
        if bandwidth == 0 {
            return Err(Error::InvalidRequest("bandwidth must be a positive Mbps value".to_string()));
        }
        if src == dst {
            return Err(Error::InvalidRequest("source and destination host must differ".to_string()));
        }

        log::info!("Allocating flow: src={}, dst={}, bandwidth={} Mbps", src, dst, bandwidth);

        self.wait_until_learned(&src, &dst).await?;

        let key = FlowKey::new(&src, &dst);
        let now = self.clock.now_in_s();

        let (stale_rules, admitted) = self.admit_locked(&src, &dst, bandwidth, &key, now);

        // Rules of expired or displaced reservations come out regardless of
        // whether this admission went through.
        self.remove_rules_best_effort(&stale_rules).await;

        let (outcome, rules) = admitted?;

        if let Err(e) = self.plane.install_rules(&rules).await {
            log::error!("Dataplane rejected rules for {}; rolling the reservation back: {}", key, e);

            {
                let mut state = self.state.lock().expect("lock poisoned");
                if let Some(reservation) = state.reservations.delete(&key) {
                    state.ledger.release(&reservation.path, reservation.bandwidth);
                }
            }
            self.remove_rules_best_effort(&rules).await;

            return Err(Error::RuleInstallFailure(e.to_string()));
        }

        log::info!("Flow allocated: {} via {:?}, bottleneck {} Mbps", key, outcome.path, outcome.bottleneck);
        Ok(outcome)
    }

    /// The admission critical section: lazy expiry, release-before-insert,
    /// path search and reserve all happen under one lock acquisition, so no
    /// concurrent request can observe capacity between our search and our
    /// reserve.
    ///
    /// # Returns
    /// Returns the rules of expired/displaced reservations (to tear down
    /// outside the lock) alongside the admission result.
    fn admit_locked(
        &self,
        src: &HostId,
        dst: &HostId,
        bandwidth: u64,
        key: &FlowKey,
        now: i64,
    ) -> (Vec<FlowRule>, Result<(AdmissionOutcome, Vec<FlowRule>)>) {
        let mut stale_rules: Vec<FlowRule> = Vec::new();
        let mut state = self.state.lock().expect("lock poisoned");

        for expired in state.reservations.remove_expired(now) {
            log::info!("Reservation {} expired during allocate", expired.key());
            state.ledger.release(&expired.path, expired.bandwidth);
            stale_rules.extend(expired.rules);
        }

        let (src_at, dst_at) = match (state.hosts.get(src).cloned(), state.hosts.get(dst).cloned()) {
            (Some(src_at), Some(dst_at)) => (src_at, dst_at),
            (None, _) => return (stale_rules, Err(Error::UnknownHost(src.clone()))),
            (_, None) => return (stale_rules, Err(Error::UnknownHost(dst.clone()))),
        };

        for attachment in [&src_at, &dst_at] {
            if !state.live_switches.contains(&attachment.switch) {
                return (stale_rules, Err(Error::UnreachableSwitch(attachment.switch)));
            }
        }

        // Release-before-insert: a second allocate for the same pair must not
        // leak the first reservation's bandwidth.
        if let Some(previous) = state.reservations.delete(key) {
            log::info!("Replacing existing reservation {} ({} Mbps)", key, previous.bandwidth);
            state.ledger.release(&previous.path, previous.bandwidth);
            stale_rules.extend(previous.rules);
        }

        let Some((path, bottleneck)) = path_finder::widest_path(&state.graph, &state.ledger, src_at.switch, dst_at.switch, bandwidth) else {
            return (stale_rules, Err(Error::NoPathWithCapacity { src: src_at.switch, dst: dst_at.switch, min_bandwidth: bandwidth }));
        };

        if let Err(e) = state.ledger.reserve(&path, bandwidth) {
            return (stale_rules, Err(e));
        }

        let rules = match compile_rules(&state.graph, &path, src, dst, &src_at, &dst_at) {
            Ok(rules) => rules,
            Err(e) => {
                state.ledger.release(&path, bandwidth);
                return (stale_rules, Err(e));
            }
        };

        state.reservations.insert(Reservation {
            src: src.clone(),
            dst: dst.clone(),
            path: path.clone(),
            bandwidth,
            created_at: now,
            ttl: self.config.reservation_ttl,
            rules: rules.clone(),
        });

        (stale_rules, Ok((AdmissionOutcome { path, bottleneck }, rules)))
    }

    /// Tears down the reservation for a host pair.
    pub async fn delete(&self, src: HostId, dst: HostId) -> Result<()> {
        let key = FlowKey::new(&src, &dst);
        let now = self.clock.now_in_s();

        let (stale_rules, removed) = {
            let mut state = self.state.lock().expect("lock poisoned");

            let mut stale_rules: Vec<FlowRule> = Vec::new();
            for expired in state.reservations.remove_expired(now) {
                log::info!("Reservation {} expired during delete", expired.key());
                state.ledger.release(&expired.path, expired.bandwidth);
                stale_rules.extend(expired.rules);
            }

            let removed = state.reservations.delete(&key);
            if let Some(reservation) = &removed {
                state.ledger.release(&reservation.path, reservation.bandwidth);
            }

            (stale_rules, removed)
        };

        self.remove_rules_best_effort(&stale_rules).await;

        let reservation = removed.ok_or(Error::ReservationNotFound(src, dst))?;
        self.plane.remove_rules(&reservation.rules).await?;

        log::info!("Flow deleted: {} ({} Mbps released)", key, reservation.bandwidth);
        Ok(())
    }

    /// Releases every reservation past its TTL, exactly as a delete would.
    ///
    /// # Returns
    /// Returns the number of reservations released.
    pub async fn expire_sweep(&self) -> usize {
        let now = self.clock.now_in_s();

        let expired = {
            let mut state = self.state.lock().expect("lock poisoned");
            let expired = state.reservations.remove_expired(now);
            for reservation in &expired {
                state.ledger.release(&reservation.path, reservation.bandwidth);
            }
            expired
        };

        for reservation in &expired {
            log::info!("Reservation {} expired after {} s", reservation.key(), reservation.ttl);
            self.remove_rules_best_effort(&reservation.rules).await;
        }

        expired.len()
    }

    /// Read-only snapshot of the active reservations. Entries past their TTL
    /// are filtered out but not released; releasing is the sweep's job.
    pub fn query(&self) -> Vec<ReservationViewDto> {
        let now = self.clock.now_in_s();
        let state = self.state.lock().expect("lock poisoned");

        let mut views: Vec<ReservationViewDto> = state.reservations.iter().filter(|r| !r.is_expired(now)).map(|r| ReservationViewDto::from_reservation(r, now)).collect();
        views.sort_by(|a, b| (&a.src, &a.dst).cmp(&(&b.src, &b.dst)));
        views
    }

    /// Residual bandwidth of a directed edge, mainly for tests and debugging.
    pub fn residual(&self, from: SwitchId, to: SwitchId) -> Option<u64> {
        self.state.lock().expect("lock poisoned").ledger.residual(from, to)
    }

    /// Blocks until both hosts appear in the learning table, bounded by the
    /// configured learning timeout.
    async fn wait_until_learned(&self, src: &HostId, dst: &HostId) -> Result<()> {
        let deadline = Instant::now() + self.config.learning_timeout;

        loop {
            let notified = self.host_learned.notified();
            tokio::pin!(notified);
            // Register before checking, so a learning event landing between
            // the check and the await is not lost.
            notified.as_mut().enable();

            let missing = {
                let state = self.state.lock().expect("lock poisoned");
                if !state.hosts.contains(src) {
                    Some(src.clone())
                } else if !state.hosts.contains(dst) {
                    Some(dst.clone())
                } else {
                    None
                }
            };

            let Some(missing) = missing else {
                return Ok(());
            };

            if timeout_at(deadline, notified).await.is_err() {
                log::warn!("Host {} was not learned within {:?}", missing, self.config.learning_timeout);
                return Err(Error::UnknownHost(missing));
            }
        }
    }

    async fn remove_rules_best_effort(&self, rules: &[FlowRule]) {
        if rules.is_empty() {
            return;
        }
        if let Err(e) = self.plane.remove_rules(rules).await {
            // Leftover rules are an inconsistency, not a reason to fail the
            // current request. The next admission for the pair reprograms them.
            log::error!("Failed to remove {} stale rules: {}", rules.len(), e);
        }
    }
}

impl EventHandler for AdmissionController {
    fn handle_event(&self, event: NetworkEvent) {
        match event {
            NetworkEvent::TopologyUpdate(snapshot) => {
                let mut state = self.state.lock().expect("lock poisoned");
                state.graph.rebuild(&snapshot);
                let CoreState { graph, ledger, .. } = &mut *state;
                ledger.resync(graph);
            }
            NetworkEvent::HostSeen { host, switch, port, ip } => {
                {
                    let mut state = self.state.lock().expect("lock poisoned");
                    state.hosts.learn(host, switch, port, ip);
                }
                self.host_learned.notify_waiters();
            }
            NetworkEvent::SwitchUp(switch) => {
                let mut state = self.state.lock().expect("lock poisoned");
                if state.live_switches.insert(switch) {
                    log::info!("Switch connected: dpid={}", switch);
                }
            }
            NetworkEvent::SwitchDown(switch) => {
                let mut state = self.state.lock().expect("lock poisoned");
                if state.live_switches.remove(&switch) {
                    log::info!("Switch disconnected: dpid={}", switch);
                }
            }
        }
    }
}

/// Compiles the per-hop rules for a path, forward and mirrored reverse.
///
/// The first hop of each direction matches the ingress port of the sending
/// host; the last hop outputs to the receiving host's attachment port; every
/// other hop outputs toward the next switch on the path.
fn compile_rules(graph: &TopologyGraph, path: &[SwitchId], src: &HostId, dst: &HostId, src_at: &Attachment, dst_at: &Attachment) -> Result<Vec<FlowRule>> {
    let mut rules = Vec::with_capacity(path.len() * 2);

    compile_direction(graph, path, src, dst, src_at.port, dst_at.port, &mut rules)?;

    let reversed: Vec<SwitchId> = path.iter().rev().copied().collect();
    compile_direction(graph, &reversed, dst, src, dst_at.port, src_at.port, &mut rules)?;

    Ok(rules)
}

fn compile_direction(
    graph: &TopologyGraph,
    path: &[SwitchId],
    match_src: &HostId,
    match_dst: &HostId,
    ingress: PortNo,
    egress: PortNo,
    rules: &mut Vec<FlowRule>,
) -> Result<()> {
    let last = path.len() - 1;

    for (i, switch) in path.iter().enumerate() {
        let out_port = if i == last {
            egress
        } else {
            graph
                .egress_port(*switch, path[i + 1])
                .ok_or_else(|| Error::RuleInstallFailure(format!("no egress port from {} toward {}", switch, path[i + 1])))?
        };

        rules.push(FlowRule {
            switch: *switch,
            match_src: match_src.clone(),
            match_dst: match_dst.clone(),
            in_port: (i == 0).then_some(ingress),
            out_port,
        });
    }

    Ok(())
}
