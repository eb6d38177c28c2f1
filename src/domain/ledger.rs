use std::collections::HashMap;

use crate::domain::graph::TopologyGraph;
use crate::domain::id::SwitchId;
use crate::error::{Error, Result};

/// Bandwidth bookkeeping for one directed edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeCapacity {
    /// Nominal bandwidth in Mbps.
    pub capacity: u64,

    /// Bandwidth not currently committed to any active reservation.
    pub residual: u64,
}

impl EdgeCapacity {
    /// Bandwidth currently committed to reservations on this edge.
    pub fn debit(&self) -> u64 {
        self.capacity - self.residual
    }
}

/// Per-edge residual-bandwidth ledger.
///
/// The ledger is the only place residuals are mutated, and only through
/// [`reserve`] and [`release`]. Topology changes re-base it via [`resync`],
/// which preserves the outstanding debit of every surviving edge.
///
/// [`reserve`]: CapacityLedger::reserve
/// [`release`]: CapacityLedger::release
/// [`resync`]: CapacityLedger::resync
#[derive(Debug, Default)]
pub struct CapacityLedger {
    edges: HashMap<(SwitchId, SwitchId), EdgeCapacity>,
}

impl CapacityLedger {
    pub fn new() -> Self {
        Self { edges: HashMap::new() }
    }

    /// Re-bases the ledger onto the current topology after a graph rebuild.
    ///
    /// Edges that continue to exist (matched by switch pair) keep their debit
    /// against the new nominal capacity; brand-new edges start at full
    /// capacity; edges that disappeared are dropped. A dropped edge that still
    /// carried reservations leaves those reservations stale. That is logged
    /// here and left for expiry or an explicit delete to clear.
    pub fn resync(&mut self, graph: &TopologyGraph) {
        let mut next: HashMap<(SwitchId, SwitchId), EdgeCapacity> = HashMap::new();

        for (pair, link) in graph.links() {
            let debit = self.edges.get(pair).map(|edge| edge.debit()).unwrap_or(0);

            if debit > link.capacity {
                log::warn!(
                    "Link {} -> {} shrank below its outstanding reservations ({} Mbps reserved, {} Mbps nominal)",
                    pair.0,
                    pair.1,
                    debit,
                    link.capacity
                );
            }

            next.insert(*pair, EdgeCapacity { capacity: link.capacity, residual: link.capacity.saturating_sub(debit) });
        }

        for (pair, edge) in &self.edges {
            if !next.contains_key(pair) && edge.debit() > 0 {
                log::error!(
                    "Link {} -> {} vanished from the topology with {} Mbps still reserved; its reservations are stale",
                    pair.0,
                    pair.1,
                    edge.debit()
                );
            }
        }

        self.edges = next;
    }

    /// Residual bandwidth of a directed edge, if the edge exists.
    pub fn residual(&self, from: SwitchId, to: SwitchId) -> Option<u64> {
        self.edges.get(&(from, to)).map(|edge| edge.residual)
    }

    pub fn edge(&self, from: SwitchId, to: SwitchId) -> Option<&EdgeCapacity> {
        self.edges.get(&(from, to))
    }

    /// Reserves `bandwidth` Mbps on every hop of `path`, in both directions.
    ///
    /// All-or-nothing: if any edge along the path lacks residual (or no longer
    /// exists), everything already deducted is credited back and the call
    /// fails with `InsufficientCapacity`.
    pub fn reserve(&mut self, path: &[SwitchId], bandwidth: u64) -> Result<()> {
        let mut applied: Vec<(SwitchId, SwitchId)> = Vec::new();

        for hop in path.windows(2) {
            let (from, to) = (hop[0], hop[1]);

            for pair in [(from, to), (to, from)] {
                match self.edges.get_mut(&pair) {
                    Some(edge) if edge.residual >= bandwidth => {
                        edge.residual -= bandwidth;
                        applied.push(pair);
                    }
                    _ => {
                        for undo in applied.drain(..) {
                            // Edges in `applied` were just decremented, the credit cannot overflow.
                            self.edges.get_mut(&undo).expect("edge vanished during rollback").residual += bandwidth;
                        }
                        log::warn!("Reserve of {} Mbps failed at {} -> {}; rolled back", bandwidth, pair.0, pair.1);
                        return Err(Error::InsufficientCapacity { from: pair.0, to: pair.1 });
                    }
                }
            }
        }

        Ok(())
    }

    /// Credits `bandwidth` Mbps back to every hop of `path`, in both directions.
    ///
    /// The residual is clamped at the nominal capacity. Hitting the clamp means
    /// a release without a matching reserve, which is a bookkeeping bug; it is
    /// reported as an error rather than silently absorbed.
    pub fn release(&mut self, path: &[SwitchId], bandwidth: u64) {
        for hop in path.windows(2) {
            let (from, to) = (hop[0], hop[1]);

            for pair in [(from, to), (to, from)] {
                match self.edges.get_mut(&pair) {
                    Some(edge) => {
                        if edge.residual + bandwidth > edge.capacity {
                            log::error!(
                                "Bookkeeping bug: releasing {} Mbps on {} -> {} would exceed nominal capacity ({} residual of {})",
                                bandwidth,
                                pair.0,
                                pair.1,
                                edge.residual,
                                edge.capacity
                            );
                            edge.residual = edge.capacity;
                        } else {
                            edge.residual += bandwidth;
                        }
                    }
                    None => {
                        // The edge was dropped by a topology rebuild while the
                        // reservation was in flight. Nothing left to credit.
                        log::warn!("Release on vanished link {} -> {} ignored", pair.0, pair.1);
                    }
                }
            }
        }
    }
}
