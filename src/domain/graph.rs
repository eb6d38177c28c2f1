use std::collections::{HashMap, HashSet};

use crate::api::topology_dto::TopologySnapshotDto;
use crate::domain::id::{PortNo, SwitchId};

/// State of one directed link between two switches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkState {
    /// Port the link occupies on the `from` switch (the egress port toward `to`).
    pub src_port: PortNo,

    /// Port the link occupies on the `to` switch.
    pub dst_port: PortNo,

    /// Nominal bandwidth in Mbps. Residuals live in the CapacityLedger, not here.
    pub capacity: u64,
}

/// In-memory directed graph of the switch fabric, built from link-state snapshots.
///
/// The graph only knows structure (which switches exist, which ports connect
/// them, nominal capacities). It is replaced atomically by [`rebuild`] and never
/// mutated otherwise; bandwidth accounting is the CapacityLedger's job.
///
/// [`rebuild`]: TopologyGraph::rebuild
#[derive(Debug, Default)]
pub struct TopologyGraph {
    /// All switches known to the topology feed, including isolated ones.
    nodes: HashSet<SwitchId>,

    /// Directed links, indexed by (from, to) switch pair.
    links: HashMap<(SwitchId, SwitchId), LinkState>,

    /// The adjacency list. Maps a switch to the set of switches it has an outgoing link to.
    adjacency: HashMap<SwitchId, HashSet<SwitchId>>,
}

impl TopologyGraph {
    pub fn new() -> Self {
        Self { nodes: HashSet::new(), links: HashMap::new(), adjacency: HashMap::new() }
    }

    /// Replaces the whole graph from a full link-state snapshot.
    ///
    /// The previous structure is discarded wholesale; partial updates do not
    /// exist. A physical link is expected to appear as two mirrored directed
    /// entries with identical nominal capacity, anything else is logged as an
    /// invalid link-state configuration and kept as-is.
    pub fn rebuild(&mut self, snapshot: &TopologySnapshotDto) {
        self.nodes.clear();
        self.links.clear();
        self.adjacency.clear();

        for node in &snapshot.nodes {
            self.nodes.insert(SwitchId(*node));
        }

        for link in &snapshot.links {
            let from = SwitchId(link.from);
            let to = SwitchId(link.to);

            // The feed occasionally reports links before the switch enumeration
            // catches up. Count the endpoints as nodes either way.
            self.nodes.insert(from);
            self.nodes.insert(to);

            self.links.insert((from, to), LinkState { src_port: PortNo(link.src_port), dst_port: PortNo(link.dst_port), capacity: link.capacity });

            self.adjacency.entry(from).or_insert_with(HashSet::new).insert(to);
        }

        for ((from, to), state) in &self.links {
            match self.links.get(&(*to, *from)) {
                Some(reverse) if reverse.capacity == state.capacity => {}
                Some(reverse) => {
                    log::warn!(
                        "InvalidLinkStateConfiguration: {} -> {} has capacity {} but reverse has {}",
                        from,
                        to,
                        state.capacity,
                        reverse.capacity
                    );
                }
                None => {
                    log::warn!("InvalidLinkStateConfiguration: {} -> {} has no reverse direction", from, to);
                }
            }
        }

        log::info!("Topology rebuilt: {} switches, {} directed links", self.nodes.len(), self.links.len());
    }

    pub fn contains_node(&self, node: SwitchId) -> bool {
        self.nodes.contains(&node)
    }

    /// Switches reachable from `node` over one outgoing link.
    pub fn neighbors(&self, node: SwitchId) -> impl Iterator<Item = SwitchId> + '_ {
        self.adjacency.get(&node).into_iter().flatten().copied()
    }

    pub fn link(&self, from: SwitchId, to: SwitchId) -> Option<&LinkState> {
        self.links.get(&(from, to))
    }

    /// Port on `from` that leads toward `to`, if the two are directly linked.
    pub fn egress_port(&self, from: SwitchId, to: SwitchId) -> Option<PortNo> {
        self.links.get(&(from, to)).map(|link| link.src_port)
    }

    /// All directed links with their state, for ledger re-syncs.
    pub fn links(&self) -> impl Iterator<Item = (&(SwitchId, SwitchId), &LinkState)> {
        self.links.iter()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::topology_dto::LinkDto;

    fn snapshot(links: Vec<(u64, u64, u64)>) -> TopologySnapshotDto {
        let links = links
            .into_iter()
            .map(|(from, to, capacity)| LinkDto { from, to, src_port: 1, dst_port: 2, capacity })
            .collect();
        TopologySnapshotDto { nodes: vec![], links }
    }

    #[test]
    fn rebuild_replaces_structure_atomically() {
        let mut graph = TopologyGraph::new();
        graph.rebuild(&snapshot(vec![(1, 2, 10), (2, 1, 10)]));
        assert_eq!(graph.node_count(), 2);
        assert!(graph.link(SwitchId(1), SwitchId(2)).is_some());

        graph.rebuild(&snapshot(vec![(2, 3, 5), (3, 2, 5)]));
        assert!(graph.link(SwitchId(1), SwitchId(2)).is_none(), "old links must not survive a rebuild");
        assert!(graph.link(SwitchId(2), SwitchId(3)).is_some());
        assert_eq!(graph.egress_port(SwitchId(2), SwitchId(3)), Some(PortNo(1)));
        assert_eq!(graph.egress_port(SwitchId(3), SwitchId(2)), Some(PortNo(1)));
    }

    #[test]
    fn neighbors_follow_directed_links() {
        let mut graph = TopologyGraph::new();
        graph.rebuild(&snapshot(vec![(1, 2, 10), (2, 1, 10), (1, 3, 7), (3, 1, 7)]));

        let mut neighbors: Vec<SwitchId> = graph.neighbors(SwitchId(1)).collect();
        neighbors.sort();
        assert_eq!(neighbors, vec![SwitchId(2), SwitchId(3)]);
        assert_eq!(graph.neighbors(SwitchId(4)).count(), 0);
    }
}
