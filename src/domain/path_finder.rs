use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

use crate::domain::graph::TopologyGraph;
use crate::domain::id::SwitchId;
use crate::domain::ledger::CapacityLedger;

/// Bottleneck value of a path with no constraining edge (the single-node path).
pub const UNCONSTRAINED: u64 = u64::MAX;

/// Search frontier entry: the best known bottleneck for reaching `node`.
#[derive(Debug, PartialEq, Eq)]
struct Candidate {
    bottleneck: u64,
    node: SwitchId,
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        // Max-heap on bottleneck; ties resolve toward the lower switch id so
        // results are reproducible.
        self.bottleneck.cmp(&other.bottleneck).then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Finds the path from `src` to `dst` maximizing the minimum residual
/// bandwidth along it, subject to that minimum being at least `min_bandwidth`.
///
/// This is Dijkstra with the relaxation `min(path_bottleneck, edge_residual)`
/// in place of summed weights. Candidates that cannot carry `min_bandwidth`
/// are pruned instead of explored; the result is the same as filtering
/// afterwards because a pruned prefix can never widen again. The first time
/// `dst` is popped its bottleneck is maximal, by the usual Dijkstra argument:
/// popped bottlenecks are monotonically non-increasing.
///
/// Ties resolve toward the lower switch id, both in heap pop order and when
/// two equally wide routes reach a node (the lower predecessor id wins), so
/// the chosen path is stable across runs.
///
/// The residuals read here must be a consistent snapshot. The caller is
/// responsible for holding the search and the matching reserve in one
/// critical section.
///
/// # Returns
/// Returns `Some((path, bottleneck))` with a simple path of switch ids, or
/// `None` if no path meets the bandwidth floor. `src == dst` yields the
/// single-node path with [`UNCONSTRAINED`] bottleneck.
pub fn widest_path(
    graph: &TopologyGraph,
    ledger: &CapacityLedger,
    src: SwitchId,
    dst: SwitchId,
    min_bandwidth: u64,
) -> Option<(Vec<SwitchId>, u64)> {
    if !graph.contains_node(src) || !graph.contains_node(dst) {
        return None;
    }

    let mut best: HashMap<SwitchId, u64> = HashMap::new();
    let mut prev: HashMap<SwitchId, SwitchId> = HashMap::new();
    let mut done: HashSet<SwitchId> = HashSet::new();
    let mut frontier: BinaryHeap<Candidate> = BinaryHeap::new();

    best.insert(src, UNCONSTRAINED);
    frontier.push(Candidate { bottleneck: UNCONSTRAINED, node: src });

    while let Some(Candidate { bottleneck, node }) = frontier.pop() {
        if !done.insert(node) {
            continue; // Stale heap entry, a wider route to `node` was settled already.
        }

        if node == dst {
            return Some((reconstruct(&prev, src, dst), bottleneck));
        }

        for neighbor in graph.neighbors(node) {
            if done.contains(&neighbor) {
                continue;
            }

            let Some(residual) = ledger.residual(node, neighbor) else {
                continue; // Ledger not yet synced for this link.
            };

            let candidate_bottleneck = bottleneck.min(residual);

            if candidate_bottleneck < min_bandwidth {
                continue;
            }

            match best.get(&neighbor).copied() {
                Some(known) if candidate_bottleneck < known => {}
                Some(known) if candidate_bottleneck == known => {
                    // Equally wide routes keep the lower predecessor id, so the
                    // chosen path does not depend on map iteration order.
                    if prev.get(&neighbor).is_some_and(|p| node < *p) {
                        prev.insert(neighbor, node);
                    }
                }
                _ => {
                    best.insert(neighbor, candidate_bottleneck);
                    prev.insert(neighbor, node);
                    frontier.push(Candidate { bottleneck: candidate_bottleneck, node: neighbor });
                }
            }
        }
    }

    log::debug!("NoPathFound: {} => {} at {} Mbps", src, dst, min_bandwidth);
    None
}

fn reconstruct(prev: &HashMap<SwitchId, SwitchId>, src: SwitchId, dst: SwitchId) -> Vec<SwitchId> {
    let mut path = vec![dst];
    let mut current = dst;

    while current != src {
        current = *prev.get(&current).expect("predecessor chain broken");
        path.push(current);
    }

    path.reverse();
    path
}
