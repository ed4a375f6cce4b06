//! Graph traversal helpers.

use std::collections::{HashSet, VecDeque};

use uuid::Uuid;

use super::{Graph, InputId, NodeKind};

/// Find viewer-kind nodes reachable upstream of `input`, nearest first.
///
/// Walks from the node connected to `input` through that node's own inputs,
/// breadth-first, so chained indirections (clip ← source ← nested viewer)
/// resolve the same way a direct connection would.
pub fn find_upstream_viewers(graph: &Graph, input: &InputId) -> Vec<Uuid> {
    let mut found = Vec::new();
    let mut visited = HashSet::new();
    let mut queue = VecDeque::new();

    if let Some(start) = graph.connected_output(input) {
        queue.push_back(start);
    }

    while let Some(id) = queue.pop_front() {
        if !visited.insert(id) {
            continue;
        }
        let Some(node) = graph.node(id) else {
            continue;
        };
        if node.kind() == NodeKind::Viewer {
            found.push(id);
        }
        for input_name in node.input_names() {
            if let Some(upstream) = graph.connected_output(&InputId::new(id, input_name)) {
                queue.push_back(upstream);
            }
        }
    }

    found
}
