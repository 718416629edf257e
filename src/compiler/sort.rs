use crate::error::CompileError;
use crate::graph::GraphIndex;
use std::collections::VecDeque;

/// Orders nodes so every edge points from an earlier to a later node (Kahn's algorithm).
///
/// Zero in-degree nodes are queued in graph order and successors are released
/// in edge order, so the result is stable for a given graph.
pub(super) fn topological_order(index: &GraphIndex<'_>) -> Result<Vec<String>, CompileError> {
    let nodes = &index.graph().nodes;
    let mut in_degree: Vec<usize> = (0..nodes.len()).map(|i| index.in_degree(i)).collect();
    let mut queue: VecDeque<usize> = (0..nodes.len()).filter(|&i| in_degree[i] == 0).collect();
    let mut order = Vec::with_capacity(nodes.len());

    while let Some(node) = queue.pop_front() {
        order.push(nodes[node].id.clone());
        for &next in index.successors(node) {
            in_degree[next] -= 1;
            if in_degree[next] == 0 {
                queue.push_back(next);
            }
        }
    }

    if order.len() < nodes.len() {
        return Err(CompileError::CycleDetected {
            visited: order.len(),
            total: nodes.len(),
        });
    }
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{GraphEdge, GraphNode, StrategyGraph};

    fn chain(edges: &[(&str, &str)], nodes: &[&str]) -> StrategyGraph {
        let mut graph = StrategyGraph::new("sort");
        for id in nodes {
            graph.add_node(GraphNode::new(*id, "and_gate"));
        }
        for (s, t) in edges {
            graph.add_edge(GraphEdge::new(s, "result", t, "inputs"));
        }
        graph
    }

    #[test]
    fn respects_every_edge() {
        let graph = chain(
            &[("c", "d"), ("a", "c"), ("b", "c"), ("a", "b")],
            &["d", "c", "b", "a"],
        );
        let order = topological_order(&graph.index()).unwrap();
        let pos = |id: &str| order.iter().position(|n| n == id).unwrap();
        for edge in &graph.edges {
            assert!(pos(&edge.source_node) < pos(&edge.target_node));
        }
    }

    #[test]
    fn duplicate_edges_do_not_stall_the_queue() {
        let graph = chain(&[("a", "b"), ("a", "b")], &["a", "b"]);
        assert_eq!(topological_order(&graph.index()).unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn cycle_leaves_nodes_unvisited() {
        let graph = chain(&[("a", "b"), ("b", "c"), ("c", "b")], &["a", "b", "c"]);
        match topological_order(&graph.index()) {
            Err(CompileError::CycleDetected { visited, total }) => {
                assert_eq!(visited, 1);
                assert_eq!(total, 3);
            }
            other => panic!("expected cycle, got {:?}", other),
        }
    }
}
