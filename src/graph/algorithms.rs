use super::model::GraphIndex;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

impl GraphIndex<'_> {
    /// Finds directed cycles with a white/gray/black depth-first search.
    ///
    /// Each returned cycle lists node ids along the back edge's path, starting
    /// at the node the back edge points to. Roots are visited in node order and
    /// successors in edge order, so results are deterministic.
    pub fn detect_cycles(&self) -> Vec<Vec<String>> {
        let n = self.graph().nodes.len();
        let mut color = vec![Color::White; n];
        let mut cycles = Vec::new();

        for root in 0..n {
            if color[root] != Color::White {
                continue;
            }
            // (node, index of the next successor to visit)
            let mut stack: Vec<(usize, usize)> = vec![(root, 0)];
            color[root] = Color::Gray;

            while let Some(top) = stack.last_mut() {
                let node = top.0;
                let successors = self.successors(node);
                if top.1 < successors.len() {
                    let succ = successors[top.1];
                    top.1 += 1;
                    match color[succ] {
                        Color::White => {
                            color[succ] = Color::Gray;
                            stack.push((succ, 0));
                        }
                        Color::Gray => {
                            let start = stack
                                .iter()
                                .position(|&(id, _)| id == succ)
                                .unwrap_or(0);
                            cycles.push(stack[start..].iter().map(|&(id, _)| self.id(id)).collect());
                        }
                        Color::Black => {}
                    }
                } else {
                    color[node] = Color::Black;
                    stack.pop();
                }
            }
        }
        cycles
    }

    /// Groups nodes into weakly connected components, ignoring edge direction.
    pub fn connected_components(&self) -> Vec<Vec<String>> {
        let n = self.graph().nodes.len();
        let mut visited = vec![false; n];
        let mut components = Vec::new();

        for root in 0..n {
            if visited[root] {
                continue;
            }
            visited[root] = true;
            let mut stack = vec![root];
            let mut component = Vec::new();
            while let Some(node) = stack.pop() {
                component.push(self.id(node));
                for &next in self.successors(node).iter().chain(self.predecessors(node)) {
                    if !visited[next] {
                        visited[next] = true;
                        stack.push(next);
                    }
                }
            }
            components.push(component);
        }
        components
    }

    /// Every node reachable from `roots` by following edges forward, roots included.
    pub fn reachable_from(&self, roots: &[usize]) -> Vec<bool> {
        let mut reached = vec![false; self.graph().nodes.len()];
        let mut stack: Vec<usize> = roots.to_vec();
        for &r in roots {
            reached[r] = true;
        }
        while let Some(node) = stack.pop() {
            for &next in self.successors(node) {
                if !reached[next] {
                    reached[next] = true;
                    stack.push(next);
                }
            }
        }
        reached
    }
}

#[cfg(test)]
mod tests {
    use crate::graph::{GraphEdge, GraphNode, StrategyGraph};

    fn graph_with(nodes: &[&str], edges: &[(&str, &str)]) -> StrategyGraph {
        let mut graph = StrategyGraph::new("test");
        for id in nodes {
            graph.add_node(GraphNode::new(*id, "and_gate"));
        }
        for (s, t) in edges {
            graph.add_edge(GraphEdge::new(s, "result", t, "inputs"));
        }
        graph
    }

    #[test]
    fn empty_graph_has_no_cycles_or_components() {
        let graph = StrategyGraph::new("empty");
        assert!(graph.detect_cycles().is_empty());
        assert!(graph.connected_components().is_empty());
    }

    #[test]
    fn diamond_is_acyclic() {
        let graph = graph_with(
            &["a", "b", "c", "d"],
            &[("a", "b"), ("a", "c"), ("b", "d"), ("c", "d")],
        );
        assert!(graph.detect_cycles().is_empty());
        assert_eq!(graph.connected_components().len(), 1);
    }

    #[test]
    fn finds_cycle_path() {
        let graph = graph_with(&["a", "b", "c"], &[("a", "b"), ("b", "c"), ("c", "a")]);
        let cycles = graph.detect_cycles();
        assert_eq!(cycles, vec![vec!["a".to_string(), "b".to_string(), "c".to_string()]]);
    }

    #[test]
    fn self_loop_is_a_cycle() {
        let graph = graph_with(&["a"], &[("a", "a")]);
        assert_eq!(graph.detect_cycles(), vec![vec!["a".to_string()]]);
    }

    #[test]
    fn cycle_in_second_component_is_found() {
        let graph = graph_with(&["a", "b", "x", "y"], &[("a", "b"), ("x", "y"), ("y", "x")]);
        assert_eq!(graph.detect_cycles().len(), 1);
        assert_eq!(graph.connected_components().len(), 2);
    }

    #[test]
    fn isolated_nodes_are_their_own_components() {
        let graph = graph_with(&["a", "b", "c"], &[("a", "b")]);
        let components = graph.connected_components();
        assert_eq!(components.len(), 2);
        assert_eq!(components[1], vec!["c".to_string()]);
    }

    #[test]
    fn dangling_edges_are_ignored() {
        let graph = graph_with(&["a"], &[("a", "ghost")]);
        assert!(graph.detect_cycles().is_empty());
        assert_eq!(graph.connected_components().len(), 1);
    }
}
