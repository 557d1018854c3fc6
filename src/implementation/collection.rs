// Copyright 2020 Xavier Gillard
//
// Permission is hereby granted, free of charge, to any person obtaining a copy of
// this software and associated documentation files (the "Software"), to deal in
// the Software without restriction, including without limitation the rights to
// use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of
// the Software, and to permit persons to whom the Software is furnished to do so,
// subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS
// FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR
// COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER
// IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN
// CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! This module provides `BddCollection`: a minimal in-memory collection of
//! decision diagrams. It lets one describe diagrams node by node and knows how
//! to produce the diagrams of two textbook constraints. It is by no means a
//! constraint compiler.

use crate::{CollectionNode, DiagramCollection, Edge};

/// A collection of explicitly given diagrams. The nodes of each diagram are
/// identified by their position, the root being the node 0.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BddCollection {
    diagrams: Vec<Vec<CollectionNode>>,
}

impl BddCollection {
    /// Adds a diagram to the collection and returns its index. The id of each
    /// node must be its position in `nodes` and the node 0 is the root of the
    /// diagram. An empty diagram has no internal node.
    ///
    /// # Panics
    /// If some id does not match its position, if an edge leads to an unknown
    /// node or if the variable ordering is violated.
    pub fn add_bdd(&mut self, nodes: Vec<CollectionNode>) -> usize {
        for (pos, node) in nodes.iter().enumerate() {
            assert_eq!(pos, node.id, "node ids must match their positions");
            for edge in [node.low, node.high] {
                if let Edge::Node(child) = edge {
                    assert!(child < nodes.len(), "unknown node {}", child);
                    assert!(
                        nodes[child].variable > node.variable,
                        "variable ordering violated: {} -> {}", node.variable, nodes[child].variable
                    );
                }
            }
        }
        self.diagrams.push(nodes);
        self.diagrams.len() - 1
    }

    /// Adds the diagram of the constraint `sum(vars) == 1` and returns its
    /// index. The variables must be given in increasing order.
    ///
    /// At each level `k`, the node `a_k` means no variable has been set so far
    /// and `b_k` means exactly one was.
    pub fn simplex_constraint(&mut self, vars: &[usize]) -> usize {
        Self::check_vars(vars);
        let n = vars.len();
        let a = |k: usize| if k == 0 { 0 } else { 2 * k - 1 };
        let b = |k: usize| 2 * k;

        let mut nodes = vec![];
        for (k, var) in vars.iter().copied().enumerate() {
            let last = k + 1 == n;
            let a_low  = if last { Edge::False } else { Edge::Node(a(k + 1)) };
            let a_high = if last { Edge::True  } else { Edge::Node(b(k + 1)) };
            nodes.push(CollectionNode { id: a(k), variable: var, low: a_low, high: a_high });

            if k > 0 {
                let b_low = if last { Edge::True } else { Edge::Node(b(k + 1)) };
                nodes.push(CollectionNode { id: b(k), variable: var, low: b_low, high: Edge::False });
            }
        }
        self.add_bdd(nodes)
    }

    /// Adds the diagram of the constraint `sum(vars) >= 1` and returns its
    /// index. The variables must be given in increasing order.
    pub fn not_all_false_constraint(&mut self, vars: &[usize]) -> usize {
        Self::check_vars(vars);
        let n = vars.len();
        let nodes = vars.iter().copied().enumerate()
            .map(|(k, var)| CollectionNode {
                id: k,
                variable: var,
                low: if k + 1 == n { Edge::False } else { Edge::Node(k + 1) },
                high: Edge::True,
            })
            .collect();
        self.add_bdd(nodes)
    }

    /// One more than the largest variable of all diagrams
    pub fn nb_variables(&self) -> usize {
        self.diagrams.iter()
            .flat_map(|d| d.iter())
            .map(|n| n.variable + 1)
            .max()
            .unwrap_or(0)
    }

    fn check_vars(vars: &[usize]) {
        assert!(
            vars.windows(2).all(|w| w[0] < w[1]),
            "variables must be given in increasing order"
        );
    }
}

impl DiagramCollection for BddCollection {
    fn nb_diagrams(&self) -> usize {
        self.diagrams.len()
    }
    fn nb_nodes(&self, bdd: usize) -> usize {
        self.diagrams[bdd].len() + 2
    }
    fn postorder(&self, bdd: usize) -> Box<dyn Iterator<Item = CollectionNode> + '_> {
        let nodes = &self.diagrams[bdd];
        let mut order = Vec::with_capacity(nodes.len());
        if nodes.is_empty() {
            return Box::new(order.into_iter());
        }

        let mut visited = vec![false; nodes.len()];
        let mut stack = vec![(0, false)];
        while let Some((id, expanded)) = stack.pop() {
            if expanded {
                order.push(nodes[id]);
                continue;
            }
            if visited[id] {
                continue;
            }
            visited[id] = true;
            stack.push((id, true));
            for edge in [nodes[id].high, nodes[id].low] {
                if let Edge::Node(child) = edge {
                    if !visited[child] {
                        stack.push((child, false));
                    }
                }
            }
        }
        Box::new(order.into_iter())
    }
    fn variables(&self, bdd: usize) -> Vec<usize> {
        let mut vars = self.diagrams[bdd].iter().map(|n| n.variable).collect::<Vec<_>>();
        vars.sort_unstable();
        vars.dedup();
        vars
    }
    fn rebase(&mut self, bdd: usize, relabel: &dyn Fn(usize) -> usize) {
        for node in self.diagrams[bdd].iter_mut() {
            node.variable = relabel(node.variable);
        }
    }
}


// ############################################################################
// #### TESTS #################################################################
// ############################################################################
