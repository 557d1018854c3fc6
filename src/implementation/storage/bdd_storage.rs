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

//! This module defines the `BddStorage`: a flat, topologically ordered
//! repository of decision diagram nodes. The nodes of each diagram are laid out
//! contiguously and in postorder: the children of a node always come before the
//! node itself so that the root of a diagram is its last node.

use std::ops::Range;

use fxhash::{FxHashMap, FxHashSet};
use log::debug;

use crate::{is_terminal, DiagramCollection, Edge, TERMINAL_0, TERMINAL_1};

/// One node of a diagram in the storage. Its children are either one of the
/// two terminals or the absolute offset of a node of the same diagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BddNode {
    pub low: usize,
    pub high: usize,
    pub variable: usize,
}

/// The flat repository of all the diagrams of a problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BddStorage {
    /// The nodes of all diagrams, one diagram after the other
    nodes: Vec<BddNode>,
    /// The nodes of the i-th diagram are `nodes[delimiters[i]..delimiters[i+1]]`
    delimiters: Vec<usize>,
    /// All variables occurring in the storage are smaller than this
    nb_variables: usize,
}

impl Default for BddStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl BddStorage {
    /// Creates an empty storage
    pub fn new() -> Self {
        Self::with_capacity(0, 0)
    }
    /// Creates an empty storage over (at least) `nb_variables` variables with
    /// room for `capacity` nodes
    pub fn with_capacity(nb_variables: usize, capacity: usize) -> Self {
        BddStorage {
            nodes: Vec::with_capacity(capacity),
            delimiters: vec![0],
            nb_variables,
        }
    }
    /// Linearizes all the diagrams of the given collection.
    ///
    /// # Example
    /// ```
    /// # use ddlb::*;
    /// let mut collection = BddCollection::default();
    /// collection.simplex_constraint(&[0, 1, 2]);
    /// collection.not_all_false_constraint(&[1, 3]);
    ///
    /// let storage = BddStorage::from_collection(&mut collection);
    /// assert_eq!(2, storage.nb_bdds());
    /// assert_eq!(8, storage.nb_bdd_nodes());
    /// assert_eq!(4, storage.nb_variables());
    /// ```
    pub fn from_collection<C: DiagramCollection + ?Sized>(collection: &mut C) -> Self {
        let mut storage = Self::new();
        for bdd in 0..collection.nb_diagrams() {
            storage.add_bdd(collection, bdd);
        }
        storage
    }

    /// Appends the diagram `bdd` of the given collection to this storage.
    /// A diagram without any internal node carries no information and is
    /// skipped.
    ///
    /// The variables of the diagram are first renamed to `0..k` in the
    /// collection, the nodes are then re-addressed to their arena offsets
    /// while their variables are mapped back to the original ones. At the end
    /// of the process, the collection is given its original labels back.
    ///
    /// The diagram is quasi-reduced on the fly: whenever an edge jumps over
    /// some variables of the diagram (or reaches the top sink before the last
    /// variable), a chain of pass-through nodes is inserted so that every path
    /// from the root to the top sink branches on every variable of the diagram
    /// exactly once. Pass-through nodes (both edges leading to the same child)
    /// are shared among all the edges needing them.
    ///
    /// # Panics
    /// If the nodes do not come in postorder or if the variable ordering
    /// is violated.
    pub fn add_bdd<C: DiagramCollection + ?Sized>(&mut self, collection: &mut C, bdd: usize) {
        let variables = collection.variables(bdd);
        if variables.is_empty() {
            debug!("skipping diagram {} which has no internal node", bdd);
            return;
        }
        let start = self.nodes.len();
        self.nodes.reserve(collection.nb_nodes(bdd).saturating_sub(2));

        collection.rebase(bdd, &|v| variables.binary_search(&v).unwrap_or(v));

        let nb_levels = variables.len();
        let mut offsets = FxHashMap::default();
        let mut bridges = FxHashMap::default();
        let mut root = None;
        for node in collection.postorder(bdd) {
            let level = node.variable;
            let low  = self.address(&offsets, &mut bridges, &variables, level, node.low);
            let high = self.address(&offsets, &mut bridges, &variables, level, node.high);
            let offset = self.push_node(BddNode { low, high, variable: variables[level] });
            offsets.insert(node.id, (offset, level));
            root = Some((offset, level));
        }
        // the variables above the root are free too
        if let Some((offset, level)) = root {
            self.bridge(&mut bridges, &variables, offset, 0..level);
        }

        collection.rebase(bdd, &|v| variables[v]);
        self.close_bdd();

        debug!(
            "linearized diagram {} ({} nodes, {} pass-through nodes, {} variables, {} nodes in storage)",
            bdd,
            offsets.len(),
            self.nodes.len() - start - offsets.len(),
            nb_levels,
            self.nodes.len()
        );
    }
    /// Returns the arena offset an edge leaving a node of the given level must
    /// lead to. When the edge jumps over some levels, this is the offset of
    /// the first node of the pass-through chain bridging the gap.
    fn address(
        &mut self,
        offsets: &FxHashMap<usize, (usize, usize)>,
        bridges: &mut FxHashMap<(usize, usize), usize>,
        variables: &[usize],
        level: usize,
        edge: Edge,
    ) -> usize {
        let (target, target_level) = match edge {
            Edge::False => return TERMINAL_0,
            Edge::True  => (TERMINAL_1, variables.len()),
            Edge::Node(id) => match offsets.get(&id) {
                Some(found) => *found,
                None => panic!("node {} is referenced before being visited", id),
            },
        };
        self.bridge(bridges, variables, target, level + 1..target_level)
    }
    /// Returns the offset of a node of level `levels.start` from which `target`
    /// is reached whatever the values of the variables of `levels`. The
    /// missing pass-through nodes are created bottom up, and `target` itself
    /// is returned when `levels` is empty.
    fn bridge(
        &mut self,
        bridges: &mut FxHashMap<(usize, usize), usize>,
        variables: &[usize],
        target: usize,
        levels: Range<usize>,
    ) -> usize {
        let mut next = target;
        for level in levels.rev() {
            next = match bridges.get(&(target, level)) {
                Some(offset) => *offset,
                None => {
                    let offset = self.push_node(BddNode { low: next, high: next, variable: variables[level] });
                    bridges.insert((target, level), offset);
                    offset
                }
            };
        }
        next
    }

    /// Appends a node to the diagram which is currently being built and
    /// returns its offset.
    ///
    /// # Panics
    /// If the node is not valid (see `check_node_valid`)
    pub fn push_node(&mut self, node: BddNode) -> usize {
        self.check_node_valid(node);
        self.nb_variables = self.nb_variables.max(node.variable + 1);
        self.nodes.push(node);
        self.nodes.len() - 1
    }
    /// Terminates the diagram which is currently being built.
    pub fn close_bdd(&mut self) {
        self.delimiters.push(self.nodes.len());
    }
    /// Checks that the given node may be appended to the diagram which is
    /// currently being built. That is, each of its children must either be a
    /// terminal or a node of the current diagram branching on a larger
    /// variable.
    pub fn check_node_valid(&self, node: BddNode) {
        let start = self.delimiters[self.delimiters.len() - 1];
        for child in [node.low, node.high] {
            if is_terminal(child) {
                continue;
            }
            assert!(
                child >= start && child < self.nodes.len(),
                "child {} does not belong to the current diagram", child
            );
            assert!(
                self.nodes[child].variable > node.variable,
                "variable ordering violated: {} -> {}", node.variable, self.nodes[child].variable
            );
        }
    }

    /// The number of diagrams in this storage
    pub fn nb_bdds(&self) -> usize {
        self.delimiters.len() - 1
    }
    /// The total number of nodes of all diagrams in this storage
    pub fn nb_bdd_nodes(&self) -> usize {
        self.nodes.len()
    }
    pub fn nb_variables(&self) -> usize {
        self.nb_variables
    }
    pub fn nodes(&self) -> &[BddNode] {
        &self.nodes
    }
    pub fn delimiters(&self) -> &[usize] {
        &self.delimiters
    }
    /// The range of offsets covered by the given diagram
    pub fn bdd_range(&self, bdd: usize) -> Range<usize> {
        self.delimiters[bdd]..self.delimiters[bdd + 1]
    }
    pub fn bdd_nodes(&self, bdd: usize) -> &[BddNode] {
        &self.nodes[self.bdd_range(bdd)]
    }
    /// The sorted set of variables occurring in the given diagram
    pub fn bdd_variables(&self, bdd: usize) -> Vec<usize> {
        let mut vars = self.bdd_nodes(bdd).iter().map(|n| n.variable).collect::<Vec<_>>();
        vars.sort_unstable();
        vars.dedup();
        vars
    }
    /// The smallest variable of the given diagram
    pub fn first_variable(&self, bdd: usize) -> Option<usize> {
        self.bdd_nodes(bdd).iter().map(|n| n.variable).min()
    }
    /// The largest variable of the given diagram
    pub fn last_variable(&self, bdd: usize) -> Option<usize> {
        self.bdd_nodes(bdd).iter().map(|n| n.variable).max()
    }

    /// Returns the edges of the variable dependency graph: two variables are
    /// linked iff they are consecutive variables of some diagram. The edges
    /// are unique and sorted.
    pub fn dependency_graph(&self) -> Vec<[usize; 2]> {
        let mut edges = FxHashSet::default();
        for bdd in 0..self.nb_bdds() {
            for pair in self.bdd_variables(bdd).windows(2) {
                edges.insert([pair[0], pair[1]]);
            }
        }
        let mut edges = edges.into_iter().collect::<Vec<_>>();
        edges.sort_unstable();
        edges
    }
}


// ############################################################################
// #### TESTS #################################################################
// ############################################################################
