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

//! This module splits the diagrams of a storage along a partition of the
//! variables. Each interval of the partition gets its own storage so that
//! the diagrams of each interval can be processed independently.
//!
//! Every node is placed in the storage of the interval its variable belongs
//! to. When a node has a child in some later interval `t`, the node is
//! duplicated:
//! * in its own interval, a stub is kept whose edges leaving the interval lead
//!   to the top sink;
//! * in interval `t`, a copy is made whose edges into `t` are preserved while
//!   all its other non terminal edges lead to the top sink.
//!
//! Relaxing an edge to the top sink can only enlarge the set of solutions of
//! a diagram. The diagram copies living in two intervals are reported as
//! `DuplicateVariable` records so that the variables they have in common can
//! be kept in sync.

use fxhash::FxHashSet;
use log::debug;

use crate::{is_terminal, BddNode, BddStorage, DuplicateVariable, Intervals, TERMINAL_1};

impl BddStorage {
    /// Splits this storage in `nb_intervals` storages (see `compute_intervals`)
    pub fn split_bdd_nodes(&self, nb_intervals: usize) -> (Vec<BddStorage>, Vec<DuplicateVariable>) {
        let intervals = self.compute_intervals(nb_intervals);
        self.split_bdd_nodes_with(&intervals)
    }

    /// Splits this storage along the given partition. It returns one storage
    /// per interval along with the (sorted, unique) records of the diagrams
    /// which have been split across two intervals.
    ///
    /// # Example
    /// ```
    /// # use ddlb::*;
    /// let mut collection = BddCollection::default();
    /// collection.simplex_constraint(&[0, 1, 2]);
    /// let storage = BddStorage::from_collection(&mut collection);
    ///
    /// let (storages, duplicates) = storage.split_bdd_nodes_with(&Intervals::from_boundaries(vec![0, 1, 3]));
    /// assert_eq!(2, storages.len());
    /// assert_eq!(1, duplicates.len());
    /// ```
    pub fn split_bdd_nodes_with(&self, intervals: &Intervals) -> (Vec<BddStorage>, Vec<DuplicateVariable>) {
        let nb_intervals = intervals.nb_intervals();
        if nb_intervals <= 1 {
            return (vec![self.clone()], vec![]);
        }

        let mut storages = self
            .split_capacities(intervals)
            .into_iter()
            .map(|capacity| BddStorage::with_capacity(self.nb_variables(), capacity))
            .collect::<Vec<_>>();

        let mut duplicates = FxHashSet::default();
        let mut own = vec![];
        let mut pairs = vec![];
        let mut touched = vec![false; nb_intervals];

        for bdd in 0..self.nb_bdds() {
            let range = self.bdd_range(bdd);
            let start = range.start;
            own.clear();
            own.resize(range.len(), TERMINAL_1);
            pairs.clear();
            touched.iter_mut().for_each(|t| *t = false);

            for offset in range {
                let node = self.nodes()[offset];
                let here = intervals.interval(node.variable);

                let stub = BddNode {
                    low:  self.relocate(node.low,  here, intervals, &own, start),
                    high: self.relocate(node.high, here, intervals, &own, start),
                    variable: node.variable,
                };
                own[offset - start] = storages[here].push_node(stub);
                touched[here] = true;

                for there in self.later_intervals(node, here, intervals) {
                    let copy = BddNode {
                        low:  self.relocate(node.low,  there, intervals, &own, start),
                        high: self.relocate(node.high, there, intervals, &own, start),
                        variable: node.variable,
                    };
                    storages[there].push_node(copy);
                    touched[there] = true;
                    pairs.push((here, there));
                }
            }

            for &(first, second) in pairs.iter() {
                duplicates.insert(DuplicateVariable {
                    first_interval: first,
                    first_bdd: storages[first].nb_bdds(),
                    second_interval: second,
                    second_bdd: storages[second].nb_bdds(),
                });
            }
            for (interval, _) in touched.iter().enumerate().filter(|(_, t)| **t) {
                storages[interval].close_bdd();
            }
        }

        let mut duplicates = duplicates.into_iter().collect::<Vec<_>>();
        duplicates.sort_unstable();

        debug!(
            "split {} nodes in {} intervals: {:?} nodes, {} duplicates",
            self.nb_bdd_nodes(),
            nb_intervals,
            storages.iter().map(|s| s.nb_bdd_nodes()).collect::<Vec<_>>(),
            duplicates.len()
        );
        (storages, duplicates)
    }

    /// Returns the offset (in the storage of interval `target`) an edge of
    /// some node placed in `target` must lead to. Terminals are preserved,
    /// a child of interval `target` is re-addressed to its own placement and
    /// any other child is relaxed to the top sink.
    fn relocate(&self, child: usize, target: usize, intervals: &Intervals, own: &[usize], start: usize) -> usize {
        if is_terminal(child) {
            child
        } else if intervals.interval(self.nodes()[child].variable) == target {
            own[child - start]
        } else {
            TERMINAL_1
        }
    }
    /// The distinct intervals (other than `here`) of the children of the
    /// given node
    fn later_intervals(&self, node: BddNode, here: usize, intervals: &Intervals) -> Vec<usize> {
        let mut out = Vec::with_capacity(2);
        for child in [node.low, node.high] {
            if is_terminal(child) {
                continue;
            }
            let there = intervals.interval(self.nodes()[child].variable);
            if there != here && !out.contains(&there) {
                out.push(there);
            }
        }
        out
    }
    /// Counts the number of nodes each interval is going to receive. A node
    /// having both its children in one later interval is counted twice in that
    /// interval so this is an upper bound.
    fn split_capacities(&self, intervals: &Intervals) -> Vec<usize> {
        let mut capacities = vec![0; intervals.nb_intervals()];
        for node in self.nodes() {
            let here = intervals.interval(node.variable);
            capacities[here] += 1;
            for child in [node.low, node.high] {
                if is_terminal(child) {
                    continue;
                }
                let there = intervals.interval(self.nodes()[child].variable);
                if there != here {
                    capacities[there] += 1;
                }
            }
        }
        capacities
    }
}


// ############################################################################
// #### TESTS #################################################################
// ############################################################################

#[cfg(test)]
mod test_split {
    use crate::*;
    use crate::test_utils::*;

    #[test]
    fn splitting_in_one_interval_is_a_noop() {
        let storage = simplex_storage(3);
        let (storages, duplicates) = storage.split_bdd_nodes(1);
        assert_eq!(vec![storage], storages);
        assert!(duplicates.is_empty());
    }
    #[test]
    fn simplex_split_after_the_first_variable() {
        let storage = simplex_storage(3);
        let (storages, duplicates) = storage.split_bdd_nodes_with(&Intervals::from_boundaries(vec![0, 1, 3]));

        assert_eq!(2, storages.len());
        // the stub of the root: both its edges leave the interval
        assert_eq!(1, storages[0].nb_bdd_nodes());
        assert_eq!(
            BddNode { low: TERMINAL_1, high: TERMINAL_1, variable: 0 },
            storages[0].nodes()[0]
        );
        // the four nodes of variables 1 and 2 plus a copy of the root
        assert_eq!(5, storages[1].nb_bdd_nodes());
        assert!(storages[0].nodes().iter().all(|n| n.variable == 0));
        assert_eq!(4, storages[1].nodes().iter().filter(|n| n.variable >= 1).count());

        let root = storages[1].nodes()[4];
        assert_eq!(0, root.variable);
        assert!(!is_terminal(root.low) && !is_terminal(root.high));

        assert_eq!(
            vec![DuplicateVariable { first_interval: 0, first_bdd: 0, second_interval: 1, second_bdd: 0 }],
            duplicates
        );
        for s in storages.iter() {
            assert_well_formed(s);
            assert_eq!(1, s.nb_bdds());
            assert_eq!(3, s.nb_variables());
        }
    }
    #[test]
    fn simplex_split_in_two_computed_intervals() {
        // boundaries are [0, 2, 3]
        let storage = simplex_storage(3);
        let (storages, duplicates) = storage.split_bdd_nodes(2);

        assert_eq!(3, storages[0].nb_bdd_nodes());
        assert_eq!(4, storages[1].nb_bdd_nodes());
        // both nodes of variable 1 are stubs
        for node in storages[0].nodes().iter().filter(|n| n.variable == 1) {
            assert!(is_terminal(node.low) && is_terminal(node.high));
        }
        // a single record even though two nodes were duplicated
        assert_eq!(1, duplicates.len());
        storages.iter().for_each(assert_well_formed);
    }
    #[test]
    fn a_stub_keeps_its_edges_to_the_bottom_sink() {
        let storage = simplex_storage(3);
        let (storages, _) = storage.split_bdd_nodes(2);
        // b1 forbids its variable to be set
        let stub = storages[0].nodes().iter()
            .find(|n| n.variable == 1 && n.high == TERMINAL_0)
            .copied();
        assert_eq!(Some(BddNode { low: TERMINAL_1, high: TERMINAL_0, variable: 1 }), stub);
    }
    #[test]
    fn diagrams_within_one_interval_are_not_duplicated() {
        let mut collection = BddCollection::default();
        collection.simplex_constraint(&[0, 1]);
        collection.simplex_constraint(&[2, 3]);
        collection.not_all_false_constraint(&[0, 1]);
        let storage = BddStorage::from_collection(&mut collection);

        let (storages, duplicates) = storage.split_bdd_nodes(2);
        assert!(duplicates.is_empty());
        assert_eq!(2, storages[0].nb_bdds());
        assert_eq!(1, storages[1].nb_bdds());
        // the not-all-false diagram gets a pass-through node
        assert_eq!(6, storages[0].nb_bdd_nodes());
        assert_eq!(3, storages[1].nb_bdd_nodes());
    }
    #[test]
    fn duplicate_records_point_to_the_right_diagrams() {
        let mut collection = BddCollection::default();
        collection.simplex_constraint(&[2, 3]);
        collection.simplex_constraint(&[0, 1, 2, 3]);
        let storage = BddStorage::from_collection(&mut collection);

        let (storages, duplicates) = storage.split_bdd_nodes(2);
        assert_eq!(
            vec![DuplicateVariable { first_interval: 0, first_bdd: 0, second_interval: 1, second_bdd: 1 }],
            duplicates
        );
        assert_eq!(vec![0, 1], storages[0].bdd_variables(0));
        assert_eq!(vec![1, 2, 3], storages[1].bdd_variables(1));
    }
    #[test]
    fn every_node_is_placed_in_its_own_interval() {
        let mut collection = BddCollection::default();
        collection.simplex_constraint(&[0, 2, 4, 6, 8]);
        collection.not_all_false_constraint(&[1, 3, 5, 7, 9]);
        collection.simplex_constraint(&[0, 9]);
        let storage = BddStorage::from_collection(&mut collection);

        let intervals = storage.compute_intervals(3);
        let (storages, _) = storage.split_bdd_nodes_with(&intervals);
        let placed = storages.iter().enumerate()
            .map(|(i, s)| s.nodes().iter().filter(|n| intervals.interval(n.variable) == i).count())
            .sum::<usize>();
        assert_eq!(storage.nb_bdd_nodes(), placed);
        storages.iter().for_each(assert_well_formed);
    }
}
