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

//! This module provides the fixtures shared by the unit tests of the library.
#![cfg(test)]

use crate::*;

/// The storage of the constraint `x_0 + ... + x_{n-1} == 1`
pub fn simplex_storage(n: usize) -> BddStorage {
    let mut collection = BddCollection::default();
    collection.simplex_constraint(&(0..n).collect::<Vec<_>>());
    BddStorage::from_collection(&mut collection)
}

/// The storage of the constraint `x_0 + ... + x_{n-1} >= 1`: a chain of `n`
/// nodes plus the `n - 1` pass-through nodes leading to the top sink
pub fn chain_storage(n: usize) -> BddStorage {
    let mut collection = BddCollection::default();
    collection.not_all_false_constraint(&(0..n).collect::<Vec<_>>());
    BddStorage::from_collection(&mut collection)
}

/// Four simplex constraints over six variables. Each variable occurs in two
/// of them.
pub fn overlapping_simplices() -> BddStorage {
    let mut collection = BddCollection::default();
    collection.simplex_constraint(&[0, 1, 2]);
    collection.simplex_constraint(&[3, 4, 5]);
    collection.simplex_constraint(&[0, 3]);
    collection.simplex_constraint(&[1, 2, 4, 5]);
    BddStorage::from_collection(&mut collection)
}

/// Two simplex and two not-all-false constraints over six variables. Some
/// edges of the latter jump over variables of their diagrams.
pub fn mixed_constraints() -> BddStorage {
    let mut collection = BddCollection::default();
    collection.simplex_constraint(&[0, 1, 2]);
    collection.simplex_constraint(&[3, 4, 5]);
    collection.not_all_false_constraint(&[0, 3, 5]);
    collection.not_all_false_constraint(&[1, 4]);
    BddStorage::from_collection(&mut collection)
}

/// The instruction arena of a simplex over three variables, in postorder:
/// a2, b2, a1, b1, a0. Each node has its variable as slot and the given
/// costs on its high edge.
pub fn simplex_arena(high_costs: &[f64; 3]) -> Vec<BranchInstruction> {
    let nodes = [
        BddNode { variable: 2, low: TERMINAL_0, high: TERMINAL_1 },
        BddNode { variable: 2, low: TERMINAL_1, high: TERMINAL_0 },
        BddNode { variable: 1, low: 0, high: 1 },
        BddNode { variable: 1, low: 1, high: TERMINAL_0 },
        BddNode { variable: 0, low: 2, high: 3 },
    ];
    nodes.iter()
        .map(|n| {
            let mut inst = BranchInstruction::new(*n, n.variable);
            inst.high_cost = high_costs[n.variable];
            inst
        })
        .collect()
}

/// Checks that every diagram of the storage is laid out in postorder and
/// respects the variable ordering
pub fn assert_well_formed(storage: &BddStorage) {
    for bdd in 0..storage.nb_bdds() {
        let range = storage.bdd_range(bdd);
        for offset in range.clone() {
            let node = storage.nodes()[offset];
            for child in [node.low, node.high] {
                if is_terminal(child) {
                    continue;
                }
                assert!(range.contains(&child) && child < offset);
                assert!(storage.nodes()[child].variable > node.variable);
            }
        }
    }
}

/// Returns the cost of the cheapest assignment satisfying all the diagrams
/// of an (unsplit) storage
pub fn brute_force_optimum(storage: &BddStorage, low: &[f64], high: &[f64]) -> f64 {
    let n = storage.nb_variables();
    let mut best = f64::INFINITY;
    for bits in 0..(1_usize << n) {
        let value = |v: usize| (bits >> v) & 1 == 1;
        let feasible = (0..storage.nb_bdds()).all(|bdd| {
            let mut current = storage.bdd_range(bdd).end - 1;
            loop {
                let node = storage.nodes()[current];
                current = if value(node.variable) { node.high } else { node.low };
                match current {
                    TERMINAL_0 => return false,
                    TERMINAL_1 => return true,
                    _ => continue,
                }
            }
        });
        if feasible {
            let cost = (0..n).map(|v| if value(v) { high[v] } else { low[v] }).sum::<f64>();
            best = best.min(cost);
        }
    }
    best
}
