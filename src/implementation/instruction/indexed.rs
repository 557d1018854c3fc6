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

//! This module provides the indexed steps of the message passing recursion.
//! These steps aggregate the sum-marginals of all the diagrams that share one
//! same variable (each (variable, diagram) pair owns one slot of an
//! accumulator) and then reparameterize the edge costs so that every diagram
//! agrees on the mass flowing through the low and high edges of that variable.

use crate::{BranchInstruction, ExpSum};

impl BranchInstruction {
    /// Merges the sum-marginals of this node into the slot it belongs to.
    /// `this` is the forward message of the node.
    #[inline]
    pub fn update_sum_marginals(&self, this: ExpSum, backward: &[ExpSum], acc: &mut [[ExpSum; 2]]) {
        let [low, high] = self.sum_marginals(this, backward);
        let slot = &mut acc[self.bdd_index];
        slot[0].update(low);
        slot[1].update(high);
    }

    /// Shifts the edge costs of this node by `ln(own) - ln(avg)` where `own`
    /// is the aggregated mass of its slot and `avg` the mass every slot should
    /// agree on. Edges that carry no mass (or for which there is no average)
    /// are left untouched.
    #[inline]
    pub fn set_sum_marginals(&mut self, acc: &[[ExpSum; 2]], avg: &[ExpSum; 2]) {
        let own = acc[self.bdd_index];
        if !own[0].is_zero() && !avg[0].is_zero() {
            self.low_cost += own[0].ln() - avg[0].ln();
        }
        if !own[1].is_zero() && !avg[1].is_zero() {
            self.high_cost += own[1].ln() - avg[1].ln();
        }
        self.check_instruction();
    }
}

/// Returns the geometric mean of the given slots, edge by edge. Slots carrying
/// no mass on an edge do not take part in the mean of that edge; when no slot
/// has any mass on some edge, the mean of that edge is zero.
///
/// Since the mean of the logarithms is taken, the reparameterization which
/// aligns every slot on this average leaves the total cost of the variable
/// unchanged.
///
/// # Example
/// ```
/// # use ddlb::*;
/// let slots = [
///     [ExpSum::new(1.0, 0.0), ExpSum::new(1.0, 2.0)],
///     [ExpSum::new(1.0, 4.0), ExpSum::ZERO],
/// ];
/// let [low, high] = average_sum_marginals(&slots);
/// assert!((low.ln()  - 2.0).abs() < 1e-12);
/// assert!((high.ln() - 2.0).abs() < 1e-12);
/// ```
pub fn average_sum_marginals(slots: &[[ExpSum; 2]]) -> [ExpSum; 2] {
    let mut avg = [ExpSum::ZERO; 2];
    for (edge, out) in avg.iter_mut().enumerate() {
        let mut count = 0_usize;
        let mut total = 0.0_f64;
        for slot in slots.iter().filter(|s| !s[edge].is_zero()) {
            count += 1;
            total += slot[edge].ln();
        }
        if count > 0 {
            *out = ExpSum::new(1.0, total / count as f64);
        }
    }
    avg
}


// ############################################################################
// #### TESTS #################################################################
// ############################################################################

#[cfg(test)]
mod test_indexed_steps {
    use crate::*;
    use crate::test_utils::*;

    #[test]
    fn update_sum_marginals_accumulates_in_the_node_slot() {
        let arena    = simplex_arena(&[0.0, 0.0, 0.0]);
        let backward = vec![ExpSum::ONE, ExpSum::ONE, ExpSum::new(2.0, 0.0), ExpSum::ONE, ExpSum::new(3.0, 0.0)];
        let mut acc  = vec![[ExpSum::ZERO; 2]; 3];

        // the two nodes of variable 1 share slot 1
        arena[2].update_sum_marginals(ExpSum::ONE, &backward, &mut acc);
        arena[3].update_sum_marginals(ExpSum::ONE, &backward, &mut acc);
        assert!((acc[1][0].value() - 2.0).abs() < 1e-12);
        assert!((acc[1][1].value() - 1.0).abs() < 1e-12);
        assert!(acc[0][0].is_zero());
        assert!(acc[2][1].is_zero());
    }
    #[test]
    fn set_sum_marginals_aligns_the_slot_on_the_average() {
        let mut inst = BranchInstruction::new(BddNode{low: TERMINAL_1, high: TERMINAL_1, variable: 0}, 0);
        let acc = [[ExpSum::new(1.0, -1.0), ExpSum::new(1.0, -3.0)]];
        let avg = [ExpSum::new(1.0, -2.0), ExpSum::new(1.0, -2.0)];
        inst.set_sum_marginals(&acc, &avg);
        assert!((inst.low_cost  - 1.0).abs() < 1e-12);
        assert!((inst.high_cost + 1.0).abs() < 1e-12);
    }
    #[test]
    fn set_sum_marginals_skips_edges_without_mass() {
        let mut inst = BranchInstruction::new(BddNode{low: TERMINAL_1, high: TERMINAL_0, variable: 0}, 0);
        inst.high_cost = 5.0;
        let acc = [[ExpSum::new(1.0, 0.0), ExpSum::ZERO]];
        let avg = [ExpSum::new(1.0, 0.0), ExpSum::new(1.0, -2.0)];
        inst.set_sum_marginals(&acc, &avg);
        assert_eq!(0.0, inst.low_cost);
        assert_eq!(5.0, inst.high_cost);
    }
    #[test]
    fn average_of_no_slot_is_zero() {
        let [low, high] = average_sum_marginals(&[]);
        assert!(low.is_zero());
        assert!(high.is_zero());
    }
    #[test]
    fn average_is_the_geometric_mean() {
        let slots = [
            [ExpSum::new(2.0, 0.0), ExpSum::new(8.0, 0.0)],
            [ExpSum::new(8.0, 0.0), ExpSum::new(2.0, 0.0)],
        ];
        let [low, high] = average_sum_marginals(&slots);
        assert!((low.value()  - 4.0).abs() < 1e-9);
        assert!((high.value() - 4.0).abs() < 1e-9);
    }
    #[test]
    fn aligning_every_slot_preserves_the_total_cost() {
        let acc = [
            [ExpSum::new(1.0, 0.3), ExpSum::new(2.0, -1.0)],
            [ExpSum::new(3.0, 1.2), ExpSum::new(1.0, 0.5)],
            [ExpSum::new(0.5, 2.0), ExpSum::new(4.0, 0.0)],
        ];
        let avg = average_sum_marginals(&acc);
        let mut total = [0.0, 0.0];
        for slot in 0..acc.len() {
            let mut inst = BranchInstruction::new(BddNode{low: TERMINAL_1, high: TERMINAL_1, variable: 0}, slot);
            inst.set_sum_marginals(&acc, &avg);
            total[0] += inst.low_cost;
            total[1] += inst.high_cost;
        }
        assert!(total[0].abs() < 1e-9);
        assert!(total[1].abs() < 1e-9);
    }
}
