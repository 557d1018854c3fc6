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

//! This module provides the `SmoothSolver`: a solver which runs the smoothed
//! message passing recursion over all the diagrams of one storage. It is the
//! stand-alone cpu solver and it is also what each worker of a decomposition
//! owns.

use fxhash::FxHashMap;
use log::trace;

use crate::{average_sum_marginals, is_terminal, BddStorage, BranchInstruction, Error, ExpSum, MinMarginals, SolverBackend};

/// How an iteration of the `SmoothSolver` updates the dual costs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessingMode {
    /// An iteration is a plain forward and backward sweep. The costs are left
    /// untouched, only the messages are refreshed.
    Smoothed,
    /// An iteration is a forward and a backward sweep during which the
    /// sum-marginals of the diagrams sharing a variable are averaged, one
    /// variable at a time.
    #[default]
    Indexed,
}

/// The smoothed min-marginal averaging solver
#[derive(Debug, Clone)]
pub struct SmoothSolver {
    mode: ProcessingMode,
    nb_variables: usize,
    /// The nodes of all diagrams (same layout as in the storage)
    instructions: Vec<BranchInstruction>,
    /// The weight of the paths from the roots to each node
    forward: Vec<ExpSum>,
    /// The weight of the paths from each node to the top sink
    backward: Vec<ExpSum>,
    forward_stale: bool,
    backward_stale: bool,
    /// The offsets of the nodes branching on each variable
    var_nodes: Vec<Vec<usize>>,
    /// The slots of variable `v` are `slot_offsets[v]..slot_offsets[v+1]`
    slot_offsets: Vec<usize>,
    /// One accumulator per slot
    slots: Vec<[ExpSum; 2]>,
    /// The nodes of each diagram having no parent in that diagram
    roots: Vec<Vec<usize>>,
    /// The costs of the variables no diagram is about
    uncovered: Vec<[f64; 2]>,
}

impl SmoothSolver {
    pub fn new(storage: &BddStorage) -> Self {
        Self::with_mode(storage, ProcessingMode::default())
    }
    /// Creates a zero cost solver for all the diagrams of the storage
    pub fn with_mode(storage: &BddStorage, mode: ProcessingMode) -> Self {
        let nb_variables = storage.nb_variables();
        let nb_bdds = storage.nb_bdds();

        // slots are grouped by variable, then ordered by diagram
        let mut slot_offsets = vec![0; nb_variables + 1];
        let bdd_variables = (0..nb_bdds).map(|b| storage.bdd_variables(b)).collect::<Vec<_>>();
        for vars in bdd_variables.iter() {
            for v in vars.iter() {
                slot_offsets[*v + 1] += 1;
            }
        }
        for v in 0..nb_variables {
            slot_offsets[v + 1] += slot_offsets[v];
        }

        let mut next_slot = slot_offsets.clone();
        let mut instructions = Vec::with_capacity(storage.nb_bdd_nodes());
        let mut var_nodes = vec![vec![]; nb_variables];
        let mut roots = Vec::with_capacity(nb_bdds);
        let mut slot_of = FxHashMap::default();

        for (bdd, vars) in bdd_variables.iter().enumerate() {
            slot_of.clear();
            for v in vars.iter().copied() {
                slot_of.insert(v, next_slot[v]);
                next_slot[v] += 1;
            }

            let range = storage.bdd_range(bdd);
            let start = range.start;
            let mut has_parent = vec![false; range.len()];
            for offset in range.clone() {
                let node = storage.nodes()[offset];
                for child in [node.low, node.high] {
                    if !is_terminal(child) {
                        has_parent[child - start] = true;
                    }
                }
                var_nodes[node.variable].push(offset);
                instructions.push(BranchInstruction::new(node, slot_of[&node.variable]));
            }
            roots.push(range.filter(|o| !has_parent[o - start]).collect());
        }

        let nb_nodes = instructions.len();
        let nb_slots = slot_offsets[nb_variables];
        SmoothSolver {
            mode,
            nb_variables,
            instructions,
            forward: vec![ExpSum::ZERO; nb_nodes],
            backward: vec![ExpSum::ZERO; nb_nodes],
            forward_stale: true,
            backward_stale: true,
            var_nodes,
            slot_offsets,
            slots: vec![[ExpSum::ZERO; 2]; nb_slots],
            roots,
            uncovered: vec![[0.0, 0.0]; nb_variables],
        }
    }

    pub fn mode(&self) -> ProcessingMode {
        self.mode
    }
    pub fn nb_variables(&self) -> usize {
        self.nb_variables
    }
    pub fn nb_bdds(&self) -> usize {
        self.roots.len()
    }
    pub fn instructions(&self) -> &[BranchInstruction] {
        &self.instructions
    }
    /// The number of nodes without a parent in their diagram
    pub fn nb_roots(&self) -> usize {
        self.roots.iter().map(|r| r.len()).sum()
    }
    /// The number of diagrams comprising the given variable
    pub fn nb_bdds_of(&self, var: usize) -> usize {
        self.slot_offsets[var + 1] - self.slot_offsets[var]
    }

    /// Adds `cost` to the cost of assigning 1 to `var`
    pub fn set_cost(&mut self, cost: f64, var: usize) {
        self.add_costs(var, 0.0, cost);
    }
    /// Adds the given costs to the low and high edges of `var`. These costs
    /// are evenly shared among all the diagrams comprising the variable.
    pub fn add_costs(&mut self, var: usize, low: f64, high: f64) {
        assert!(low.is_finite() && high.is_finite(), "costs must be finite");
        let nb_bdds = self.nb_bdds_of(var);
        if nb_bdds == 0 {
            self.uncovered[var][0] += low;
            self.uncovered[var][1] += high;
            return;
        }

        let low  = low  / nb_bdds as f64;
        let high = high / nb_bdds as f64;
        for &offset in self.var_nodes[var].iter() {
            let inst = &mut self.instructions[offset];
            inst.low_cost  += low;
            inst.high_cost += high;
        }
        self.forward_stale  = true;
        self.backward_stale = true;
    }
    /// Returns the `[low, high]` costs of the given variable, summed over all
    /// the diagrams comprising it.
    pub fn variable_costs(&self, var: usize) -> [f64; 2] {
        let mut costs = self.uncovered[var];
        let mut seen  = vec![false; self.nb_bdds_of(var)];
        let first = self.slot_offsets[var];
        for &offset in self.var_nodes[var].iter() {
            let inst = &self.instructions[offset];
            if !seen[inst.bdd_index - first] {
                seen[inst.bdd_index - first] = true;
                costs[0] += inst.low_cost;
                costs[1] += inst.high_cost;
            }
        }
        costs
    }

    /// Recomputes all the backward messages. The nodes are processed by
    /// increasing offset so that children are always done before their parents.
    pub fn backward_run(&mut self) {
        for i in 0..self.instructions.len() {
            let msg = self.instructions[i].smooth_backward_step(&self.backward);
            self.backward[i] = msg;
        }
        self.backward_stale = false;
    }
    /// Recomputes all the forward messages. Every root is seeded with one, then
    /// the nodes are processed by decreasing offset.
    pub fn forward_run(&mut self) {
        self.seed_forward();
        for i in (0..self.instructions.len()).rev() {
            let this = self.forward[i];
            self.instructions[i].smooth_forward_step(this, &mut self.forward);
        }
        self.forward_stale = false;
    }
    fn seed_forward(&mut self) {
        for inst in self.instructions.iter() {
            inst.prepare_smooth_forward_step(&mut self.forward);
        }
        for root in self.roots.iter().flatten() {
            self.forward[*root] = ExpSum::ONE;
        }
    }

    /// Performs one iteration of message passing
    pub fn iteration(&mut self) {
        match self.mode {
            ProcessingMode::Smoothed => {
                self.forward_run();
                self.backward_run();
            },
            ProcessingMode::Indexed => {
                if self.backward_stale {
                    self.backward_run();
                }
                self.forward_averaging();
                self.backward_averaging();
            }
        }
    }

    /// Aggregates the sum-marginals of all nodes of `var` in their slots and
    /// aligns every slot on their average.
    fn average_variable(&mut self, var: usize) {
        let slots = self.slot_offsets[var]..self.slot_offsets[var + 1];
        self.slots[slots.clone()].iter_mut().for_each(|s| *s = [ExpSum::ZERO; 2]);

        for &offset in self.var_nodes[var].iter() {
            self.instructions[offset].update_sum_marginals(self.forward[offset], &self.backward, &mut self.slots);
        }
        let avg = average_sum_marginals(&self.slots[slots]);
        for &offset in self.var_nodes[var].iter() {
            self.instructions[offset].set_sum_marginals(&self.slots, &avg);
        }
    }
    /// Forward sweep, variable after variable. When a variable gets processed,
    /// the forward messages of its nodes are complete and the backward
    /// messages of their children are those of the previous backward sweep
    /// (their costs did not change since).
    fn forward_averaging(&mut self) {
        self.seed_forward();
        for var in 0..self.nb_variables {
            if self.var_nodes[var].is_empty() {
                continue;
            }
            self.average_variable(var);
            for &offset in self.var_nodes[var].iter() {
                let this = self.forward[offset];
                self.instructions[offset].smooth_forward_step(this, &mut self.forward);
            }
        }
        self.forward_stale  = false;
        self.backward_stale = true;
    }
    /// Backward sweep, variable after variable (last one first).
    fn backward_averaging(&mut self) {
        for var in (0..self.nb_variables).rev() {
            if self.var_nodes[var].is_empty() {
                continue;
            }
            self.average_variable(var);
            for &offset in self.var_nodes[var].iter() {
                let msg = self.instructions[offset].smooth_backward_step(&self.backward);
                self.backward[offset] = msg;
            }
        }
        self.forward_stale  = true;
        self.backward_stale = false;
    }

    /// Returns the smoothed lower bound implied by the current costs
    pub fn lower_bound(&mut self) -> f64 {
        if self.backward_stale {
            self.backward_run();
        }
        let mut lb = 0.0;
        for roots in self.roots.iter() {
            let mut total = ExpSum::ZERO;
            for root in roots.iter() {
                total.update(self.backward[*root]);
            }
            lb -= total.ln();
        }
        lb += self.uncovered.iter().map(|[low, high]| low.min(*high)).sum::<f64>();
        trace!("smoothed lower bound {}", lb);
        lb
    }

    /// Returns, for each variable, the `[low, high]` smoothed min-marginals of
    /// each diagram comprising that variable (ordered by diagram).
    pub fn min_marginals(&mut self) -> MinMarginals {
        if self.backward_stale {
            self.backward_run();
        }
        if self.forward_stale {
            self.forward_run();
        }
        self.slots.iter_mut().for_each(|s| *s = [ExpSum::ZERO; 2]);
        for (offset, inst) in self.instructions.iter().enumerate() {
            inst.update_sum_marginals(self.forward[offset], &self.backward, &mut self.slots);
        }

        (0..self.nb_variables)
            .map(|v| {
                self.slots[self.slot_offsets[v]..self.slot_offsets[v + 1]]
                    .iter()
                    .map(|[low, high]| [-low.ln(), -high.ln()])
                    .collect()
            })
            .collect()
    }

    /// Makes sure the given cost vectors fit the problem
    pub(crate) fn check_cost_lengths(low: &[f64], high: &[f64], nb_variables: usize) -> Result<(), Error> {
        if low.len() != high.len() {
            return Err(Error::CostLength { given: high.len(), expected: low.len() });
        }
        if low.len() > nb_variables {
            return Err(Error::CostLength { given: low.len(), expected: nb_variables });
        }
        Ok(())
    }
}

impl SolverBackend for SmoothSolver {
    fn update_costs(&mut self, low: &[f64], high: &[f64]) -> Result<(), Error> {
        Self::check_cost_lengths(low, high, self.nb_variables)?;
        for (var, (l, h)) in low.iter().zip(high.iter()).enumerate() {
            self.add_costs(var, *l, *h);
        }
        Ok(())
    }
    fn backward_run(&mut self) -> Result<(), Error> {
        SmoothSolver::backward_run(self);
        Ok(())
    }
    fn iteration(&mut self) -> Result<(), Error> {
        SmoothSolver::iteration(self);
        Ok(())
    }
    fn lower_bound(&mut self) -> f64 {
        SmoothSolver::lower_bound(self)
    }
    fn min_marginals(&mut self) -> Result<MinMarginals, Error> {
        Ok(SmoothSolver::min_marginals(self))
    }
}


// ############################################################################
// #### TESTS #################################################################
// ############################################################################

#[cfg(test)]
mod test_smooth_solver {
    use crate::*;
    use crate::test_utils::*;

    const TOL: f64 = 1e-9;

    #[test]
    fn zero_costs_bound_is_minus_log_of_the_number_of_solutions() {
        let mut solver = SmoothSolver::new(&simplex_storage(3));
        assert!((solver.lower_bound() + 3.0_f64.ln()).abs() < TOL);
    }
    #[test]
    fn high_costs_on_a_simplex() {
        let mut solver = SmoothSolver::new(&simplex_storage(3));
        for (var, cost) in [1.0, 2.0, 3.0].into_iter().enumerate() {
            solver.set_cost(cost, var);
        }
        assert!((solver.lower_bound() - 0.592_394_035_555_619_6).abs() < TOL);
    }
    #[test]
    fn costs_are_shared_among_the_diagrams() {
        let mut collection = BddCollection::default();
        collection.simplex_constraint(&[0, 1]);
        collection.not_all_false_constraint(&[0, 1]);
        let mut solver = SmoothSolver::new(&BddStorage::from_collection(&mut collection));

        assert_eq!(2, solver.nb_bdds_of(0));
        solver.set_cost(3.0, 0);
        let share = solver.instructions().iter()
            .filter(|i| i.variable == 0)
            .map(|i| i.high_cost)
            .collect::<Vec<_>>();
        assert_eq!(vec![1.5, 1.5], share);
        assert_eq!([0.0, 3.0], solver.variable_costs(0));
    }
    #[test]
    fn uncovered_variables_contribute_their_cheapest_value() {
        let mut collection = BddCollection::default();
        collection.simplex_constraint(&[0, 2]);
        let storage = BddStorage::from_collection(&mut collection);
        let mut solver = SmoothSolver::new(&storage);

        assert_eq!(0, solver.nb_bdds_of(1));
        solver.update_costs(&[0.0, 5.0, 0.0], &[0.0, -2.0, 0.0]).unwrap();
        assert!((solver.lower_bound() - (-(2.0_f64.ln()) - 2.0)).abs() < TOL);
    }
    #[test]
    fn cost_vectors_must_fit() {
        let mut solver = SmoothSolver::new(&simplex_storage(3));
        assert!(matches!(
            solver.update_costs(&[0.0; 4], &[0.0; 4]),
            Err(Error::CostLength { given: 4, expected: 3 })
        ));
        assert!(matches!(
            solver.update_costs(&[0.0; 2], &[0.0; 3]),
            Err(Error::CostLength { given: 3, expected: 2 })
        ));
        assert!(solver.update_costs(&[1.0], &[2.0]).is_ok());
    }
    #[test]
    fn min_marginals_of_a_zero_cost_simplex() {
        let mut solver = SmoothSolver::new(&simplex_storage(3));
        let mm = solver.min_marginals();
        assert_eq!(3, mm.len());
        for var in mm {
            assert_eq!(1, var.len());
            assert!((var[0][0] + 2.0_f64.ln()).abs() < TOL);
            assert!(var[0][1].abs() < TOL);
        }
    }
    #[test]
    fn min_marginals_of_an_impossible_value_are_infinite() {
        let mut collection = BddCollection::default();
        collection.add_bdd(vec![
            CollectionNode { id: 0, variable: 0, low: Edge::False, high: Edge::True },
        ]);
        let mut solver = SmoothSolver::new(&BddStorage::from_collection(&mut collection));
        let mm = solver.min_marginals();
        assert_eq!(f64::INFINITY, mm[0][0][0]);
        assert!(mm[0][0][1].abs() < TOL);
    }
    #[test]
    fn smoothed_iterations_leave_the_bound_unchanged() {
        let mut solver = SmoothSolver::with_mode(&overlapping_simplices(), ProcessingMode::Smoothed);
        solver.update_costs(&[0.0; 6], &[1.0, -2.0, 0.5, 3.0, -1.0, 0.25]).unwrap();
        let before = solver.lower_bound();
        for _ in 0..5 {
            solver.iteration();
        }
        assert!((before - solver.lower_bound()).abs() < TOL);
    }
    #[test]
    fn indexed_iterations_never_decrease_the_bound() {
        let mut solver = SmoothSolver::with_mode(&overlapping_simplices(), ProcessingMode::Indexed);
        solver.update_costs(&[0.0; 6], &[1.0, -2.0, 0.5, 3.0, -1.0, 0.25]).unwrap();
        let mut lb = solver.lower_bound();
        let first  = lb;
        for _ in 0..20 {
            solver.iteration();
            let next = solver.lower_bound();
            assert!(next >= lb - TOL, "{} < {}", next, lb);
            lb = next;
        }
        assert!(lb > first);
    }
    #[test]
    fn indexed_iterations_preserve_the_total_costs() {
        let mut solver = SmoothSolver::new(&overlapping_simplices());
        let high = [1.0, -2.0, 0.5, 3.0, -1.0, 0.25];
        solver.update_costs(&[0.0; 6], &high).unwrap();
        for _ in 0..5 {
            solver.iteration();
        }
        for (var, cost) in high.iter().enumerate() {
            let [low, high] = solver.variable_costs(var);
            assert!(low.abs() < 1e-6);
            assert!((high - cost).abs() < 1e-6);
        }
    }
    #[test]
    fn the_bound_never_exceeds_the_optimum() {
        let storage = overlapping_simplices();
        let high = [1.0, -2.0, 0.5, 3.0, -1.0, 0.25];
        let optimum = brute_force_optimum(&storage, &[0.0; 6], &high);

        let mut solver = SmoothSolver::new(&storage);
        solver.update_costs(&[0.0; 6], &high).unwrap();
        for _ in 0..50 {
            solver.iteration();
            assert!(solver.lower_bound() <= optimum + TOL);
        }
    }
    #[test]
    fn skipped_variables_keep_their_mass() {
        use std::f64::consts::E;
        let mut collection = BddCollection::default();
        collection.not_all_false_constraint(&[0, 1]);
        let storage = BddStorage::from_collection(&mut collection);
        let optimum = brute_force_optimum(&storage, &[0.0; 2], &[-1.0, -1.0]);
        assert!((optimum + 2.0).abs() < TOL);

        let mut solver = SmoothSolver::new(&storage);
        solver.update_costs(&[0.0; 2], &[-1.0, -1.0]).unwrap();
        // x = 01, 10 and 11
        assert!((solver.lower_bound() + (2.0 * E + E * E).ln()).abs() < TOL);
        for _ in 0..20 {
            solver.iteration();
            assert!(solver.lower_bound() <= optimum + TOL);
        }
    }
    #[test]
    fn zero_cost_marginals_count_the_satisfying_assignments() {
        let mut solver = SmoothSolver::new(&chain_storage(3));
        assert!((solver.lower_bound() + 7.0_f64.ln()).abs() < TOL);

        let mm = solver.min_marginals();
        for var in mm {
            assert_eq!(1, var.len());
            // three assignments with the variable unset, four with it set
            assert!((var[0][0] + 3.0_f64.ln()).abs() < TOL);
            assert!((var[0][1] + 4.0_f64.ln()).abs() < TOL);
        }
    }
    #[test]
    fn the_bound_never_exceeds_the_optimum_with_skipping_diagrams() {
        let storage = mixed_constraints();
        let high = [1.0, -2.0, 0.5, 3.0, -1.0, 0.25];
        let optimum = brute_force_optimum(&storage, &[0.0; 6], &high);
        assert!(optimum.is_finite());

        for mode in [ProcessingMode::Smoothed, ProcessingMode::Indexed] {
            let mut solver = SmoothSolver::with_mode(&storage, mode);
            solver.update_costs(&[0.0; 6], &high).unwrap();
            assert!(solver.lower_bound() <= optimum + TOL);
            for _ in 0..50 {
                solver.iteration();
                assert!(solver.lower_bound() <= optimum + TOL, "{:?}", mode);
            }
        }
    }
    #[test]
    fn a_split_storage_may_have_several_roots() {
        let (storages, _) = simplex_storage(3).split_bdd_nodes(2);
        let mut solver = SmoothSolver::new(&storages[1]);
        assert_eq!(1, solver.nb_bdds());
        assert_eq!(2, solver.nb_roots());
        assert!((solver.lower_bound() + 3.0_f64.ln()).abs() < TOL);
    }
}
