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

//! This module provides the implementation of the decomposition solver. That
//! is a solver which partitions the variables of a problem into contiguous
//! intervals and runs one `SmoothSolver` per interval, each on its own thread.
//! The variables which belong to several intervals (because some diagram has
//! been split across them) are kept in sync after each parallel iteration.

use derive_builder::Builder;
use fxhash::{FxHashMap, FxHashSet};
use log::{info, trace};
use parking_lot::Mutex;

use crate::{BddStorage, DuplicateVariable, Error, MinMarginals, ProcessingMode, SmoothSolver, SolverBackend};

/// This is how you configure a decomposition. For instance:
///
/// ```
/// # use ddlb::*;
/// let options = DecompositionOptionsBuilder::default()
///     .nb_threads(4)
///     .force_thread_nr(true)
///     .build()
///     .unwrap();
/// assert_eq!(4, options.nb_threads);
/// assert_eq!(0.5, options.parallel_message_passing_weight);
/// ```
#[derive(Debug, Clone, PartialEq, Builder)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct DecompositionOptions {
    /// The maximum number of intervals (hence of threads). By default, this
    /// is the number of hardware threads available on the machine.
    #[builder(default = "num_cpus::get()")]
    pub nb_threads: usize,
    /// When set, exactly `nb_threads` intervals are used (but never more than
    /// there are variables) regardless of the size of the problem.
    #[builder(default = "false")]
    pub force_thread_nr: bool,
    /// Unless the number of threads is forced, each interval must be worth
    /// (on average) at least this many nodes.
    #[builder(default = "10000")]
    pub min_nb_bdd_nodes: usize,
    /// The fraction of the disagreement between intervals that is resolved
    /// at each synchronization.
    #[builder(default = "0.5")]
    pub parallel_message_passing_weight: f64,
    /// How each interval performs its iterations
    #[builder(default = "ProcessingMode::Indexed")]
    pub mode: ProcessingMode,
}
impl DecompositionOptionsBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(0) = self.nb_threads {
            return Err("nb_threads must be positive".to_string());
        }
        if let Some(0) = self.min_nb_bdd_nodes {
            return Err("min_nb_bdd_nodes must be positive".to_string());
        }
        if let Some(w) = self.parallel_message_passing_weight {
            if !(0.0..=1.0).contains(&w) {
                return Err(format!("parallel_message_passing_weight {} is not in [0, 1]", w));
            }
        }
        Ok(())
    }
}
impl Default for DecompositionOptions {
    fn default() -> Self {
        DecompositionOptions {
            nb_threads: num_cpus::get(),
            force_thread_nr: false,
            min_nb_bdd_nodes: 10000,
            parallel_message_passing_weight: 0.5,
            mode: ProcessingMode::Indexed,
        }
    }
}
impl DecompositionOptions {
    /// Returns the number of intervals a storage is going to be split in
    pub fn nb_intervals(&self, storage: &BddStorage) -> usize {
        let wanted = if self.force_thread_nr {
            self.nb_threads
        } else {
            self.nb_threads.min(storage.nb_bdd_nodes() / self.min_nb_bdd_nodes.max(1))
        };
        wanted.min(storage.nb_variables()).max(1)
    }
}

/// The solver which runs one `SmoothSolver` per interval
#[derive(Debug, Clone)]
pub struct DecompositionSolver {
    /// One solver per interval
    solvers: Vec<SmoothSolver>,
    /// For each interval, the (sorted) variables it shares with other intervals
    shared: Vec<Vec<usize>>,
    /// The costs of the variables no diagram is about
    uncovered: Vec<[f64; 2]>,
    nb_variables: usize,
    weight: f64,
}

impl DecompositionSolver {
    /// Splits the given storage according to the options and creates the
    /// solvers of all intervals. All costs are zero.
    pub fn new(storage: &BddStorage, options: &DecompositionOptions) -> Self {
        let nb_intervals = options.nb_intervals(storage);
        let (storages, duplicates) = storage.split_bdd_nodes(nb_intervals);
        let shared = Self::shared_variables(&storages, &duplicates);

        info!(
            "decomposing {} nodes over {} variables in {} intervals ({} duplicated diagrams, {} shared variables)",
            storage.nb_bdd_nodes(),
            storage.nb_variables(),
            storages.len(),
            duplicates.len(),
            shared.iter().flatten().collect::<FxHashSet<_>>().len()
        );

        DecompositionSolver {
            solvers: storages.iter().map(|s| SmoothSolver::with_mode(s, options.mode)).collect(),
            shared,
            uncovered: vec![[0.0, 0.0]; storage.nb_variables()],
            nb_variables: storage.nb_variables(),
            weight: options.parallel_message_passing_weight,
        }
    }
    /// Creates a decomposition with the given costs (the cost of assigning 1
    /// to each variable) and runs a first backward pass.
    pub fn with_costs(storage: &BddStorage, costs: &[f64], options: &DecompositionOptions) -> Result<Self, Error> {
        let mut solver = Self::new(storage, options);
        let zeros = vec![0.0; costs.len()];
        SolverBackend::update_costs(&mut solver, &zeros, costs)?;
        solver.backward_run();
        Ok(solver)
    }

    /// For each interval, the variables its diagram copies have in common with
    /// the copies of some other interval
    fn shared_variables(storages: &[BddStorage], duplicates: &[DuplicateVariable]) -> Vec<Vec<usize>> {
        let mut shared = vec![FxHashSet::default(); storages.len()];
        for dup in duplicates.iter() {
            let first  = storages[dup.first_interval].bdd_variables(dup.first_bdd);
            let second = storages[dup.second_interval].bdd_variables(dup.second_bdd);
            for var in first.iter().filter(|v| second.binary_search(v).is_ok()) {
                shared[dup.first_interval].insert(*var);
                shared[dup.second_interval].insert(*var);
            }
        }
        shared.into_iter()
            .map(|set| {
                let mut vars = set.into_iter().collect::<Vec<_>>();
                vars.sort_unstable();
                vars
            })
            .collect()
    }

    pub fn nb_intervals(&self) -> usize {
        self.solvers.len()
    }
    pub fn nb_variables(&self) -> usize {
        self.nb_variables
    }
    /// The variables which are shared by several intervals
    pub fn shared_variables_of(&self, interval: usize) -> &[usize] {
        &self.shared[interval]
    }
    pub fn solvers(&self) -> &[SmoothSolver] {
        &self.solvers
    }

    /// Adds `cost` to the cost of assigning 1 to `var`
    pub fn set_cost(&mut self, cost: f64, var: usize) {
        self.add_costs(var, 0.0, cost);
    }
    /// Adds the given costs to the variable. These are shared among the
    /// intervals in proportion to the number of diagram copies comprising the
    /// variable each of them holds.
    pub fn add_costs(&mut self, var: usize, low: f64, high: f64) {
        let counts = self.solvers.iter().map(|s| s.nb_bdds_of(var)).collect::<Vec<_>>();
        let total  = counts.iter().sum::<usize>();
        if total == 0 {
            self.uncovered[var][0] += low;
            self.uncovered[var][1] += high;
            return;
        }
        for (solver, count) in self.solvers.iter_mut().zip(counts) {
            if count > 0 {
                let share = count as f64 / total as f64;
                solver.add_costs(var, low * share, high * share);
            }
        }
    }
    /// Returns the `[low, high]` costs of the given variable summed over all
    /// intervals.
    pub fn variable_costs(&self, var: usize) -> [f64; 2] {
        let mut costs = self.uncovered[var];
        for solver in self.solvers.iter() {
            let [low, high] = solver.variable_costs(var);
            costs[0] += low;
            costs[1] += high;
        }
        costs
    }

    /// Runs the given closure on each interval solver, every one of them on its
    /// own thread, and returns the results in interval order.
    fn in_parallel<T, F>(solvers: &mut [SmoothSolver], f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize, &mut SmoothSolver) -> T + Sync,
    {
        let critical = Mutex::new((0..solvers.len()).map(|_| None).collect::<Vec<Option<T>>>());

        std::thread::scope(|s| {
            for (interval, solver) in solvers.iter_mut().enumerate() {
                let critical = &critical;
                let f = &f;
                s.spawn(move || {
                    let result = f(interval, solver);
                    critical.lock()[interval] = Some(result);
                });
            }
        });

        critical.into_inner().into_iter().flatten().collect()
    }

    /// Recomputes the backward messages of all intervals
    pub fn backward_run(&mut self) {
        Self::in_parallel(&mut self.solvers, |_, solver| solver.backward_run());
    }

    /// Performs one iteration on every interval in parallel and then
    /// synchronizes the shared variables.
    pub fn iteration(&mut self) {
        let shared = &self.shared;
        let deltas = Self::in_parallel(&mut self.solvers, |interval, solver| {
            solver.iteration();
            Self::marginal_differences(solver, &shared[interval])
        });
        self.synchronize(&deltas);
    }
    /// For each of the given variables, the sum over all diagrams of the
    /// difference between the high and the low min-marginals
    fn marginal_differences(solver: &mut SmoothSolver, vars: &[usize]) -> Vec<(usize, f64)> {
        if vars.is_empty() {
            return vec![];
        }
        let mm = solver.min_marginals();
        vars.iter()
            .map(|&v| (v, mm[v].iter().map(|[low, high]| high - low).sum::<f64>()))
            .collect()
    }
    /// Moves each interval's view of the shared variables toward the average
    /// view. Each interval `k` receives the cost `w * (mean - delta_k)` on the
    /// high edge. Only the intervals having a finite difference take part in
    /// the average (and receive a cost), so the total cost is preserved.
    fn synchronize(&mut self, deltas: &[Vec<(usize, f64)>]) {
        let mut by_variable: FxHashMap<usize, Vec<(usize, f64)>> = FxHashMap::default();
        for (interval, deltas) in deltas.iter().enumerate() {
            for &(var, delta) in deltas.iter().filter(|(_, d)| d.is_finite()) {
                by_variable.entry(var).or_default().push((interval, delta));
            }
        }

        let mut moved = 0.0_f64;
        for (var, views) in by_variable.iter() {
            if views.len() < 2 {
                continue;
            }
            let mean = views.iter().map(|(_, d)| d).sum::<f64>() / views.len() as f64;
            for &(interval, delta) in views.iter() {
                let update = self.weight * (mean - delta);
                self.solvers[interval].add_costs(*var, 0.0, update);
                moved += update.abs();
            }
        }
        trace!("synchronized {} shared variables (total update {})", by_variable.len(), moved);
    }

    /// Returns the sum of the lower bounds of all intervals (plus the cheapest
    /// value of every uncovered variable)
    pub fn lower_bound(&mut self) -> f64 {
        let bounds = Self::in_parallel(&mut self.solvers, |_, solver| solver.lower_bound());
        let lb = bounds.iter().sum::<f64>()
            + self.uncovered.iter().map(|[low, high]| low.min(*high)).sum::<f64>();
        trace!("interval bounds {:?}, lower bound {}", bounds, lb);
        lb
    }
    /// Returns, for each variable, the min-marginals of all the diagram copies
    /// comprising it (interval after interval)
    pub fn min_marginals(&mut self) -> MinMarginals {
        let per_interval = Self::in_parallel(&mut self.solvers, |_, solver| solver.min_marginals());
        let mut out: MinMarginals = vec![vec![]; self.nb_variables];
        for mm in per_interval {
            for (var, marginals) in mm.into_iter().enumerate() {
                out[var].extend(marginals);
            }
        }
        out
    }
}

impl SolverBackend for DecompositionSolver {
    fn update_costs(&mut self, low: &[f64], high: &[f64]) -> Result<(), Error> {
        SmoothSolver::check_cost_lengths(low, high, self.nb_variables)?;
        for (var, (l, h)) in low.iter().zip(high.iter()).enumerate() {
            self.add_costs(var, *l, *h);
        }
        Ok(())
    }
    fn backward_run(&mut self) -> Result<(), Error> {
        DecompositionSolver::backward_run(self);
        Ok(())
    }
    fn iteration(&mut self) -> Result<(), Error> {
        DecompositionSolver::iteration(self);
        Ok(())
    }
    fn lower_bound(&mut self) -> f64 {
        DecompositionSolver::lower_bound(self)
    }
    fn min_marginals(&mut self) -> Result<MinMarginals, Error> {
        Ok(DecompositionSolver::min_marginals(self))
    }
}


// ############################################################################
// #### TESTS #################################################################
// ############################################################################


#[cfg(test)]
mod test_decomposition_solver {
    use crate::*;
    use crate::test_utils::*;

    const TOL: f64 = 1e-9;

    fn forced(nb_threads: usize) -> DecompositionOptions {
        DecompositionOptionsBuilder::default()
            .nb_threads(nb_threads)
            .force_thread_nr(true)
            .build()
            .unwrap()
    }

    #[test]
    fn one_interval_behaves_like_a_smooth_solver() {
        let storage = overlapping_simplices();
        let costs   = [1.0, -2.0, 0.5, 3.0, -1.0, 0.25];

        let mut decomposition = DecompositionSolver::with_costs(&storage, &costs, &forced(1)).unwrap();
        let mut smooth = SmoothSolver::new(&storage);
        smooth.update_costs(&[0.0; 6], &costs).unwrap();

        assert_eq!(1, decomposition.nb_intervals());
        for _ in 0..5 {
            assert!((decomposition.lower_bound() - smooth.lower_bound()).abs() < TOL);
            decomposition.iteration();
            smooth.iteration();
        }
        assert!((decomposition.lower_bound() - smooth.lower_bound()).abs() < TOL);
    }
    #[test]
    fn costs_are_shared_among_the_intervals() {
        let storage = simplex_storage(3);
        let mut solver = DecompositionSolver::new(&storage, &forced(2));
        assert_eq!(2, solver.nb_intervals());
        // variable 1 lives in both intervals
        assert_eq!(&[1], solver.shared_variables_of(0));
        assert_eq!(&[1], solver.shared_variables_of(1));

        solver.set_cost(4.0, 1);
        assert_eq!([0.0, 2.0], solver.solvers()[0].variable_costs(1));
        assert_eq!([0.0, 2.0], solver.solvers()[1].variable_costs(1));
        assert_eq!([0.0, 4.0], solver.variable_costs(1));
    }
    #[test]
    fn cost_vectors_must_fit() {
        let mut solver = DecompositionSolver::new(&simplex_storage(3), &forced(2));
        assert!(matches!(
            solver.update_costs(&[0.0; 5], &[0.0; 5]),
            Err(Error::CostLength { given: 5, expected: 3 })
        ));
        assert!(DecompositionSolver::with_costs(&simplex_storage(3), &[0.0; 4], &forced(2)).is_err());
    }
    #[test]
    fn min_marginals_list_every_copy() {
        let mut solver = DecompositionSolver::with_costs(&simplex_storage(3), &[0.0; 3], &forced(2)).unwrap();
        let mm = solver.min_marginals();
        assert_eq!(3, mm.len());
        assert_eq!(1, mm[0].len());
        assert_eq!(2, mm[1].len());
        assert_eq!(1, mm[2].len());
    }
    #[test]
    fn synchronization_preserves_the_total_costs() {
        let storage = overlapping_simplices();
        let costs   = [1.0, -2.0, 0.5, 3.0, -1.0, 0.25];
        let mut solver = DecompositionSolver::with_costs(&storage, &costs, &forced(3)).unwrap();
        for _ in 0..10 {
            solver.iteration();
        }
        for (var, cost) in costs.iter().enumerate() {
            let [low, high] = solver.variable_costs(var);
            assert!(low.abs() < 1e-6, "variable {}", var);
            assert!((high - cost).abs() < 1e-6, "variable {}", var);
        }
    }
    #[test]
    fn one_interval_keeps_the_mass_of_skipped_variables() {
        use std::f64::consts::E;
        let mut collection = BddCollection::default();
        collection.not_all_false_constraint(&[0, 1]);
        let storage = BddStorage::from_collection(&mut collection);

        let mut solver = DecompositionSolver::with_costs(&storage, &[-1.0, -1.0], &forced(1)).unwrap();
        assert!((solver.lower_bound() + (2.0 * E + E * E).ln()).abs() < TOL);
    }
    #[test]
    fn split_skipping_diagrams_still_yield_a_lower_bound() {
        let storage = mixed_constraints();
        let high = [1.0, -2.0, 0.5, 3.0, -1.0, 0.25];
        let optimum = brute_force_optimum(&storage, &[0.0; 6], &high);

        for nb_threads in [2, 3] {
            let mut solver = DecompositionSolver::with_costs(&storage, &high, &forced(nb_threads)).unwrap();
            assert_eq!(nb_threads, solver.nb_intervals());
            for _ in 0..30 {
                solver.iteration();
                let lb = solver.lower_bound();
                assert!(lb.is_finite());
                assert!(lb <= optimum + TOL, "{} intervals: {} > {}", nb_threads, lb, optimum);
            }
        }
    }
    #[test]
    fn uncovered_variables_are_accounted_for() {
        let mut collection = BddCollection::default();
        collection.simplex_constraint(&[0, 2]);
        let storage = BddStorage::from_collection(&mut collection);
        let mut solver = DecompositionSolver::with_costs(&storage, &[0.0, -3.0, 0.0], &forced(1)).unwrap();
        assert!((solver.lower_bound() - (-(2.0_f64.ln()) - 3.0)).abs() < TOL);
    }
}
