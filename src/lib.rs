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

//! # DDLB
//! DDLB computes dual (Lagrangean) lower bounds for binary optimization
//! problems whose constraints have been compiled into binary decision
//! diagrams. Each variable is given a cost; the bound is obtained by running a
//! smoothed message passing over all diagrams, which keeps shifting these
//! costs among the diagrams sharing a variable until they agree.
//!
//! The diagrams are stored in flat arenas (see `BddStorage`) where each node
//! refers to its children by their offsets. All the values of the recursion
//! are kept as numerically stabilized sums of exponentials (see `ExpSum`) so
//! that arbitrary large (or small) costs can be handled without overflowing.
//!
//! ## Side benefit
//! Large problems can be decomposed: the variables are partitioned in
//! contiguous intervals and one solver runs per interval, each on its own
//! thread (see `DecompositionSolver`).
//!
//! ## Quick Example
//! ```
//! # use ddlb::*;
//! // 1. Describe the constraints of your problem as decision diagrams
//! let mut collection = BddCollection::default();
//! collection.simplex_constraint(&[0, 1, 2]);
//! collection.simplex_constraint(&[1, 3]);
//! collection.simplex_constraint(&[0, 3]);
//!
//! // 2. Linearize them
//! let storage = BddStorage::from_collection(&mut collection);
//!
//! // 3. Create a solver with the cost of setting each variable to 1
//! let options = DecompositionOptionsBuilder::default().build().unwrap();
//! let mut solver = DecompositionSolver::with_costs(&storage, &[1.0, 2.0, -1.0, 3.0], &options).unwrap();
//!
//! // 4. Iterate and watch the bound improve
//! let before = solver.lower_bound();
//! for _ in 0..10 {
//!     solver.iteration();
//! }
//! assert!(solver.lower_bound() >= before - 1e-9);
//! ```

mod common;
mod abstraction;
mod implementation;

pub use common::*;
pub use abstraction::*;
pub use implementation::*;

#[cfg(test)]
mod test_utils;
