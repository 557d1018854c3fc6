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

//! This module defines the `SolverBackend` trait.

use crate::{Error, MinMarginals};

/// This is the solver abstraction. It is implemented by any structure able to
/// run dual (Lagrangean) message passing over a collection of decision
/// diagrams, be it on the cpu (possibly decomposed over many threads) or on
/// some dedicated device.
pub trait SolverBackend {
    /// Adds the given costs to the problem. The i-th item of `low` (resp. `high`)
    /// is the cost of assigning 0 (resp. 1) to the i-th variable. Both slices
    /// must have the same length which may not exceed the number of variables.
    fn update_costs(&mut self, low: &[f64], high: &[f64]) -> Result<(), Error>;
    /// Recomputes the backward messages of all diagrams from scratch.
    fn backward_run(&mut self) -> Result<(), Error>;
    /// Performs one round of message passing (forward and backward sweeps).
    fn iteration(&mut self) -> Result<(), Error>;
    /// Returns the lower bound implied by the current dual costs. A backend
    /// which is unable to compute anything returns -inf.
    fn lower_bound(&mut self) -> f64;
    /// Returns the min-marginals of each variable in each diagram.
    fn min_marginals(&mut self) -> Result<MinMarginals, Error>;
}
