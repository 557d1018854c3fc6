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

//! This module defines the most basic data types that are used throughout all
//! the code of our library (both at the abstraction and implementation levels).
//! These are also the types your client library is likely to work with.

use crate::DecompositionOptionsBuilderError;

// ----------------------------------------------------------------------------
// --- TERMINALS --------------------------------------------------------------
// ----------------------------------------------------------------------------
/// The reserved offset standing for the bottom sink (the 'false' terminal) of
/// a decision diagram. It lies outside of any possible arena.
pub const TERMINAL_0: usize = usize::MAX;
/// The reserved offset standing for the top sink (the 'true' terminal) of
/// a decision diagram. It lies outside of any possible arena.
pub const TERMINAL_1: usize = usize::MAX - 1;

/// Returns true iff the given child offset denotes one of the two terminals.
///
/// # Examples:
/// ```
/// # use ddlb::*;
/// assert!(is_terminal(TERMINAL_0));
/// assert!(is_terminal(TERMINAL_1));
/// assert!(!is_terminal(0));
/// assert!(!is_terminal(42));
/// ```
#[inline]
pub fn is_terminal(offset: usize) -> bool {
    offset >= TERMINAL_1
}

// ----------------------------------------------------------------------------
// --- EXP SUM ----------------------------------------------------------------
// ----------------------------------------------------------------------------
/// A numerically stabilized representation of a non negative sum of
/// exponentials. The pair `(sum, max)` stands for the value `sum * e^max`.
///
/// Keeping the largest exponent apart from the mantissa is what lets us
/// accumulate terms such as `e^-1000` and `e^1000` without underflowing nor
/// overflowing. The zero value is represented by `(0, -inf)`.
///
/// # Examples:
/// ```
/// # use ddlb::*;
/// let mut acc = ExpSum::ZERO;
/// acc.update(ExpSum::new(1.0, 1000.0));
/// acc.update(ExpSum::new(1.0, 1000.0));
/// // the value itself would overflow, its logarithm does not
/// assert!((acc.ln() - (1000.0 + 2.0_f64.ln())).abs() < 1e-9);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExpSum {
    /// The mantissa of the represented value
    pub sum: f64,
    /// The exponent by which the mantissa is scaled
    pub max: f64,
}
impl Default for ExpSum {
    fn default() -> Self {
        Self::ZERO
    }
}
impl ExpSum {
    /// The neutral element of `update`: it stands for the value 0
    pub const ZERO: ExpSum = ExpSum { sum: 0.0, max: f64::NEG_INFINITY };
    /// The value 1 (= 1 * e^0)
    pub const ONE: ExpSum = ExpSum { sum: 1.0, max: 0.0 };

    #[inline]
    pub fn new(sum: f64, max: f64) -> Self {
        Self { sum, max }
    }
    /// Returns true iff this accumulator stands for the value 0
    #[inline]
    pub fn is_zero(self) -> bool {
        self.sum == 0.0
    }
    /// Merges the value `o` into this accumulator using the running max
    /// rescaling rule. Merging the zero value is a no-op.
    #[inline]
    pub fn update(&mut self, o: ExpSum) {
        debug_assert!(self.sum.is_finite() && self.sum >= 0.0);
        debug_assert!(!self.max.is_nan());

        if o.sum == 0.0 {
            return;
        }

        if self.max > o.max {
            self.sum += o.sum * (o.max - self.max).exp();
        } else {
            self.sum *= (self.max - o.max).exp();
            self.sum += o.sum;
            self.max  = o.max;
        }

        debug_assert!(self.sum.is_finite());
        debug_assert!(!self.max.is_nan());
    }
    /// The natural logarithm of the represented value (-inf for zero)
    #[inline]
    pub fn ln(self) -> f64 {
        if self.sum == 0.0 {
            f64::NEG_INFINITY
        } else {
            self.sum.ln() + self.max
        }
    }
    /// The represented value. Beware, this one may very well overflow.
    #[inline]
    pub fn value(self) -> f64 {
        if self.sum == 0.0 {
            0.0
        } else {
            self.sum * self.max.exp()
        }
    }
}

// ----------------------------------------------------------------------------
// --- DUPLICATE VARIABLE -----------------------------------------------------
// ----------------------------------------------------------------------------
/// When a diagram gets split across two intervals, this record remembers that
/// the diagram `first_bdd` of interval `first_interval` and the diagram
/// `second_bdd` of interval `second_interval` are two copies of one same
/// original diagram. The variables they have in common must be kept in sync
/// by the decomposition solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DuplicateVariable {
    pub first_interval: usize,
    pub first_bdd: usize,
    pub second_interval: usize,
    pub second_bdd: usize,
}

// ----------------------------------------------------------------------------
// --- RESULTS ----------------------------------------------------------------
// ----------------------------------------------------------------------------
/// For each variable, the `[low, high]` min-marginals of every diagram that
/// comprises this variable.
pub type MinMarginals = Vec<Vec<[f64; 2]>>;

/// The errors that can be reported by a solver backend.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested backend has not been compiled in
    #[error("the {0} backend is not available")]
    BackendUnavailable(&'static str),
    /// The cost vectors do not fit the number of variables of the problem
    #[error("got {given} costs for {expected} variables")]
    CostLength { given: usize, expected: usize },
    /// The decomposition options could not be built
    #[error("invalid options {0}")]
    Options(#[from] DecompositionOptionsBuilderError),
}


// ############################################################################
// #### TESTS #################################################################
// ############################################################################
