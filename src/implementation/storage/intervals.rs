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

//! This module defines the partition of the variables of a problem into
//! contiguous intervals.

use crate::BddStorage;

/// A partition of the variables `0..nb_variables` into contiguous intervals.
/// The k-th interval comprises the variables `boundaries[k]..boundaries[k+1]`.
/// A partition without any boundary is the trivial partition: all variables
/// belong to interval 0.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Intervals {
    variable_interval: Vec<usize>,
    boundaries: Vec<usize>,
}

impl Intervals {
    /// The trivial partition
    pub fn single() -> Self {
        Self::default()
    }
    /// Creates a partition with the given boundaries. These must start at 0
    /// and be strictly increasing. The last boundary is the number of
    /// variables being partitioned.
    ///
    /// # Example
    /// ```
    /// # use ddlb::*;
    /// let intervals = Intervals::from_boundaries(vec![0, 1, 3]);
    /// assert_eq!(2, intervals.nb_intervals());
    /// assert_eq!(0, intervals.interval(0));
    /// assert_eq!(1, intervals.interval(1));
    /// assert_eq!(1, intervals.interval(2));
    /// ```
    pub fn from_boundaries(boundaries: Vec<usize>) -> Self {
        assert!(boundaries.len() >= 2, "at least one interval is required");
        assert_eq!(0, boundaries[0], "the first interval must start at 0");
        assert!(
            boundaries.windows(2).all(|w| w[0] < w[1]),
            "boundaries must be strictly increasing"
        );

        let mut variable_interval = Vec::with_capacity(boundaries[boundaries.len() - 1]);
        for (i, w) in boundaries.windows(2).enumerate() {
            variable_interval.extend(std::iter::repeat(i).take(w[1] - w[0]));
        }
        Intervals { variable_interval, boundaries }
    }
    /// The interval the given variable belongs to. Variables past the last
    /// boundary are considered to belong to the last interval.
    pub fn interval(&self, variable: usize) -> usize {
        if self.boundaries.is_empty() {
            0
        } else {
            self.variable_interval
                .get(variable)
                .copied()
                .unwrap_or(self.boundaries.len() - 2)
        }
    }
    pub fn nb_intervals(&self) -> usize {
        self.boundaries.len().saturating_sub(1).max(1)
    }
    pub fn boundaries(&self) -> &[usize] {
        &self.boundaries
    }
}

impl BddStorage {
    /// Partitions the variables of this storage into `nb_intervals` intervals
    /// of (nearly) equal sizes. The boundaries are `round(k * V / n)` for
    /// `k` in `0..n`, followed by `V` (the number of variables).
    /// Asking for one interval (or none) yields the trivial partition, asking
    /// for more intervals than there are variables yields one interval per
    /// variable.
    ///
    /// # Example
    /// ```
    /// # use ddlb::*;
    /// let mut collection = BddCollection::default();
    /// collection.not_all_false_constraint(&(0..10).collect::<Vec<_>>());
    /// let storage   = BddStorage::from_collection(&mut collection);
    /// let intervals = storage.compute_intervals(4);
    /// assert_eq!(&[0, 3, 5, 8, 10], intervals.boundaries());
    /// ```
    pub fn compute_intervals(&self, nb_intervals: usize) -> Intervals {
        let nb_vars = self.nb_variables();
        let n = nb_intervals.min(nb_vars);
        if n <= 1 {
            return Intervals::single();
        }

        let mut boundaries = (0..n)
            .map(|k| (k as f64 * nb_vars as f64 / n as f64).round() as usize)
            .collect::<Vec<_>>();
        boundaries.push(nb_vars);

        Intervals::from_boundaries(boundaries)
    }
}


// ############################################################################
// #### TESTS #################################################################
// ############################################################################
