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

//! This module provides the implementation of the solvers as well as the
//! function which picks one of them at construction time.

mod smooth;
mod decomposition;
mod device;

pub use smooth::*;
pub use decomposition::*;
pub use device::*;

use crate::{BddStorage, Error, SolverBackend};

/// The backends a solver can be created for
#[derive(Debug, Clone)]
pub enum BackendType {
    /// A single `SmoothSolver` running on the calling thread
    Smooth(ProcessingMode),
    /// A `DecompositionSolver` configured with the given options
    Decomposition(DecompositionOptions),
    /// The device backend (unavailable in this build)
    Device,
}

/// Creates a zero cost solver of the requested kind for the given storage.
///
/// # Example
/// ```
/// # use ddlb::*;
/// let mut collection = BddCollection::default();
/// collection.simplex_constraint(&[0, 1, 2]);
/// let storage = BddStorage::from_collection(&mut collection);
///
/// let mut solver = backend(&storage, BackendType::Smooth(ProcessingMode::Indexed)).unwrap();
/// solver.update_costs(&[0.0, 0.0, 0.0], &[1.0, 2.0, 3.0]).unwrap();
/// solver.iteration().unwrap();
/// assert!(solver.lower_bound() <= 1.0);
///
/// assert!(backend(&storage, BackendType::Device).is_err());
/// ```
pub fn backend(storage: &BddStorage, kind: BackendType) -> Result<Box<dyn SolverBackend + Send>, Error> {
    match kind {
        BackendType::Smooth(mode) => Ok(Box::new(SmoothSolver::with_mode(storage, mode))),
        BackendType::Decomposition(options) => Ok(Box::new(DecompositionSolver::new(storage, &options))),
        BackendType::Device => Ok(Box::new(DeviceSolver::new(storage)?)),
    }
}


// ############################################################################
// #### TESTS #################################################################
// ############################################################################
