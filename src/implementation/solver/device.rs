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

//! This module provides the facade of the device (gpu) backend. No such
//! backend is compiled in this crate: any attempt to create one fails with
//! `Error::BackendUnavailable`.

use crate::{BddStorage, Error, MinMarginals, SolverBackend};

const DEVICE: &str = "device";

/// The solver running the message passing on a dedicated device
#[derive(Debug)]
pub struct DeviceSolver {
    _private: (),
}

impl DeviceSolver {
    /// Always fails since there is no device backend in this build
    pub fn new(_storage: &BddStorage) -> Result<Self, Error> {
        Err(Error::BackendUnavailable(DEVICE))
    }
}

impl SolverBackend for DeviceSolver {
    fn update_costs(&mut self, _low: &[f64], _high: &[f64]) -> Result<(), Error> {
        Err(Error::BackendUnavailable(DEVICE))
    }
    fn backward_run(&mut self) -> Result<(), Error> {
        Err(Error::BackendUnavailable(DEVICE))
    }
    fn iteration(&mut self) -> Result<(), Error> {
        Err(Error::BackendUnavailable(DEVICE))
    }
    fn lower_bound(&mut self) -> f64 {
        f64::NEG_INFINITY
    }
    fn min_marginals(&mut self) -> Result<MinMarginals, Error> {
        Err(Error::BackendUnavailable(DEVICE))
    }
}


// ############################################################################
// #### TESTS #################################################################
// ############################################################################
