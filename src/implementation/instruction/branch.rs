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

//! This module defines the `BranchInstruction`: the node of a decision diagram
//! such as it is manipulated by the solvers.

use crate::{is_terminal, BddNode};

/// A branch instruction is one node of a decision diagram laid out in a flat
/// arena. Its children are not referenced by pointers but by their offset in
/// the arena (or by one of the reserved `TERMINAL_0`, `TERMINAL_1` values).
///
/// # Note
/// The per-sweep values (the messages) are *not* stored in the instruction
/// itself but in scratch buffers which are parallel to the arena. This keeps
/// the topology and costs of the diagrams apart from the transient state of
/// the recursion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BranchInstruction {
    /// The variable this node branches on
    pub variable: usize,
    /// Offset of the child reached when the variable is assigned 0
    pub low: usize,
    /// Offset of the child reached when the variable is assigned 1
    pub high: usize,
    /// The cost of the low edge
    pub low_cost: f64,
    /// The cost of the high edge
    pub high_cost: f64,
    /// The slot identifying the (variable, diagram) pair this node belongs to.
    /// All nodes of one diagram branching on one same variable share a slot.
    pub bdd_index: usize,
}

impl BranchInstruction {
    /// Creates a zero cost instruction from the given storage node
    pub fn new(node: BddNode, bdd_index: usize) -> Self {
        BranchInstruction {
            variable: node.variable,
            low: node.low,
            high: node.high,
            low_cost: 0.0,
            high_cost: 0.0,
            bdd_index,
        }
    }
    #[inline]
    pub fn low_is_terminal(&self) -> bool {
        is_terminal(self.low)
    }
    #[inline]
    pub fn high_is_terminal(&self) -> bool {
        is_terminal(self.high)
    }
    /// Returns the two children offsets, low first
    #[inline]
    pub fn children(&self) -> [usize; 2] {
        [self.low, self.high]
    }
    /// Returns the two edge costs, low first
    #[inline]
    pub fn costs(&self) -> [f64; 2] {
        [self.low_cost, self.high_cost]
    }
    /// Checks the invariants that must hold before and after each step
    #[inline]
    pub(crate) fn check_instruction(&self) {
        debug_assert!(self.low_cost.is_finite(), "non finite low cost");
        debug_assert!(self.high_cost.is_finite(), "non finite high cost");
    }
}


// ############################################################################
// #### TESTS #################################################################
// ############################################################################
