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

//! This module provides the smoothed steps of the message passing recursion.
//! Smoothing means that the (min, +) semiring of the usual min-marginal
//! computation is replaced by the (+, *) semiring over the weights `e^-cost`.
//! All these weights are kept as stabilized `ExpSum` values.
//!
//! Two scratch buffers, parallel to the instruction arena, hold the messages:
//! * `forward[i]` is the total weight of the paths from the root(s) to node i;
//! * `backward[i]` is the total weight of the paths from node i to the top sink.

use crate::{BranchInstruction, ExpSum, TERMINAL_0, TERMINAL_1};

impl BranchInstruction {
    /// Returns the backward message of the child at the given offset
    #[inline]
    fn child_message(offset: usize, backward: &[ExpSum]) -> ExpSum {
        match offset {
            TERMINAL_0 => ExpSum::ZERO,
            TERMINAL_1 => ExpSum::ONE,
            _          => backward[offset],
        }
    }

    /// Computes the backward message of this node out of the backward messages
    /// of its children. The children must have been processed beforehand
    /// (hence the diagrams are processed leaves first, that is by increasing
    /// offset).
    #[inline]
    pub fn smooth_backward_step(&self, backward: &[ExpSum]) -> ExpSum {
        self.check_instruction();

        let low  = Self::child_message(self.low,  backward);
        let high = Self::child_message(self.high, backward);
        debug_assert!(low.sum.is_finite() && high.sum.is_finite());

        let mut msg = ExpSum::new(low.sum, low.max - self.low_cost);
        msg.update(ExpSum::new(high.sum, high.max - self.high_cost));

        debug_assert!(msg.sum.is_finite());
        debug_assert!(!msg.max.is_nan());
        msg
    }

    /// Resets the forward accumulator of each non terminal child of this node
    pub fn prepare_smooth_forward_step(&self, forward: &mut [ExpSum]) {
        self.check_instruction();
        for child in self.children() {
            if child != TERMINAL_0 && child != TERMINAL_1 {
                forward[child] = ExpSum::ZERO;
            }
        }
    }

    /// Pushes the forward message `this` of the current node down to its non
    /// terminal children. The forward message of the current node must be
    /// complete, which means that all of its parents must have been processed
    /// (hence the diagrams are processed root first, by decreasing offset).
    #[inline]
    pub fn smooth_forward_step(&self, this: ExpSum, forward: &mut [ExpSum]) {
        self.check_instruction();
        debug_assert!(this.sum.is_finite() && !this.max.is_nan());

        for (child, cost) in self.children().into_iter().zip(self.costs()) {
            if child == TERMINAL_0 || child == TERMINAL_1 {
                continue;
            }
            let msg = ExpSum::new(this.sum, this.max - cost);
            let acc = &mut forward[child];
            // a zero accumulator is overwritten
            if acc.is_zero() {
                *acc = msg;
            } else {
                acc.update(msg);
            }
            debug_assert!(acc.sum.is_finite() && !acc.max.is_nan());
        }
    }

    /// Returns the total weight of the paths going through the low and high
    /// edges of this node (low first). `this` is the forward message of the
    /// node, the children backward messages are read from `backward`.
    #[inline]
    pub fn sum_marginals(&self, this: ExpSum, backward: &[ExpSum]) -> [ExpSum; 2] {
        self.check_instruction();

        let edge = |child: usize, cost: f64| -> ExpSum {
            match child {
                TERMINAL_0 => ExpSum::ZERO,
                TERMINAL_1 => ExpSum::new(this.sum, this.max - cost),
                _ => {
                    let down = backward[child];
                    ExpSum::new(this.sum * down.sum, this.max - cost + down.max)
                }
            }
        };

        [edge(self.low, self.low_cost), edge(self.high, self.high_cost)]
    }
}


// ############################################################################
// #### TESTS #################################################################
// ############################################################################
