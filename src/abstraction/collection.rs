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

//! This module defines the `DiagramCollection` trait: the view our storage
//! takes on whatever component compiled the constraints of a problem into
//! decision diagrams.

/// The target of one of the two outgoing edges of a diagram node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Edge {
    /// The edge leads to the bottom sink (the constraint is violated)
    False,
    /// The edge leads to the top sink (the constraint is satisfied)
    True,
    /// The edge leads to the node having the given id in the same diagram
    Node(usize),
}

/// One internal node of a diagram, as it is exposed by a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionNode {
    /// The identifier of this node within its diagram
    pub id: usize,
    /// The variable this node branches on
    pub variable: usize,
    /// Where to go when the variable is assigned 0
    pub low: Edge,
    /// Where to go when the variable is assigned 1
    pub high: Edge,
}

/// This trait describes a collection of decision diagrams as it is consumed
/// when linearizing the diagrams in a `BddStorage`.
///
/// # Note
/// The variable ordering of the diagrams is the natural order of the variables:
/// the variable of a node must be strictly smaller than that of its children.
pub trait DiagramCollection {
    /// The number of diagrams in this collection
    fn nb_diagrams(&self) -> usize;
    /// The number of nodes of the given diagram, *including* its two sinks
    fn nb_nodes(&self, bdd: usize) -> usize;
    /// Iterates over the internal nodes of the given diagram in postorder.
    /// That is, the children of a node are always visited before the node
    /// itself and the root is the last node being visited.
    fn postorder(&self, bdd: usize) -> Box<dyn Iterator<Item = CollectionNode> + '_>;
    /// The (sorted) set of variables occurring in the given diagram
    fn variables(&self, bdd: usize) -> Vec<usize>;
    /// Renames each variable `v` of the given diagram to `relabel(v)`.
    /// The relabeling must be order preserving.
    fn rebase(&mut self, bdd: usize, relabel: &dyn Fn(usize) -> usize);
}
