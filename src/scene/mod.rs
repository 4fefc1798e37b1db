pub(crate) mod document;
pub(crate) mod geometry;
pub(crate) mod graph;
pub(crate) mod subtree;
