pub mod graph;
pub mod iteration;
