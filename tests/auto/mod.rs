//! Dependency graphs built by hand and with `#[inject]`

mod graphs;
