//! Tests for tracing functionality
//!
//! These verify that instrumented code paths run under a subscriber when the feature
//! is enabled, and behave the same without it.


#[cfg(not(feature = "tracing"))]
mod without_tracing;
