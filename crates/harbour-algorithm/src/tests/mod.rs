//! Test suites for the algorithm run.

mod support;
