//! Integration test driver for `tests/integration/` submodules.
//!
//! Each `mod` below exercises one subsystem of the node against the
//! simulated radio. All tests run on the host with no real hardware.

#![cfg(not(target_os = "espidf"))]

mod harness;
mod lifecycle_tests;
mod measurement_tests;
mod node_tests;
