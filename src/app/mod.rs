//! Application core.
//!
//! Peripheral service, connection lifecycle handling and the main event
//! loop. Everything radio-specific sits behind the traits in [`ports`], so
//! this layer runs unchanged against the simulated radio on the host.

pub mod events;
pub mod lifecycle;
pub mod main_loop;
pub mod node;
pub mod ports;
pub mod service;
