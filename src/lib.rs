//! Environmental sensing node firmware library.
//!
//! A BLE peripheral that exposes temperature and relative humidity through
//! the Environmental Sensing Service and measures periodically while a
//! central is connected. ESP-IDF-specific code is guarded by
//! `#[cfg(all(target_os = "espidf", feature = "espidf"))]` within each
//! module; everything else runs on the host against the simulated radio in
//! `adapters::sim`.

#![deny(unused_must_use)]

pub mod adapters;
pub mod advertising;
pub mod app;
pub mod config;
pub mod error;
pub mod events;
pub mod gatt;
pub mod identity;
pub mod scheduler;
pub mod sensors;
pub mod store;

pub use app::node::{Node, Radio};
pub use config::NodeConfig;
pub use error::Error;
