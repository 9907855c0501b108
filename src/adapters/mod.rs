//! Adapters: concrete implementations of the port traits.
//!
//! | Adapter | Implements                                   | Connects to            |
//! |---------|----------------------------------------------|------------------------|
//! | `ble`   | GattPort, LinkPort, AdvertiserPort, Registry | Bluedroid (ESP-IDF)    |
//! | `sim`   | same                                         | in-process peer (host) |
//! | `timer` | WorkTimer                                    | dedicated worker thread|

#[cfg(all(target_os = "espidf", feature = "espidf"))]
pub mod ble;
#[cfg(not(target_os = "espidf"))]
pub mod sim;
pub mod timer;
