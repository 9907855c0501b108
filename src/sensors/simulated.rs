//! Simulated humidity/temperature device for host builds and tests.
//!
//! Values live in atomics so a test or the simulator can change them while
//! the measurement worker owns the device.

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use super::SensorDevice;
use crate::app::ports::Reading;
use crate::error::SensorError;

#[derive(Debug)]
struct State {
    temperature_bits: AtomicU32,
    humidity_bits: AtomicU32,
    ready: AtomicBool,
    failing: AtomicBool,
    fetches: AtomicU32,
}

/// Cloneable handle: every clone controls the same simulated device.
#[derive(Debug, Clone)]
pub struct SimulatedSensor {
    state: Arc<State>,
}

impl SimulatedSensor {
    pub fn new(temperature_c: f32, humidity_pct: f32) -> Self {
        Self {
            state: Arc::new(State {
                temperature_bits: AtomicU32::new(temperature_c.to_bits()),
                humidity_bits: AtomicU32::new(humidity_pct.to_bits()),
                ready: AtomicBool::new(true),
                failing: AtomicBool::new(false),
                fetches: AtomicU32::new(0),
            }),
        }
    }

    pub fn set_reading(&self, temperature_c: f32, humidity_pct: f32) {
        self.state
            .temperature_bits
            .store(temperature_c.to_bits(), Ordering::Relaxed);
        self.state
            .humidity_bits
            .store(humidity_pct.to_bits(), Ordering::Relaxed);
    }

    pub fn set_ready(&self, ready: bool) {
        self.state.ready.store(ready, Ordering::Relaxed);
    }

    /// While set, every fetch fails with a bus error.
    pub fn set_failing(&self, failing: bool) {
        self.state.failing.store(failing, Ordering::Relaxed);
    }

    pub fn fetches(&self) -> u32 {
        self.state.fetches.load(Ordering::Relaxed)
    }
}

impl SensorDevice for SimulatedSensor {
    fn is_ready(&mut self) -> bool {
        self.state.ready.load(Ordering::Relaxed)
    }

    fn sample_fetch(&mut self) -> Result<Reading, SensorError> {
        self.state.fetches.fetch_add(1, Ordering::Relaxed);
        if self.state.failing.load(Ordering::Relaxed) {
            return Err(SensorError::Bus);
        }
        Ok(Reading {
            temperature_c: f32::from_bits(self.state.temperature_bits.load(Ordering::Relaxed)),
            humidity_pct: f32::from_bits(self.state.humidity_bits.load(Ordering::Relaxed)),
        })
    }
}
