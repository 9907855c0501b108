//! Humidity/temperature sensing.
//!
//! [`HumidityTemperatureSensor`] wraps one [`SensorDevice`] driver, checks
//! it is ready at construction and caches the last good reading. It is the
//! [`SensorPort`] the measurement cycle consumes.

pub mod sht4x;
pub mod simulated;

use log::{debug, error};

use crate::app::ports::{Reading, SensorPort};
use crate::error::SensorError;

/// Minimal driver contract: a readiness probe and a blocking
/// trigger-and-fetch.
pub trait SensorDevice {
    fn is_ready(&mut self) -> bool;
    fn sample_fetch(&mut self) -> Result<Reading, SensorError>;
}

pub struct HumidityTemperatureSensor<D: SensorDevice> {
    dev: D,
    last: Option<Reading>,
}

impl<D: SensorDevice> HumidityTemperatureSensor<D> {
    pub fn new(mut dev: D) -> Result<Self, SensorError> {
        if !dev.is_ready() {
            error!("humidity/temperature sensor not ready");
            return Err(SensorError::DeviceNotReady);
        }
        debug!("humidity/temperature sensor initialised");
        Ok(Self { dev, last: None })
    }

    /// Fetch a fresh sample and cache it.
    pub fn trigger_measurement(&mut self) -> Result<Reading, SensorError> {
        let r = self.dev.sample_fetch()?;
        debug!(
            "temperature {:.2} °C, humidity {:.2} %",
            r.temperature_c, r.humidity_pct
        );
        self.last = Some(r);
        Ok(r)
    }

    /// Last measured temperature, if any measurement succeeded yet.
    pub fn temperature(&self) -> Option<f32> {
        self.last.map(|r| r.temperature_c)
    }

    pub fn humidity(&self) -> Option<f32> {
        self.last.map(|r| r.humidity_pct)
    }
}

impl<D: SensorDevice + Send> SensorPort for HumidityTemperatureSensor<D> {
    fn measure(&mut self) -> Result<Reading, SensorError> {
        self.trigger_measurement()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use simulated::SimulatedSensor;

    #[test]
    fn not_ready_device_is_rejected() {
        let dev = SimulatedSensor::new(20.0, 50.0);
        dev.set_ready(false);
        assert!(matches!(
            HumidityTemperatureSensor::new(dev),
            Err(SensorError::DeviceNotReady)
        ));
    }

    #[test]
    fn caches_last_good_reading() {
        let dev = SimulatedSensor::new(21.5, 48.0);
        let mut s = HumidityTemperatureSensor::new(dev.clone()).unwrap();
        assert_eq!(s.temperature(), None);

        s.measure().unwrap();
        assert_eq!(s.temperature(), Some(21.5));

        dev.set_failing(true);
        assert_eq!(s.measure(), Err(SensorError::Bus));
        assert_eq!(s.humidity(), Some(48.0));
    }
}
