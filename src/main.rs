//! EnvNode firmware: main entry point.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  EspRadio (Bluedroid)            Sht4x over I2C0             │
//! │  GATT · link · advertising       HumidityTemperatureSensor   │
//! │                                                              │
//! │  ──────────────── Port Trait Boundary ─────────────────      │
//! │                                                              │
//! │  PeripheralService   ConnectionLifecycleMonitor   EventBus   │
//! │  MeasurementScheduler (ThreadTimer "measure")   MainLoop     │
//! └──────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use esp_idf_hal::delay::Delay;
use esp_idf_hal::i2c::{I2cConfig, I2cDriver};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::units::Hertz;
use log::{error, info};

use envnode::adapters::ble::EspRadio;
use envnode::sensors::HumidityTemperatureSensor;
use envnode::sensors::sht4x::Sht4x;
use envnode::{Node, NodeConfig};

const I2C_BAUDRATE: Hertz = Hertz(100_000);

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("EnvNode v{}", env!("CARGO_PKG_VERSION"));

    // ── 2. Sensor ─────────────────────────────────────────────
    let peripherals = Peripherals::take()?;
    let i2c = I2cDriver::new(
        peripherals.i2c0,
        peripherals.pins.gpio8,
        peripherals.pins.gpio9,
        &I2cConfig::new().baudrate(I2C_BAUDRATE),
    )?;
    let sensor = match HumidityTemperatureSensor::new(Sht4x::new(i2c, Delay::new_default())) {
        Ok(s) => s,
        Err(e) => {
            error!("Humidity/temperature sensor not ready: {e}");
            return Err(e.into());
        }
    };

    // ── 3. BLE ────────────────────────────────────────────────
    let config = NodeConfig::default();
    let mut node = Node::new(config, EspRadio::new())?;
    node.initialize()?;
    node.enable_and_start_advertising()?;
    info!("Bluetooth initialized");

    // ── 4. Event loop ─────────────────────────────────────────
    let mut main_loop = node.spawn_measurements(sensor)?;
    main_loop.run_blocking();
    Ok(())
}
