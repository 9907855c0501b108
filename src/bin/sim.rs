//! Host simulator.
//!
//! Runs the node against the in-process radio and a simulated sensor and
//! plays one central session: connect, subscribe, receive a few
//! measurements, watch the advertised counter move, disconnect.
//!
//! ```text
//! envnode-sim [config.json]
//! RUST_LOG=debug envnode-sim
//! ```

#[cfg(not(target_os = "espidf"))]
fn main() -> anyhow::Result<()> {
    host::run()
}

#[cfg(target_os = "espidf")]
fn main() {}

#[cfg(not(target_os = "espidf"))]
mod host {
    use std::thread;
    use std::time::Duration;

    use anyhow::{Context, Result};
    use log::info;

    use envnode::adapters::sim::SimRadio;
    use envnode::gatt::{Characteristic, decode_humidity, decode_temperature};
    use envnode::sensors::HumidityTemperatureSensor;
    use envnode::sensors::simulated::SimulatedSensor;
    use envnode::{Node, NodeConfig};

    const SESSION_CYCLES: u32 = 3;
    const COUNTER_BUMPS: u32 = 3;

    fn load_config() -> Result<NodeConfig> {
        match std::env::args().nth(1) {
            Some(path) => {
                let json = std::fs::read_to_string(&path)
                    .with_context(|| format!("reading config {path}"))?;
                Ok(NodeConfig::from_json(&json)?)
            }
            None => Ok(NodeConfig {
                first_measurement_delay_secs: 1,
                measuring_period_secs: 2,
                ..NodeConfig::default()
            }),
        }
    }

    pub fn run() -> Result<()> {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Info)
            .format_timestamp_millis()
            .init();

        let config = load_config()?;
        let first_delay = config.first_measurement_delay();
        let period = config.measuring_period();

        let radio = SimRadio::new();
        let mut node = Node::new(config, radio.clone())?;
        node.initialize()?;
        node.enable_and_start_advertising()?;

        let device = SimulatedSensor::new(21.5, 40.0);
        let sensor = HumidityTemperatureSensor::new(device.clone())?;
        let mut main_loop = node.spawn_measurements(sensor)?;

        let conn = radio.connect();
        radio.subscribe(Characteristic::Temperature);
        radio.subscribe(Characteristic::Humidity);
        main_loop.process_pending();

        thread::sleep(first_delay + Duration::from_millis(200));
        for cycle in 0..SESSION_CYCLES {
            for n in radio.take_notifications() {
                let bytes = [n.value[0], n.value[1]];
                match n.characteristic {
                    Characteristic::Temperature => {
                        info!("{conn} <- temperature {:.2} C", decode_temperature(i16::from_le_bytes(bytes)));
                    }
                    Characteristic::Humidity => {
                        info!("{conn} <- humidity {:.2} %", decode_humidity(u16::from_le_bytes(bytes)));
                    }
                }
            }
            device.set_reading(21.5 + cycle as f32 * 0.75, 40.0 + cycle as f32 * 1.5);
            thread::sleep(period);
        }

        for _ in 0..COUNTER_BUMPS {
            node.increment_advertised_counter()?;
        }

        radio.disconnect(0x13);
        main_loop.process_pending();
        info!(
            "session over: {} fetches, scheduler {:?}, {} advertising updates",
            device.fetches(),
            main_loop.scheduler_state(),
            radio.advertising_updates()
        );
        Ok(())
    }
}
