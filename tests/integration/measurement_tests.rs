//! Measurement cycles end to end.

use std::thread;
use std::time::Duration;

use envnode::Node;
use envnode::NodeConfig;
use envnode::adapters::sim::SimRadio;
use envnode::app::ports::SchedulerState;
use envnode::gatt::Characteristic;
use envnode::sensors::HumidityTemperatureSensor;
use envnode::sensors::simulated::SimulatedSensor;

use super::harness::measuring_node;

#[test]
fn cycle_notifies_temperature_then_humidity() {
    let (_node, radio, _device, timer, mut main_loop) = measuring_node(22.5, 48.25);
    radio.connect();
    radio.subscribe(Characteristic::Temperature);
    radio.subscribe(Characteristic::Humidity);
    main_loop.process_pending();

    assert!(timer.fire());

    let sent = radio.take_notifications();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].characteristic, Characteristic::Temperature);
    assert_eq!(sent[0].value, 2250i16.to_le_bytes());
    assert_eq!(sent[1].characteristic, Characteristic::Humidity);
    assert_eq!(sent[1].value, 4825u16.to_le_bytes());
}

#[test]
fn sensor_failure_skips_cycle_and_keeps_values() {
    let (node, radio, device, timer, mut main_loop) = measuring_node(22.5, 48.25);
    radio.connect();
    radio.subscribe(Characteristic::Temperature);
    main_loop.process_pending();
    assert!(timer.fire());
    radio.take_notifications();

    device.set_failing(true);
    device.set_reading(30.0, 60.0);
    assert!(timer.fire());

    assert!(radio.notifications().is_empty());
    assert_eq!(node.service().read_temperature(), 2250);
    assert!(matches!(main_loop.scheduler_state(), SchedulerState::Scheduled(_)));
}

#[test]
fn out_of_range_temperature_still_updates_humidity() {
    let (node, radio, device, timer, mut main_loop) = measuring_node(22.5, 48.25);
    radio.connect();
    radio.subscribe(Characteristic::Humidity);
    main_loop.process_pending();

    device.set_reading(130.0, 55.0);
    assert!(timer.fire());

    assert_eq!(node.service().read_temperature(), 0);
    assert_eq!(node.service().read_humidity(), 5500);
    assert_eq!(radio.notifications().len(), 1);
}

#[test]
fn worker_thread_measures_until_disconnect() {
    let radio = SimRadio::new();
    let config = NodeConfig {
        first_measurement_delay_secs: 0,
        measuring_period_secs: 60,
        ..NodeConfig::default()
    };
    let mut node = Node::new(config, radio.clone()).unwrap();
    node.initialize().unwrap();
    node.enable_and_start_advertising().unwrap();

    let device = SimulatedSensor::new(19.0, 35.0);
    let sensor = HumidityTemperatureSensor::new(device.clone()).unwrap();
    let mut main_loop = node.spawn_measurements(sensor).unwrap();

    radio.connect();
    radio.subscribe(Characteristic::Temperature);
    main_loop.process_pending();

    let mut waited = Duration::ZERO;
    while device.fetches() == 0 && waited < Duration::from_secs(2) {
        thread::sleep(Duration::from_millis(10));
        waited += Duration::from_millis(10);
    }
    assert_eq!(device.fetches(), 1);

    radio.disconnect(0x13);
    main_loop.process_pending();
    assert_eq!(main_loop.scheduler_state(), SchedulerState::Idle);
    assert_eq!(node.service().read_temperature(), 1900);
}
