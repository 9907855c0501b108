//! Connection lifecycle: events, scheduling, link preferences.

use envnode::app::events::LifecycleEvent;
use envnode::app::ports::{MAX_DATA_LENGTH, PREFERRED_PHY, SchedulerState};
use envnode::gatt::Characteristic;

use super::harness::{advertising_node, measuring_node};

#[test]
fn connect_publishes_event_and_requests_link_preferences() {
    let (node, radio) = advertising_node();
    let bus = node.event_bus();

    let conn = radio.connect();

    assert_eq!(node.service().store().get_connection(), Some(conn));
    assert_eq!(bus.try_receive(), Some(LifecycleEvent::Connected));
    assert_eq!(radio.phy_requests(), vec![PREFERRED_PHY]);
    assert_eq!(radio.data_length_requests(), vec![MAX_DATA_LENGTH]);
}

#[test]
fn failed_connect_publishes_nothing() {
    let (node, radio) = advertising_node();
    let bus = node.event_bus();

    radio.fail_connect(0x3E);

    assert!(bus.is_empty());
    assert!(radio.phy_requests().is_empty());
}

#[test]
fn disconnect_clears_connection_and_subscriptions() {
    let (node, radio) = advertising_node();
    let bus = node.event_bus();
    radio.connect();
    radio.subscribe(Characteristic::Temperature);

    radio.disconnect(0x13);

    assert_eq!(node.service().store().get_connection(), None);
    assert!(!node.service().subscriptions().is_enabled(Characteristic::Temperature));
    assert_eq!(bus.try_receive(), Some(LifecycleEvent::Connected));
    assert_eq!(bus.try_receive(), Some(LifecycleEvent::Disconnected(0x13)));
}

#[test]
fn connect_schedules_first_measurement() {
    let (node, radio, _device, timer, mut main_loop) = measuring_node(21.0, 40.0);

    radio.connect();
    assert_eq!(main_loop.process_pending(), 1);

    assert!(main_loop.measuring_started());
    assert_eq!(
        timer.armed(),
        Some((
            node.config().first_measurement_delay(),
            node.config().measuring_period()
        ))
    );
}

#[test]
fn disconnect_cancels_measurements() {
    let (_node, radio, _device, timer, mut main_loop) = measuring_node(21.0, 40.0);

    radio.connect();
    radio.disconnect(0x13);
    assert_eq!(main_loop.process_pending(), 2);

    assert_eq!(timer.cancels(), 1);
    assert_eq!(main_loop.scheduler_state(), SchedulerState::Idle);
    assert!(!timer.fire());
}

#[test]
fn reconnect_leaves_exactly_one_schedule() {
    let (_node, radio, device, timer, mut main_loop) = measuring_node(21.0, 40.0);

    radio.connect();
    radio.disconnect(0x13);
    radio.connect();
    assert_eq!(main_loop.process_pending(), 3);

    assert_eq!(timer.arms(), 2);
    assert_eq!(timer.cancels(), 1);
    assert!(matches!(main_loop.scheduler_state(), SchedulerState::Scheduled(_)));

    assert!(timer.fire());
    assert_eq!(device.fetches(), 1);
}

#[test]
fn failed_connect_and_repeated_disconnect_cancel_once() {
    let (_node, radio, _device, timer, mut main_loop) = measuring_node(21.0, 40.0);

    radio.fail_connect(0x3E);
    radio.connect();
    radio.disconnect(0x08);
    radio.disconnect(0x08);
    main_loop.process_pending();

    assert_eq!(timer.cancels(), 1);
}
