//! Node bring-up, characteristic updates and advertising payloads.

use envnode::Node;
use envnode::adapters::sim::SimRadio;
use envnode::advertising::MAX_PAYLOAD_LEN;
use envnode::error::{Error, LinkError, ServiceError};
use envnode::gatt::Characteristic;

use super::harness::{advertising_node, config};

#[test]
fn bring_up_installs_identity_then_advertises() {
    let (node, radio) = advertising_node();

    let identity = radio.identity().expect("identity installed");
    assert_eq!(identity.to_string(), node.config().static_address.as_str());
    assert!(radio.is_enabled());

    let params = radio.adv_params().expect("advertising started");
    assert!(params.connectable);

    let (adv, scan) = radio.advertising_data();
    assert_eq!(adv.len(), 30);
    assert!(scan.len() <= MAX_PAYLOAD_LEN);
    // Flags element leads the advertising payload.
    assert_eq!(&adv[..3], &[0x02, 0x01, 0x06]);
}

#[test]
fn advertising_before_initialize_is_refused() {
    let mut node = Node::new(config(), SimRadio::new()).unwrap();
    assert!(matches!(
        node.enable_and_start_advertising(),
        Err(Error::Config(_))
    ));
}

#[test]
fn invalid_address_rejected_at_construction() {
    let mut cfg = config();
    cfg.static_address = heapless::String::try_from("12:34:56:78:9A:BC").unwrap();
    assert!(matches!(
        Node::new(cfg, SimRadio::new()),
        Err(Error::Identity(_))
    ));
}

#[test]
fn oversized_name_rejected_at_construction() {
    let mut cfg = config();
    cfg.device_name = heapless::String::try_from("ENVIRONMENTAL_SENSOR_NODE").unwrap();
    assert!(matches!(
        Node::new(cfg, SimRadio::new()),
        Err(Error::Advertising(_))
    ));
}

#[test]
fn temperature_update_notifies_subscribed_peer() {
    let (node, radio) = advertising_node();
    let conn = radio.connect();
    radio.subscribe(Characteristic::Temperature);

    node.update_temperature(23.456).unwrap();

    assert_eq!(node.service().read_temperature(), 2346);
    let sent = radio.notifications();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].conn, conn);
    assert_eq!(sent[0].characteristic, Characteristic::Temperature);
    assert_eq!(sent[0].value, 2346i16.to_le_bytes());
}

#[test]
fn out_of_range_humidity_keeps_previous_value() {
    let (node, radio) = advertising_node();
    radio.connect();
    radio.subscribe(Characteristic::Humidity);

    node.update_humidity(45.0).unwrap();
    assert_eq!(
        node.update_humidity(-1.0),
        Err(ServiceError::OutOfRange)
    );

    assert_eq!(node.service().read_humidity(), 4500);
    assert_eq!(radio.read(Characteristic::Humidity), Some(4500u16.to_le_bytes()));
    assert_eq!(radio.notifications().len(), 1);
}

#[test]
fn update_without_connection_only_caches() {
    let (node, radio) = advertising_node();
    node.update_temperature(-5.5).unwrap();

    assert!(radio.notifications().is_empty());
    assert_eq!(radio.read(Characteristic::Temperature), Some((-550i16).to_le_bytes()));
}

#[test]
fn link_failure_is_reported_but_value_cached() {
    let (node, radio) = advertising_node();
    radio.connect();
    radio.subscribe(Characteristic::Temperature);
    radio.set_notify_failure(Some(LinkError::NoBuffers));

    assert_eq!(
        node.update_temperature(20.0),
        Err(ServiceError::Link(LinkError::NoBuffers))
    );
    assert_eq!(node.service().read_temperature(), 2000);
}

#[test]
fn counter_bump_republishes_payloads() {
    let (mut node, radio) = advertising_node();
    let (before, _) = radio.advertising_data();

    assert_eq!(node.increment_advertised_counter().unwrap(), 1);
    assert_eq!(node.increment_advertised_counter().unwrap(), 2);

    let (after, _) = radio.advertising_data();
    assert_eq!(radio.advertising_updates(), 2);
    assert_eq!(after.len(), before.len());
    assert_ne!(after, before);
    assert_eq!(node.advertised_counter(), 2);
}

#[test]
fn humidity_cached_before_connect_is_read_after() {
    let (node, radio) = advertising_node();

    assert_eq!(node.update_humidity(-1.0), Err(ServiceError::OutOfRange));
    assert_eq!(node.update_humidity(45.0), Ok(()));
    assert_eq!(node.service().read_humidity(), 4500);

    radio.connect();
    assert_eq!(radio.read(Characteristic::Humidity), Some(4500u16.to_le_bytes()));
}
