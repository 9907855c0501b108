//! Fuzz target: `NodeConfig::from_json` into `Node::new`
//!
//! Invariants checked:
//! - No panics under any byte sequence
//! - A configuration the node accepts always produces payloads that fit a
//!   single advertising PDU
//!
//! cargo fuzz run fuzz_node_config

#![no_main]

use envnode::adapters::sim::SimRadio;
use envnode::advertising::{AdvertisingPayloadBuilder, MAX_PAYLOAD_LEN};
use envnode::{Node, NodeConfig};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(json) = core::str::from_utf8(data) else {
        return;
    };
    let Ok(config) = NodeConfig::from_json(json) else {
        return;
    };

    if let Ok(builder) = AdvertisingPayloadBuilder::from_config(&config) {
        let adv = builder.encode_advertising().expect("validated at construction");
        let scan = builder.encode_scan_response().expect("validated at construction");
        assert!(adv.len() <= MAX_PAYLOAD_LEN);
        assert!(scan.len() <= MAX_PAYLOAD_LEN);
    }

    let _ = Node::new(config, SimRadio::new());
});
