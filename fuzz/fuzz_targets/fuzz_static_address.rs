//! Fuzz target: `StaticAddress` parsing
//!
//! Invariants checked:
//! - No panics under any byte sequence
//! - Every accepted address has the two static-random marker bits set
//! - Display output parses back to the same address
//!
//! cargo fuzz run fuzz_static_address

#![no_main]

use envnode::identity::StaticAddress;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = core::str::from_utf8(data) else {
        return;
    };
    let Ok(addr) = text.parse::<StaticAddress>() else {
        return;
    };
    assert_eq!(addr.octets()[0] & 0xC0, 0xC0);
    assert_eq!(addr.to_string().parse::<StaticAddress>(), Ok(addr));
});
