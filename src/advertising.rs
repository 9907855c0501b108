//! Advertising and scan-response payload assembly.
//!
//! ```text
//! Advertising (≤ 31 bytes)                 Scan response (≤ 31 bytes)
//! ┌───────────────────────────────┐        ┌──────────────────────────┐
//! │ Flags             0x01  [06]  │        │ URI  0x24  [17] //host…  │
//! │ UUID16 complete   0x03  1A 18 │        └──────────────────────────┘
//! │ Complete name     0x09  …     │
//! │ Manufacturer      0xFF  CC CC │  company id LE
//! │                         NN NN │  counter LE
//! └───────────────────────────────┘
//! ```
//!
//! Each element costs `data.len() + 2` bytes on air. Sizes are checked once
//! at construction; only the counter changes afterwards and it never changes
//! the encoded length.

use log::{debug, info};

use crate::app::ports::AdvertiserPort;
use crate::config::NodeConfig;
use crate::error::{AdvertisingError, Error, PayloadKind};
use crate::gatt::ENVIRONMENTAL_SENSING_SERVICE;

/// Link-layer limit for either payload.
pub const MAX_PAYLOAD_LEN: usize = 31;
/// Largest data field of one element (length and type octets excluded).
pub const MAX_ELEMENT_DATA_LEN: usize = MAX_PAYLOAD_LEN - 2;

pub const AD_TYPE_FLAGS: u8 = 0x01;
pub const AD_TYPE_UUID16_ALL: u8 = 0x03;
pub const AD_TYPE_NAME_COMPLETE: u8 = 0x09;
pub const AD_TYPE_URI: u8 = 0x24;
pub const AD_TYPE_MANUFACTURER_DATA: u8 = 0xFF;

/// LE General Discoverable, BR/EDR not supported.
pub const FLAGS_GENERAL_NO_BREDR: u8 = 0x06;

/// Encoded advertising or scan-response payload.
pub type Payload = heapless::Vec<u8, MAX_PAYLOAD_LEN>;

/// One `length, type, data` structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdElement {
    pub ad_type: u8,
    pub data: heapless::Vec<u8, MAX_ELEMENT_DATA_LEN>,
}

impl AdElement {
    pub fn new(ad_type: u8, data: &[u8]) -> Result<Self, AdvertisingError> {
        let data = heapless::Vec::from_slice(data).map_err(|()| AdvertisingError::ElementTooLong)?;
        Ok(Self { ad_type, data })
    }

    pub fn encoded_len(&self) -> usize {
        self.data.len() + 2
    }
}

/// Bytes `elements` occupy on air.
pub fn total_size(elements: &[AdElement]) -> usize {
    elements.iter().map(AdElement::encoded_len).sum()
}

fn encode(elements: &[AdElement], payload: PayloadKind) -> Result<Payload, AdvertisingError> {
    let size = total_size(elements);
    let too_large = AdvertisingError::PayloadTooLarge { payload, size };
    if size > MAX_PAYLOAD_LEN {
        return Err(too_large);
    }
    let mut out = Payload::new();
    for e in elements {
        out.push((e.data.len() + 1) as u8).map_err(|_| too_large)?;
        out.push(e.ad_type).map_err(|_| too_large)?;
        out.extend_from_slice(&e.data).map_err(|()| too_large)?;
    }
    Ok(out)
}

/// Vendor-specific element body: company identifier and a rolling counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VendorData {
    pub company_id: u16,
    pub counter: u16,
}

impl VendorData {
    pub fn to_bytes(self) -> [u8; 4] {
        let c = self.company_id.to_le_bytes();
        let n = self.counter.to_le_bytes();
        [c[0], c[1], n[0], n[1]]
    }
}

/// URI scheme name-string codes from the assigned-numbers table.
const URI_SCHEMES: &[(&str, u8)] = &[("https:", 0x17), ("http:", 0x16)];

/// Compress a URI for the URI element: scheme code followed by the remainder.
pub fn encode_uri(uri: &str) -> Result<heapless::Vec<u8, MAX_ELEMENT_DATA_LEN>, AdvertisingError> {
    let (rest, code) = URI_SCHEMES
        .iter()
        .find_map(|&(scheme, code)| uri.strip_prefix(scheme).map(|rest| (rest, code)))
        .ok_or(AdvertisingError::UnsupportedUriScheme)?;

    let mut out = heapless::Vec::new();
    out.push(code).map_err(|_| AdvertisingError::ElementTooLong)?;
    out.extend_from_slice(rest.as_bytes())
        .map_err(|()| AdvertisingError::ElementTooLong)?;
    Ok(out)
}

/// Owns the broadcast payloads. The only mutable part is the vendor counter.
///
/// Mutation goes through `&mut self`, so the single-writer rule for the
/// counter is enforced by the borrow checker rather than a lock.
#[derive(Debug, Clone)]
pub struct AdvertisingPayloadBuilder {
    name: AdElement,
    uri: AdElement,
    vendor: VendorData,
}

impl AdvertisingPayloadBuilder {
    /// Build and size-check both payloads.
    pub fn new(device_name: &str, company_id: u16, uri: &str) -> Result<Self, AdvertisingError> {
        let name = AdElement::new(AD_TYPE_NAME_COMPLETE, device_name.as_bytes())?;
        let uri = AdElement {
            ad_type: AD_TYPE_URI,
            data: encode_uri(uri)?,
        };
        let builder = Self {
            name,
            uri,
            vendor: VendorData {
                company_id,
                counter: 0,
            },
        };

        let adv = builder.encode_advertising()?;
        let scan = builder.encode_scan_response()?;
        debug!(
            "advertising payload {} bytes, scan response {} bytes",
            adv.len(),
            scan.len()
        );
        Ok(builder)
    }

    pub fn from_config(config: &NodeConfig) -> Result<Self, AdvertisingError> {
        Self::new(&config.device_name, config.company_id, &config.uri)
    }

    pub fn counter(&self) -> u16 {
        self.vendor.counter
    }

    pub fn advertising_elements(&self) -> [AdElement; 4] {
        let uuid = ENVIRONMENTAL_SENSING_SERVICE.to_le_bytes();
        let mut flags = heapless::Vec::new();
        let mut uuids = heapless::Vec::new();
        let mut vendor = heapless::Vec::new();
        // Capacities are far above these lengths.
        let _ = flags.push(FLAGS_GENERAL_NO_BREDR);
        let _ = uuids.extend_from_slice(&uuid);
        let _ = vendor.extend_from_slice(&self.vendor.to_bytes());
        [
            AdElement {
                ad_type: AD_TYPE_FLAGS,
                data: flags,
            },
            AdElement {
                ad_type: AD_TYPE_UUID16_ALL,
                data: uuids,
            },
            self.name.clone(),
            AdElement {
                ad_type: AD_TYPE_MANUFACTURER_DATA,
                data: vendor,
            },
        ]
    }

    pub fn scan_response_elements(&self) -> [AdElement; 1] {
        [self.uri.clone()]
    }

    pub fn encode_advertising(&self) -> Result<Payload, AdvertisingError> {
        encode(&self.advertising_elements(), PayloadKind::Advertising)
    }

    pub fn encode_scan_response(&self) -> Result<Payload, AdvertisingError> {
        encode(&self.scan_response_elements(), PayloadKind::ScanResponse)
    }

    /// Increment the counter (wrapping) and push both payloads to the radio.
    pub fn bump_counter_and_republish(
        &mut self,
        radio: &mut impl AdvertiserPort,
    ) -> Result<u16, Error> {
        self.vendor.counter = self.vendor.counter.wrapping_add(1);
        let adv = self.encode_advertising()?;
        let scan = self.encode_scan_response()?;
        radio.update_advertising_data(&adv, &scan)?;
        info!("advertised counter now {}", self.vendor.counter);
        Ok(self.vendor.counter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::ports::AdvParams;
    use crate::error::LinkError;
    use crate::identity::StaticAddress;

    #[test]
    fn default_payload_layout() {
        let b = AdvertisingPayloadBuilder::from_config(&NodeConfig::default()).unwrap();
        let adv = b.encode_advertising().unwrap();
        assert_eq!(adv.len(), 30);
        assert_eq!(&adv[..7], &[0x02, 0x01, 0x06, 0x03, 0x03, 0x1A, 0x18]);
        assert_eq!(adv[7], 16);
        assert_eq!(adv[8], AD_TYPE_NAME_COMPLETE);
        assert_eq!(&adv[9..24], b"TBZ_SHAM_SENSOR");
        assert_eq!(&adv[24..], &[0x05, 0xFF, 0x59, 0x00, 0x00, 0x00]);

        let scan = b.encode_scan_response().unwrap();
        assert_eq!(scan[1], AD_TYPE_URI);
        assert_eq!(scan[2], 0x17);
        assert_eq!(&scan[3..], b"//github.com/TAREQ-TBZ");
        assert_eq!(scan[0] as usize, scan.len() - 1);
    }

    #[derive(Default)]
    struct RecordingAdvertiser {
        advertising: Vec<u8>,
        updates: u32,
    }

    impl AdvertiserPort for RecordingAdvertiser {
        fn create_identity(&mut self, _address: StaticAddress) -> Result<(), LinkError> {
            Ok(())
        }
        fn enable(&mut self) -> Result<(), LinkError> {
            Ok(())
        }
        fn start_advertising(
            &mut self,
            _params: &AdvParams,
            _advertising: &[u8],
            _scan_response: &[u8],
        ) -> Result<(), LinkError> {
            Ok(())
        }
        fn update_advertising_data(
            &mut self,
            advertising: &[u8],
            _scan_response: &[u8],
        ) -> Result<(), LinkError> {
            self.advertising = advertising.to_vec();
            self.updates += 1;
            Ok(())
        }
    }

    #[test]
    fn counter_wraps_without_changing_payload_size() {
        let mut b = AdvertisingPayloadBuilder::from_config(&NodeConfig::default()).unwrap();
        b.vendor.counter = u16::MAX;
        let mut radio = RecordingAdvertiser::default();

        assert_eq!(b.bump_counter_and_republish(&mut radio).unwrap(), 0);
        assert_eq!(radio.updates, 1);
        assert_eq!(radio.advertising.len(), 30);
        assert_eq!(&radio.advertising[28..], &[0x00, 0x00]);
    }

    #[test]
    fn total_size_counts_header_octets() {
        let e = [
            AdElement::new(AD_TYPE_FLAGS, &[0x06]).unwrap(),
            AdElement::new(AD_TYPE_NAME_COMPLETE, b"abc").unwrap(),
        ];
        assert_eq!(total_size(&e), 3 + 5);
    }

    #[test]
    fn long_name_is_rejected() {
        let err = AdvertisingPayloadBuilder::new("A_VERY_LONG_SENSOR_NAME_X", 0x0059, "https://x")
            .unwrap_err();
        assert_eq!(
            err,
            AdvertisingError::PayloadTooLarge {
                payload: PayloadKind::Advertising,
                size: 40
            }
        );
    }

    #[test]
    fn unknown_uri_scheme_is_rejected() {
        assert_eq!(
            encode_uri("ftp://example.org").unwrap_err(),
            AdvertisingError::UnsupportedUriScheme
        );
        assert_eq!(encode_uri("http://a").unwrap().as_slice(), &[0x16, b'/', b'/', b'a']);
    }

    #[test]
    fn vendor_bytes_are_little_endian() {
        let v = VendorData {
            company_id: 0x0059,
            counter: 0x0102,
        };
        assert_eq!(v.to_bytes(), [0x59, 0x00, 0x02, 0x01]);
    }
}
