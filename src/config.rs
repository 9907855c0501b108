//! Node configuration parameters
//!
//! All tunable parameters for the sensor node. The firmware image ships
//! with [`NodeConfig::default`]; the host simulator can load overrides
//! from a JSON file.

use core::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Shortest advertising interval the link layer allows (ms).
const ADV_INTERVAL_FLOOR_MS: u16 = 20;
/// Longest advertising interval the link layer allows (ms).
const ADV_INTERVAL_CEIL_MS: u16 = 10_240;

/// Core node configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    // --- Identity ---
    /// Complete local name carried in the advertising payload
    pub device_name: heapless::String<29>,
    /// Bluetooth SIG company identifier for the vendor-specific element
    pub company_id: u16,
    /// Static random device address, `XX:XX:XX:XX:XX:XX`
    pub static_address: heapless::String<17>,

    // --- Advertising ---
    /// Minimum advertising interval (milliseconds)
    pub adv_interval_min_ms: u16,
    /// Maximum advertising interval (milliseconds)
    pub adv_interval_max_ms: u16,
    /// URI published in the scan response
    pub uri: heapless::String<64>,

    // --- Timing ---
    /// Delay between connection and the first measurement (seconds)
    pub first_measurement_delay_secs: u32,
    /// Measurement period while a peer is connected (seconds)
    pub measuring_period_secs: u32,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            // Identity
            device_name: fixed_str("TBZ_SHAM_SENSOR"),
            company_id: 0x0059, // Nordic Semiconductor ASA
            static_address: fixed_str("DE:8B:49:00:00:01"),

            // Advertising
            adv_interval_min_ms: 100,
            adv_interval_max_ms: 150,
            uri: fixed_str("https://github.com/TAREQ-TBZ"),

            // Timing
            first_measurement_delay_secs: 10,
            measuring_period_secs: 30,
        }
    }
}

impl NodeConfig {
    /// Parse a JSON document and validate it. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let config: Self =
            serde_json::from_str(json).map_err(|_| Error::Config("malformed JSON"))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make the node misbehave on air.
    pub fn validate(&self) -> Result<(), Error> {
        if self.device_name.is_empty() {
            return Err(Error::Config("device_name must not be empty"));
        }
        if self.adv_interval_min_ms < ADV_INTERVAL_FLOOR_MS
            || self.adv_interval_max_ms > ADV_INTERVAL_CEIL_MS
        {
            return Err(Error::Config("advertising interval outside 20..=10240 ms"));
        }
        if self.adv_interval_min_ms > self.adv_interval_max_ms {
            return Err(Error::Config("adv_interval_min_ms above adv_interval_max_ms"));
        }
        if self.measuring_period_secs == 0 {
            return Err(Error::Config("measuring_period_secs must be non-zero"));
        }
        Ok(())
    }

    pub fn first_measurement_delay(&self) -> Duration {
        Duration::from_secs(u64::from(self.first_measurement_delay_secs))
    }

    pub fn measuring_period(&self) -> Duration {
        Duration::from_secs(u64::from(self.measuring_period_secs))
    }
}

/// Build a fixed-capacity string from a literal known to fit.
fn fixed_str<const N: usize>(s: &str) -> heapless::String<N> {
    let mut out = heapless::String::new();
    for c in s.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}
