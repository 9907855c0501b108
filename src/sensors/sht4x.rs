//! Sensirion SHT4x humidity/temperature sensor over I2C.
//!
//! Every command is a single byte; every response is a sequence of 16-bit
//! big-endian words, each followed by a CRC-8 (poly 0x31, init 0xFF).
//!
//! Conversion (datasheet §4.6):
//!   T  = -45 + 175 · S_T  / 65535   [°C]
//!   RH =  -6 + 125 · S_RH / 65535   [%], clamped to 0..=100

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use log::warn;

use super::SensorDevice;
use crate::app::ports::Reading;
use crate::error::SensorError;

pub const DEFAULT_ADDRESS: u8 = 0x44;

const CMD_MEASURE_HIGH_PRECISION: u8 = 0xFD;
const CMD_SOFT_RESET: u8 = 0x94;
const CMD_READ_SERIAL: u8 = 0x89;

const MEASURE_HIGH_PRECISION_MS: u32 = 10;
const SOFT_RESET_MS: u32 = 1;

/// Sensirion CRC-8 over one data word.
pub fn crc8(data: &[u8]) -> u8 {
    let mut crc: u8 = 0xFF;
    for &byte in data {
        crc ^= byte;
        for _ in 0..8 {
            if crc & 0x80 != 0 {
                crc = (crc << 1) ^ 0x31;
            } else {
                crc <<= 1;
            }
        }
    }
    crc
}

/// Split a 6-byte response into its two CRC-checked words.
fn words(buf: &[u8; 6]) -> Result<(u16, u16), SensorError> {
    for chunk in buf.chunks_exact(3) {
        if crc8(&chunk[..2]) != chunk[2] {
            return Err(SensorError::Crc);
        }
    }
    Ok((
        u16::from_be_bytes([buf[0], buf[1]]),
        u16::from_be_bytes([buf[3], buf[4]]),
    ))
}

pub fn convert_temperature(raw: u16) -> f32 {
    -45.0 + 175.0 * f32::from(raw) / 65535.0
}

pub fn convert_humidity(raw: u16) -> f32 {
    (-6.0 + 125.0 * f32::from(raw) / 65535.0).clamp(0.0, 100.0)
}

pub struct Sht4x<I2C, D> {
    i2c: I2C,
    delay: D,
    address: u8,
}

impl<I2C: I2c, D: DelayNs> Sht4x<I2C, D> {
    pub fn new(i2c: I2C, delay: D) -> Self {
        Self::with_address(i2c, delay, DEFAULT_ADDRESS)
    }

    pub fn with_address(i2c: I2C, delay: D, address: u8) -> Self {
        Self {
            i2c,
            delay,
            address,
        }
    }

    fn command(&mut self, cmd: u8, wait_ms: u32) -> Result<(), SensorError> {
        self.i2c.write(self.address, &[cmd]).map_err(|e| {
            warn!("SHT4x command 0x{cmd:02x} failed: {e:?}");
            SensorError::Bus
        })?;
        self.delay.delay_ms(wait_ms);
        Ok(())
    }

    fn read_words(&mut self) -> Result<(u16, u16), SensorError> {
        let mut buf = [0u8; 6];
        self.i2c
            .read(self.address, &mut buf)
            .map_err(|_| SensorError::Bus)?;
        words(&buf)
    }

    pub fn soft_reset(&mut self) -> Result<(), SensorError> {
        self.command(CMD_SOFT_RESET, SOFT_RESET_MS)
    }

    pub fn serial_number(&mut self) -> Result<u32, SensorError> {
        self.command(CMD_READ_SERIAL, SOFT_RESET_MS)?;
        let (hi, lo) = self.read_words()?;
        Ok((u32::from(hi) << 16) | u32::from(lo))
    }

    /// High-precision single shot.
    pub fn measure(&mut self) -> Result<Reading, SensorError> {
        self.command(CMD_MEASURE_HIGH_PRECISION, MEASURE_HIGH_PRECISION_MS)?;
        let (t, rh) = self.read_words()?;
        Ok(Reading {
            temperature_c: convert_temperature(t),
            humidity_pct: convert_humidity(rh),
        })
    }

    pub fn release(self) -> (I2C, D) {
        (self.i2c, self.delay)
    }
}

impl<I2C: I2c, D: DelayNs> SensorDevice for Sht4x<I2C, D> {
    fn is_ready(&mut self) -> bool {
        self.soft_reset().is_ok() && self.serial_number().is_ok()
    }

    fn sample_fetch(&mut self) -> Result<Reading, SensorError> {
        self.measure()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use embedded_hal::i2c::{ErrorKind, ErrorType, Operation};

    use super::*;

    #[derive(Default)]
    struct FakeBus {
        writes: Vec<u8>,
        responses: VecDeque<[u8; 6]>,
        nack: bool,
    }

    impl ErrorType for FakeBus {
        type Error = ErrorKind;
    }

    impl I2c for FakeBus {
        fn transaction(
            &mut self,
            address: u8,
            operations: &mut [Operation<'_>],
        ) -> Result<(), Self::Error> {
            assert_eq!(address, DEFAULT_ADDRESS);
            if self.nack {
                return Err(ErrorKind::Other);
            }
            for op in operations {
                match op {
                    Operation::Write(bytes) => self.writes.extend_from_slice(bytes),
                    Operation::Read(buf) => {
                        let resp = self.responses.pop_front().ok_or(ErrorKind::Other)?;
                        buf.copy_from_slice(&resp[..buf.len()]);
                    }
                }
            }
            Ok(())
        }
    }

    struct NoDelay;

    impl DelayNs for NoDelay {
        fn delay_ns(&mut self, _ns: u32) {}
    }

    fn frame(a: u16, b: u16) -> [u8; 6] {
        let [a0, a1] = a.to_be_bytes();
        let [b0, b1] = b.to_be_bytes();
        [a0, a1, crc8(&[a0, a1]), b0, b1, crc8(&[b0, b1])]
    }

    #[test]
    fn crc_matches_datasheet_example() {
        assert_eq!(crc8(&[0xBE, 0xEF]), 0x92);
    }

    #[test]
    fn measure_converts_raw_words() {
        let mut bus = FakeBus::default();
        bus.responses.push_back(frame(0x6666, 0x8000));
        let mut sht = Sht4x::new(bus, NoDelay);

        let r = sht.measure().unwrap();
        assert!((r.temperature_c - 25.0).abs() < 0.01);
        assert!((r.humidity_pct - 56.5).abs() < 0.01);

        let (bus, _) = sht.release();
        assert_eq!(bus.writes, [CMD_MEASURE_HIGH_PRECISION]);
    }

    #[test]
    fn corrupted_word_is_rejected() {
        let mut bus = FakeBus::default();
        let mut f = frame(0x6666, 0x8000);
        f[5] ^= 0xFF;
        bus.responses.push_back(f);
        let mut sht = Sht4x::new(bus, NoDelay);
        assert_eq!(sht.measure(), Err(SensorError::Crc));
    }

    #[test]
    fn humidity_is_clamped() {
        assert_eq!(convert_humidity(0), 0.0);
        assert_eq!(convert_humidity(u16::MAX), 100.0);
    }

    #[test]
    fn ready_probe_resets_and_reads_serial() {
        let mut bus = FakeBus::default();
        bus.responses.push_back(frame(0x1234, 0x5678));
        let mut sht = Sht4x::new(bus, NoDelay);
        assert!(sht.is_ready());
        let (bus, _) = sht.release();
        assert_eq!(bus.writes, [CMD_SOFT_RESET, CMD_READ_SERIAL]);

        let bus = FakeBus {
            nack: true,
            ..FakeBus::default()
        };
        assert!(!Sht4x::new(bus, NoDelay).is_ready());
    }
}
