//! Latest sample and current peer link, shared between the wireless stack's
//! callback context and the measurement worker.
//!
//! Both fields sit behind one critical-section mutex. Callers only copy
//! values in and out; nothing blocks or talks to the radio while the lock
//! is held.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

use crate::app::ports::ConnHandle;

/// Latest encoded reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Sample {
    /// 0.01 °C units.
    pub temperature: i16,
    /// 0.01 %RH units.
    pub humidity: u16,
}

#[derive(Debug, Default)]
struct Shared {
    sample: Sample,
    conn: Option<ConnHandle>,
}

/// Lock-guarded holder of [`Sample`] and the active [`ConnHandle`].
pub struct SampleStore {
    inner: Mutex<CriticalSectionRawMutex, RefCell<Shared>>,
}

impl SampleStore {
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(Shared {
                sample: Sample {
                    temperature: 0,
                    humidity: 0,
                },
                conn: None,
            })),
        }
    }

    pub fn write_sample(&self, sample: Sample) {
        self.inner.lock(|s| s.borrow_mut().sample = sample);
    }

    pub fn read_sample(&self) -> Sample {
        self.inner.lock(|s| s.borrow().sample)
    }

    pub fn set_connection(&self, conn: Option<ConnHandle>) {
        self.inner.lock(|s| s.borrow_mut().conn = conn);
    }

    pub fn get_connection(&self) -> Option<ConnHandle> {
        self.inner.lock(|s| s.borrow().conn)
    }

    /// Store the temperature and return the link to notify, in one critical section.
    pub fn store_temperature(&self, temperature: i16) -> Option<ConnHandle> {
        self.inner.lock(|s| {
            let mut s = s.borrow_mut();
            s.sample.temperature = temperature;
            s.conn
        })
    }

    /// Store the humidity and return the link to notify, in one critical section.
    pub fn store_humidity(&self, humidity: u16) -> Option<ConnHandle> {
        self.inner.lock(|s| {
            let mut s = s.borrow_mut();
            s.sample.humidity = humidity;
            s.conn
        })
    }
}

impl Default for SampleStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    #[test]
    fn starts_zeroed_and_disconnected() {
        let store = SampleStore::new();
        assert_eq!(store.read_sample(), Sample::default());
        assert_eq!(store.get_connection(), None);
    }

    #[test]
    fn field_stores_return_current_link() {
        let store = SampleStore::new();
        assert_eq!(store.store_temperature(2346), None);

        store.set_connection(Some(ConnHandle(3)));
        assert_eq!(store.store_humidity(4500), Some(ConnHandle(3)));
        assert_eq!(
            store.read_sample(),
            Sample {
                temperature: 2346,
                humidity: 4500
            }
        );
    }

    #[test]
    fn concurrent_writers_never_tear_a_sample() {
        let store = Arc::new(SampleStore::new());
        let writers: Vec<_> = (0..4i16)
            .map(|i| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for _ in 0..500 {
                        store.write_sample(Sample {
                            temperature: i,
                            humidity: i as u16,
                        });
                    }
                })
            })
            .collect();

        for _ in 0..500 {
            let s = store.read_sample();
            assert_eq!(s.temperature as u16, s.humidity);
        }
        for w in writers {
            w.join().unwrap();
        }
    }
}
