//! Thread-backed cancellable periodic timer.
//!
//! One dedicated worker thread owns the work closure and sleeps on a
//! condition variable until the slot's due time. The slot holds at most one
//! due time, so re-arming replaces rather than stacks.
//!
//! # ESP-IDF threading
//!
//! `std::thread` maps onto pthreads, which ESP-IDF implements as FreeRTOS
//! tasks. `esp_pthread_set_cfg()` configures the *next* `pthread_create()`
//! from the calling thread, so config and spawn must not interleave with
//! other thread creation on the same thread.

use core::time::Duration;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Instant;

use log::{debug, warn};

use crate::app::ports::{SchedulerState, WorkTimer};
use crate::error::Error;

/// Stack for the measurement worker: the sensor driver and one
/// notification are all it ever runs.
pub const WORKER_STACK_KB: usize = 6;

#[derive(Debug, Default)]
struct Slot {
    /// Set by `arm`, cleared by `cancel`. Governs re-arming after a firing.
    armed: bool,
    due: Option<Instant>,
    period: Duration,
    running: bool,
    /// `arm` called mid-firing: first due time after the firing ends.
    next_delay: Option<Duration>,
    shutdown: bool,
    fires: u64,
}

struct Shared {
    slot: Mutex<Slot>,
    cv: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// [`WorkTimer`] running its work on a single named thread.
pub struct ThreadTimer {
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
    worker_id: ThreadId,
}

impl ThreadTimer {
    /// Spawn the worker. It idles until the first [`arm`](WorkTimer::arm).
    pub fn spawn(
        name: &'static str,
        work: impl FnMut() + Send + 'static,
    ) -> Result<Self, Error> {
        let shared = Arc::new(Shared {
            slot: Mutex::new(Slot::default()),
            cv: Condvar::new(),
        });
        let worker_shared = Arc::clone(&shared);
        let worker = spawn_worker(name, WORKER_STACK_KB, move || {
            worker_loop(&worker_shared, work);
        })?;
        let worker_id = worker.thread().id();
        Ok(Self {
            shared,
            worker: Some(worker),
            worker_id,
        })
    }

    /// Completed firings since spawn.
    pub fn fires(&self) -> u64 {
        self.shared.lock().fires
    }
}

fn worker_loop(shared: &Shared, mut work: impl FnMut()) {
    let mut slot = shared.lock();
    loop {
        if slot.shutdown {
            return;
        }
        let Some(due) = slot.due else {
            slot = shared.cv.wait(slot).unwrap_or_else(PoisonError::into_inner);
            continue;
        };
        let now = Instant::now();
        if now < due {
            slot = shared
                .cv
                .wait_timeout(slot, due - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
            continue;
        }

        slot.due = None;
        slot.running = true;
        drop(slot);

        work();

        slot = shared.lock();
        slot.running = false;
        slot.fires += 1;
        if slot.armed {
            let delay = slot.next_delay.take().unwrap_or(slot.period);
            slot.due = Some(Instant::now() + delay);
        }
        shared.cv.notify_all();
    }
}

impl WorkTimer for ThreadTimer {
    fn arm(&self, delay: Duration, period: Duration) {
        let mut slot = self.shared.lock();
        slot.armed = true;
        slot.period = period;
        if slot.running {
            slot.next_delay = Some(delay);
        } else {
            slot.due = Some(Instant::now() + delay);
        }
        debug!("timer armed: delay {delay:?}, period {period:?}");
        self.shared.cv.notify_all();
    }

    fn cancel(&self) {
        let mut slot = self.shared.lock();
        slot.armed = false;
        slot.due = None;
        slot.next_delay = None;
        self.shared.cv.notify_all();

        if thread::current().id() == self.worker_id {
            warn!("timer cancelled from its own work item; not waiting");
            return;
        }
        while slot.running {
            slot = self
                .shared
                .cv
                .wait(slot)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    fn state(&self) -> SchedulerState {
        let slot = self.shared.lock();
        match (slot.running, slot.due) {
            (true, _) => SchedulerState::Running,
            (false, Some(due)) => SchedulerState::Scheduled(due),
            (false, None) => SchedulerState::Idle,
        }
    }
}

impl Drop for ThreadTimer {
    fn drop(&mut self) {
        {
            let mut slot = self.shared.lock();
            slot.shutdown = true;
            slot.armed = false;
            slot.due = None;
        }
        self.shared.cv.notify_all();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("timer worker panicked");
            }
        }
    }
}

// ── Thread spawn ─────────────────────────────────────────────

/// Spawn a named worker thread with an explicit stack size.
#[cfg(all(target_os = "espidf", feature = "espidf"))]
pub fn spawn_worker(
    name: &'static str,
    stack_kb: usize,
    f: impl FnOnce() + Send + 'static,
) -> Result<JoinHandle<()>, Error> {
    // SAFETY: the config is copied by ESP-IDF before returning.
    let ret = unsafe {
        let mut cfg = esp_idf_sys::esp_create_default_pthread_config();
        cfg.stack_size = (stack_kb * 1024) as i32;
        esp_idf_sys::esp_pthread_set_cfg(&cfg)
    };
    if ret != esp_idf_sys::ESP_OK as i32 {
        log::error!("esp_pthread_set_cfg failed: {ret}");
        return Err(Error::Spawn);
    }
    log::info!("Spawning '{name}' (stack={stack_kb}KB)");
    thread::Builder::new()
        .name(name.into())
        .spawn(f)
        .map_err(|_| Error::Spawn)
}

/// Host fallback: plain `std::thread` with the requested stack.
#[cfg(not(all(target_os = "espidf", feature = "espidf")))]
pub fn spawn_worker(
    name: &'static str,
    stack_kb: usize,
    f: impl FnOnce() + Send + 'static,
) -> Result<JoinHandle<()>, Error> {
    log::info!("Spawning '{name}' (sim, stack={stack_kb}KB)");
    thread::Builder::new()
        .name(name.into())
        .stack_size(stack_kb * 1024)
        .spawn(f)
        .map_err(|_| Error::Spawn)
}
