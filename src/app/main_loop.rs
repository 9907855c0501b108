//! Single consumer of lifecycle events.
//!
//! Turns `Connected`/`Disconnected` into measurement start/stop. Events are
//! handled strictly one at a time, in arrival order.

use core::time::Duration;
use std::sync::Arc;

use log::info;

use crate::events::EventBus;
use crate::scheduler::MeasurementScheduler;

use super::events::LifecycleEvent;
use super::ports::{SchedulerState, WorkTimer};

pub struct MainLoop<T: WorkTimer> {
    bus: Arc<EventBus>,
    scheduler: MeasurementScheduler<T>,
    first_delay: Duration,
    measuring_started: bool,
}

impl<T: WorkTimer> MainLoop<T> {
    pub fn new(bus: Arc<EventBus>, scheduler: MeasurementScheduler<T>, first_delay: Duration) -> Self {
        Self {
            bus,
            scheduler,
            first_delay,
            measuring_started: false,
        }
    }

    pub fn handle(&mut self, event: LifecycleEvent) {
        info!("Event: {event}");
        match event {
            LifecycleEvent::Connected => {
                self.scheduler.start(self.first_delay);
                self.measuring_started = true;
            }
            LifecycleEvent::Disconnected(_) => {
                if self.measuring_started {
                    self.scheduler.cancel();
                    self.measuring_started = false;
                }
            }
        }
    }

    /// Handle everything already queued without waiting. Returns the count.
    pub fn process_pending(&mut self) -> usize {
        let mut n = 0;
        while let Some(event) = self.bus.try_receive() {
            self.handle(event);
            n += 1;
        }
        n
    }

    /// Wait for events forever.
    pub async fn run(&mut self) {
        loop {
            let event = self.bus.receive().await;
            self.handle(event);
        }
    }

    /// Drive [`run`](Self::run) on the calling thread.
    pub fn run_blocking(&mut self) {
        futures_lite::future::block_on(self.run());
    }

    pub fn measuring_started(&self) -> bool {
        self.measuring_started
    }

    pub fn scheduler_state(&self) -> SchedulerState {
        self.scheduler.state()
    }

    pub fn scheduler(&self) -> &MeasurementScheduler<T> {
        &self.scheduler
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Instant;

    use super::*;

    #[derive(Default)]
    struct CountingTimer {
        armed: Mutex<Option<Duration>>,
        arms: Mutex<u32>,
        cancels: Mutex<u32>,
    }

    impl WorkTimer for Arc<CountingTimer> {
        fn arm(&self, delay: Duration, _period: Duration) {
            *self.armed.lock().unwrap() = Some(delay);
            *self.arms.lock().unwrap() += 1;
        }
        fn cancel(&self) {
            *self.armed.lock().unwrap() = None;
            *self.cancels.lock().unwrap() += 1;
        }
        fn state(&self) -> SchedulerState {
            match *self.armed.lock().unwrap() {
                Some(d) => SchedulerState::Scheduled(Instant::now() + d),
                None => SchedulerState::Idle,
            }
        }
    }

    fn main_loop() -> (MainLoop<Arc<CountingTimer>>, Arc<EventBus>, Arc<CountingTimer>) {
        let bus = Arc::new(EventBus::new());
        let timer = Arc::new(CountingTimer::default());
        let scheduler = MeasurementScheduler::new(Arc::clone(&timer), Duration::from_secs(30));
        let ml = MainLoop::new(Arc::clone(&bus), scheduler, Duration::from_secs(10));
        (ml, bus, timer)
    }

    #[test]
    fn connected_schedules_first_measurement() {
        let (mut ml, bus, timer) = main_loop();
        bus.publish(LifecycleEvent::Connected);
        assert_eq!(ml.process_pending(), 1);
        assert!(ml.measuring_started());
        assert_eq!(*timer.armed.lock().unwrap(), Some(Duration::from_secs(10)));
    }

    #[test]
    fn disconnect_before_connect_does_not_cancel() {
        let (mut ml, bus, timer) = main_loop();
        bus.publish(LifecycleEvent::Disconnected(0x13));
        ml.process_pending();
        assert_eq!(*timer.cancels.lock().unwrap(), 0);
    }

    #[test]
    fn reconnect_leaves_one_schedule() {
        let (mut ml, bus, timer) = main_loop();
        bus.publish(LifecycleEvent::Connected);
        bus.publish(LifecycleEvent::Disconnected(0x13));
        bus.publish(LifecycleEvent::Connected);
        assert_eq!(ml.process_pending(), 3);

        assert_eq!(*timer.arms.lock().unwrap(), 2);
        assert_eq!(*timer.cancels.lock().unwrap(), 1);
        assert!(matches!(ml.scheduler_state(), SchedulerState::Scheduled(_)));
    }
}
