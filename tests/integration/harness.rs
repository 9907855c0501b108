//! Shared fixtures: a node over `SimRadio` and a hand-cranked timer.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use envnode::adapters::sim::SimRadio;
use envnode::app::main_loop::MainLoop;
use envnode::app::ports::{SchedulerState, WorkTimer};
use envnode::sensors::HumidityTemperatureSensor;
use envnode::sensors::simulated::SimulatedSensor;
use envnode::{Node, NodeConfig};

pub type SimNode = Node<SimRadio>;

pub fn config() -> NodeConfig {
    NodeConfig {
        first_measurement_delay_secs: 10,
        measuring_period_secs: 30,
        ..NodeConfig::default()
    }
}

/// Node initialised and advertising.
pub fn advertising_node() -> (SimNode, SimRadio) {
    let radio = SimRadio::new();
    let mut node = Node::new(config(), radio.clone()).expect("default config is valid");
    node.initialize().expect("initialize");
    node.enable_and_start_advertising().expect("advertise");
    (node, radio)
}

struct Inner {
    armed: Option<(Duration, Duration)>,
    arms: u32,
    cancels: u32,
    fires: u32,
    work: Box<dyn FnMut() + Send>,
}

/// Timer that fires only when a test calls [`ManualTimer::fire`].
#[derive(Clone)]
pub struct ManualTimer {
    inner: Arc<Mutex<Inner>>,
}

impl ManualTimer {
    pub fn new(work: impl FnMut() + Send + 'static) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                armed: None,
                arms: 0,
                cancels: 0,
                fires: 0,
                work: Box::new(work),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap()
    }

    /// Run the work once if armed. Returns whether it ran.
    pub fn fire(&self) -> bool {
        let mut inner = self.lock();
        if inner.armed.is_none() {
            return false;
        }
        inner.fires += 1;
        (inner.work)();
        true
    }

    pub fn armed(&self) -> Option<(Duration, Duration)> {
        self.lock().armed
    }

    pub fn arms(&self) -> u32 {
        self.lock().arms
    }

    pub fn cancels(&self) -> u32 {
        self.lock().cancels
    }
}

impl WorkTimer for ManualTimer {
    fn arm(&self, delay: Duration, period: Duration) {
        let mut inner = self.lock();
        inner.armed = Some((delay, period));
        inner.arms += 1;
    }

    fn cancel(&self) {
        let mut inner = self.lock();
        inner.armed = None;
        inner.cancels += 1;
    }

    fn state(&self) -> SchedulerState {
        match self.lock().armed {
            Some((delay, _)) => SchedulerState::Scheduled(Instant::now() + delay),
            None => SchedulerState::Idle,
        }
    }
}

/// Advertising node with a simulated sensor behind a manual timer.
pub fn measuring_node(
    temperature_c: f32,
    humidity_pct: f32,
) -> (SimNode, SimRadio, SimulatedSensor, ManualTimer, MainLoop<ManualTimer>) {
    let (node, radio) = advertising_node();
    let device = SimulatedSensor::new(temperature_c, humidity_pct);
    let sensor = HumidityTemperatureSensor::new(device.clone()).expect("sensor ready");
    let timer = ManualTimer::new(node.measurement_cycle(sensor).into_work());
    let main_loop = node.main_loop(timer.clone());
    (node, radio, device, timer, main_loop)
}
