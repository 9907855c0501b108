//! Composition root.
//!
//! [`Node`] wires the domain components to one radio adapter and exposes
//! the entry points the binaries call:
//!
//! ```text
//!   initialize()                    identity + callback registration
//!   enable_and_start_advertising()  stack up, payloads on air
//!   update_temperature/humidity()   push a reading to the peer
//!   increment_advertised_counter()  bump vendor data, republish
//!   spawn_measurements(sensor)      main loop over a ThreadTimer
//! ```

use std::sync::Arc;

use log::{error, info};

use crate::adapters::timer::ThreadTimer;
use crate::advertising::AdvertisingPayloadBuilder;
use crate::config::NodeConfig;
use crate::error::{Error, ServiceError};
use crate::events::EventBus;
use crate::identity::StaticAddress;
use crate::scheduler::{MeasurementCycle, MeasurementScheduler};
use crate::store::SampleStore;

use super::lifecycle::ConnectionLifecycleMonitor;
use super::main_loop::MainLoop;
use super::ports::{
    AdvParams, AdvertiserPort, CallbackRegistry, GattPort, LinkPort, SensorPort, WorkTimer,
};
use super::service::PeripheralService;

/// Everything the node needs from its radio adapter.
///
/// The adapter is a cheap cloneable handle: the service, the lifecycle
/// monitor and the node each keep one.
pub trait Radio:
    GattPort + LinkPort + AdvertiserPort + CallbackRegistry + Clone + 'static
{
}

impl<R> Radio for R where
    R: GattPort + LinkPort + AdvertiserPort + CallbackRegistry + Clone + 'static
{
}

pub struct Node<R: Radio> {
    config: NodeConfig,
    radio: R,
    identity: StaticAddress,
    bus: Arc<EventBus>,
    service: Arc<PeripheralService<R>>,
    advertising: AdvertisingPayloadBuilder,
    initialized: bool,
}

impl<R: Radio> Node<R> {
    /// Validate the configuration and assemble both payloads.
    ///
    /// An oversized payload is a packaging defect and fails here, before
    /// anything touches the radio.
    pub fn new(config: NodeConfig, radio: R) -> Result<Self, Error> {
        config.validate()?;
        let identity: StaticAddress = config.static_address.parse()?;
        let advertising = AdvertisingPayloadBuilder::from_config(&config).inspect_err(|e| {
            error!("advertising payload rejected: {e}");
        })?;

        let store = Arc::new(SampleStore::new());
        let service = Arc::new(PeripheralService::new(store, radio.clone()));

        Ok(Self {
            config,
            radio,
            identity,
            bus: Arc::new(EventBus::new()),
            service,
            advertising,
            initialized: false,
        })
    }

    /// Install the identity and register the stack callbacks.
    pub fn initialize(&mut self) -> Result<(), Error> {
        self.radio.create_identity(self.identity).inspect_err(|e| {
            error!("creating identity {} failed: {e}", self.identity);
        })?;

        let monitor = ConnectionLifecycleMonitor::new(
            Arc::clone(self.service.store()),
            Arc::clone(&self.bus),
            self.service.subscriptions(),
            self.radio.clone(),
        );
        self.radio.register_connection_callbacks(Arc::new(monitor));
        self.radio
            .register_gatt_callbacks(Arc::clone(&self.service) as _);

        self.initialized = true;
        info!("node initialised as {}", self.identity);
        Ok(())
    }

    /// Bring the stack up and start connectable advertising.
    pub fn enable_and_start_advertising(&mut self) -> Result<(), Error> {
        if !self.initialized {
            return Err(Error::Config("initialize() must run first"));
        }
        self.radio.enable().inspect_err(|e| error!("enabling BLE failed: {e}"))?;

        let params = AdvParams::connectable_ms(
            self.config.adv_interval_min_ms,
            self.config.adv_interval_max_ms,
        );
        let adv = self.advertising.encode_advertising()?;
        let scan = self.advertising.encode_scan_response()?;
        self.radio
            .start_advertising(&params, &adv, &scan)
            .inspect_err(|e| error!("advertising failed to start: {e}"))?;

        info!(
            "advertising as '{}' ({} + {} bytes)",
            self.config.device_name,
            adv.len(),
            scan.len()
        );
        Ok(())
    }

    pub fn update_temperature(&self, celsius: f32) -> Result<(), ServiceError> {
        self.service.update_temperature(celsius)
    }

    pub fn update_humidity(&self, percent: f32) -> Result<(), ServiceError> {
        self.service.update_humidity(percent)
    }

    /// Bump the vendor-data counter and republish both payloads.
    pub fn increment_advertised_counter(&mut self) -> Result<u16, Error> {
        self.advertising
            .bump_counter_and_republish(&mut self.radio)
    }

    pub fn advertised_counter(&self) -> u16 {
        self.advertising.counter()
    }

    pub fn service(&self) -> &Arc<PeripheralService<R>> {
        &self.service
    }

    pub fn event_bus(&self) -> Arc<EventBus> {
        Arc::clone(&self.bus)
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    /// Work body reading `sensor` into this node's service.
    pub fn measurement_cycle<S: SensorPort>(&self, sensor: S) -> MeasurementCycle<S, R> {
        MeasurementCycle::new(sensor, Arc::clone(&self.service))
    }

    /// Main loop over an arbitrary timer. The timer must already own the
    /// work body.
    pub fn main_loop<T: WorkTimer>(&self, timer: T) -> MainLoop<T> {
        let scheduler = MeasurementScheduler::new(timer, self.config.measuring_period());
        MainLoop::new(
            Arc::clone(&self.bus),
            scheduler,
            self.config.first_measurement_delay(),
        )
    }

    /// Main loop whose measurements run on a dedicated worker thread.
    pub fn spawn_measurements<S>(&self, sensor: S) -> Result<MainLoop<ThreadTimer>, Error>
    where
        S: SensorPort + 'static,
    {
        let work = self.measurement_cycle(sensor).into_work();
        let timer = ThreadTimer::spawn("measure", work)?;
        Ok(self.main_loop(timer))
    }
}
