//! Fake collaborators for controller tests.

use std::{
    path::Path,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use async_trait::async_trait;
use boiler_common::{
    BoilerConfig, HardwareConfig, HistoryPoint, HistoryRange, RelayState, Sample, TemperatureUnit,
};
use boiler_sensor::TemperatureSensor;
use serde_json::Value;

use crate::{
    config_store::ConfigStore,
    error::{Error, Result},
    relay::Relay,
    state::AppState,
    store::{Persistence, SqliteStore},
};

pub struct FakeSensor {
    temperature: Mutex<f64>,
    reads: AtomicUsize,
}

impl FakeSensor {
    pub fn new(temperature: f64) -> Self {
        Self {
            temperature: Mutex::new(temperature),
            reads: AtomicUsize::new(0),
        }
    }

    pub fn set(&self, temperature: f64) {
        *self.temperature.lock().unwrap() = temperature;
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TemperatureSensor for FakeSensor {
    async fn read(&self, _sensor_id: &str, _timeout_secs: u64, _unit: TemperatureUnit) -> f64 {
        self.reads.fetch_add(1, Ordering::SeqCst);
        *self.temperature.lock().unwrap()
    }
}

/// Relay that latches whatever is written, unless it is stuck.
pub struct FakeRelay {
    state: Mutex<RelayState>,
    stuck: Mutex<Option<RelayState>>,
    writes: Mutex<Vec<RelayState>>,
}

impl FakeRelay {
    pub fn new(initial: RelayState) -> Self {
        Self {
            state: Mutex::new(initial),
            stuck: Mutex::new(None),
            writes: Mutex::new(Vec::new()),
        }
    }

    pub fn stick_at(&self, state: RelayState) {
        *self.stuck.lock().unwrap() = Some(state);
    }

    pub fn writes(&self) -> Vec<RelayState> {
        self.writes.lock().unwrap().clone()
    }
}

#[async_trait]
impl Relay for FakeRelay {
    async fn write(&self, state: RelayState) -> RelayState {
        self.writes.lock().unwrap().push(state);
        *self.state.lock().unwrap() = state;
        self.read().await
    }

    async fn read(&self) -> RelayState {
        self.stuck
            .lock()
            .unwrap()
            .unwrap_or(*self.state.lock().unwrap())
    }
}

pub struct FlakyStore {
    inner: SqliteStore,
    saved: Mutex<Vec<Sample>>,
    pub fail_set_point: AtomicBool,
    pub fail_saves: AtomicBool,
    pub fail_history: AtomicBool,
}

impl FlakyStore {
    pub fn new(default_set_point: f64) -> Self {
        Self {
            inner: SqliteStore::open_in_memory(default_set_point).unwrap(),
            saved: Mutex::new(Vec::new()),
            fail_set_point: AtomicBool::new(false),
            fail_saves: AtomicBool::new(false),
            fail_history: AtomicBool::new(false),
        }
    }

    pub fn saved(&self) -> Vec<Sample> {
        self.saved.lock().unwrap().clone()
    }

    fn check(flag: &AtomicBool) -> Result<()> {
        if flag.load(Ordering::SeqCst) {
            Err(Error::Database(rusqlite::Error::InvalidQuery))
        } else {
            Ok(())
        }
    }
}

impl Persistence for FlakyStore {
    fn set_point(&self) -> Result<f64> {
        Self::check(&self.fail_set_point)?;
        self.inner.set_point()
    }

    fn set_set_point(&self, temperature: f64, time_start: &str, time_end: &str) -> Result<()> {
        self.inner.set_set_point(temperature, time_start, time_end)
    }

    fn save_sample(&self, sensor: &str, sample: &Sample) -> Result<()> {
        Self::check(&self.fail_saves)?;
        self.inner.save_sample(sensor, sample)?;
        self.saved.lock().unwrap().push(sample.clone());
        Ok(())
    }

    fn history(&self, sensor: &str, range: &HistoryRange) -> Result<Vec<HistoryPoint>> {
        Self::check(&self.fail_history)?;
        self.inner.history(sensor, range)
    }
}

pub struct Fixture {
    pub state: AppState,
    pub sensor: Arc<FakeSensor>,
    pub relay: Arc<FakeRelay>,
    pub store: Arc<FlakyStore>,
    _dir: tempfile::TempDir,
}

/// Builds an [`AppState`] over fakes, with `thermostat` as the settings map
/// and the config file placed in a temporary directory.
pub fn fixture(thermostat: Value, temperature: f64) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let config: BoilerConfig = serde_json::from_value(serde_json::json!({
        "sensor": { "id": "28-test", "label": "sensor_1" },
        "relay": { "relay_1": 17, "relay_2": 27 },
        "thermostat": thermostat,
    }))
    .unwrap();
    let hardware: HardwareConfig = config.hardware().unwrap();
    let config = ConfigStore::with_config(config_path(dir.path()), config);

    let sensor = Arc::new(FakeSensor::new(temperature));
    let relay = Arc::new(FakeRelay::new(RelayState::Off));
    let store = Arc::new(FlakyStore::new(20.0));

    let state = AppState {
        config: Arc::new(config),
        hardware: Arc::new(hardware),
        sensor: sensor.clone(),
        relay: relay.clone(),
        store: store.clone(),
    };

    Fixture {
        state,
        sensor,
        relay,
        store,
        _dir: dir,
    }
}

fn config_path(dir: &Path) -> std::path::PathBuf {
    dir.join("boiler.json")
}
