use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use boiler_common::{
    config::{BoilerConfig, CONFIG_REFRESH_SECS, KEY_THERMO_SWITCH},
    HardwareConfig, TemperatureUnit, ThermostatMode,
};
use chrono_tz::Tz;
use serde_json::Value;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

struct Loaded {
    config: BoilerConfig,
    last_refresh: Instant,
}

/// JSON configuration file, re-read at most once per refresh period. Writes go
/// to disk immediately.
pub struct ConfigStore {
    path: PathBuf,
    refresh_period: Duration,
    loaded: RwLock<Loaded>,
    write_lock: Mutex<()>,
}

impl ConfigStore {
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let config = load_config(&path).await?;
        Ok(Self::with_config(path, config))
    }

    pub fn with_config(path: impl Into<PathBuf>, config: BoilerConfig) -> Self {
        Self {
            path: path.into(),
            refresh_period: Duration::from_secs(CONFIG_REFRESH_SECS),
            loaded: RwLock::new(Loaded {
                config,
                last_refresh: Instant::now(),
            }),
            write_lock: Mutex::new(()),
        }
    }

    #[cfg(test)]
    pub fn with_refresh_period(mut self, refresh_period: Duration) -> Self {
        self.refresh_period = refresh_period;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-reads the file if the refresh period has elapsed. Returns whether a
    /// reload happened; a failed reload keeps the previous configuration.
    pub async fn refresh(&self) -> bool {
        {
            let loaded = self.loaded.read().await;
            if loaded.last_refresh.elapsed() < self.refresh_period {
                return false;
            }
        }

        // Writers hold this lock until the file is on disk, so a reload never
        // reads a file older than memory.
        let _guard = self.write_lock.lock().await;
        let mut loaded = self.loaded.write().await;
        if loaded.last_refresh.elapsed() < self.refresh_period {
            return false;
        }
        loaded.last_refresh = Instant::now();

        match load_config(&self.path).await {
            Ok(config) => {
                debug!("reloaded configuration from {}", self.path.display());
                loaded.config = config;
                true
            }
            Err(err) => {
                warn!("keeping previous configuration: {err}");
                false
            }
        }
    }

    pub async fn current(&self) -> BoilerConfig {
        self.loaded.read().await.config.clone()
    }

    pub async fn hardware(&self) -> Result<HardwareConfig> {
        Ok(self.loaded.read().await.config.hardware()?)
    }

    pub async fn switch_mode(&self) -> ThermostatMode {
        self.loaded.read().await.config.switch_mode()
    }

    pub async fn record_interval(&self) -> Option<u32> {
        self.loaded.read().await.config.record_interval()
    }

    pub async fn units(&self) -> TemperatureUnit {
        self.loaded.read().await.config.units()
    }

    pub async fn timezone(&self) -> Tz {
        let name = self.loaded.read().await.config.timezone.clone();
        name.parse::<Tz>().unwrap_or_else(|_| {
            warn!("unknown timezone '{name}', using UTC");
            Tz::UTC
        })
    }

    pub async fn set_switch_mode(&self, mode: ThermostatMode) -> Result<()> {
        self.set(KEY_THERMO_SWITCH, mode.as_u8().to_string()).await
    }

    pub async fn set(&self, key: &str, value: String) -> Result<()> {
        if !BoilerConfig::is_writable(key) {
            return Err(Error::ReadOnlySetting(key.to_string()));
        }

        let _guard = self.write_lock.lock().await;
        let snapshot = {
            let mut loaded = self.loaded.write().await;
            loaded
                .config
                .thermostat
                .insert(key.to_string(), Value::String(value.clone()));
            loaded.config.clone()
        };

        save_config(&self.path, &snapshot).await?;
        info!("setting '{key}' changed to '{value}'");
        Ok(())
    }
}

async fn load_config(path: &Path) -> Result<BoilerConfig> {
    match tokio::fs::read(path).await {
        Ok(raw) => serde_json::from_slice(&raw).map_err(|source| Error::Parse {
            path: path.to_path_buf(),
            source,
        }),
        Err(err) if err.kind() == ErrorKind::NotFound => {
            warn!("{} not found, using defaults", path.display());
            Ok(BoilerConfig::default())
        }
        Err(err) => Err(Error::io(path, err)),
    }
}

async fn save_config(path: &Path, config: &BoilerConfig) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|err| Error::io(parent, err))?;
    }
    let payload = serde_json::to_vec_pretty(config)?;
    tokio::fs::write(path, payload)
        .await
        .map_err(|err| Error::io(path, err))
}
