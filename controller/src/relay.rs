use std::path::PathBuf;

use async_trait::async_trait;
use boiler_common::RelayState;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Two-output boiler relay. Both calls report the state read back from the
/// outputs, never the state that was asked for.
#[async_trait]
pub trait Relay: Send + Sync {
    async fn write(&self, state: RelayState) -> RelayState;
    async fn read(&self) -> RelayState;
}

#[derive(Debug, Clone)]
pub struct SysfsRelay {
    root: PathBuf,
    relay_1: u32,
    relay_2: u32,
}

impl SysfsRelay {
    pub fn new(root: impl Into<PathBuf>, relay_1: u32, relay_2: u32) -> Self {
        Self {
            root: root.into(),
            relay_1,
            relay_2,
        }
    }

    /// Exports both pins and configures them as outputs. Pins that are already
    /// exported are left as they are.
    pub async fn export(&self) -> Result<()> {
        for pin in [self.relay_1, self.relay_2] {
            let pin_dir = self.pin_dir(pin);
            if tokio::fs::metadata(&pin_dir).await.is_err() {
                let export = self.root.join("export");
                tokio::fs::write(&export, pin.to_string())
                    .await
                    .map_err(|err| Error::io(&export, err))?;
            }

            let direction = pin_dir.join("direction");
            tokio::fs::write(&direction, "out")
                .await
                .map_err(|err| Error::io(&direction, err))?;
            debug!("gpio{pin} exported as output");
        }
        Ok(())
    }

    fn pin_dir(&self, pin: u32) -> PathBuf {
        self.root.join(format!("gpio{pin}"))
    }

    fn value_path(&self, pin: u32) -> PathBuf {
        self.pin_dir(pin).join("value")
    }

    async fn read_pin(&self, pin: u32) -> Option<bool> {
        let path = self.value_path(pin);
        match tokio::fs::read_to_string(&path).await {
            Ok(raw) => match raw.trim() {
                "1" => Some(true),
                "0" => Some(false),
                other => {
                    warn!("gpio{pin} reported unexpected value '{other}'");
                    None
                }
            },
            Err(err) => {
                warn!("failed to read {}: {err}", path.display());
                None
            }
        }
    }

    async fn write_pin(&self, pin: u32, high: bool) {
        let path = self.value_path(pin);
        let level = if high { "1" } else { "0" };
        if let Err(err) = tokio::fs::write(&path, level).await {
            warn!("failed to drive gpio{pin}: {err}");
        }
    }
}

#[async_trait]
impl Relay for SysfsRelay {
    async fn write(&self, state: RelayState) -> RelayState {
        let (relay_1, relay_2) = state.outputs();
        self.write_pin(self.relay_1, relay_1).await;
        self.write_pin(self.relay_2, relay_2).await;
        self.read().await
    }

    async fn read(&self) -> RelayState {
        match (
            self.read_pin(self.relay_1).await,
            self.read_pin(self.relay_2).await,
        ) {
            (Some(relay_1), Some(relay_2)) => RelayState::from_outputs(relay_1, relay_2),
            _ => RelayState::On,
        }
    }
}
