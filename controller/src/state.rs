use std::sync::Arc;

use boiler_common::{relay_decision, ControlAction, HardwareConfig, RelayState, ThermostatMode};
use boiler_sensor::TemperatureSensor;
use tracing::{debug, warn};

use crate::{config_store::ConfigStore, relay::Relay, store::Persistence};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ConfigStore>,
    pub hardware: Arc<HardwareConfig>,
    pub sensor: Arc<dyn TemperatureSensor>,
    pub relay: Arc<dyn Relay>,
    pub store: Arc<dyn Persistence>,
}

impl AppState {
    pub async fn room_temperature(&self) -> f64 {
        let unit = self.config.units().await;
        self.sensor
            .read(
                &self.hardware.sensor_id,
                self.hardware.sensor_timeout_secs,
                unit,
            )
            .await
    }

    pub async fn command_relay(&self, commanded: RelayState) -> RelayState {
        let observed = self.relay.write(commanded).await;
        if observed != commanded {
            warn!(
                "relay commanded {} but reads {}",
                commanded.as_str(),
                observed.as_str()
            );
        }
        observed
    }

    /// `None` when the set-point is unreadable.
    pub async fn regulate(&self, room_temperature: f64) -> Option<RelayState> {
        let set_point = match self.store.set_point() {
            Ok(set_point) => set_point,
            Err(err) => {
                warn!("skipping relay decision, set-point unavailable: {err}");
                return None;
            }
        };

        let commanded = relay_decision(set_point, room_temperature);
        debug!(
            "set-point {set_point} vs room {room_temperature:.2}: {}",
            commanded.as_str()
        );
        self.command_relay(commanded).await;
        Some(commanded)
    }

    pub async fn drive_relay(&self, mode: ThermostatMode) -> Option<RelayState> {
        match mode.control_action() {
            ControlAction::ForceOff => {
                self.command_relay(RelayState::Off).await;
                Some(RelayState::Off)
            }
            ControlAction::Regulate => {
                let room_temperature = self.room_temperature().await;
                self.regulate(room_temperature).await
            }
            ControlAction::Idle => None,
        }
    }
}
