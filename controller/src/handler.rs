use boiler_common::{
    parse_request,
    types::{ALWAYS_ON_END, ALWAYS_ON_START},
    Command, Rejection, RelayState, StateSnapshot, ThermostatMode,
};
use chrono::Utc;
use tracing::{debug, info, warn};

use crate::{snapshot, state::AppState};

pub struct RequestHandler {
    state: AppState,
}

impl RequestHandler {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    /// Returns `None` when the message is dropped; nothing is changed then.
    pub async fn handle(&self, raw: &str) -> Option<StateSnapshot> {
        let (request, command) = match parse_request(raw).and_then(|request| {
            let command = request.command()?;
            Ok((request, command))
        }) {
            Ok(parsed) => parsed,
            Err(Rejection::Empty) => {
                info!("dropping empty request");
                return None;
            }
            Err(rejection) => {
                warn!("dropping request: {rejection}");
                return None;
            }
        };
        debug!(?command, "handling {}", request.name.as_str());

        self.state.config.refresh().await;
        self.apply(command).await;

        match snapshot::build(
            &self.state,
            request.start.as_deref(),
            request.end.as_deref(),
            Utc::now(),
        )
        .await
        {
            Ok(snapshot) => Some(snapshot),
            Err(err) => {
                warn!("cannot report state: {err}");
                None
            }
        }
    }

    async fn apply(&self, command: Command) {
        match command {
            Command::Query => {}
            Command::SetSwitchMode(mode) => {
                if let Err(err) = self.state.config.set_switch_mode(mode).await {
                    warn!("failed to store switch mode: {err}");
                }
                if mode == ThermostatMode::Off {
                    self.state.command_relay(RelayState::Off).await;
                } else {
                    let room_temperature = self.state.room_temperature().await;
                    self.state.regulate(room_temperature).await;
                }
            }
            Command::SetSetPoint(set_point) => {
                if let Err(err) =
                    self.state
                        .store
                        .set_set_point(set_point, ALWAYS_ON_START, ALWAYS_ON_END)
                {
                    warn!("failed to store set-point: {err}");
                }
                let mode = self.state.config.switch_mode().await;
                self.state.drive_relay(mode).await;
            }
        }
    }
}
