use boiler_common::{
    should_record, until_next_minute, DwellCounter, RelayState, Sample, ThermostatMode,
    TICK_DURATION,
};
use chrono::{DateTime, Timelike, Utc};
use tokio::{sync::watch, task::JoinHandle};
use tracing::{debug, info, warn};

use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    pub mode: ThermostatMode,
    pub commanded: Option<RelayState>,
    pub observed: RelayState,
    pub recorded: bool,
    pub dwell_seconds: u64,
}

pub struct ControlLoop {
    state: AppState,
    dwell: DwellCounter,
}

impl ControlLoop {
    pub fn new(state: AppState) -> Self {
        Self {
            state,
            dwell: DwellCounter::default(),
        }
    }

    #[cfg(test)]
    pub fn dwell_seconds(&self) -> u64 {
        self.dwell.seconds()
    }

    pub async fn tick(&mut self, now: DateTime<Utc>) -> TickReport {
        let config = &self.state.config;
        config.refresh().await;

        let mode = config.switch_mode().await;
        let mut room_temperature = None;

        let commanded = match mode {
            ThermostatMode::Manual => {
                let temperature = self.state.room_temperature().await;
                room_temperature = Some(temperature);
                self.state.regulate(temperature).await
            }
            other => self.state.drive_relay(other).await,
        };

        let mut recorded = false;
        let minute = now.with_timezone(&config.timezone().await).minute();
        if should_record(minute, config.record_interval().await) {
            let temperature = match room_temperature {
                Some(temperature) => temperature,
                None => self.state.room_temperature().await,
            };
            let sample = Sample {
                dwell_seconds: self.dwell.seconds(),
                temperature,
                unit: config.units().await,
                recorded_at: now,
            };

            match self
                .state
                .store
                .save_sample(&self.state.hardware.sensor_label, &sample)
            {
                Ok(()) => {
                    debug!(
                        "recorded {temperature:.2}{} with {}s of heating",
                        sample.unit.as_str(),
                        sample.dwell_seconds
                    );
                    self.dwell.reset();
                    recorded = true;
                }
                Err(err) => warn!("failed to save temperature sample: {err}"),
            }
        }

        let observed = self.state.relay.read().await;
        self.dwell.accrue(observed, TICK_DURATION);

        TickReport {
            mode,
            commanded,
            observed,
            recorded,
            dwell_seconds: self.dwell.seconds(),
        }
    }

    /// Ticks immediately, then on every minute boundary until shutdown.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!("control loop started");
        loop {
            let started = Utc::now();
            let report = self.tick(started).await;
            debug!(
                "tick: mode {}, commanded {}, relay {}, recorded {}, dwell {}s",
                report.mode.as_str(),
                report.commanded.map_or("nothing", RelayState::as_str),
                report.observed.as_str(),
                report.recorded,
                report.dwell_seconds
            );

            let wait = until_next_minute(started, Utc::now());
            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("control loop stopped");
    }
}

pub fn spawn_control_loop(state: AppState, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
    tokio::spawn(ControlLoop::new(state).run(shutdown))
}
