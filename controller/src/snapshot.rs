use boiler_common::{HistoryRange, StateSnapshot};
use chrono::{DateTime, Utc};
use tracing::warn;

use crate::{error::Result, state::AppState};

/// Assembles the full state reported to the client. Only an unreadable
/// set-point fails the snapshot; a failed history query reports no history.
pub async fn build(
    state: &AppState,
    start: Option<&str>,
    end: Option<&str>,
    now: DateTime<Utc>,
) -> Result<StateSnapshot> {
    let set_point = state.store.set_point()?;
    let relay_state = state.relay.read().await;
    let switch_mode = state.config.switch_mode().await;
    let unit = state.config.units().await;
    let current_temperature = state.room_temperature().await;

    let tz = state.config.timezone().await;
    let range = HistoryRange::resolve(start, end, now, &tz);
    let history = state
        .store
        .history(&state.hardware.sensor_label, &range)
        .unwrap_or_else(|err| {
            warn!("history query failed: {err}");
            Vec::new()
        });

    Ok(StateSnapshot {
        relay_state,
        switch_mode,
        set_point,
        current_temperature,
        unit,
        history,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use boiler_common::{RelayState, Sample, TemperatureUnit, ThermostatMode};
    use chrono::{Duration, TimeZone};
    use serde_json::json;

    use super::*;
    use crate::{store::Persistence, testing::fixture};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap()
    }

    fn save(store: &dyn Persistence, hours_ago: i64, temperature: f64) {
        store
            .save_sample(
                "sensor_1",
                &Sample {
                    dwell_seconds: 0,
                    temperature,
                    unit: TemperatureUnit::Celsius,
                    recorded_at: now() - Duration::hours(hours_ago),
                },
            )
            .unwrap();
    }

    #[tokio::test]
    async fn reports_every_field() {
        let fixture = fixture(json!({ "thermo_switch": 1, "temp_units": "C" }), 19.25);

        let snapshot = build(&fixture.state, None, None, now()).await.unwrap();
        assert_eq!(snapshot.relay_state, RelayState::Off);
        assert_eq!(snapshot.switch_mode, ThermostatMode::Manual);
        assert_eq!(snapshot.set_point, 20.0);
        assert_eq!(snapshot.current_temperature, 19.25);
        assert_eq!(snapshot.unit, TemperatureUnit::Celsius);
        assert!(snapshot.history.is_empty());
    }

    #[tokio::test]
    async fn default_history_covers_two_days_in_order() {
        let fixture = fixture(json!({}), 19.0);
        save(fixture.store.as_ref(), 1, 21.0);
        save(fixture.store.as_ref(), 47, 18.0);
        save(fixture.store.as_ref(), 49, 17.0);
        save(fixture.store.as_ref(), 24, 20.0);

        let snapshot = build(&fixture.state, None, None, now()).await.unwrap();
        let temperatures: Vec<f64> = snapshot.history.iter().map(|p| p.temperature).collect();
        assert_eq!(temperatures, vec![18.0, 20.0, 21.0]);
    }

    #[tokio::test]
    async fn explicit_bounds_narrow_history() {
        let fixture = fixture(json!({}), 19.0);
        save(fixture.store.as_ref(), 1, 21.0);
        save(fixture.store.as_ref(), 24, 20.0);

        let snapshot = build(
            &fixture.state,
            Some("2026-03-09 00:00"),
            Some("not a date"),
            now(),
        )
        .await
        .unwrap();
        let temperatures: Vec<f64> = snapshot.history.iter().map(|p| p.temperature).collect();
        assert_eq!(temperatures, vec![20.0, 21.0]);

        let snapshot = build(&fixture.state, Some("10/03/2026 00:00"), None, now())
            .await
            .unwrap();
        assert_eq!(snapshot.history.len(), 1);
    }

    #[tokio::test]
    async fn history_failure_yields_empty_history() {
        let fixture = fixture(json!({}), 19.0);
        save(fixture.store.as_ref(), 1, 21.0);
        fixture.store.fail_history.store(true, Ordering::SeqCst);

        let snapshot = build(&fixture.state, None, None, now()).await.unwrap();
        assert!(snapshot.history.is_empty());
    }

    #[tokio::test]
    async fn unreadable_set_point_fails() {
        let fixture = fixture(json!({}), 19.0);
        fixture.store.fail_set_point.store(true, Ordering::SeqCst);
        assert!(build(&fixture.state, None, None, now()).await.is_err());
    }

    #[tokio::test]
    async fn serializes_to_wire_shape() {
        let fixture = fixture(json!({ "thermo_switch": 0, "temp_units": "F" }), 68.0);
        let snapshot = build(&fixture.state, None, None, now()).await.unwrap();

        let value = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(value["relay_state"], json!(false));
        assert_eq!(value["switch_mode"], json!(0));
        assert_eq!(value["unit"], json!("F"));
        assert_eq!(value["current_temperature"], json!(68.0));
        assert!(value["history"].is_array());
    }
}
