use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};

pub const DEFAULT_HISTORY_DAYS: i64 = 2;

const ACCEPTED_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl HistoryRange {
    pub fn last_days(now: DateTime<Utc>, days: i64) -> Self {
        Self {
            start: now - Duration::days(days),
            end: now,
        }
    }

    /// Resolves optional client bounds, given as local wall-clock time in `tz`.
    ///
    /// Each bound falls back on its own: a missing or unparsable start becomes
    /// `now - 2 days`, a missing or unparsable end becomes `now`.
    pub fn resolve<Tz: TimeZone>(
        start: Option<&str>,
        end: Option<&str>,
        now: DateTime<Utc>,
        tz: &Tz,
    ) -> Self {
        let fallback = Self::last_days(now, DEFAULT_HISTORY_DAYS);
        Self {
            start: start
                .and_then(|raw| parse_local(raw, tz))
                .unwrap_or(fallback.start),
            end: end.and_then(|raw| parse_local(raw, tz)).unwrap_or(fallback.end),
        }
    }
}

pub fn parse_local<Tz: TimeZone>(raw: &str, tz: &Tz) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    let naive = ACCEPTED_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())?;
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
}
