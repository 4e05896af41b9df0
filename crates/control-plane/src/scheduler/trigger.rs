//! Time-based triggers.
//!
//! All fire times are computed in UTC.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// When a schedule entry fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Trigger {
    /// Every `minutes` minutes, anchored at the first fire time.
    Interval { minutes: u32 },
    /// Every day at `hour:minute` UTC.
    Daily { hour: u32, minute: u32 },
}

impl Trigger {
    /// Parse a trigger from its request form: `interval` with a minute
    /// count, or `daily` with `HH:MM`.
    pub fn parse(kind: &str, value: &str) -> Result<Self, String> {
        match kind {
            "interval" => {
                let minutes: u32 = value
                    .trim()
                    .parse()
                    .map_err(|_| format!("Invalid interval '{}': expected minutes", value))?;
                if minutes == 0 {
                    return Err("Interval must be at least 1 minute".to_string());
                }
                Ok(Trigger::Interval { minutes })
            }
            "daily" => {
                let (h, m) = value
                    .trim()
                    .split_once(':')
                    .ok_or_else(|| format!("Invalid time '{}': expected HH:MM", value))?;
                let hour: u32 = h
                    .parse()
                    .map_err(|_| format!("Invalid hour in '{}'", value))?;
                let minute: u32 = m
                    .parse()
                    .map_err(|_| format!("Invalid minute in '{}'", value))?;
                if hour > 23 || minute > 59 {
                    return Err(format!("Time out of range: '{}'", value));
                }
                Ok(Trigger::Daily { hour, minute })
            }
            other => Err(format!("Invalid type: {}", other)),
        }
    }

    /// First fire time for an entry created at `now`.
    pub fn first_fire_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match *self {
            Trigger::Interval { minutes } => now + Duration::minutes(minutes as i64),
            Trigger::Daily { hour, minute } => {
                let today = at(now.date_naive(), hour, minute);
                if today > now {
                    today
                } else {
                    today + Duration::days(1)
                }
            }
        }
    }

    /// Given a due fire time `next_run <= now`, return the latest fire time
    /// not after `now` and the first fire time strictly after `now`.
    ///
    /// Every fire time between `next_run` and the latest one is part of
    /// the same backlog and is coalesced into it.
    pub fn advance(
        &self,
        next_run: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> (DateTime<Utc>, DateTime<Utc>) {
        if next_run > now {
            return (next_run, next_run);
        }
        match *self {
            Trigger::Interval { minutes } => {
                let period = Duration::minutes(minutes as i64);
                let periods = (now - next_run).num_seconds() / period.num_seconds();
                let latest = next_run + Duration::seconds(periods * period.num_seconds());
                (latest, latest + period)
            }
            Trigger::Daily { hour, minute } => {
                let today = at(now.date_naive(), hour, minute);
                let latest = if today <= now {
                    today
                } else {
                    today - Duration::days(1)
                };
                (latest, latest + Duration::days(1))
            }
        }
    }

    /// Number of fire times in `[next_run, now]`.
    pub fn missed_firings(&self, next_run: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
        if next_run > now {
            return 0;
        }
        let period = match *self {
            Trigger::Interval { minutes } => Duration::minutes(minutes as i64),
            Trigger::Daily { .. } => Duration::days(1),
        };
        (now - next_run).num_seconds() / period.num_seconds() + 1
    }
}

fn at(date: NaiveDate, hour: u32, minute: u32) -> DateTime<Utc> {
    let time = NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or_default();
    Utc.from_utc_datetime(&date.and_time(time))
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Interval { minutes } => {
                write!(f, "interval[{}:{:02}:00]", minutes / 60, minutes % 60)
            }
            Trigger::Daily { hour, minute } => {
                write!(f, "cron[hour='{}', minute='{}']", hour, minute)
            }
        }
    }
}
