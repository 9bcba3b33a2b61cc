use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use thiserror::Error;

use super::models::{DayBuckets, DisplaySlot, ForecastSample};

const ICON_URL_TEMPLATE: &str = "https://openweathermap.org/img/wn/{icon}@2x.png";
const DAY_LABEL_FORMAT: &str = "%A, %b %-d";

#[derive(Error, Debug, PartialEq)]
pub enum GroupingError {
    #[error("Sample timestamp {0} is out of range")]
    InvalidTimestamp(i64),

    #[error("Sample at {0} has no weather condition")]
    MissingCondition(i64),
}

/// Zone in which calendar days and clock times are labelled
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DisplayZone {
    Local,
    Named(chrono_tz::Tz),
}

impl DisplayZone {
    fn wall_clock(&self, timestamp: i64) -> Result<NaiveDateTime, GroupingError> {
        let instant = DateTime::<Utc>::from_timestamp(timestamp, 0)
            .ok_or(GroupingError::InvalidTimestamp(timestamp))?;
        Ok(match self {
            DisplayZone::Local => instant.with_timezone(&Local).naive_local(),
            DisplayZone::Named(tz) => tz.from_utc_datetime(&instant.naive_utc()).naive_local(),
        })
    }
}

/// Fully-qualified URL of the 2x icon asset for a provider icon code
pub fn icon_url(icon: &str) -> String {
    ICON_URL_TEMPLATE.replace("{icon}", icon)
}

/// Buckets forecast samples by local calendar day
#[derive(Debug, Clone)]
pub struct DayGrouper {
    zone: DisplayZone,
    time_format: String,
}

impl DayGrouper {
    pub fn new(zone: DisplayZone, time_format: impl Into<String>) -> Self {
        Self {
            zone,
            time_format: time_format.into(),
        }
    }

    /// Group samples in a single pass, labelling in `zone` or the default zone.
    ///
    /// Days appear in the order they are first seen and slots keep input order;
    /// nothing is sorted or deduplicated.
    pub fn group(
        &self,
        samples: &[ForecastSample],
        zone: Option<DisplayZone>,
    ) -> Result<DayBuckets, GroupingError> {
        let zone = zone.unwrap_or(self.zone);
        let mut days = DayBuckets::new();
        for sample in samples {
            let local = zone.wall_clock(sample.dt)?;
            let label = local.format(DAY_LABEL_FORMAT).to_string();
            let slot = self.slot(sample, &local)?;
            days.entry(label).or_default().push(slot);
        }
        Ok(days)
    }

    fn slot(
        &self,
        sample: &ForecastSample,
        local: &NaiveDateTime,
    ) -> Result<DisplaySlot, GroupingError> {
        let condition = sample
            .weather
            .first()
            .ok_or(GroupingError::MissingCondition(sample.dt))?;

        Ok(DisplaySlot {
            timestamp: sample.dt,
            time: local.format(&self.time_format).to_string(),
            temperature: sample.main.temp,
            feels_like: sample.main.feels_like,
            pressure: sample.main.pressure,
            humidity: sample.main.humidity,
            visibility_km: sample.visibility.map(|meters| meters / 1000.0),
            wind_speed: sample.wind.speed,
            wind_deg: sample.wind.deg,
            clouds: sample.clouds.all,
            description: condition.description.clone(),
            icon_url: icon_url(&condition.icon),
        })
    }
}
