//! Forecast samples shared by the unit tests

use super::grouper::{DayGrouper, DisplayZone};
use super::models::{
    CityInfo, CloudCover, ForecastResult, ForecastSample, MainReadings, WeatherCondition, Wind,
};
use super::service::ForecastError;
use crate::geolocation::Coordinates;

// 2025-01-05 00:00:00 UTC, a Sunday
pub const SUNDAY_MIDNIGHT: i64 = 1736035200;
pub const THREE_HOURS: i64 = 3 * 60 * 60;

pub fn sample(dt: i64, temp: f64) -> ForecastSample {
    ForecastSample {
        dt,
        main: MainReadings {
            temp,
            feels_like: temp - 1.5,
            temp_min: None,
            temp_max: None,
            pressure: 1013,
            humidity: 70,
        },
        weather: vec![WeatherCondition {
            id: 803,
            main: "Clouds".to_string(),
            description: "broken clouds".to_string(),
            icon: "04d".to_string(),
        }],
        clouds: CloudCover { all: 75 },
        wind: Wind {
            speed: 3.6,
            deg: 250,
            gust: None,
        },
        visibility: Some(10000.0),
        pop: None,
        dt_txt: None,
    }
}

/// One sample at 20:00 UTC on Sunday, grouped the way the service does it
/// with a UTC default zone
pub fn sunday_evening(
    city: &str,
    at: Coordinates,
    zone: Option<DisplayZone>,
) -> Result<ForecastResult, ForecastError> {
    let grouper = DayGrouper::new(DisplayZone::Named(chrono_tz::UTC), "%H:%M");
    let days = grouper.group(&[sample(SUNDAY_MIDNIGHT + 20 * 60 * 60, 18.0)], zone)?;
    Ok(ForecastResult {
        city: CityInfo {
            name: city.to_string(),
            country: "IN".to_string(),
            coordinates: at,
        },
        days,
    })
}
