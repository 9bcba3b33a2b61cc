use serde::Serialize;
use utoipa::ToSchema;

use super::models::{CityInfo, DisplaySlot, ForecastResult};

/// Round half-up: 2.5 -> 3, -2.5 -> -2
pub fn round_half_up(value: f64) -> i64 {
    let floor = value.floor();
    if value - floor >= 0.5 {
        floor as i64 + 1
    } else {
        floor as i64
    }
}

/// Rendered forecast: one section per day, one card per slot
#[derive(Debug, Serialize, ToSchema)]
pub struct ForecastView {
    pub heading: String,
    pub city: CityInfo,
    pub days: Vec<DayView>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DayView {
    pub label: String,
    pub slots: Vec<SlotCard>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SlotCard {
    pub time: String,
    pub icon_url: String,
    pub description: String,
    pub temperature: i64,
    pub feels_like: i64,
    pub temperature_label: String,
    pub feels_like_label: String,
    pub pressure: u32,
    pub humidity: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visibility_km: Option<f64>,
    pub wind_speed: f64,
    pub wind_deg: u32,
    pub clouds: u32,
}

impl From<&DisplaySlot> for SlotCard {
    fn from(slot: &DisplaySlot) -> Self {
        let temperature = round_half_up(slot.temperature);
        let feels_like = round_half_up(slot.feels_like);
        SlotCard {
            time: slot.time.clone(),
            icon_url: slot.icon_url.clone(),
            description: slot.description.clone(),
            temperature,
            feels_like,
            temperature_label: format!("{temperature}°C"),
            feels_like_label: format!("Feels: {feels_like}°C"),
            pressure: slot.pressure,
            humidity: slot.humidity,
            visibility_km: slot.visibility_km,
            wind_speed: slot.wind_speed,
            wind_deg: slot.wind_deg,
            clouds: slot.clouds,
        }
    }
}

impl From<&ForecastResult> for ForecastView {
    fn from(result: &ForecastResult) -> Self {
        ForecastView {
            heading: format!(
                "Weather Forecast for {}, {}",
                result.city.name, result.city.country
            ),
            city: result.city.clone(),
            days: result
                .days
                .iter()
                .map(|(label, slots)| DayView {
                    label: label.clone(),
                    slots: slots.iter().map(SlotCard::from).collect(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forecast::models::DayBuckets;
    use crate::geolocation::Coordinates;

    fn slot(time: &str, temperature: f64, feels_like: f64) -> DisplaySlot {
        DisplaySlot {
            timestamp: 0,
            time: time.to_string(),
            temperature,
            feels_like,
            pressure: 1000,
            humidity: 50,
            visibility_km: Some(10.0),
            wind_speed: 1.0,
            wind_deg: 90,
            clouds: 0,
            description: "clear sky".to_string(),
            icon_url: "https://openweathermap.org/img/wn/01d@2x.png".to_string(),
        }
    }

    #[test]
    fn test_round_half_up() {
        assert_eq!(round_half_up(2.5), 3);
        assert_eq!(round_half_up(2.49), 2);
        assert_eq!(round_half_up(-2.5), -2);
        assert_eq!(round_half_up(-2.51), -3);
        assert_eq!(round_half_up(-0.4), 0);
        assert_eq!(round_half_up(0.0), 0);
        assert_eq!(round_half_up(21.0), 21);
    }

    #[test]
    fn test_view_rounds_at_render_time() {
        let mut days = DayBuckets::new();
        days.insert("Sunday, Jan 5".to_string(), vec![slot("12:00", 7.5, -0.5)]);
        days.insert("Monday, Jan 6".to_string(), vec![slot("00:00", 3.2, 1.49)]);
        let result = ForecastResult {
            city: CityInfo {
                name: "Pune".to_string(),
                country: "IN".to_string(),
                coordinates: Coordinates::new(18.52, 73.86),
            },
            days,
        };

        let view = ForecastView::from(&result);

        assert_eq!(view.heading, "Weather Forecast for Pune, IN");
        let labels: Vec<_> = view.days.iter().map(|d| d.label.as_str()).collect();
        assert_eq!(labels, ["Sunday, Jan 5", "Monday, Jan 6"]);

        let card = &view.days[0].slots[0];
        assert_eq!(card.temperature, 8);
        assert_eq!(card.feels_like, 0);
        assert_eq!(card.temperature_label, "8°C");
        assert_eq!(card.feels_like_label, "Feels: 0°C");

        // The grouped result itself keeps full precision
        assert_eq!(result.days["Sunday, Jan 5"][0].temperature, 7.5);
    }
}
