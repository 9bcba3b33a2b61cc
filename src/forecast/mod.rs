#[cfg(test)]
pub(crate) mod fixtures;
pub mod grouper;
pub mod handlers;
pub mod models;
mod service;
pub mod view;

pub use grouper::{DayGrouper, DisplayZone};
pub use models::{CityInfo, ForecastQuery, ForecastResult};
pub use service::{ForecastError, ForecastService, ForecastSource};
pub use view::ForecastView;
