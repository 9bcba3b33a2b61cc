//! Ownership of the map view and its single marker.
//!
//! Drawing tiles and pins is left to whatever implements [`MapView`]; the
//! controller only decides where the view points and which marker exists.

mod scene;

pub use scene::{MapScene, SceneMap, SceneMarker, TileLayer};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::geolocation::Coordinates;

const LEAFLET_ASSETS: &str = "https://unpkg.com/leaflet@1.9.3/dist/images";

#[derive(Error, Debug, PartialEq)]
pub enum MapError {
    #[error("Map view is not mounted")]
    NotMounted,
}

/// Marker icon images handed to the renderer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MarkerAssets {
    #[serde(default = "default_icon_url")]
    pub icon_url: String,
    #[serde(default = "default_icon_retina_url")]
    pub icon_retina_url: String,
    #[serde(default = "default_shadow_url")]
    pub shadow_url: String,
}

fn default_icon_url() -> String {
    format!("{LEAFLET_ASSETS}/marker-icon.png")
}

fn default_icon_retina_url() -> String {
    format!("{LEAFLET_ASSETS}/marker-icon-2x.png")
}

fn default_shadow_url() -> String {
    format!("{LEAFLET_ASSETS}/marker-shadow.png")
}

impl Default for MarkerAssets {
    fn default() -> Self {
        Self {
            icon_url: default_icon_url(),
            icon_retina_url: default_icon_retina_url(),
            shadow_url: default_shadow_url(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapSettings {
    pub initial_center: Coordinates,
    pub initial_zoom: u8,
    pub focus_zoom: u8,
    pub tile_url: String,
    pub max_zoom: u8,
    pub attribution: String,
}

impl Default for MapSettings {
    fn default() -> Self {
        Self {
            initial_center: Coordinates::new(20.0, 78.0),
            initial_zoom: 4,
            focus_zoom: 12,
            tile_url: "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png".to_string(),
            max_zoom: 19,
            attribution: "&copy; OpenStreetMap contributors".to_string(),
        }
    }
}

/// A rendering backend for one map
pub trait MapView {
    type Marker;
    type Scene;

    fn set_view(&mut self, center: Coordinates, zoom: u8);

    /// Add a marker whose popup shows `label`, already opened
    fn add_marker(&mut self, at: Coordinates, label: &str, assets: &MarkerAssets) -> Self::Marker;

    fn remove_marker(&mut self, marker: Self::Marker);

    /// Release whatever the view holds; it is not used afterwards
    fn release(&mut self);

    fn scene(&self) -> Self::Scene;
}

/// Exclusive owner of a map view and the markers placed on it
pub struct MapController<V: MapView> {
    view: Option<V>,
    markers: Vec<V::Marker>,
    settings: MapSettings,
    assets: MarkerAssets,
}

impl<V: MapView> MapController<V> {
    pub fn new(settings: MapSettings, assets: MarkerAssets) -> Self {
        Self {
            view: None,
            markers: Vec::new(),
            settings,
            assets,
        }
    }

    /// Create the view unless one already exists. Returns whether a view was created.
    pub fn mount(&mut self, create: impl FnOnce(&MapSettings) -> V) -> bool {
        if self.view.is_some() {
            tracing::debug!("Map view already mounted");
            return false;
        }

        let mut view = create(&self.settings);
        view.set_view(self.settings.initial_center, self.settings.initial_zoom);
        self.view = Some(view);
        true
    }

    pub fn recenter(&mut self, at: Coordinates, zoom: u8) -> Result<(), MapError> {
        let view = self.view.as_mut().ok_or(MapError::NotMounted)?;
        view.set_view(at, zoom);
        Ok(())
    }

    /// Focus on `at`, replacing every existing marker with one labelled `label`
    pub fn place_single_marker(&mut self, at: Coordinates, label: &str) -> Result<(), MapError> {
        self.recenter(at, self.settings.focus_zoom)?;
        let view = self.view.as_mut().ok_or(MapError::NotMounted)?;
        for marker in self.markers.drain(..) {
            view.remove_marker(marker);
        }
        let marker = view.add_marker(at, label, &self.assets);
        self.markers.push(marker);

        tracing::debug!(lat = at.latitude, lon = at.longitude, label = %label, "Marker placed");
        Ok(())
    }

    /// Remove all markers and release the view. Safe to call repeatedly.
    pub fn dispose(&mut self) {
        if let Some(mut view) = self.view.take() {
            for marker in self.markers.drain(..) {
                view.remove_marker(marker);
            }
            view.release();
            tracing::debug!("Map view released");
        }
    }

    /// Description of the current view, if mounted
    pub fn scene(&self) -> Option<V::Scene> {
        self.view.as_ref().map(MapView::scene)
    }
}

impl<V: MapView> Drop for MapController<V> {
    fn drop(&mut self) {
        self.dispose();
    }
}
