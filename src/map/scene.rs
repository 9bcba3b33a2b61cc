use serde::Serialize;
use utoipa::ToSchema;

use super::{MapSettings, MapView, MarkerAssets};
use crate::geolocation::Coordinates;

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct TileLayer {
    pub url_template: String,
    pub max_zoom: u8,
    pub attribution: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct SceneMarker {
    pub id: u32,
    pub position: Coordinates,
    pub popup: String,
    pub popup_open: bool,
    pub assets: MarkerAssets,
}

/// Everything a client needs to draw the map as it currently stands
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct MapScene {
    pub center: Coordinates,
    pub zoom: u8,
    pub tiles: TileLayer,
    pub markers: Vec<SceneMarker>,
}

/// A map view that keeps a serialisable scene for a remote renderer
#[derive(Debug)]
pub struct SceneMap {
    scene: MapScene,
    next_marker: u32,
}

impl SceneMap {
    pub fn new(settings: &MapSettings) -> Self {
        Self {
            scene: MapScene {
                center: settings.initial_center,
                zoom: settings.initial_zoom,
                tiles: TileLayer {
                    url_template: settings.tile_url.clone(),
                    max_zoom: settings.max_zoom,
                    attribution: settings.attribution.clone(),
                },
                markers: Vec::new(),
            },
            next_marker: 0,
        }
    }
}

impl MapView for SceneMap {
    type Marker = u32;
    type Scene = MapScene;

    fn set_view(&mut self, center: Coordinates, zoom: u8) {
        self.scene.center = center;
        self.scene.zoom = zoom.min(self.scene.tiles.max_zoom);
    }

    fn add_marker(&mut self, at: Coordinates, label: &str, assets: &MarkerAssets) -> u32 {
        self.next_marker += 1;
        // Only the newest popup stays open
        for marker in &mut self.scene.markers {
            marker.popup_open = false;
        }
        self.scene.markers.push(SceneMarker {
            id: self.next_marker,
            position: at,
            popup: label.to_string(),
            popup_open: true,
            assets: assets.clone(),
        });
        self.next_marker
    }

    fn remove_marker(&mut self, marker: u32) {
        self.scene.markers.retain(|m| m.id != marker);
    }

    fn release(&mut self) {
        self.scene.markers.clear();
    }

    fn scene(&self) -> MapScene {
        self.scene.clone()
    }
}
