//! One-shot map setup.
//!
//! [`MapInitializer`] turns a [`MapConfig`] (center + points) into calls on a
//! [`MapRenderer`]: create the map, attach the tile layer, then add one circle
//! marker with a popup per point, in input order.
use serde::{Deserialize, Serialize};

use crate::track::{mean_by_minute, LatLng, Track};

pub const DEFAULT_CONTAINER: &str = "map";
pub const DEFAULT_ZOOM: u8 = 15;
pub const DEFAULT_TILE_URL: &str = "https://tile.openstreetmap.org/{z}/{x}/{y}.png";
pub const DEFAULT_MAX_ZOOM: u8 = 19;
pub const DEFAULT_ATTRIBUTION: &str =
    r#"&copy; <a href="http://www.openstreetmap.org/copyright">OpenStreetMap</a>"#;
pub const DEFAULT_MARKER_COLOR: &str = "red";
pub const DEFAULT_MARKER_RADIUS: f64 = 20.0;

/// Popup label format of reduced track points (`HH:MM`).
pub const POPUP_TIME_FORMAT: &str = "%H:%M";

/// One marker to draw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapPoint {
    pub lat: f64,
    pub lng: f64,
    /// Popup content, used as is
    pub time: String,
}

impl MapPoint {
    pub fn location(&self) -> LatLng {
        LatLng::new(self.lat, self.lng)
    }
}

/// Everything the initializer draws.
///
/// JSON shape: `{"center": {"lat", "lng"}, "points": [{"lat", "lng", "time"}, ...]}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapConfig {
    pub center: LatLng,
    pub points: Vec<MapPoint>,
}

impl MapConfig {
    /// Deserialize and validate. Entries missing `lat`, `lng` or `time` are rejected.
    pub fn from_json(content: &str) -> Result<Self, MapError> {
        let config: MapConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Center on the mean of the raw track, one point per minute labelled `HH:MM`.
    ///
    /// `None` for a track without points.
    pub fn from_track(track: &Track) -> Option<Self> {
        let center = track.center()?;
        let points = mean_by_minute(&track.points)
            .into_iter()
            .map(|pt| MapPoint {
                lat: pt.lat,
                lng: pt.lng,
                time: pt.time.format(POPUP_TIME_FORMAT).to_string(),
            })
            .collect();
        Some(MapConfig { center, points })
    }

    /// Fail on the first coordinate that is not finite or out of range.
    pub fn validate(&self) -> Result<(), MapError> {
        if !self.center.is_valid() {
            return Err(MapError::InvalidCenter(self.center));
        }
        if let Some((index, point)) = self
            .points
            .iter()
            .enumerate()
            .find(|(_, point)| !point.location().is_valid())
        {
            return Err(MapError::InvalidPoint {
                index,
                location: point.location(),
            });
        }
        Ok(())
    }
}

/// Raster tile source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TileLayer {
    /// `{z}/{x}/{y}` url template
    pub url_template: String,
    pub max_zoom: u8,
    pub attribution: String,
}

impl Default for TileLayer {
    fn default() -> Self {
        TileLayer {
            url_template: DEFAULT_TILE_URL.to_owned(),
            max_zoom: DEFAULT_MAX_ZOOM,
            attribution: DEFAULT_ATTRIBUTION.to_owned(),
        }
    }
}

/// Circle marker look, radius in meters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircleStyle {
    pub color: String,
    pub radius: f64,
}

impl Default for CircleStyle {
    fn default() -> Self {
        CircleStyle {
            color: DEFAULT_MARKER_COLOR.to_owned(),
            radius: DEFAULT_MARKER_RADIUS,
        }
    }
}

/// Fixed parts of the map: where it goes and how it looks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapOptions {
    /// Id of the page element the map is bound to
    pub container: String,
    pub zoom: u8,
    pub tile_layer: TileLayer,
    pub marker: CircleStyle,
}

impl Default for MapOptions {
    fn default() -> Self {
        MapOptions {
            container: DEFAULT_CONTAINER.to_owned(),
            zoom: DEFAULT_ZOOM,
            tile_layer: TileLayer::default(),
            marker: CircleStyle::default(),
        }
    }
}

/// Handle of a marker created by a [`MapRenderer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MarkerId(pub usize);

impl std::fmt::Display for MarkerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("container {0:?} not found")]
    ContainerMissing(String),
    #[error("map is not created")]
    MapNotCreated,
    #[error("unknown marker {0}")]
    UnknownMarker(MarkerId),
    #[error("can't encode value: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("map is already initialized")]
    AlreadyInitialized,
    #[error("invalid center {0:?}")]
    InvalidCenter(LatLng),
    #[error("point {index}: invalid location {location:?}")]
    InvalidPoint { index: usize, location: LatLng },
    #[error("malformed map config: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Mapping library capability used by [`MapInitializer`].
pub trait MapRenderer {
    /// Create the map bound to `container`, viewing `center` at `zoom`.
    fn create(&mut self, container: &str, center: LatLng, zoom: u8) -> Result<(), RenderError>;
    /// Attach a background tile layer to the map.
    fn add_tile_layer(&mut self, layer: &TileLayer) -> Result<(), RenderError>;
    /// Add a circle marker to the map.
    fn add_marker(&mut self, at: LatLng, style: &CircleStyle) -> Result<MarkerId, RenderError>;
    /// Bind a popup to a marker. Popups are not opened.
    fn bind_popup(&mut self, marker: MarkerId, content: &str) -> Result<(), RenderError>;
}

impl<R: MapRenderer + ?Sized> MapRenderer for &mut R {
    fn create(&mut self, container: &str, center: LatLng, zoom: u8) -> Result<(), RenderError> {
        (**self).create(container, center, zoom)
    }

    fn add_tile_layer(&mut self, layer: &TileLayer) -> Result<(), RenderError> {
        (**self).add_tile_layer(layer)
    }

    fn add_marker(&mut self, at: LatLng, style: &CircleStyle) -> Result<MarkerId, RenderError> {
        (**self).add_marker(at, style)
    }

    fn bind_popup(&mut self, marker: MarkerId, content: &str) -> Result<(), RenderError> {
        (**self).bind_popup(marker, content)
    }
}

pub struct MapInitializer<R> {
    renderer: R,
    config: MapConfig,
    options: MapOptions,
    initialized: bool,
}

impl<R: MapRenderer> MapInitializer<R> {
    /// Validates `config` before anything is drawn.
    pub fn new(renderer: R, config: MapConfig, options: MapOptions) -> Result<Self, MapError> {
        config.validate()?;
        Ok(MapInitializer {
            renderer,
            config,
            options,
            initialized: false,
        })
    }

    /// Run the setup. Returns the number of markers created.
    ///
    /// Only the first call reaches the renderer, even if it fails; later calls
    /// return [`MapError::AlreadyInitialized`].
    pub fn initialize(&mut self) -> Result<usize, MapError> {
        if self.initialized {
            return Err(MapError::AlreadyInitialized);
        }
        self.initialized = true;

        let options = &self.options;
        self.renderer.create(&options.container, self.config.center, options.zoom)?;
        self.renderer.add_tile_layer(&options.tile_layer)?;

        for point in &self.config.points {
            let marker = self.renderer.add_marker(point.location(), &options.marker)?;
            self.renderer.bind_popup(marker, &point.time)?;
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(
            "Map {:?} initialized with {} markers",
            options.container,
            self.config.points.len()
        );

        Ok(self.config.points.len())
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn into_renderer(self) -> R {
        self.renderer
    }
}
