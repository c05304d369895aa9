#![doc = include_str!("../README.md")]

pub mod gpx;
pub mod leaflet;
pub mod map;
pub mod page;
pub mod track;

pub use gpx::{parse_gpx, parse_gpx_file, GpxError};
pub use leaflet::LeafletScript;
pub use map::{
    CircleStyle, MapConfig, MapError, MapInitializer, MapOptions, MapPoint, MapRenderer,
    MarkerId, RenderError, TileLayer,
};
pub use page::{map_script, render_page, render_track_page, PageError};
pub use track::{mean_by_minute, LatLng, Track, TrackPoint};
