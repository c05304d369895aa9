use chrono::{DateTime, FixedOffset, Timelike};
use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// Geographic coordinate in decimal degrees (WGS84).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        LatLng { lat, lng }
    }

    /// Finite and inside [-90, 90] x [-180, 180].
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

/// Single recorded position of a track.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackPoint {
    pub lat: f64,
    pub lng: f64,
    /// Keeps the offset the point was recorded with
    pub time: DateTime<FixedOffset>,
}

impl TrackPoint {
    pub fn location(&self) -> LatLng {
        LatLng::new(self.lat, self.lng)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Track {
    pub name: String,
    /// `<metadata><time>` of the source document
    pub time: Option<DateTime<FixedOffset>>,
    pub points: Vec<TrackPoint>,
}

impl Track {
    /// Mean of all points, `None` for an empty track.
    pub fn center(&self) -> Option<LatLng> {
        if self.points.is_empty() {
            return None;
        }

        let (lat, lng) = self
            .points
            .iter()
            .fold((0.0, 0.0), |(lat, lng), pt| (lat + pt.lat, lng + pt.lng));
        let size = self.points.len() as f64;

        Some(LatLng::new(lat / size, lng / size))
    }

    /// Track date as `YYYY-MM-DD`.
    ///
    /// Metadata time wins over the first point's time.
    pub fn date(&self) -> Option<String> {
        self.time
            .or_else(|| self.points.first().map(|pt| pt.time))
            .map(|time| time.format("%Y-%m-%d").to_string())
    }
}

fn minute_of(time: &DateTime<FixedOffset>) -> DateTime<FixedOffset> {
    time.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(*time)
}

/// Replace every run of consecutive points recorded within the same minute by
/// a single point at their mean position, stamped with the start of the minute.
pub fn mean_by_minute(points: &[TrackPoint]) -> Vec<TrackPoint> {
    let by_minute = points.iter().group_by(|pt| minute_of(&pt.time));

    let reduced = by_minute
        .into_iter()
        .map(|(minute, group)| {
            let (count, lat, lng) = group.fold((0usize, 0.0, 0.0), |(count, lat, lng), pt| {
                (count + 1, lat + pt.lat, lng + pt.lng)
            });
            TrackPoint {
                lat: lat / count as f64,
                lng: lng / count as f64,
                time: minute,
            }
        })
        .collect::<Vec<TrackPoint>>();

    reduced
}
