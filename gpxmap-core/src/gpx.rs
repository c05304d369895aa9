//! GPX 1.1 track reader.
//!
//! Only the parts needed for drawing are read: the first track name, the
//! optional `<metadata><time>` and every `<trkpt>` of every `<trkseg>`, in
//! document order. Waypoints, routes and extensions are skipped.
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use chrono::DateTime;
use serde::Deserialize;

#[cfg(feature = "tracing")]
use std::time::Instant;

use crate::track::{Track, TrackPoint};

#[derive(Debug, thiserror::Error)]
pub enum GpxError {
    #[error("can't read gpx: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed gpx: {0}")]
    Xml(#[from] quick_xml::de::DeError),
    #[error("point {index}: missing time")]
    MissingTime { index: usize },
    #[error("point {index}: bad time - {source}")]
    BadTime {
        index: usize,
        #[source]
        source: chrono::ParseError,
    },
    #[error("metadata: bad time - {0}")]
    BadMetadataTime(#[source] chrono::ParseError),
}

#[derive(Debug, Deserialize)]
struct GpxDocument {
    #[serde(default)]
    metadata: Option<Metadata>,
    #[serde(rename = "trk", default)]
    tracks: Vec<TrackRaw>,
}

#[derive(Debug, Deserialize)]
struct Metadata {
    #[serde(default)]
    time: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TrackRaw {
    #[serde(default)]
    name: Option<String>,
    #[serde(rename = "trkseg", default)]
    segments: Vec<SegmentRaw>,
}

#[derive(Debug, Deserialize)]
struct SegmentRaw {
    #[serde(rename = "trkpt", default)]
    points: Vec<PointRaw>,
}

#[derive(Debug, Deserialize)]
struct PointRaw {
    #[serde(rename = "@lat")]
    lat: f64,
    #[serde(rename = "@lon")]
    lon: f64,
    #[serde(default)]
    time: Option<String>,
}

/// Parse a GPX document.
///
/// Every track point must carry an RFC 3339 `<time>`; the first point
/// without one fails the whole document.
pub fn parse_gpx<R: BufRead>(reader: R) -> Result<Track, GpxError> {
    #[cfg(feature = "tracing")]
    let now = Instant::now();

    let document: GpxDocument = quick_xml::de::from_reader(reader)?;

    let time = document
        .metadata
        .and_then(|metadata| metadata.time)
        .map(|time| DateTime::parse_from_rfc3339(time.trim()))
        .transpose()
        .map_err(GpxError::BadMetadataTime)?;

    let name = document
        .tracks
        .first()
        .and_then(|track| track.name.as_deref())
        .map(|name| name.trim().to_owned())
        .unwrap_or_default();

    let points = document
        .tracks
        .into_iter()
        .flat_map(|track| track.segments)
        .flat_map(|segment| segment.points)
        .enumerate()
        .map(|(index, point)| {
            let raw_time = point.time.ok_or(GpxError::MissingTime { index })?;
            let time = DateTime::parse_from_rfc3339(raw_time.trim())
                .map_err(|source| GpxError::BadTime { index, source })?;
            Ok(TrackPoint {
                lat: point.lat,
                lng: point.lon,
                time,
            })
        })
        .collect::<Result<Vec<TrackPoint>, GpxError>>()?;

    #[cfg(feature = "tracing")]
    tracing::debug!(
        "Parsed gpx {:?} with {} points. took {}ms",
        name,
        points.len(),
        now.elapsed().as_millis()
    );

    Ok(Track { name, time, points })
}

/// Parse a GPX file from disk.
pub fn parse_gpx_file<P: AsRef<Path>>(path: P) -> Result<Track, GpxError> {
    let file = File::open(path)?;
    parse_gpx(BufReader::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_SEGMENTS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="test" xmlns="http://www.topografix.com/GPX/1/1">
  <metadata><time>2024-05-01T06:59:00Z</time></metadata>
  <wpt lat="0.5" lon="0.5"><name>start</name></wpt>
  <trk>
    <name>Two Segments</name>
    <type>walking</type>
    <trkseg>
      <trkpt lat="1.0" lon="2.0"><ele>10.5</ele><time>2024-05-01T07:00:00Z</time></trkpt>
      <trkpt lat="3.0" lon="4.0"><ele>11.0</ele><time>2024-05-01T07:00:30Z</time></trkpt>
    </trkseg>
    <trkseg>
      <trkpt lat="5.0" lon="6.0"><time>2024-05-01T07:05:00Z</time></trkpt>
    </trkseg>
  </trk>
</gpx>"#;

    #[test]
    fn parses_all_segments_in_order() {
        let track = parse_gpx(TWO_SEGMENTS.as_bytes()).unwrap();
        assert_eq!(track.name, "Two Segments");
        assert_eq!(track.points.len(), 3);
        assert_eq!(track.points[0].lat, 1.0);
        assert_eq!(track.points[0].lng, 2.0);
        assert_eq!(track.points[2].lat, 5.0);
        assert_eq!(track.date().as_deref(), Some("2024-05-01"));
        assert_eq!(
            track.time.map(|t| t.to_rfc3339()).as_deref(),
            Some("2024-05-01T06:59:00+00:00")
        );
    }

    #[test]
    fn concatenates_tracks_in_document_order() {
        let content = r#"<gpx version="1.1">
  <trk>
    <name>Out</name>
    <trkseg>
      <trkpt lat="1.0" lon="2.0"><time>2024-05-01T07:00:00Z</time></trkpt>
      <trkpt lat="3.0" lon="4.0"><time>2024-05-01T07:01:00Z</time></trkpt>
    </trkseg>
  </trk>
  <trk>
    <name>Back</name>
    <trkseg>
      <trkpt lat="5.0" lon="6.0"><time>2024-05-01T08:00:00Z</time></trkpt>
    </trkseg>
    <trkseg>
      <trkpt lat="7.0" lon="8.0"><time>2024-05-01T08:01:00Z</time></trkpt>
    </trkseg>
  </trk>
</gpx>"#;
        let track = parse_gpx(content.as_bytes()).unwrap();
        assert_eq!(track.name, "Out");

        let lats = track.points.iter().map(|pt| pt.lat).collect::<Vec<_>>();
        assert_eq!(lats, vec![1.0, 3.0, 5.0, 7.0]);
        assert_eq!(track.points[3].lng, 8.0);
        assert_eq!(track.points[2].time.to_rfc3339(), "2024-05-01T08:00:00+00:00");
    }

    #[test]
    fn track_without_name_and_points() {
        let content = r#"<gpx version="1.1"><trk><trkseg></trkseg></trk></gpx>"#;
        let track = parse_gpx(content.as_bytes()).unwrap();
        assert_eq!(track.name, "");
        assert!(track.points.is_empty());
    }

    #[test]
    fn bad_time_reports_point_index() {
        let content = r#"<gpx><trk><trkseg>
            <trkpt lat="1" lon="2"><time>2024-05-01T07:00:00Z</time></trkpt>
            <trkpt lat="1" lon="2"><time>yesterday</time></trkpt>
        </trkseg></trk></gpx>"#;
        let err = parse_gpx(content.as_bytes()).unwrap_err();
        assert!(matches!(err, GpxError::BadTime { index: 1, .. }));
        assert!(err.to_string().starts_with("point 1: bad time"));
    }

    #[test]
    fn missing_time() {
        let content = r#"<gpx><trk><trkseg><trkpt lat="1" lon="2"></trkpt></trkseg></trk></gpx>"#;
        let err = parse_gpx(content.as_bytes()).unwrap_err();
        assert!(matches!(err, GpxError::MissingTime { index: 0 }));
    }

    #[test]
    fn mismatched_tags() {
        let err = parse_gpx("<gpx><trk><name>x</name></gpx>".as_bytes()).unwrap_err();
        assert!(matches!(err, GpxError::Xml(_)));
    }

    #[test]
    fn missing_coordinates() {
        let content = r#"<gpx><trk><trkseg><trkpt lat="1"><time>2024-05-01T07:00:00Z</time></trkpt></trkseg></trk></gpx>"#;
        assert!(matches!(
            parse_gpx(content.as_bytes()).unwrap_err(),
            GpxError::Xml(_)
        ));
    }
}
