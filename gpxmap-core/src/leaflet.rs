//! [`MapRenderer`] emitting a Leaflet setup routine.
//!
//! Nothing is drawn on the server: every call is recorded as a JavaScript
//! statement and [`LeafletScript::finish`] wraps them into a function run by the
//! browser once the page content is parsed (`DOMContentLoaded`).
use serde::Serialize;

use crate::map::{CircleStyle, MapRenderer, MarkerId, RenderError, TileLayer};
use crate::track::LatLng;

const MAP_VAR: &str = "map";
const HANDLER_NAME: &str = "on_loaded";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TileLayerOptions<'a> {
    max_zoom: u8,
    attribution: &'a str,
}

/// JSON literal safe to embed into a `<script>` element.
fn js_value<T: Serialize + ?Sized>(value: &T) -> Result<String, RenderError> {
    let json = serde_json::to_string(value)?;
    Ok(json
        .replace('<', "\\u003c")
        .replace('>', "\\u003e")
        .replace('&', "\\u0026"))
}

fn js_location(at: LatLng) -> Result<String, RenderError> {
    Ok(format!("[{}, {}]", js_value(&at.lat)?, js_value(&at.lng)?))
}

#[derive(Debug, Clone)]
pub struct LeafletScript {
    containers: Vec<String>,
    statements: Vec<String>,
    created: bool,
    markers: usize,
}

impl LeafletScript {
    /// `containers` are the element ids present on the hosting page.
    pub fn new<I, S>(containers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        LeafletScript {
            containers: containers.into_iter().map(Into::into).collect(),
            statements: Vec::new(),
            created: false,
            markers: 0,
        }
    }

    pub fn statements(&self) -> &[String] {
        &self.statements
    }

    pub fn marker_count(&self) -> usize {
        self.markers
    }

    /// The setup routine and its registration on `DOMContentLoaded`.
    pub fn finish(self) -> String {
        let mut script = format!("function {HANDLER_NAME}() {{\n");
        for statement in &self.statements {
            script.push_str("    ");
            script.push_str(statement);
            script.push('\n');
        }
        script.push_str("}\n");
        script.push_str(&format!(
            "document.addEventListener(\"DOMContentLoaded\", {HANDLER_NAME});\n"
        ));
        script
    }

    fn ensure_created(&self) -> Result<(), RenderError> {
        if self.created {
            Ok(())
        } else {
            Err(RenderError::MapNotCreated)
        }
    }
}

impl MapRenderer for LeafletScript {
    fn create(&mut self, container: &str, center: LatLng, zoom: u8) -> Result<(), RenderError> {
        if !self.containers.iter().any(|id| id == container) {
            return Err(RenderError::ContainerMissing(container.to_owned()));
        }
        self.statements.push(format!(
            "var {MAP_VAR} = L.map({}).setView({}, {zoom});",
            js_value(container)?,
            js_location(center)?,
        ));
        self.created = true;
        Ok(())
    }

    fn add_tile_layer(&mut self, layer: &TileLayer) -> Result<(), RenderError> {
        self.ensure_created()?;
        let options = TileLayerOptions {
            max_zoom: layer.max_zoom,
            attribution: &layer.attribution,
        };
        self.statements.push(format!(
            "L.tileLayer({}, {}).addTo({MAP_VAR});",
            js_value(&layer.url_template)?,
            js_value(&options)?,
        ));
        Ok(())
    }

    fn add_marker(&mut self, at: LatLng, style: &CircleStyle) -> Result<MarkerId, RenderError> {
        self.ensure_created()?;
        let id = MarkerId(self.markers);
        self.statements.push(format!(
            "var marker{} = L.circle({}, {}).addTo({MAP_VAR});",
            id.0,
            js_location(at)?,
            js_value(style)?,
        ));
        self.markers += 1;
        Ok(id)
    }

    fn bind_popup(&mut self, marker: MarkerId, content: &str) -> Result<(), RenderError> {
        if marker.0 >= self.markers {
            return Err(RenderError::UnknownMarker(marker));
        }
        self.statements.push(format!(
            "marker{}.bindPopup({});",
            marker.0,
            js_value(content)?
        ));
        Ok(())
    }
}
