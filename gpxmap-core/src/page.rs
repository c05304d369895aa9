use handlebars::Handlebars;
use lazy_static::lazy_static;
use serde::Serialize;

use crate::leaflet::LeafletScript;
use crate::map::{MapConfig, MapError, MapInitializer, MapOptions};
use crate::track::Track;

const MAP_TEMPLATE: &str = "MAP_TEMPLATE";

fn get_templates() -> Result<Handlebars<'static>, handlebars::TemplateError> {
    let mut h = Handlebars::new();
    h.register_template_string(MAP_TEMPLATE, include_str!("templates/map.html.hbs"))?;
    Ok(h)
}

lazy_static! {
    static ref HBR: Handlebars<'static> = get_templates().expect("Failed to parse templates");
}

#[derive(Debug, thiserror::Error)]
pub enum PageError {
    #[error("track has no points")]
    EmptyTrack,
    #[error(transparent)]
    Map(#[from] MapError),
    #[error("can't render page: {0}")]
    Template(#[from] handlebars::RenderError),
}

#[derive(Serialize)]
struct PageContext<'a> {
    name: &'a str,
    date: Option<&'a str>,
    container: &'a str,
    script: &'a str,
}

/// Leaflet setup script drawing `config` into the `options.container` element.
pub fn map_script(config: MapConfig, options: &MapOptions) -> Result<String, MapError> {
    let renderer = LeafletScript::new([options.container.as_str()]);
    let mut initializer = MapInitializer::new(renderer, config, options.clone())?;
    initializer.initialize()?;
    Ok(initializer.into_renderer().finish())
}

/// Full HTML page hosting the map container and its setup `script`.
pub fn render_page(
    name: &str,
    date: Option<&str>,
    container: &str,
    script: &str,
) -> Result<String, PageError> {
    Ok(HBR.render(
        MAP_TEMPLATE,
        &PageContext {
            name,
            date,
            container,
            script,
        },
    )?)
}

/// Parse-to-page pipeline: reduce `track` per minute and render it.
pub fn render_track_page(track: &Track, options: &MapOptions) -> Result<String, PageError> {
    let config = MapConfig::from_track(track).ok_or(PageError::EmptyTrack)?;

    #[cfg(feature = "tracing")]
    tracing::info!(
        "Render {:?}: {} points, {} markers",
        track.name,
        track.points.len(),
        config.points.len()
    );

    let script = map_script(config, options)?;
    render_page(
        &track.name,
        track.date().as_deref(),
        &options.container,
        &script,
    )
}
