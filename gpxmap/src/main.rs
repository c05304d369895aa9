use std::time::Instant;

use ntex::http::header;
use ntex::util::Bytes;
use ntex::web::{self, middleware, App, HttpRequest, HttpResponse};
use ntex_cors::Cors;
use ntex_files as fs;
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gpxmap_core::{map_script, parse_gpx, render_page, MapConfig, MapOptions, PageError, Track};

mod settings;

const INDEX_HTML: &str = include_str!("static/index.html");

/// Form field holding the uploaded file
const GPX_FIELD: &str = "gpx";

#[derive(Serialize)]
pub struct TrackResult<'a> {
    name: &'a str,
    date: Option<String>,
    #[serde(flatten)]
    map: MapConfig,
    /// elapsed time in ms
    time: usize,
}

/// Content of the `gpx` field of a `multipart/form-data` body.
async fn read_gpx_field(req: &HttpRequest, body: Bytes) -> Result<Option<Vec<u8>>, multer::Error> {
    let content_type = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    let boundary = multer::parse_boundary(content_type)?;

    let body = body.to_vec();
    let stream = futures::stream::once(async move { Ok::<_, std::convert::Infallible>(body) });
    let mut multipart = multer::Multipart::new(stream, boundary);

    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some(GPX_FIELD) {
            return Ok(Some(field.bytes().await?.to_vec()));
        }
    }

    Ok(None)
}

/// Parsed upload, or the response explaining why there is none.
async fn upload_track(req: &HttpRequest, body: Bytes) -> Result<Track, HttpResponse> {
    let content = match read_gpx_field(req, body).await {
        Ok(Some(content)) => content,
        Ok(None) => {
            tracing::error!("missing gpx file");
            return Err(HttpResponse::BadRequest().body("missing gpx file"));
        }
        Err(e) => {
            tracing::error!(error = %e, "bad form");
            return Err(HttpResponse::BadRequest().body("bad form"));
        }
    };

    let track = parse_gpx(content.as_slice()).map_err(|e| {
        tracing::error!(error = %e, "bad gpx");
        HttpResponse::BadRequest().body("bad gpx")
    })?;

    tracing::info!(name = %track.name, count = track.points.len(), "gpx parsed");

    Ok(track)
}

/// Minute-reduced map data of a track with in-range coordinates.
fn track_map(track: &Track) -> Result<MapConfig, HttpResponse> {
    let Some(map) = MapConfig::from_track(track) else {
        tracing::error!("empty track");
        return Err(HttpResponse::BadRequest().body("empty track"));
    };
    tracing::info!(count = map.points.len(), "minute agg");

    map.validate().map_err(|e| {
        tracing::error!(error = %e, "bad gpx");
        HttpResponse::BadRequest().body("bad gpx")
    })?;

    Ok(map)
}

pub async fn index() -> HttpResponse {
    HttpResponse::Ok().content_type("text/html").body(INDEX_HTML)
}

/// Render the uploaded track as a map page.
pub async fn map(
    options: web::types::State<MapOptions>,
    body: Bytes,
    req: HttpRequest,
) -> HttpResponse {
    tracing::info!(remote = ?req.peer_addr(), "map called");

    let track = match upload_track(&req, body).await {
        Ok(track) => track,
        Err(response) => return response,
    };

    let map = match track_map(&track) {
        Ok(map) => map,
        Err(response) => return response,
    };

    let page = map_script(map, &options)
        .map_err(PageError::from)
        .and_then(|script| {
            render_page(&track.name, track.date().as_deref(), &options.container, &script)
        });

    match page {
        Ok(page) => HttpResponse::Ok().content_type("text/html").body(page),
        Err(e) => {
            tracing::error!(error = %e, "can't render map page");
            HttpResponse::InternalServerError().body("can't render map")
        }
    }
}

/// Same as [`map`] but answers with the map data as JSON.
pub async fn api_map(body: Bytes, req: HttpRequest) -> HttpResponse {
    let now = Instant::now();

    let track = match upload_track(&req, body).await {
        Ok(track) => track,
        Err(response) => return response,
    };

    let map = match track_map(&track) {
        Ok(map) => map,
        Err(response) => return response,
    };

    HttpResponse::Ok().json(&TrackResult {
        name: &track.name,
        date: track.date(),
        map,
        time: now.elapsed().as_millis() as usize,
    })
}

pub async fn bad_method(req: HttpRequest) -> HttpResponse {
    tracing::error!(method = %req.method(), path = req.path(), "bad method");
    HttpResponse::MethodNotAllowed().body("bad method")
}

fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service((
        web::resource("/")
            .route(web::get().to(index))
            .route(web::route().to(bad_method)),
        web::resource("/map")
            .route(web::post().to(map))
            .route(web::route().to(bad_method)),
        web::resource("/api/map")
            .route(web::post().to(api_map))
            .route(web::route().to(bad_method)),
    ));
}

#[ntex::main]
async fn main() -> std::io::Result<()> {
    // logging
    let subscriber = tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer());
    subscriber.init();

    let settings = settings::Settings::new().map_err(|e| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("On read settings: {e}"),
        )
    })?;
    tracing::info!("Settings are:\n{:#?}", settings);

    let settings_clone = settings.clone();

    web::server(move || {
        let settings = settings_clone.clone();

        App::new()
            .state(settings.map.clone())
            .state(web::types::PayloadConfig::new(settings.max_upload_size))
            // enable logger
            .wrap(middleware::Logger::default())
            .wrap(Cors::default())
            .configure(routes)
            .configure(move |cfg: &mut web::ServiceConfig| {
                if let Some(static_dir) = settings.static_dir.as_ref() {
                    cfg.service(fs::Files::new("/static", static_dir));
                }
            })
    })
    .bind(format!("{}:{}", settings.host, settings.port))?
    .run()
    .await
}
