use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tera::{Context, Tera};
use thiserror::Error;
use tracing::{debug, info};

use crate::models::ScoredRecord;
use crate::report;

pub const MAP_CENTER: (f64, f64) = (22.9734, 78.6569);
pub const MAP_ZOOM: u8 = 5;
pub const MARKER_RADIUS: u8 = 8;
pub const MARKER_FILL_OPACITY: f64 = 0.7;

pub const MAPS_DIR: &str = "maps";
pub const MAP_FILE_NAME: &str = "india_hotspot_map.html";
/// Where the web server exposes the map relative to the public root.
pub const MAP_URL_PATH: &str = "/maps/india_hotspot_map.html";

const TEMPLATE_NAME: &str = "hotspot_map.html";

#[derive(Debug, Error)]
pub enum MapError {
    #[error("template error: {0}")]
    Template(#[from] tera::Error),

    #[error("failed to serialize markers: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct Marker {
    pub lat: f64,
    pub lon: f64,
    pub color: &'static str,
    pub popup: String,
}

pub fn popup_text(scored: &ScoredRecord) -> String {
    let record = &scored.record;
    [
        format!("State/UT: {}", tera::escape_html(&record.state_ut)),
        format!("District: {}", tera::escape_html(&record.district)),
        format!("Disease: {}", tera::escape_html(&record.disease)),
        format!("Date: {}", tera::escape_html(&report::row_date(record))),
        format!("Cases: {:?}", record.cases),
        format!("Risk Band: {}", scored.band.label()),
        format!("Outbreak %: {:?}%", scored.outbreak_percent),
    ]
    .join("<br>")
}

pub fn markers(scored: &[ScoredRecord]) -> Vec<Marker> {
    scored
        .iter()
        .filter_map(|item| {
            let (lat, lon) = item.record.coordinates()?;
            Some(Marker {
                lat,
                lon,
                color: item.band.as_str(),
                popup: popup_text(item),
            })
        })
        .collect()
}

pub fn render_html(scored: &[ScoredRecord], generated_at: DateTime<Utc>) -> Result<String, MapError> {
    let markers = markers(scored);
    // keep "</script>" inside popup text from closing the data block
    let markers_json = serde_json::to_string(&markers)?.replace("</", "<\\/");

    let mut tera = Tera::default();
    tera.add_raw_template(TEMPLATE_NAME, MAP_TEMPLATE)?;

    let mut context = Context::new();
    context.insert("center_lat", &MAP_CENTER.0);
    context.insert("center_lon", &MAP_CENTER.1);
    context.insert("zoom", &MAP_ZOOM);
    context.insert("radius", &MARKER_RADIUS);
    context.insert("fill_opacity", &MARKER_FILL_OPACITY);
    context.insert("marker_count", &markers.len());
    context.insert("markers_json", &markers_json);
    context.insert(
        "generated_at",
        &generated_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    );

    debug!(markers = markers.len(), skipped = scored.len() - markers.len(), "rendering map");
    Ok(tera.render(TEMPLATE_NAME, &context)?)
}

pub fn map_file_path(public_dir: &Path) -> PathBuf {
    public_dir.join(MAPS_DIR).join(MAP_FILE_NAME)
}

pub fn write_map(public_dir: &Path, scored: &[ScoredRecord]) -> Result<String, MapError> {
    let html = render_html(scored, Utc::now())?;

    let path = map_file_path(public_dir);
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| MapError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }
    std::fs::write(&path, html).map_err(|source| MapError::Io {
        path: path.clone(),
        source,
    })?;

    info!(path = %path.display(), "map written");
    Ok(MAP_URL_PATH.to_string())
}

const MAP_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1.0" />
    <title>Outbreak hotspots</title>
    <link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css" />
    <script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js"></script>
    <style>
        html, body { width: 100%; height: 100%; margin: 0; padding: 0; }
        #map { position: absolute; top: 0; bottom: 0; right: 0; left: 0; }
    </style>
</head>
<body>
    <div id="map" data-markers="{{ marker_count }}" data-generated="{{ generated_at }}"></div>
    <script>
        var map = L.map("map").setView([{{ center_lat }}, {{ center_lon }}], {{ zoom }});
        L.tileLayer("https://tile.openstreetmap.org/{z}/{x}/{y}.png", {
            maxZoom: 18,
            attribution: "&copy; OpenStreetMap contributors"
        }).addTo(map);

        var markers = {{ markers_json | safe }};
        markers.forEach(function (m) {
            L.circleMarker([m.lat, m.lon], {
                radius: {{ radius }},
                color: m.color,
                fill: true,
                fillColor: m.color,
                fillOpacity: {{ fill_opacity }}
            }).bindPopup(m.popup).addTo(map);
        });
    </script>
</body>
</html>
"#;
