use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use tracing::{info, warn};

use crate::map;
use crate::models::{HotspotPayload, OutbreakRecord};
use crate::report;
use crate::risk;

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub min_cases: f64,
    pub public_dir: PathBuf,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            min_cases: risk::DEFAULT_MIN_CASES,
            public_dir: PathBuf::from("public"),
        }
    }
}

/// Scores, ranks and maps a batch. A map failure only drops `mapPath`.
pub fn build_payload(records: Vec<OutbreakRecord>, options: &PipelineOptions) -> HotspotPayload {
    if records.is_empty() {
        info!("no outbreak records, emitting empty payload");
        return HotspotPayload::empty();
    }

    let scored = risk::score_records(records, options.min_cases);
    let table = report::build_table(&scored);

    let map_path = match map::write_map(&options.public_dir, &scored) {
        Ok(path) => Some(path),
        Err(err) => {
            warn!(error = %err, "map rendering failed, continuing without map");
            None
        }
    };

    info!(rows = table.len(), map = map_path.is_some(), "payload ready");
    HotspotPayload::new(table, map_path)
}

pub fn emit<W: Write>(payload: &HotspotPayload, out: &mut W) -> anyhow::Result<()> {
    serde_json::to_writer(&mut *out, payload).context("failed to serialize payload")?;
    out.flush().context("failed to flush stdout")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Band;

    fn record(district: &str, disease: &str, cases: f64, coords: Option<(f64, f64)>) -> OutbreakRecord {
        OutbreakRecord {
            state_ut: "Assam".to_string(),
            district: district.to_string(),
            disease: disease.to_string(),
            cases,
            latitude: coords.map(|c| c.0),
            longitude: coords.map(|c| c.1),
            year: Some(2023.0),
            month: Some(8.0),
            ..OutbreakRecord::default()
        }
    }

    fn options(public_dir: PathBuf) -> PipelineOptions {
        PipelineOptions {
            public_dir,
            ..PipelineOptions::default()
        }
    }

    #[test]
    fn empty_batch_yields_empty_payload() {
        let dir = tempfile::tempdir().unwrap();
        let payload = build_payload(Vec::new(), &options(dir.path().to_path_buf()));

        let mut out = Vec::new();
        emit(&payload, &mut out).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(json["redzones"], serde_json::json!([]));
        assert_eq!(json["mapPath"], serde_json::Value::Null);
        assert!(!dir.path().join("maps").exists());
    }

    #[test]
    fn full_batch_produces_table_and_map() {
        let dir = tempfile::tempdir().unwrap();
        let records = vec![
            record("Pune", "Cholera", 10.0, Some((18.52, 73.85))),
            record("Cachar", "Cholera", 90.0, None),
        ];

        let payload = build_payload(records, &options(dir.path().to_path_buf()));
        assert_eq!(payload.areas.len(), 2);
        assert_eq!(payload.areas, payload.redzones);
        assert_eq!(payload.areas[0].district, "🔴 Cachar");
        assert_eq!(payload.areas[0].band, Band::Red);
        assert_eq!(payload.areas[1].percentage, 14.29);
        assert_eq!(payload.areas[1].date, "2023-08");
        assert_eq!(payload.map_path.as_deref(), Some(map::MAP_URL_PATH));

        let html = std::fs::read_to_string(map::map_file_path(dir.path())).unwrap();
        assert!(html.contains("Pune"));
        assert!(!html.contains("Cachar"));
    }

    #[test]
    fn map_failure_keeps_table() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("public");
        std::fs::write(&blocker, "file in the way").unwrap();

        let payload = build_payload(
            vec![record("Kolkata", "Typhoid", 60.0, Some((22.57, 88.36)))],
            &options(blocker),
        );
        assert_eq!(payload.map_path, None);
        assert_eq!(payload.areas.len(), 1);
        assert_eq!(payload.areas[0].percentage, 100.0);
    }

    #[test]
    fn emitted_json_uses_expected_keys() {
        let dir = tempfile::tempdir().unwrap();
        let payload = build_payload(
            vec![record("Dibrugarh", "Hepatitis A", 20.0, None)],
            &options(dir.path().to_path_buf()),
        );

        let mut out = Vec::new();
        emit(&payload, &mut out).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&out).unwrap();
        let row = &json["areas"][0];
        assert_eq!(row["district"], "🟢 Dibrugarh");
        assert_eq!(row["disease"], "Hepatitis A");
        assert_eq!(row["percentage"], 40.0);
        assert_eq!(row["band"], "green");
        assert_eq!(json["mapPath"], map::MAP_URL_PATH);
    }
}
