use std::fmt;

use serde::Serialize;

/// Field names as stored in the outbreak collection.
pub mod fields {
    pub const STATE: &str = "state_ut";
    pub const DISTRICT: &str = "district";
    pub const DISEASE: &str = "Disease";
    pub const CASES: &str = "Cases";
    pub const DEATHS: &str = "Deaths";
    pub const LATITUDE: &str = "Latitude";
    pub const LONGITUDE: &str = "Longitude";
    pub const YEAR: &str = "year";
    pub const MONTH: &str = "mon";
    pub const DAY: &str = "day";
    pub const WEEK_OF_OUTBREAK: &str = "week_of_outbreak";

    pub const ESSENTIAL: [&str; 11] = [
        STATE,
        DISTRICT,
        DISEASE,
        CASES,
        DEATHS,
        LATITUDE,
        LONGITUDE,
        YEAR,
        MONTH,
        DAY,
        WEEK_OF_OUTBREAK,
    ];
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutbreakRecord {
    pub state_ut: String,
    pub district: String,
    pub disease: String,
    pub cases: f64,
    pub deaths: f64,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub year: Option<f64>,
    pub month: Option<f64>,
    pub day: Option<f64>,
    pub week_of_outbreak: Option<String>,
}

impl OutbreakRecord {
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        let lat = self.latitude.filter(|v| v.is_finite())?;
        let lon = self.longitude.filter(|v| v.is_finite())?;
        Some((lat, lon))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Band {
    #[default]
    Green,
    Yellow,
    Red,
}

impl Band {
    pub fn as_str(self) -> &'static str {
        match self {
            Band::Green => "green",
            Band::Yellow => "yellow",
            Band::Red => "red",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Band::Green => "Green",
            Band::Yellow => "Yellow",
            Band::Red => "Red",
        }
    }

    pub fn indicator(self) -> &'static str {
        match self {
            Band::Green => "🟢",
            Band::Yellow => "🟡",
            Band::Red => "🔴",
        }
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct ScoredRecord {
    pub record: OutbreakRecord,
    pub threshold: f64,
    pub outbreak_percent: f64,
    pub band: Band,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableRow {
    pub district: String,
    pub disease: String,
    pub percentage: f64,
    pub date: String,
    pub band: Band,
}

#[derive(Debug, Clone)]
pub struct BandSummary {
    pub band: Band,
    pub count: usize,
    pub avg_percent: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct HotspotPayload {
    pub areas: Vec<TableRow>,
    pub redzones: Vec<TableRow>,
    #[serde(rename = "mapPath")]
    pub map_path: Option<String>,
}

impl HotspotPayload {
    pub fn new(rows: Vec<TableRow>, map_path: Option<String>) -> Self {
        Self {
            redzones: rows.clone(),
            areas: rows,
            map_path,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}
