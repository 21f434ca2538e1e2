use anyhow::Context;
use futures::TryStreamExt;
use mongodb::bson::{doc, Bson, Document};
use mongodb::{Client, Collection, Database};
use tracing::{debug, info, warn};

use crate::coerce;
use crate::models::{fields, OutbreakRecord};

pub const FALLBACK_DATABASE: &str = "water";
pub const PREFERRED_COLLECTION: &str = "Dieses_data";
pub const FALLBACK_COLLECTION: &str = "Disease_Data";

#[derive(Debug, Clone)]
pub struct MongoSettings {
    pub uri: String,
    pub database: Option<String>,
    pub collection: Option<String>,
}

pub fn normalize_uri(uri: &str) -> &str {
    uri.strip_suffix('/').unwrap_or(uri)
}

pub fn pick_collection(explicit: Option<&str>, available: &[String]) -> String {
    if let Some(name) = explicit.filter(|name| !name.is_empty()) {
        return name.to_string();
    }

    if available.iter().any(|name| name == PREFERRED_COLLECTION) {
        PREFERRED_COLLECTION.to_string()
    } else {
        FALLBACK_COLLECTION.to_string()
    }
}

fn resolve_database(client: &Client, override_name: Option<&str>) -> Database {
    if let Some(db) = client.default_database() {
        return db;
    }

    let name = override_name
        .filter(|name| !name.is_empty())
        .unwrap_or(FALLBACK_DATABASE);
    client.database(name)
}

pub async fn connect(settings: &MongoSettings) -> anyhow::Result<Collection<Document>> {
    let client = Client::with_uri_str(normalize_uri(&settings.uri))
        .await
        .context("failed to connect to MongoDB")?;

    let db = resolve_database(&client, settings.database.as_deref());

    let available = match db.list_collection_names().await {
        Ok(names) => names,
        Err(err) => {
            warn!(error = %err, "could not list collections, using fallback name");
            Vec::new()
        }
    };
    let name = pick_collection(settings.collection.as_deref(), &available);

    info!(database = db.name(), collection = %name, "using outbreak collection");
    Ok(db.collection::<Document>(&name))
}

pub fn projection() -> Document {
    fields::ESSENTIAL
        .iter()
        .map(|field| (field.to_string(), Bson::Int32(1)))
        .collect()
}

pub async fn fetch_records(collection: &Collection<Document>) -> anyhow::Result<Vec<OutbreakRecord>> {
    let cursor = collection
        .find(doc! {})
        .projection(projection())
        .await
        .context("failed to query outbreak records")?;

    let documents: Vec<Document> = cursor
        .try_collect()
        .await
        .context("failed to read outbreak records")?;

    debug!(count = documents.len(), "fetched outbreak documents");
    Ok(documents.iter().map(coerce::outbreak_record).collect())
}

// keyed on place, disease and date
async fn upsert(collection: &Collection<Document>, document: Document) -> anyhow::Result<bool> {
    let mut filter = Document::new();
    for key in [
        fields::STATE,
        fields::DISTRICT,
        fields::DISEASE,
        fields::YEAR,
        fields::MONTH,
        fields::DAY,
    ] {
        if let Some(value) = document.get(key) {
            filter.insert(key, value.clone());
        }
    }

    let result = collection
        .update_one(filter, doc! { "$set": document })
        .upsert(true)
        .await
        .context("failed to upsert outbreak record")?;

    Ok(result.upserted_id.is_some())
}

pub async fn seed(collection: &Collection<Document>) -> anyhow::Result<usize> {
    let records = vec![
        doc! {
            "state_ut": "Assam", "district": "Kamrup Metropolitan", "Disease": "Cholera",
            "Cases": 64, "Deaths": 1, "Latitude": 26.1445, "Longitude": 91.7362,
            "year": 2023, "mon": 7, "day": 4, "week_of_outbreak": "27th week",
        },
        doc! {
            "state_ut": "Assam", "district": "Cachar", "Disease": "Acute Diarrhoeal Disease",
            "Cases": 112, "Deaths": 0, "Latitude": 24.8333, "Longitude": 92.7789,
            "year": 2023, "mon": 8, "day": 12, "week_of_outbreak": "32nd week",
        },
        doc! {
            "state_ut": "Assam", "district": "Dibrugarh", "Disease": "Hepatitis A",
            "Cases": 18, "Deaths": 0, "Latitude": 27.4728, "Longitude": 94.912,
            "year": 2023, "mon": 9, "week_of_outbreak": "36th week",
        },
        doc! {
            "state_ut": "Maharashtra", "district": "Pune", "Disease": "Cholera",
            "Cases": 9, "Deaths": 0, "Latitude": 18.5204, "Longitude": 73.8567,
            "year": 2022, "mon": 6, "day": 21, "week_of_outbreak": "25th week",
        },
        doc! {
            "state_ut": "West Bengal", "district": "Kolkata", "Disease": "Acute Diarrhoeal Disease",
            "Cases": 47, "Deaths": 2, "Latitude": 22.5726, "Longitude": 88.3639,
            "year": 2022, "week_of_outbreak": "30th week",
        },
        doc! {
            "state_ut": "Bihar", "district": "Patna", "Disease": "Typhoid",
            "Cases": 23, "Deaths": 0,
            "week_of_outbreak": "41st week",
        },
    ];

    let mut inserted = 0usize;
    for record in records {
        if upsert(collection, record).await? {
            inserted += 1;
        }
    }

    Ok(inserted)
}

#[derive(Debug, serde::Deserialize)]
pub struct CsvRow {
    pub state_ut: Option<String>,
    pub district: Option<String>,
    #[serde(rename = "Disease")]
    pub disease: Option<String>,
    #[serde(rename = "Cases")]
    pub cases: Option<f64>,
    #[serde(rename = "Deaths")]
    pub deaths: Option<f64>,
    #[serde(rename = "Latitude")]
    pub latitude: Option<f64>,
    #[serde(rename = "Longitude")]
    pub longitude: Option<f64>,
    pub year: Option<i32>,
    pub mon: Option<i32>,
    pub day: Option<i32>,
    pub week_of_outbreak: Option<String>,
}

pub fn document_from_row(row: &CsvRow) -> Document {
    let mut document = Document::new();

    let text_fields = [
        (fields::STATE, &row.state_ut),
        (fields::DISTRICT, &row.district),
        (fields::DISEASE, &row.disease),
        (fields::WEEK_OF_OUTBREAK, &row.week_of_outbreak),
    ];
    for (key, value) in text_fields {
        if let Some(value) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
            document.insert(key, value);
        }
    }

    let float_fields = [
        (fields::CASES, row.cases),
        (fields::DEATHS, row.deaths),
        (fields::LATITUDE, row.latitude),
        (fields::LONGITUDE, row.longitude),
    ];
    for (key, value) in float_fields {
        if let Some(value) = value {
            document.insert(key, value);
        }
    }

    let int_fields = [
        (fields::YEAR, row.year),
        (fields::MONTH, row.mon),
        (fields::DAY, row.day),
    ];
    for (key, value) in int_fields {
        if let Some(value) = value {
            document.insert(key, value);
        }
    }

    document
}

pub fn read_csv(csv_path: &std::path::Path) -> anyhow::Result<Vec<Document>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;

    let mut documents = Vec::new();
    for (index, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row = result.with_context(|| format!("invalid CSV row {}", index + 1))?;
        documents.push(document_from_row(&row));
    }

    Ok(documents)
}

pub async fn import_csv(
    collection: &Collection<Document>,
    csv_path: &std::path::Path,
) -> anyhow::Result<usize> {
    let documents = read_csv(csv_path)?;
    if documents.is_empty() {
        return Ok(0);
    }

    let result = collection
        .insert_many(documents)
        .await
        .context("failed to insert outbreak records")?;

    Ok(result.inserted_ids.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn explicit_collection_wins() {
        let available = vec![PREFERRED_COLLECTION.to_string()];
        assert_eq!(pick_collection(Some("custom"), &available), "custom");
    }

    #[test]
    fn preferred_collection_used_when_present() {
        let available = vec!["users".to_string(), PREFERRED_COLLECTION.to_string()];
        assert_eq!(pick_collection(None, &available), PREFERRED_COLLECTION);
        assert_eq!(pick_collection(Some(""), &available), PREFERRED_COLLECTION);
    }

    #[test]
    fn falls_back_when_preferred_missing() {
        assert_eq!(pick_collection(None, &[]), FALLBACK_COLLECTION);
        assert_eq!(
            pick_collection(None, &["posts".to_string()]),
            FALLBACK_COLLECTION
        );
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        assert_eq!(normalize_uri("mongodb://localhost:27017/"), "mongodb://localhost:27017");
        assert_eq!(normalize_uri("mongodb://localhost/water"), "mongodb://localhost/water");
    }

    #[test]
    fn projection_covers_essential_fields() {
        let projection = projection();
        assert_eq!(projection.len(), fields::ESSENTIAL.len());
        assert_eq!(projection.get_i32("Cases").unwrap(), 1);
        assert_eq!(projection.get_i32("week_of_outbreak").unwrap(), 1);
    }

    #[test]
    fn csv_rows_skip_empty_cells() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "state_ut,district,Disease,Cases,Deaths,Latitude,Longitude,year,mon,day,week_of_outbreak"
        )
        .unwrap();
        writeln!(file, "Assam,Cachar,Cholera,31,0,24.83,92.78,2023,7,4,27th week").unwrap();
        writeln!(file, "Bihar,Patna,Typhoid,12,,,,2022,,,").unwrap();

        let documents = read_csv(file.path()).unwrap();
        assert_eq!(documents.len(), 2);

        let first = coerce::outbreak_record(&documents[0]);
        assert_eq!(first.cases, 31.0);
        assert_eq!(first.coordinates(), Some((24.83, 92.78)));
        assert_eq!(first.week_of_outbreak.as_deref(), Some("27th week"));

        assert!(!documents[1].contains_key("Latitude"));
        assert!(!documents[1].contains_key("week_of_outbreak"));
        assert_eq!(documents[1].get_i32("year").unwrap(), 2022);
    }
}
