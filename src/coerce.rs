use mongodb::bson::{Bson, Document};

use crate::models::{fields, OutbreakRecord};

// NaN counts as missing
pub fn number(value: Option<&Bson>) -> Option<f64> {
    let parsed = match value? {
        Bson::Double(v) => *v,
        Bson::Int32(v) => f64::from(*v),
        Bson::Int64(v) => *v as f64,
        Bson::Decimal128(v) => parse_number(&v.to_string())?,
        Bson::Boolean(v) => f64::from(u8::from(*v)),
        Bson::String(s) => parse_number(s)?,
        _ => return None,
    };

    (!parsed.is_nan()).then_some(parsed)
}

pub fn parse_number(raw: &str) -> Option<f64> {
    let value = raw.trim().parse::<f64>().ok()?;
    (!value.is_nan()).then_some(value)
}

pub fn text(value: Option<&Bson>) -> String {
    match value {
        Some(Bson::String(s)) => s.clone(),
        Some(Bson::Int32(v)) => v.to_string(),
        Some(Bson::Int64(v)) => v.to_string(),
        Some(Bson::Double(v)) if !v.is_nan() => v.to_string(),
        Some(Bson::Decimal128(v)) => v.to_string(),
        Some(Bson::Boolean(v)) => v.to_string(),
        _ => String::new(),
    }
}

pub fn label(value: Option<&Bson>) -> Option<String> {
    match value {
        Some(Bson::String(s)) => Some(s.clone()),
        _ => None,
    }
}

pub fn outbreak_record(doc: &Document) -> OutbreakRecord {
    OutbreakRecord {
        state_ut: text(doc.get(fields::STATE)),
        district: text(doc.get(fields::DISTRICT)),
        disease: text(doc.get(fields::DISEASE)),
        cases: number(doc.get(fields::CASES)).unwrap_or(0.0),
        deaths: number(doc.get(fields::DEATHS)).unwrap_or(0.0),
        latitude: number(doc.get(fields::LATITUDE)),
        longitude: number(doc.get(fields::LONGITUDE)),
        year: number(doc.get(fields::YEAR)),
        month: number(doc.get(fields::MONTH)),
        day: number(doc.get(fields::DAY)),
        week_of_outbreak: label(doc.get(fields::WEEK_OF_OUTBREAK)),
    }
}
