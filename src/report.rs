use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt::Write;

use crate::models::{Band, BandSummary, OutbreakRecord, ScoredRecord, TableRow};

const MISSING_DATE: &str = "N/A";

/// `YYYY-MM-DD`, `YYYY-MM` or `YYYY`, whichever the parts allow.
pub fn build_date_string(year: Option<f64>, month: Option<f64>, day: Option<f64>) -> Option<String> {
    match (year, month, day) {
        (Some(y), Some(m), Some(d)) => Some(format!(
            "{:04}-{:02}-{:02}",
            whole(y)?,
            whole(m)?,
            whole(d)?
        )),
        (Some(y), Some(m), None) => Some(format!("{:04}-{:02}", whole(y)?, whole(m)?)),
        (Some(y), _, _) => Some(format!("{:04}", whole(y)?)),
        _ => None,
    }
}

// `as` saturates, so out-of-range values are rejected
fn whole(value: f64) -> Option<i64> {
    let truncated = value.trunc();
    let in_range = truncated >= i64::MIN as f64 && truncated < i64::MAX as f64;
    (value.is_finite() && in_range).then(|| truncated as i64)
}

pub fn row_date(record: &OutbreakRecord) -> String {
    if let Some(date) = build_date_string(record.year, record.month, record.day) {
        return date;
    }

    match &record.week_of_outbreak {
        Some(week) if !week.trim().is_empty() => week.clone(),
        _ => MISSING_DATE.to_string(),
    }
}

// highest risk first, then most cases
pub fn rank(scored: &[ScoredRecord]) -> Vec<&ScoredRecord> {
    let mut ranked: Vec<&ScoredRecord> = scored.iter().collect();
    ranked.sort_by(|a, b| {
        b.outbreak_percent
            .partial_cmp(&a.outbreak_percent)
            .unwrap_or(Ordering::Equal)
            .then_with(|| {
                b.record
                    .cases
                    .partial_cmp(&a.record.cases)
                    .unwrap_or(Ordering::Equal)
            })
    });
    ranked
}

pub fn table_row(scored: &ScoredRecord) -> TableRow {
    TableRow {
        district: format!("{} {}", scored.band.indicator(), scored.record.district),
        disease: scored.record.disease.clone(),
        percentage: scored.outbreak_percent,
        date: row_date(&scored.record),
        band: scored.band,
    }
}

pub fn build_table(scored: &[ScoredRecord]) -> Vec<TableRow> {
    rank(scored).into_iter().map(table_row).collect()
}

pub fn summarize_by_band(scored: &[ScoredRecord]) -> Vec<BandSummary> {
    let mut map: BTreeMap<Band, (usize, f64)> = BTreeMap::new();

    for item in scored {
        let entry = map.entry(item.band).or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += item.outbreak_percent;
    }

    // red first
    map.into_iter()
        .rev()
        .map(|(band, (count, total))| BandSummary {
            band,
            count,
            avg_percent: if count == 0 { 0.0 } else { total / count as f64 },
        })
        .collect()
}

pub fn build_ranking(scored: &[ScoredRecord], limit: usize) -> String {
    let mut output = String::new();

    if scored.is_empty() {
        let _ = writeln!(output, "No outbreak records found.");
        return output;
    }

    let _ = writeln!(output, "Band mix:");
    for summary in summarize_by_band(scored) {
        let _ = writeln!(
            output,
            "- {}: {} records (avg risk {:.1}%)",
            summary.band.label(),
            summary.count,
            summary.avg_percent
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "Top districts by outbreak risk:");
    for item in rank(scored).into_iter().take(limit) {
        let row = table_row(item);
        let _ = writeln!(
            output,
            "- {} ({}, {}) {:.2}% of threshold {:.1}: {} cases, {} deaths on {}",
            row.district,
            row.disease,
            item.record.state_ut,
            row.percentage,
            item.threshold,
            item.record.cases,
            item.record.deaths,
            row.date
        );
    }

    output
}
