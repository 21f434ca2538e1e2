use std::collections::BTreeMap;

use tracing::debug;

use crate::models::{Band, OutbreakRecord, ScoredRecord};

pub const DEFAULT_MIN_CASES: f64 = 50.0;

const THRESHOLD_QUANTILE: f64 = 0.75;

/// Linear-interpolated quantile over `values`, `None` when empty.
pub fn percentile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let pos = (sorted.len() - 1) as f64 * q.clamp(0.0, 1.0);
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let fraction = pos - lower as f64;

    if lower == upper {
        return Some(sorted[lower]);
    }

    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

// records with no disease share the "" group
pub fn compute_thresholds(records: &[OutbreakRecord], min_cases: f64) -> BTreeMap<String, f64> {
    let mut groups: BTreeMap<&str, Vec<f64>> = BTreeMap::new();

    for record in records {
        let cases = if record.cases.is_nan() { 0.0 } else { record.cases };
        groups.entry(record.disease.as_str()).or_default().push(cases);
    }

    groups
        .into_iter()
        .map(|(disease, cases)| {
            let threshold = disease_threshold(&cases, min_cases);
            debug!(disease, samples = cases.len(), threshold, "computed threshold");
            (disease.to_string(), threshold)
        })
        .collect()
}

pub fn disease_threshold(cases: &[f64], min_cases: f64) -> f64 {
    let q75 = percentile(cases, THRESHOLD_QUANTILE)
        .filter(|v| !v.is_nan())
        .unwrap_or(0.0);
    let threshold = q75.max(min_cases);

    if threshold <= 0.0 {
        min_cases
    } else {
        threshold
    }
}

pub fn outbreak_percent(cases: f64, threshold: f64) -> f64 {
    let raw = cases / threshold * 100.0;
    if raw.is_nan() {
        return 0.0;
    }

    round2(raw.clamp(0.0, 100.0))
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

pub fn band_from_percent(percent: f64) -> Band {
    // 40 itself stays green
    if percent >= 60.0 {
        Band::Red
    } else if percent > 40.0 {
        Band::Yellow
    } else {
        Band::Green
    }
}

pub fn score_records(records: Vec<OutbreakRecord>, min_cases: f64) -> Vec<ScoredRecord> {
    let thresholds = compute_thresholds(&records, min_cases);

    records
        .into_iter()
        .map(|record| {
            let threshold = thresholds
                .get(&record.disease)
                .copied()
                .unwrap_or(min_cases);
            let percent = outbreak_percent(record.cases, threshold);
            ScoredRecord {
                record,
                threshold,
                outbreak_percent: percent,
                band: band_from_percent(percent),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record(disease: &str, cases: f64) -> OutbreakRecord {
        OutbreakRecord {
            state_ut: "Assam".to_string(),
            district: "Kamrup Metropolitan".to_string(),
            disease: disease.to_string(),
            cases,
            ..OutbreakRecord::default()
        }
    }

    #[test]
    fn bands_follow_expected_boundaries() {
        assert_eq!(band_from_percent(39.9), Band::Green);
        assert_eq!(band_from_percent(40.0), Band::Green);
        assert_eq!(band_from_percent(40.1), Band::Yellow);
        assert_eq!(band_from_percent(59.9), Band::Yellow);
        assert_eq!(band_from_percent(60.0), Band::Red);
        assert_eq!(band_from_percent(100.0), Band::Red);
        assert_eq!(band_from_percent(0.0), Band::Green);
    }

    #[test]
    fn percentile_interpolates_between_ranks() {
        assert_eq!(percentile(&[10.0, 20.0, 30.0, 40.0], 0.75), Some(32.5));
        assert_eq!(percentile(&[400.0, 100.0, 300.0, 200.0], 0.75), Some(325.0));
        assert_eq!(percentile(&[7.0], 0.75), Some(7.0));
        assert_eq!(percentile(&[], 0.75), None);
    }

    #[test]
    fn threshold_respects_floor() {
        assert_eq!(disease_threshold(&[10.0, 20.0, 30.0, 40.0], 50.0), 50.0);
        assert_eq!(disease_threshold(&[100.0, 200.0, 300.0, 400.0], 50.0), 325.0);
        assert_eq!(disease_threshold(&[], 50.0), 50.0);
    }

    #[test]
    fn thresholds_are_grouped_by_disease() {
        let records = vec![
            sample_record("Dengue", 100.0),
            sample_record("Dengue", 200.0),
            sample_record("Dengue", 300.0),
            sample_record("Dengue", 400.0),
            sample_record("Cholera", 12.0),
            sample_record("", 900.0),
        ];

        let thresholds = compute_thresholds(&records, DEFAULT_MIN_CASES);
        assert_eq!(thresholds.get("Dengue"), Some(&325.0));
        assert_eq!(thresholds.get("Cholera"), Some(&50.0));
        assert_eq!(thresholds.get(""), Some(&900.0));
    }

    #[test]
    fn percent_is_clipped_and_rounded() {
        assert_eq!(outbreak_percent(10.0, 70.0), 14.29);
        assert_eq!(outbreak_percent(500.0, 50.0), 100.0);
        assert_eq!(outbreak_percent(-5.0, 50.0), 0.0);
        assert_eq!(outbreak_percent(f64::INFINITY, 50.0), 100.0);
        assert_eq!(outbreak_percent(0.0, 0.0), 0.0);
    }

    #[test]
    fn rounding_uses_ties_to_even() {
        assert_eq!(round2(0.125), 0.12);
        assert_eq!(round2(12.5), 12.5);
        assert_eq!(round2(33.333_333), 33.33);
    }

    #[test]
    fn two_records_share_one_threshold() {
        let records = vec![sample_record("Cholera", 10.0), sample_record("Cholera", 90.0)];
        let scored = score_records(records, 50.0);

        // q75 of [10, 90] is 70, which clears the floor
        assert!(scored.iter().all(|s| s.threshold == 70.0));
        assert_eq!(scored[0].outbreak_percent, 14.29);
        assert_eq!(scored[0].band, Band::Green);
        assert_eq!(scored[1].outbreak_percent, 100.0);
        assert_eq!(scored[1].band, Band::Red);
    }

    #[test]
    fn every_percent_stays_in_range() {
        let records = vec![
            sample_record("Malaria", 0.0),
            sample_record("Malaria", 3.0),
            sample_record("Malaria", 48.0),
            sample_record("Malaria", 5000.0),
            sample_record("Typhoid", -20.0),
            sample_record("Typhoid", f64::NAN),
        ];

        for scored in score_records(records, DEFAULT_MIN_CASES) {
            assert!((0.0..=100.0).contains(&scored.outbreak_percent));
            assert_eq!(scored.band, band_from_percent(scored.outbreak_percent));
        }
    }
}
