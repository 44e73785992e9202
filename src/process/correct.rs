// src/process/correct.rs
//
// Underreporting correction for recent serious-injury counts. Serious
// injuries are undercounted from 2020 on, so we derive a fatal:injury
// ratio from complete reference years and scale each recent year's fatal
// count by it.

use crate::error::CorrectError;
use crate::process::{Dataset, Severity};
use std::collections::BTreeMap;

/// Fatal:injury baseline over `ref_start..=ref_end`.
///
/// Pure function of its inputs. Returns `injury_n / fatal_n` over the rows
/// whose year falls inside the interval; when the interval has no fatal
/// records (including empty input) the `fallback` ratio is returned instead
/// of dividing by zero. `ref_start > ref_end` is a caller error.
pub fn compute_baseline(
    data: &Dataset,
    ref_start: i32,
    ref_end: i32,
    fallback: f64,
) -> Result<f64, CorrectError> {
    if ref_start > ref_end {
        return Err(CorrectError::InvalidRange {
            start: ref_start,
            end: ref_end,
        });
    }

    let mut fatal_n = 0u64;
    let mut injury_n = 0u64;
    for row in data.rows() {
        let year = match data.year(row) {
            Some(y) => y,
            None => continue,
        };
        if year < ref_start || year > ref_end {
            continue;
        }
        match data.severity(row) {
            Severity::Fatal => fatal_n += 1,
            Severity::SeriousInjury => injury_n += 1,
            Severity::Other => {}
        }
    }

    if fatal_n == 0 {
        Ok(fallback)
    } else {
        Ok(injury_n as f64 / fatal_n as f64)
    }
}

/// Count fatal rows per year over the years selected by `is_target`.
pub fn fatal_counts_by_year<F>(data: &Dataset, is_target: F) -> BTreeMap<i32, u64>
where
    F: Fn(i32) -> bool,
{
    let mut counts = BTreeMap::new();
    for row in data.rows() {
        let year = match data.year(row) {
            Some(y) if is_target(y) => y,
            _ => continue,
        };
        if data.severity(row) == Severity::Fatal {
            *counts.entry(year).or_insert(0) += 1;
        }
    }
    counts
}

/// Estimated serious-injury count per target year:
/// `floor(fatal_n * baseline)` for each year with at least one fatal record.
/// Years with no fatal records carry no signal and are absent from the map.
pub fn estimate_underreported<F>(data: &Dataset, baseline: f64, is_target: F) -> BTreeMap<i32, u64>
where
    F: Fn(i32) -> bool,
{
    fatal_counts_by_year(data, is_target)
        .into_iter()
        .map(|(year, fatal_n)| (year, (fatal_n as f64 * baseline).floor() as u64))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Rows of (year, severity code) with the standard two columns.
    fn dataset(rows: &[(i32, &str)]) -> Dataset {
        Dataset::new(
            vec!["C_YEAR".to_string(), "C_SEV".to_string()],
            rows.iter()
                .map(|(y, s)| vec![y.to_string(), s.to_string()])
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn baseline_is_exact_injury_over_fatal_ratio() {
        let data = dataset(&[
            (2012, "1"),
            (2012, "1"),
            (2014, "2"),
            (2014, "2"),
            (2014, "2"),
            (2019, "2"), // outside the reference interval
        ]);
        let ratio = compute_baseline(&data, 2010, 2018, 5.0).unwrap();
        assert!((ratio - 1.5).abs() < 1e-12);
    }

    #[test]
    fn zero_fatal_reference_returns_fallback() {
        let data = dataset(&[(2012, "2"), (2013, "2")]);
        assert_eq!(compute_baseline(&data, 2010, 2018, 5.0).unwrap(), 5.0);
    }

    #[test]
    fn empty_input_returns_fallback() {
        let data = dataset(&[]);
        assert!(data.is_empty());
        assert_eq!(compute_baseline(&data, 2010, 2018, 5.0).unwrap(), 5.0);
    }

    #[test]
    fn inverted_range_is_invalid() {
        let data = dataset(&[(2012, "1")]);
        match compute_baseline(&data, 2018, 2010, 5.0) {
            Err(CorrectError::InvalidRange { start, end }) => {
                assert_eq!((start, end), (2018, 2010));
            }
            other => panic!("expected InvalidRange, got {:?}", other),
        }
    }

    #[test]
    fn non_numeric_years_and_severities_are_ignored() {
        let data = Dataset::new(
            vec!["C_YEAR".to_string(), "C_SEV".to_string()],
            vec![
                vec!["2012".to_string(), "1".to_string()],
                vec!["n/a".to_string(), "2".to_string()],
                vec!["2012".to_string(), "U".to_string()],
                vec!["2012".to_string(), "2".to_string()],
            ],
        )
        .unwrap();
        let ratio = compute_baseline(&data, 2010, 2018, 5.0).unwrap();
        assert!((ratio - 1.0).abs() < 1e-12);
    }

    #[test]
    fn estimates_floor_the_scaled_fatal_count() {
        let rows: Vec<(i32, &str)> = std::iter::repeat((2021, "1")).take(10).collect();
        let data = dataset(&rows);

        let est = estimate_underreported(&data, 2.5, |y| y >= 2020);
        assert_eq!(est.get(&2021), Some(&25));

        let est = estimate_underreported(&data, 2.49, |y| y >= 2020);
        assert_eq!(est.get(&2021), Some(&24));
    }

    #[test]
    fn years_without_fatal_records_are_absent() {
        let data = dataset(&[(2020, "2"), (2021, "1"), (2022, "9")]);
        let est = estimate_underreported(&data, 3.0, |y| y >= 2020);
        assert_eq!(est.keys().copied().collect::<Vec<_>>(), vec![2021]);
        assert_eq!(est[&2021], 3);
    }

    #[test]
    fn reference_scenario_baseline_four_estimate_twelve() {
        let mut rows: Vec<(i32, &str)> = vec![(2012, "1"), (2012, "1")];
        rows.extend(std::iter::repeat((2012, "2")).take(8));
        rows.extend(std::iter::repeat((2021, "1")).take(3));
        let data = dataset(&rows);

        let baseline = compute_baseline(&data, 2010, 2018, 5.0).unwrap();
        assert_eq!(baseline, 4.0);

        let est = estimate_underreported(&data, baseline, |y| y >= 2020);
        assert_eq!(est.len(), 1);
        assert_eq!(est[&2021], 12);
    }
}
