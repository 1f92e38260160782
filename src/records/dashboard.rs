//! Dashboard aggregates over `ehr_data.csv` and patient search.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use serde::Serialize;

use super::csv::CsvTable;
use super::RecordsError;

pub const EHR_DATA_FILE: &str = "ehr_data.csv";

const PATIENT_ID_COL: &str = "patient_id";
const STROKE_COL: &str = "stroke_type";
const GENDER_COL: &str = "gender";
const DATE_COL: &str = "date_of_scan";
const NUM_IMAGES_COL: &str = "num_images";

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d", "%m/%d/%Y", "%d-%m-%Y", "%d.%m.%Y", "%d %b %Y",
    "%b %d, %Y", "%Y%m%d",
];
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M",
    "%Y/%m/%d %H:%M:%S",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValueCount {
    pub value: String,
    pub count: usize,
}

/// Scan count for one period (`YYYY-MM` or `YYYY-MM-DD`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeriodCount {
    pub period: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardSummary {
    pub columns: Vec<String>,
    pub total_records: usize,
    pub total_patients: Option<usize>,
    pub stroke_type_distribution: Option<Vec<ValueCount>>,
    pub gender_distribution: Option<Vec<ValueCount>>,
    pub scans_per_month: Option<Vec<PeriodCount>>,
    pub notices: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageCountPoint {
    pub patient_id: Option<String>,
    pub num_images: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PatientSearch {
    pub query: String,
    pub matches: Vec<serde_json::Value>,
    pub stroke_type_counts: Option<Vec<ValueCount>>,
    pub num_images: Option<Vec<ImageCountPoint>>,
    pub scan_timeline: Option<Vec<PeriodCount>>,
}

/// Load `<data_dir>/ehr_data.csv` and compute the dashboard.
pub fn load_dashboard(data_dir: &Path) -> Result<DashboardSummary, RecordsError> {
    let table = CsvTable::load(&data_dir.join(EHR_DATA_FILE))?;
    Ok(summarize(&table))
}

pub fn summarize(table: &CsvTable) -> DashboardSummary {
    let mut notices = Vec::new();

    let total_patients = match table.column(PATIENT_ID_COL) {
        Some(ids) => {
            let mut distinct: Vec<&str> = ids.flatten().collect();
            distinct.sort_unstable();
            distinct.dedup();
            Some(distinct.len())
        }
        None => {
            notices.push(format!("Column '{PATIENT_ID_COL}' not found."));
            None
        }
    };

    let stroke_type_distribution = match table.column(STROKE_COL) {
        Some(cells) => Some(value_counts(cells)),
        None => {
            notices.push(format!(
                "Column '{STROKE_COL}' not found. Skipping Stroke Type chart."
            ));
            None
        }
    };

    let gender_distribution = match table.column(GENDER_COL) {
        Some(cells) => Some(value_counts(cells)),
        None => {
            notices.push(format!(
                "Column '{GENDER_COL}' not found. Skipping Gender Distribution chart."
            ));
            None
        }
    };

    let scans_per_month = match table.column(DATE_COL) {
        Some(cells) => Some(count_by_period(cells, "%Y-%m")),
        None => {
            notices.push(format!(
                "Column '{DATE_COL}' not found. Skipping Scans Over Time chart."
            ));
            None
        }
    };

    DashboardSummary {
        columns: table.columns().to_vec(),
        total_records: table.len(),
        total_patients,
        stroke_type_distribution,
        gender_distribution,
        scans_per_month,
        notices,
    }
}

/// Rows whose `patient_id` contains `query` (trimmed, case-insensitive).
pub fn search_patients(table: &CsvTable, query: &str) -> Result<PatientSearch, RecordsError> {
    let needle = query.trim().to_lowercase();
    let ids = table
        .column(PATIENT_ID_COL)
        .ok_or_else(|| RecordsError::MissingColumn(PATIENT_ID_COL.to_string()))?;

    let rows: Vec<usize> = ids
        .enumerate()
        .filter(|(_, id)| id.is_some_and(|id| id.to_lowercase().contains(&needle)))
        .map(|(row, _)| row)
        .collect();

    let stroke_type_counts =
        cells_at(table, &rows, STROKE_COL).map(|cells| value_counts(cells.into_iter()));
    let num_images = table.has_column(NUM_IMAGES_COL).then(|| {
        rows.iter()
            .map(|&row| ImageCountPoint {
                patient_id: table.cell(row, PATIENT_ID_COL).map(str::to_string),
                num_images: table
                    .cell(row, NUM_IMAGES_COL)
                    .and_then(|v| v.parse::<f64>().ok()),
            })
            .collect()
    });
    let scan_timeline = cells_at(table, &rows, DATE_COL)
        .map(|cells| count_by_period(cells.into_iter(), "%Y-%m-%d"));

    Ok(PatientSearch {
        query: query.trim().to_string(),
        matches: rows.iter().map(|&row| table.row_json(row)).collect(),
        stroke_type_counts,
        num_images,
        scan_timeline,
    })
}

/// Cells of column `name` for the given rows; `None` when the column is absent.
fn cells_at<'a>(table: &'a CsvTable, rows: &[usize], name: &str) -> Option<Vec<Option<&'a str>>> {
    if !table.has_column(name) {
        return None;
    }
    Some(rows.iter().map(|&row| table.cell(row, name)).collect())
}

/// Counts of non-null values, highest first; ties keep first-appearance order.
fn value_counts<'a>(cells: impl Iterator<Item = Option<&'a str>>) -> Vec<ValueCount> {
    let mut counts: Vec<ValueCount> = Vec::new();
    for value in cells.flatten() {
        match counts.iter_mut().find(|c| c.value == value) {
            Some(entry) => entry.count += 1,
            None => counts.push(ValueCount {
                value: value.to_string(),
                count: 1,
            }),
        }
    }
    // Stable sort keeps first-appearance order among equal counts.
    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts
}

/// Group parseable dates by `format`, ascending. Unparseable dates are dropped.
fn count_by_period<'a>(
    cells: impl Iterator<Item = Option<&'a str>>,
    format: &str,
) -> Vec<PeriodCount> {
    let mut periods: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for date in cells.flatten().filter_map(parse_date) {
        *periods.entry(truncate(date, format)).or_default() += 1;
    }
    periods
        .into_iter()
        .map(|(date, count)| PeriodCount {
            period: date.format(format).to_string(),
            count,
        })
        .collect()
}

/// Month grouping keys on the first of the month.
fn truncate(date: NaiveDate, format: &str) -> NaiveDate {
    if format == "%Y-%m" {
        date.with_day(1).unwrap_or(date)
    } else {
        date
    }
}

/// Lenient date parsing for scan dates.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
                .map(|dt| dt.date())
        })
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
Patient_ID,Gender,Stroke_Type,Date_of_Scan,Num_Images
P001,F,Ischemic,2024-01-15,3
P002,M,Hemorrhagic,2024-01-20,5
P001,F,Ischemic,2024-02-03,2
P103,M,Ischemic,not a date,
P004,,TIA,02/10/2024,1
";

    #[test]
    fn dashboard_aggregates() {
        let summary = summarize(&CsvTable::parse(SAMPLE));
        assert_eq!(summary.total_records, 5);
        assert_eq!(summary.total_patients, Some(4));
        assert_eq!(
            summary.stroke_type_distribution.unwrap(),
            vec![
                ValueCount { value: "Ischemic".into(), count: 3 },
                ValueCount { value: "Hemorrhagic".into(), count: 1 },
                ValueCount { value: "TIA".into(), count: 1 },
            ]
        );
        // Empty gender cell is skipped; F and M tie, F first seen.
        let genders = summary.gender_distribution.unwrap();
        assert_eq!(genders[0], ValueCount { value: "F".into(), count: 2 });
        assert_eq!(genders[1], ValueCount { value: "M".into(), count: 2 });
        assert_eq!(
            summary.scans_per_month.unwrap(),
            vec![
                PeriodCount { period: "2024-01".into(), count: 2 },
                PeriodCount { period: "2024-02".into(), count: 2 },
            ]
        );
        assert!(summary.notices.is_empty());
    }

    #[test]
    fn missing_columns_produce_notices() {
        let summary = summarize(&CsvTable::parse("name,age\nA,40\n"));
        assert_eq!(summary.total_records, 1);
        assert_eq!(summary.total_patients, None);
        assert!(summary.stroke_type_distribution.is_none());
        assert_eq!(summary.notices.len(), 4);
        assert_eq!(summary.notices[0], "Column 'patient_id' not found.");
    }

    #[test]
    fn search_is_case_insensitive_substring() {
        let table = CsvTable::parse(SAMPLE);
        let result = search_patients(&table, "  p00 ").unwrap();
        assert_eq!(result.query, "p00");
        assert_eq!(result.matches.len(), 4);
        assert_eq!(result.matches[0]["patient_id"], "P001");

        let result = search_patients(&table, "p001").unwrap();
        assert_eq!(result.matches.len(), 2);
        assert_eq!(
            result.stroke_type_counts.unwrap(),
            vec![ValueCount { value: "Ischemic".into(), count: 2 }]
        );
        let images: Vec<Option<f64>> =
            result.num_images.unwrap().iter().map(|p| p.num_images).collect();
        assert_eq!(images, vec![Some(3.0), Some(2.0)]);
        assert_eq!(
            result.scan_timeline.unwrap(),
            vec![
                PeriodCount { period: "2024-01-15".into(), count: 1 },
                PeriodCount { period: "2024-02-03".into(), count: 1 },
            ]
        );
    }

    #[test]
    fn search_without_matches_is_empty() {
        let result = search_patients(&CsvTable::parse(SAMPLE), "zzz").unwrap();
        assert!(result.matches.is_empty());
        assert_eq!(result.stroke_type_counts.unwrap(), vec![]);
    }

    #[test]
    fn search_requires_patient_id_column() {
        let err = search_patients(&CsvTable::parse("name\nA\n"), "A").unwrap_err();
        assert!(matches!(err, RecordsError::MissingColumn(c) if c == "patient_id"));
    }

    #[test]
    fn lenient_date_parsing() {
        let jan15 = NaiveDate::from_ymd_opt(2024, 1, 15);
        assert_eq!(parse_date("2024-01-15"), jan15);
        assert_eq!(parse_date("2024/01/15"), jan15);
        assert_eq!(parse_date("01/15/2024"), jan15);
        assert_eq!(parse_date("2024-01-15 08:30:00"), jan15);
        assert_eq!(parse_date("2024-01-15T08:30:00+01:00"), jan15);
        assert_eq!(parse_date("15 Jan 2024"), jan15);
        assert_eq!(parse_date("yesterday"), None);
    }

    #[test]
    fn dashboard_file_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_dashboard(dir.path()),
            Err(RecordsError::NotFound(_))
        ));

        std::fs::write(dir.path().join(EHR_DATA_FILE), SAMPLE).unwrap();
        assert_eq!(load_dashboard(dir.path()).unwrap().total_records, 5);
    }
}
