use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::path::Path;
use std::str::FromStr;

use super::ExportError;
use crate::models::{format_duration, normalize_heart_rate, ActivityRecord, RecordSource};

/// One line of `master_activities.csv`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct MasterRow {
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Distance_km")]
    distance_km: String,
    #[serde(rename = "Moving_Time")]
    moving_time: String,
    #[serde(rename = "Avg_HR")]
    avg_hr: Option<f64>,
}

impl From<&ActivityRecord> for MasterRow {
    fn from(record: &ActivityRecord) -> Self {
        MasterRow {
            date: record.date.format("%Y-%m-%d").to_string(),
            name: record.name.clone(),
            distance_km: format_km(record.distance_km),
            moving_time: if record.moving_seconds == 0 {
                String::new()
            } else {
                format_duration(record.moving_seconds)
            },
            avg_hr: record.avg_heart_rate,
        }
    }
}

/// Kilometers with at least one decimal place (`10.0`, `10.25`)
pub fn format_km(km: Decimal) -> String {
    let km = km.normalize();
    if km.scale() == 0 {
        format!("{}.0", km)
    } else {
        km.to_string()
    }
}

/// Parse `H:MM:SS` or `M:SS` back into seconds; blank means unknown (0)
pub fn parse_moving_time(value: &str) -> Option<u32> {
    let value = value.trim();
    if value.is_empty() {
        return Some(0);
    }
    let parts = value
        .split(':')
        .map(|p| p.parse::<u32>().ok())
        .collect::<Option<Vec<u32>>>()?;
    match parts.as_slice() {
        [m, s] => Some(m * 60 + s),
        [h, m, s] => Some(h * 3600 + m * 60 + s),
        _ => None,
    }
}

/// Write the merged record set as `master_activities.csv`
pub fn write_master<W: Write>(records: &[ActivityRecord], output: W) -> Result<(), ExportError> {
    let mut writer = csv::Writer::from_writer(output);
    // Header is written explicitly so an empty table still has one
    writer.write_record(["Date", "Name", "Distance_km", "Moving_Time", "Avg_HR"])?;
    for record in records {
        let row = MasterRow::from(record);
        writer.write_record([
            row.date,
            row.name,
            row.distance_km,
            row.moving_time,
            row.avg_hr.map_or(String::new(), |hr| format!("{:?}", hr)),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

pub fn export_master<P: AsRef<Path>>(records: &[ActivityRecord], output_path: P) -> Result<(), ExportError> {
    let path = output_path.as_ref();
    let file = std::fs::File::create(path).map_err(|e| ExportError::WriteFailed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    write_master(records, file)?;
    tracing::info!(path = %path.display(), records = records.len(), "Wrote master activity table");
    Ok(())
}

/// Read a previously written master table; malformed lines are skipped
pub fn read_master<R: Read>(input: R) -> Result<Vec<ActivityRecord>, ExportError> {
    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(input);
    let mut records = Vec::new();

    for (line, row) in reader.deserialize::<MasterRow>().enumerate() {
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                tracing::debug!(line = line + 2, error = %e, "Skipping unreadable master row");
                continue;
            }
        };
        match parse_master_row(&row) {
            Some(record) => records.push(record),
            None => tracing::debug!(line = line + 2, "Skipping malformed master row"),
        }
    }
    Ok(records)
}

pub fn import_master<P: AsRef<Path>>(path: P) -> Result<Vec<ActivityRecord>, ExportError> {
    let file = std::fs::File::open(path.as_ref())?;
    read_master(file)
}

fn parse_master_row(row: &MasterRow) -> Option<ActivityRecord> {
    Some(ActivityRecord {
        id: None,
        date: NaiveDate::parse_from_str(row.date.trim(), "%Y-%m-%d").ok()?,
        name: row.name.clone(),
        distance_km: Decimal::from_str(row.distance_km.trim()).ok()?,
        moving_seconds: parse_moving_time(&row.moving_time)?,
        avg_heart_rate: normalize_heart_rate(row.avg_hr),
        source: RecordSource::Export,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tempfile::NamedTempFile;

    fn record(km: Decimal, secs: u32, hr: Option<f64>) -> ActivityRecord {
        ActivityRecord {
            id: Some("1".to_string()),
            date: NaiveDate::from_ymd_opt(2025, 12, 22).unwrap(),
            name: "Morning, easy".to_string(),
            distance_km: km,
            moving_seconds: secs,
            avg_heart_rate: hr,
            source: RecordSource::Api,
        }
    }

    #[test]
    fn test_master_layout() {
        let mut out = Vec::new();
        write_master(
            &[
                record(dec!(10), 2400, None),
                record(dec!(21.1), 5400, Some(152.5)),
                record(dec!(3.25), 0, Some(140.0)),
            ],
            &mut out,
        )
        .unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Date,Name,Distance_km,Moving_Time,Avg_HR");
        assert_eq!(lines[1], "2025-12-22,\"Morning, easy\",10.0,40:00,");
        assert_eq!(lines[2], "2025-12-22,\"Morning, easy\",21.1,1:30:00,152.5");
        assert_eq!(lines[3], "2025-12-22,\"Morning, easy\",3.25,,140.0");
    }

    #[test]
    fn test_empty_table_has_header() {
        let mut out = Vec::new();
        write_master(&[], &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "Date,Name,Distance_km,Moving_Time,Avg_HR\n");
    }

    #[test]
    fn test_parse_moving_time() {
        assert_eq!(parse_moving_time(""), Some(0));
        assert_eq!(parse_moving_time("40:00"), Some(2400));
        assert_eq!(parse_moving_time("1:30:05"), Some(5405));
        assert_eq!(parse_moving_time("abc"), None);
    }

    #[test]
    fn test_master_file_reads_back() {
        let file = NamedTempFile::new().unwrap();
        let original = vec![record(dec!(10.0), 2400, Some(150.0)), record(dec!(5.5), 0, None)];
        export_master(&original, file.path()).unwrap();

        let loaded = import_master(file.path()).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].distance_km, dec!(10.0));
        assert_eq!(loaded[0].moving_seconds, 2400);
        assert_eq!(loaded[0].avg_heart_rate, Some(150.0));
        assert_eq!(loaded[1].moving_seconds, 0);
        assert_eq!(loaded[1].avg_heart_rate, None);
        assert_eq!(loaded[1].id, None);
    }

    #[test]
    fn test_malformed_master_rows_are_skipped() {
        let input = "Date,Name,Distance_km,Moving_Time,Avg_HR\n\
                     2026-01-05,Tempo,12.0,55:00,158.0\n\
                     not-a-date,Broken,5.0,25:00,\n\
                     2026-01-06,Easy,x,30:00,\n";
        let records = read_master(input.as_bytes()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "Tempo");
    }
}
