use std::io::Write;
use std::path::Path;

use rust_decimal::prelude::*;

use super::ExportError;
use crate::config::PlanConfig;
use crate::efficiency::{AnalysisResult, Trend};
use crate::models::{format_clock, format_pace, ActivityRecord};
use crate::prediction::Prediction;

/// Width of the longest efficiency bar
const BAR_WIDTH: f64 = 40.0;

/// Write the weekly performance audit
pub fn write_weekly_report<W: Write>(
    out: &mut W,
    config: &PlanConfig,
    records: &[ActivityRecord],
    analysis: &AnalysisResult,
    prediction: &Prediction,
) -> Result<(), ExportError> {
    let plan = config.training_plan();
    let rule = "=".repeat(60);

    writeln!(out, "{}", rule)?;
    match analysis.current_week {
        Some(week) => match plan.week_start(week) {
            Some(monday) => writeln!(out, "WEEK {} PERFORMANCE AUDIT (from {})", week, monday)?,
            None => writeln!(out, "WEEK {} PERFORMANCE AUDIT", week)?,
        },
        None => writeln!(
            out,
            "PERFORMANCE AUDIT (plan {} to {})",
            plan.start,
            plan.end()
        )?,
    }
    writeln!(out, "{}", rule)?;

    if let Some(week) = analysis.current_week {
        let mut runs: Vec<&ActivityRecord> = records
            .iter()
            .filter(|r| plan.week_of(r.date) == Some(week))
            .collect();
        runs.sort_by_key(|r| r.date);

        for run in runs {
            let Some(speed) = run.speed_ms() else {
                continue;
            };
            let (hr, ae) = match run.avg_heart_rate {
                Some(hr) => (format!("{} bpm", hr), format!(" | AE {:.3}", speed / hr * 1000.0)),
                None => ("no HR".to_string(), String::new()),
            };
            writeln!(
                out,
                "  {}  {:5.1}km  {}  {}{}  {}",
                run.date,
                run.distance_km.to_f64().unwrap_or(0.0),
                format_pace(speed),
                hr,
                ae,
                run.name
            )?;
        }
    } else {
        writeln!(out, "  No runs with heart rate inside the plan yet.")?;
    }

    writeln!(out)?;
    writeln!(out, "AEROBIC EFFICIENCY BY WEEK (runs with HR data):")?;
    let max_efficiency = analysis
        .by_week
        .values()
        .map(|b| b.efficiency)
        .fold(0.0_f64, f64::max);
    for bucket in analysis.by_week.values() {
        let bar_len = if max_efficiency > 0.0 {
            (bucket.efficiency / max_efficiency * BAR_WIDTH) as usize
        } else {
            0
        };
        writeln!(
            out,
            "  Week {:2}: AE {:.3}  avg {:.2}min/km  {}bpm  ({} runs)  {}",
            bucket.week,
            bucket.efficiency,
            bucket.avg_pace_min_km,
            bucket.avg_heart_rate,
            bucket.runs,
            "#".repeat(bar_len)
        )?;
    }

    writeln!(out)?;
    match analysis.trend_pct {
        Some(pct) => writeln!(out, "AE trend (overall):      {} ({:+.1}%)", analysis.trend, pct)?,
        None => writeln!(out, "AE trend: {}", analysis.trend)?,
    }
    if let Some(delta) = analysis.week_over_week_pct {
        writeln!(out, "AE vs previous week:     {:+.1}%", delta)?;
    }
    if let Some(hr) = analysis.hr_at_marathon_pace {
        writeln!(out, "Predicted HR at MP:      {} bpm", hr)?;
        writeln!(out, "Red zone threshold:      {} bpm", analysis.red_zone_hr)?;
        if let Some(buffer) = analysis.hr_buffer {
            writeln!(out, "HR buffer at MP:         {:+.1} bpm", buffer)?;
        }
    }

    writeln!(out)?;
    writeln!(out, "{} MARATHON OUTLOOK:", format_clock(config.target_seconds))?;
    if let Some(buffer) = analysis.hr_buffer.filter(|b| *b > 0.0) {
        writeln!(out, "  HR buffer of {:.0}bpm at MP -- POSITIVE signal.", buffer)?;
    }
    writeln!(
        out,
        "  Riegel from {} reference -> {} baseline capability.",
        format_clock(config.reference_seconds.round() as u32),
        format_clock(prediction.baseline_seconds.round() as u32)
    )?;
    writeln!(
        out,
        "  Projected finish: {} ({:+.0}s trend adjustment).",
        format_clock(prediction.predicted_seconds),
        prediction.adjustment_seconds
    )?;
    let outlook = match analysis.trend {
        Trend::Improving => "AE improving -> fitness building into taper.",
        Trend::Declining => "AE declining -> likely accumulated fatigue. Taper should resolve this.",
        Trend::Stable => "AE stable -> consistent fitness base.",
        Trend::InsufficientData => "Not enough weekly data for a trend yet.",
    };
    writeln!(out, "  {}", outlook)?;

    Ok(())
}

/// Write the audit report to a file
pub fn export_weekly_report<P: AsRef<Path>>(
    config: &PlanConfig,
    records: &[ActivityRecord],
    analysis: &AnalysisResult,
    prediction: &Prediction,
    output_path: P,
) -> Result<(), ExportError> {
    let path = output_path.as_ref();
    let mut file = std::fs::File::create(path).map_err(|e| ExportError::WriteFailed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    write_weekly_report(&mut file, config, records, analysis, prediction)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::efficiency::EfficiencyAnalyzer;
    use crate::models::RecordSource;
    use crate::prediction::Predictor;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn run(day: u32, km: Decimal, secs: u32, hr: Option<f64>, name: &str) -> ActivityRecord {
        ActivityRecord {
            id: None,
            date: NaiveDate::from_ymd_opt(2026, 1, day).unwrap(),
            name: name.to_string(),
            distance_km: km,
            moving_seconds: secs,
            avg_heart_rate: hr,
            source: RecordSource::Export,
        }
    }

    fn render(records: &[ActivityRecord]) -> String {
        let config = PlanConfig::default();
        let analysis = EfficiencyAnalyzer::new(&config).analyze(records);
        let prediction = Predictor::new(&config).predict(&analysis);
        let mut out = Vec::new();
        write_weekly_report(&mut out, &config, records, &analysis, &prediction).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_report_lists_current_week_runs() {
        let report = render(&[
            run(2, dec!(10.0), 3000, Some(150.0), "Week two"),
            run(6, dec!(16.0), 4800, Some(150.0), "Long run"),
            run(7, dec!(4.0), 1440, None, "Shakeout"),
        ]);

        assert!(report.contains("WEEK 3 PERFORMANCE AUDIT (from 2026-01-05)"));
        assert!(report.contains("  2026-01-06   16.0km  5:00/km  150 bpm | AE 22.222  Long run"));
        assert!(report.contains("  2026-01-07    4.0km  6:00/km  no HR  Shakeout"));
        assert!(!report.contains("Week two"));
        assert!(report.contains("  Week  2: AE 22.222"));
        assert!(report.contains("AE trend (overall):      stable (+0.0%)"));
        assert!(report.contains("AE vs previous week:     +0.0%"));
        assert!(report.contains("2:35:00 MARATHON OUTLOOK:"));
    }

    #[test]
    fn test_report_without_data() {
        let report = render(&[]);
        assert!(report.contains("PERFORMANCE AUDIT (plan 2025-12-22 to 2026-04-26)"));
        assert!(report.contains("No runs with heart rate"));
        assert!(report.contains("AE trend: insufficient data"));
        assert!(!report.contains("Predicted HR at MP"));
    }
}
