//! Aerobic efficiency analysis
//!
//! Efficiency is speed per heartbeat (m/s per bpm, scaled by 1000). Runs are
//! bucketed by plan week, the weekly means are compared half against half
//! for the overall trend, and a least-squares fit of HR on speed estimates
//! the heart rate needed at marathon pace.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::config::PlanConfig;
use crate::models::{round_to, ActivityRecord};
use crate::plan::TrainingPlan;

/// One run that qualifies for efficiency analysis
#[derive(Debug, Clone, PartialEq)]
pub struct EfficiencySample {
    pub record: ActivityRecord,
    pub week: Option<u32>,
    /// m/s
    pub speed: f64,
    pub heart_rate: f64,
    pub efficiency: f64,
}

impl EfficiencySample {
    /// Pace in minutes per kilometer
    pub fn pace_min_km(&self) -> f64 {
        1000.0 / self.speed / 60.0
    }
}

/// Weekly aggregate of qualifying runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekBucket {
    pub week: u32,
    /// Mean efficiency, 4 dp
    pub efficiency: f64,
    /// Mean heart rate, 1 dp
    pub avg_heart_rate: f64,
    /// Mean of per-run paces in min/km, 2 dp
    pub avg_pace_min_km: f64,
    pub runs: usize,
}

/// Direction of the efficiency trend across the plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trend {
    #[serde(rename = "improving")]
    Improving,
    #[serde(rename = "stable")]
    Stable,
    #[serde(rename = "declining")]
    Declining,
    #[serde(rename = "insufficient data")]
    InsufficientData,
}

impl Trend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trend::Improving => "improving",
            Trend::Stable => "stable",
            Trend::Declining => "declining",
            Trend::InsufficientData => "insufficient data",
        }
    }

    /// Classify a percentage change against a symmetric threshold
    pub fn classify(percent: f64, threshold: f64) -> Self {
        if percent > threshold {
            Trend::Improving
        } else if percent < -threshold {
            Trend::Declining
        } else {
            Trend::Stable
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordinary least-squares line `y = slope * x + intercept`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
}

impl LinearFit {
    /// Fit over `(x, y)` points; needs at least 3 points and non-zero x variance
    pub fn fit(points: &[(f64, f64)]) -> Option<Self> {
        if points.len() < 3 {
            return None;
        }

        let n = points.len() as f64;
        let sum_x: f64 = points.iter().map(|(x, _)| x).sum();
        let sum_y: f64 = points.iter().map(|(_, y)| y).sum();
        let sum_xy: f64 = points.iter().map(|(x, y)| x * y).sum();
        let sum_xx: f64 = points.iter().map(|(x, _)| x * x).sum();

        let denom = n * sum_xx - sum_x * sum_x;
        if denom == 0.0 || !denom.is_finite() {
            return None;
        }

        let slope = (n * sum_xy - sum_x * sum_y) / denom;
        let intercept = (sum_y - slope * sum_x) / n;
        Some(Self { slope, intercept })
    }

    pub fn at(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Snapshot of one analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub by_week: BTreeMap<u32, WeekBucket>,
    pub trend: Trend,
    /// First-half vs second-half change in weekly efficiency, 1 dp
    pub trend_pct: Option<f64>,
    /// Latest vs previous populated week, 1 dp
    pub week_over_week_pct: Option<f64>,
    /// Regression estimate of HR at marathon pace, 1 dp
    pub hr_at_marathon_pace: Option<f64>,
    pub estimated_max_hr: f64,
    /// 1 dp
    pub red_zone_hr: f64,
    /// Red zone minus HR at marathon pace, 1 dp
    pub hr_buffer: Option<f64>,
    /// Latest populated plan week
    pub current_week: Option<u32>,
    /// Qualifying runs, including those outside the plan calendar
    pub qualifying_runs: usize,
}

/// Aerobic-efficiency analyzer over the merged record set
pub struct EfficiencyAnalyzer<'a> {
    config: &'a PlanConfig,
    plan: TrainingPlan,
}

impl<'a> EfficiencyAnalyzer<'a> {
    pub fn new(config: &'a PlanConfig) -> Self {
        Self {
            config,
            plan: config.training_plan(),
        }
    }

    /// Runs with HR, a known duration and at least the minimum distance
    pub fn qualifying_samples(&self, records: &[ActivityRecord]) -> Vec<EfficiencySample> {
        records
            .iter()
            .filter(|r| r.distance_km_f64() >= self.config.min_distance_km)
            .filter_map(|r| {
                let heart_rate = r.avg_heart_rate?;
                let speed = r.speed_ms()?;
                Some(EfficiencySample {
                    record: r.clone(),
                    week: self.plan.week_of(r.date),
                    speed,
                    heart_rate,
                    efficiency: speed / heart_rate * 1000.0,
                })
            })
            .collect()
    }

    /// Run the full analysis
    pub fn analyze(&self, records: &[ActivityRecord]) -> AnalysisResult {
        let samples = self.qualifying_samples(records);

        let mut grouped: BTreeMap<u32, Vec<&EfficiencySample>> = BTreeMap::new();
        for sample in &samples {
            if let Some(week) = sample.week {
                grouped.entry(week).or_default().push(sample);
            }
        }

        let by_week: BTreeMap<u32, WeekBucket> = grouped
            .iter()
            .map(|(&week, runs)| (week, Self::bucket(week, runs)))
            .collect();

        let (trend, trend_pct) = self.trend(&by_week);
        let week_over_week_pct = Self::week_over_week(&by_week);

        // Regression pools every run that landed in a plan week
        let points: Vec<(f64, f64)> = grouped
            .values()
            .flatten()
            .map(|s| (s.speed, s.heart_rate))
            .collect();
        let hr_at_marathon_pace = LinearFit::fit(&points)
            .map(|line| round_to(line.at(self.config.marathon_speed()), 1));

        let estimated_max_hr = samples
            .iter()
            .map(|s| s.heart_rate)
            .fold(None, |max: Option<f64>, hr| Some(max.map_or(hr, |m| m.max(hr))))
            .map(|max_avg| max_avg * self.config.max_hr_multiplier)
            .unwrap_or(self.config.fallback_max_hr);
        let red_zone_hr = round_to(estimated_max_hr * self.config.red_zone_fraction, 1);
        let hr_buffer = hr_at_marathon_pace.map(|hr| round_to(red_zone_hr - hr, 1));

        let result = AnalysisResult {
            current_week: by_week.keys().next_back().copied(),
            by_week,
            trend,
            trend_pct,
            week_over_week_pct,
            hr_at_marathon_pace,
            estimated_max_hr,
            red_zone_hr,
            hr_buffer,
            qualifying_runs: samples.len(),
        };

        tracing::info!(
            qualifying_runs = result.qualifying_runs,
            weeks = result.by_week.len(),
            trend = %result.trend,
            trend_pct = ?result.trend_pct,
            hr_at_mp = ?result.hr_at_marathon_pace,
            "Aerobic efficiency analysed"
        );
        result
    }

    fn bucket(week: u32, runs: &[&EfficiencySample]) -> WeekBucket {
        let n = runs.len() as f64;
        WeekBucket {
            week,
            efficiency: round_to(runs.iter().map(|r| r.efficiency).sum::<f64>() / n, 4),
            avg_heart_rate: round_to(runs.iter().map(|r| r.heart_rate).sum::<f64>() / n, 1),
            // Mean of per-run paces, not the pace of the mean speed
            avg_pace_min_km: round_to(runs.iter().map(|r| r.pace_min_km()).sum::<f64>() / n, 2),
            runs: runs.len(),
        }
    }

    fn trend(&self, by_week: &BTreeMap<u32, WeekBucket>) -> (Trend, Option<f64>) {
        let values: Vec<f64> = by_week.values().map(|b| b.efficiency).collect();
        if values.len() < 2 {
            return (Trend::InsufficientData, None);
        }

        let mid = values.len() / 2;
        let (first, second) = values.split_at(mid);
        let first_mean = first.iter().sum::<f64>() / first.len() as f64;
        let second_mean = second.iter().sum::<f64>() / second.len() as f64;
        if first_mean == 0.0 {
            return (Trend::InsufficientData, None);
        }

        let pct = round_to((second_mean - first_mean) / first_mean * 100.0, 1);
        (Trend::classify(pct, self.config.trend_threshold_pct), Some(pct))
    }

    fn week_over_week(by_week: &BTreeMap<u32, WeekBucket>) -> Option<f64> {
        let mut latest = by_week.values().rev();
        let current = latest.next()?;
        let previous = latest.next()?;
        if previous.efficiency == 0.0 {
            return None;
        }
        Some(round_to(
            (current.efficiency - previous.efficiency) / previous.efficiency * 100.0,
            1,
        ))
    }
}
