//! Training plan calendar
//!
//! Maps calendar dates onto 1-based plan weeks anchored at a fixed Monday.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

/// Fixed-length training plan anchored at its first Monday
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingPlan {
    /// First day of week 1
    pub start: NaiveDate,

    /// Number of weeks in the plan
    pub weeks: u32,
}

impl TrainingPlan {
    pub fn new(start: NaiveDate, weeks: u32) -> Self {
        Self { start, weeks }
    }

    /// Plan week containing `date`, or `None` outside the plan
    pub fn week_of(&self, date: NaiveDate) -> Option<u32> {
        let days = (date - self.start).num_days();
        if days < 0 {
            return None;
        }
        let week = u32::try_from(days / 7).ok()? + 1;
        (week <= self.weeks).then_some(week)
    }

    /// First day of a plan week
    pub fn week_start(&self, week: u32) -> Option<NaiveDate> {
        if week == 0 || week > self.weeks {
            return None;
        }
        self.start
            .checked_add_days(Days::new(u64::from(week - 1) * 7))
    }

    /// Last day of the plan
    pub fn end(&self) -> NaiveDate {
        self.start
            .checked_add_days(Days::new(u64::from(self.weeks) * 7 - 1))
            .unwrap_or(self.start)
    }
}
