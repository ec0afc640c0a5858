use chrono::{Duration, Local, NaiveDate};
use std::fmt;

use crate::error::{FeedError, Result};

/// Inclusive range of calendar days covered by one extraction run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    start: NaiveDate,
    end: NaiveDate,
}

impl Period {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(FeedError::InvalidPeriod {
                message: format!("start {} is after end {}", start, end),
            });
        }
        Ok(Period { start, end })
    }

    /// Two days ago through yesterday, the usual daily submission window.
    pub fn default_recent() -> Self {
        let today = Local::now().date_naive();
        Period {
            start: today - Duration::days(2),
            end: today - Duration::days(1),
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn day_count(&self) -> u64 {
        (self.end - self.start).num_days() as u64 + 1
    }

    pub fn days(&self) -> Days {
        Days {
            next: Some(self.start),
            end: self.end,
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Iterator over the days of a [`Period`], in order, both bounds included.
pub struct Days {
    next: Option<NaiveDate>,
    end: NaiveDate,
}

impl Iterator for Days {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<NaiveDate> {
        let current = self.next?;
        self.next = if current < self.end {
            current.succ_opt()
        } else {
            None
        };
        Some(current)
    }
}
