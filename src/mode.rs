use crate::{daily, monthly, weekly, yearly, Error, Instant};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a recurrence steps from one occurrence to the next.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RepeatMode {
    Days,
    #[default]
    Weeks,
    MonthsByDate,
    MonthsByWeekday,
    YearsByDate,
    YearsByWeekday,
}

impl RepeatMode {
    pub const ALL: [RepeatMode; 6] = [
        RepeatMode::Days,
        RepeatMode::Weeks,
        RepeatMode::MonthsByDate,
        RepeatMode::MonthsByWeekday,
        RepeatMode::YearsByDate,
        RepeatMode::YearsByWeekday,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RepeatMode::Days => "days",
            RepeatMode::Weeks => "weeks",
            RepeatMode::MonthsByDate => "months-by-date",
            RepeatMode::MonthsByWeekday => "months-by-weekday",
            RepeatMode::YearsByDate => "years-by-date",
            RepeatMode::YearsByWeekday => "years-by-weekday",
        }
    }

    /// Caption shown next to the "Repeat every" input.
    pub fn label(self) -> &'static str {
        match self {
            RepeatMode::Days => "Days",
            RepeatMode::Weeks => "Weeks",
            RepeatMode::MonthsByDate => "Months (by Date)",
            RepeatMode::MonthsByWeekday => "Months (by Weekday)",
            RepeatMode::YearsByDate => "Years (by Date)",
            RepeatMode::YearsByWeekday => "Years (by Weekday)",
        }
    }

    /// The instant `steps` periods after `start`, or `None` once the
    /// calendar runs out of range.
    ///
    /// Always computed from `start` so that clamped days do not carry over
    /// into later months.
    pub(crate) fn nth(self, start: Instant, steps: u64) -> Option<Instant> {
        match self {
            RepeatMode::Days => daily::nth(start, steps),
            RepeatMode::Weeks => weekly::nth(start, steps),
            RepeatMode::MonthsByDate => monthly::by_date(start, steps),
            RepeatMode::MonthsByWeekday => monthly::by_weekday(start, steps),
            RepeatMode::YearsByDate => yearly::by_date(start, steps),
            RepeatMode::YearsByWeekday => yearly::by_weekday(start, steps),
        }
    }
}

impl fmt::Display for RepeatMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RepeatMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RepeatMode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| Error::UnknownMode(s.to_owned()))
    }
}
