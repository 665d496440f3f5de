//! The five cron fields and their bounds.

use std::fmt;

const MONTHS: [&str; 12] = [
    "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
];

const WEEKDAYS: [&str; 7] = ["SUN", "MON", "TUE", "WED", "THU", "FRI", "SAT"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CronField {
    Minute,
    Hour,
    DayOfMonth,
    Month,
    DayOfWeek,
}

impl CronField {
    pub const ALL: [CronField; 5] = [
        CronField::Minute,
        CronField::Hour,
        CronField::DayOfMonth,
        CronField::Month,
        CronField::DayOfWeek,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Minute => "minute",
            Self::Hour => "hour",
            Self::DayOfMonth => "day-of-month",
            Self::Month => "month",
            Self::DayOfWeek => "day-of-week",
        }
    }

    /// Inclusive bounds. Day-of-week allows both 0 and 7 for Sunday.
    pub fn bounds(self) -> (u32, u32) {
        match self {
            Self::Minute => (0, 59),
            Self::Hour => (0, 23),
            Self::DayOfMonth => (1, 31),
            Self::Month => (1, 12),
            Self::DayOfWeek => (0, 7),
        }
    }

    /// Number of distinct raw values; the largest step a field accepts.
    pub fn span(self) -> u32 {
        let (min, max) = self.bounds();
        max - min + 1
    }

    pub(crate) fn index(self) -> usize {
        match self {
            Self::Minute => 0,
            Self::Hour => 1,
            Self::DayOfMonth => 2,
            Self::Month => 3,
            Self::DayOfWeek => 4,
        }
    }

    /// Case-insensitive month (`JAN`..`DEC`) or weekday (`SUN`..`SAT`) name.
    pub(crate) fn alias(self, text: &str) -> Option<u32> {
        let upper = text.to_ascii_uppercase();
        match self {
            Self::Month => MONTHS
                .iter()
                .position(|m| *m == upper)
                .map(|i| i as u32 + 1),
            Self::DayOfWeek => WEEKDAYS
                .iter()
                .position(|d| *d == upper)
                .map(|i| i as u32),
            _ => None,
        }
    }

    pub(crate) fn normalize(self, value: u32) -> u32 {
        match (self, value) {
            (Self::DayOfWeek, 7) => 0,
            _ => value,
        }
    }

    /// Short display label for a value (`Jan`, `Mon`, or the number).
    pub(crate) fn label(self, value: u32) -> String {
        match self {
            Self::Month => title_case(MONTHS[(value as usize).saturating_sub(1) % 12]),
            Self::DayOfWeek => title_case(WEEKDAYS[value as usize % 7]),
            _ => value.to_string(),
        }
    }
}

fn title_case(upper: &str) -> String {
    let mut out = String::with_capacity(upper.len());
    for (i, c) in upper.chars().enumerate() {
        out.push(if i == 0 { c } else { c.to_ascii_lowercase() });
    }
    out
}

impl fmt::Display for CronField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
