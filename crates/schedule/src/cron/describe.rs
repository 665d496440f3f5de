//! Human-readable rendering of a cron expression for the schedule preview.
//!
//! Best effort only: anything that does not fit a short phrase is echoed back
//! as the raw field text. Never used to decide whether a schedule is valid.

use std::collections::BTreeSet;

use super::{CronExpression, CronField, FieldSpec};

/// Beyond this many concrete times the time-of-day phrase falls back to the raw fields.
const MAX_LISTED_TIMES: usize = 8;

/// Beyond this many days the day-of-month phrase falls back to the raw field.
const MAX_LISTED_DAYS: usize = 10;

/// Describe `expr`, or `None` if it does not validate.
pub fn describe(expr: &str) -> Option<String> {
    CronExpression::parse(expr).ok().map(|c| c.describe())
}

impl CronExpression {
    pub fn describe(&self) -> String {
        let mut parts = vec![time_phrase(
            self.field(CronField::Minute),
            self.field(CronField::Hour),
        )];
        parts.extend(day_of_week_phrase(self.field(CronField::DayOfWeek)));
        parts.extend(day_of_month_phrase(self.field(CronField::DayOfMonth)));
        parts.extend(month_phrase(self.field(CronField::Month)));

        let sentence = parts.join(" ");
        let mut chars = sentence.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => sentence,
        }
    }
}

fn time_phrase(minute: &FieldSpec, hour: &FieldSpec) -> String {
    if minute.is_wildcard() && hour.is_wildcard() {
        return "every minute".to_string();
    }
    if hour.is_wildcard() {
        if let Some(n) = minute.every_step() {
            return if n == 1 {
                "every minute".to_string()
            } else {
                format!("every {n} minutes")
            };
        }
        if let Some(m) = minute.single_value() {
            return format!("at minute {m} past every hour");
        }
    }
    if let (Some(m), Some(n)) = (minute.single_value(), hour.every_step()) {
        return if n == 1 {
            format!("at minute {m} past every hour")
        } else {
            format!("every {n} hours at minute {m}")
        };
    }

    let minutes = minute.values();
    let hours = hour.values();
    if minutes.len() * hours.len() <= MAX_LISTED_TIMES {
        let times: Vec<String> = hours
            .iter()
            .flat_map(|h| minutes.iter().map(move |m| format!("{h:02}:{m:02}")))
            .collect();
        return format!("at {}", times.join(", "));
    }

    format!("at minute {} past hour {}", minute.raw(), hour.raw())
}

fn day_of_week_phrase(dow: &FieldSpec) -> Option<String> {
    if dow.is_wildcard() {
        return None;
    }
    let days = dow.values();
    let weekdays: BTreeSet<u32> = (1..=5).collect();
    let weekend: BTreeSet<u32> = [0, 6].into_iter().collect();
    if days == weekdays {
        return Some("on weekdays".to_string());
    }
    if days == weekend {
        return Some("on weekends".to_string());
    }
    Some(format!("on {}", labels(CronField::DayOfWeek, &days)))
}

fn day_of_month_phrase(dom: &FieldSpec) -> Option<String> {
    if dom.is_wildcard() {
        return None;
    }
    let days = dom.values();
    if days.len() > MAX_LISTED_DAYS {
        return Some(format!("on day-of-month {}", dom.raw()));
    }
    let noun = if days.len() == 1 { "day" } else { "days" };
    Some(format!(
        "on {noun} {} of the month",
        labels(CronField::DayOfMonth, &days)
    ))
}

fn month_phrase(month: &FieldSpec) -> Option<String> {
    if month.is_wildcard() {
        return None;
    }
    Some(format!("in {}", labels(CronField::Month, &month.values())))
}

fn labels(field: CronField, values: &BTreeSet<u32>) -> String {
    values
        .iter()
        .map(|v| field.label(*v))
        .collect::<Vec<_>>()
        .join(", ")
}
