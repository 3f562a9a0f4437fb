//! Time reports.
//!
//! A report lists, per task, the total time logged since a cutoff, then the
//! total per calendar day, then each interval:
//!
//! ```text
//! review [flatrel] 02:30:00
//!     2026-10-15 01:30:00
//!         09:00 + 01:30:00 first pass
//!     2026-10-16 01:00:00
//!         14:10 + 01:00:00
//! ```

use std::fmt::Write;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use clap::ValueEnum;

use crate::models::{Log, Task};

const DAY: f64 = 24.0 * 3600.0;

/// Reporting window, counted back from now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Period {
    /// Last 24 hours.
    Day,
    /// Last 7 days.
    Week,
    /// Last 31 days.
    Month,
    /// Last 366 days.
    Year,
}

impl Period {
    /// Length of the window in seconds.
    pub fn seconds(self) -> f64 {
        match self {
            Period::Day => DAY,
            Period::Week => 7.0 * DAY,
            Period::Month => 31.0 * DAY,
            Period::Year => 366.0 * DAY,
        }
    }
}

/// Formats a duration as `HH:MM:SS`, or `Nd HH:MM:SS` from one day up.
///
/// Fractional seconds are truncated; negative durations print as zero.
pub fn pretty_duration(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    let (minutes, seconds) = (total / 60, total % 60);
    let (hours, minutes) = (minutes / 60, minutes % 60);
    let (days, hours) = (hours / 24, hours % 24);
    if days == 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
    }
}

/// Converts Unix seconds into a point in `tz`.
pub fn to_datetime<Tz: TimeZone>(timestamp: f64, tz: &Tz) -> Option<DateTime<Tz>> {
    let secs = timestamp.floor();
    let nanos = ((timestamp - secs) * 1e9) as u32;
    Utc.timestamp_opt(secs as i64, nanos)
        .single()
        .map(|t| t.with_timezone(tz))
}

/// One-line rendering of a log entry: day, start and end time, duration,
/// description.
pub fn format_log<Tz: TimeZone>(log: &Log, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let start = to_datetime(log.start, tz);
    let end = to_datetime(log.end, tz);
    let mut line = match (start, end) {
        (Some(start), Some(end)) => format!(
            "{} {}-{}",
            start.format("%Y-%m-%d"),
            start.format("%H:%M"),
            end.format("%H:%M")
        ),
        _ => format!("{}-{}", log.start, log.end),
    };
    let _ = write!(line, " {}", pretty_duration(log.duration()));
    if !log.description.is_empty() {
        let _ = write!(line, " {}", log.description);
    }
    line
}

/// Time logged on one calendar day.
#[derive(Debug, Clone, PartialEq)]
pub struct DayReport {
    /// Day the intervals started on.
    pub day: Option<NaiveDate>,
    /// Sum of the interval lengths.
    pub total: f64,
    /// Intervals in the order they were logged.
    pub logs: Vec<Log>,
}

/// Time logged on one task.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskReport {
    /// The task.
    pub task: Task,
    /// Sum of the interval lengths.
    pub total: f64,
    /// Per-day breakdown, in order of first occurrence.
    pub days: Vec<DayReport>,
}

/// Builds per-task reports. Tasks without logs are left out.
pub fn build_report<Tz: TimeZone>(entries: Vec<(Task, Vec<Log>)>, tz: &Tz) -> Vec<TaskReport> {
    entries
        .into_iter()
        .filter(|(_, logs)| !logs.is_empty())
        .map(|(task, logs)| {
            let total = logs.iter().map(Log::duration).sum();
            let mut days: Vec<DayReport> = Vec::new();
            for log in logs {
                let day = to_datetime(log.start, tz).map(|t| t.date_naive());
                match days.iter_mut().find(|d| d.day == day) {
                    Some(entry) => {
                        entry.total += log.duration();
                        entry.logs.push(log);
                    }
                    None => days.push(DayReport {
                        day,
                        total: log.duration(),
                        logs: vec![log],
                    }),
                }
            }
            TaskReport { task, total, days }
        })
        .collect()
}

/// Renders reports as indented text.
pub fn render_report<Tz: TimeZone>(reports: &[TaskReport], tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let mut out = String::new();
    for report in reports {
        let _ = writeln!(out, "{} {}", report.task, pretty_duration(report.total));
        for day in &report.days {
            let label = day
                .day
                .map_or_else(|| "????-??-??".to_string(), |d| d.format("%Y-%m-%d").to_string());
            let _ = writeln!(out, "    {} {}", label, pretty_duration(day.total));
            for log in &day.logs {
                let minute = to_datetime(log.start, tz)
                    .map_or_else(|| "--:--".to_string(), |t| t.format("%H:%M").to_string());
                let mut line = format!("        {} + {}", minute, pretty_duration(log.duration()));
                if !log.description.is_empty() {
                    line.push(' ');
                    line.push_str(&log.description);
                }
                let _ = writeln!(out, "{}", line);
            }
        }
    }
    out
}
