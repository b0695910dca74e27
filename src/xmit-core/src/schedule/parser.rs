// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

use std::path::Path;

use chrono::{DateTime, Duration, Local, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use tracing::{debug, warn};

use super::row::{Occurrence, DEFAULT_PAUSE_S, DEFAULT_POWER_W};

const REQUIRED_COLUMNS: &[&str] = &[
    "Start Date",
    "End Date",
    "Start Time",
    "Duration (minutes)",
    "Frequency (MHz)",
    "Mode",
    "Power (W)",
    "Pause (sec)",
];

/// Parse one `schedule.csv` into concrete occurrences, relative to `now`.
///
/// A malformed or unreadable file yields an empty list and a warning; a
/// malformed row is skipped with a debug note. Neither is fatal to the
/// caller (§4.1).
pub fn parse_schedule_file(path: &Path, now: DateTime<Local>) -> Vec<Occurrence> {
    let set_folder = path
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| Path::new(".").to_path_buf());

    let mut reader = match csv::ReaderBuilder::new().delimiter(b';').from_path(path) {
        Ok(r) => r,
        Err(e) => {
            warn!("failed to open schedule file {}: {}", path.display(), e);
            return Vec::new();
        }
    };

    let headers = match reader.headers() {
        Ok(h) => h.clone(),
        Err(e) => {
            warn!("failed to read header of {}: {}", path.display(), e);
            return Vec::new();
        }
    };

    for required in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == *required) {
            warn!(
                "schedule file {} is missing required column '{}', skipping file",
                path.display(),
                required
            );
            return Vec::new();
        }
    }

    let column = |name: &str| headers.iter().position(|h| h == name);
    let columns: Vec<(&str, usize)> = REQUIRED_COLUMNS
        .iter()
        .map(|name| (*name, column(name).expect("checked above")))
        .collect();
    let col = |name: &str| columns.iter().find(|(n, _)| *n == name).unwrap().1;

    let mut occurrences = Vec::new();

    for (line, result) in reader.records().enumerate() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                debug!("skipping malformed row {} in {}: {}", line + 2, path.display(), e);
                continue;
            }
        };

        let get = |name: &str| record.get(col(name)).unwrap_or("").trim();

        let start_date_s = get("Start Date");
        if start_date_s.is_empty() {
            continue;
        }

        let Some(parsed) = parse_row(&record, &col) else {
            debug!("skipping malformed row {} in {}", line + 2, path.display());
            continue;
        };

        let ParsedRow {
            start_date,
            end_date,
            start_time,
            duration_minutes,
            frequency_mhz,
            mode,
            power_w,
            pause_s,
        } = parsed;

        if duration_minutes <= 0 || start_date > end_date {
            continue;
        }

        let mut day = start_date;
        while day <= end_date {
            let naive = NaiveDateTime::new(day, start_time);
            let start = match Local.from_local_datetime(&naive) {
                LocalResult::Single(dt) => dt,
                LocalResult::Ambiguous(dt, _) => dt,
                LocalResult::None => {
                    day += Duration::days(1);
                    continue;
                }
            };
            let end = start + Duration::minutes(duration_minutes);

            if end < now {
                debug!("skipping past schedule: {}", start);
                day += Duration::days(1);
                continue;
            }

            occurrences.push(Occurrence {
                set_folder: set_folder.clone(),
                start,
                end,
                frequency_mhz,
                mode: mode.clone(),
                power_w,
                pause_s,
            });

            day += Duration::days(1);
        }
    }

    occurrences
}

struct ParsedRow {
    start_date: NaiveDate,
    end_date: NaiveDate,
    start_time: NaiveTime,
    duration_minutes: i64,
    frequency_mhz: f64,
    mode: String,
    power_w: u32,
    pause_s: u32,
}

fn parse_row(record: &csv::StringRecord, col: &impl Fn(&str) -> usize) -> Option<ParsedRow> {
    let get = |name: &str| record.get(col(name)).unwrap_or("").trim().to_string();

    let start_date = NaiveDate::parse_from_str(&get("Start Date"), "%d.%m.%Y").ok()?;
    let end_date = NaiveDate::parse_from_str(&get("End Date"), "%d.%m.%Y").ok()?;
    let start_time = NaiveTime::parse_from_str(&get("Start Time"), "%H:%M").ok()?;
    let duration_minutes: i64 = get("Duration (minutes)").parse().ok()?;
    let frequency_mhz: f64 = get("Frequency (MHz)").replace(',', ".").parse().ok()?;
    let mode = get("Mode").to_ascii_uppercase();

    let power_w = get("Power (W)").parse::<u32>().unwrap_or(0);
    let power_w = if power_w == 0 { DEFAULT_POWER_W } else { power_w };

    let pause_s = get("Pause (sec)").parse::<u32>().unwrap_or(0);
    let pause_s = if pause_s == 0 { DEFAULT_PAUSE_S } else { pause_s };

    Some(ParsedRow {
        start_date,
        end_date,
        start_time,
        duration_minutes,
        frequency_mhz,
        mode,
        power_w,
        pause_s,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(dir: &Path, contents: &str) -> std::path::PathBuf {
        let path = dir.join("schedule.csv");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    const HEADER: &str = "Start Date;End Date;Start Time;Duration (minutes);Frequency (MHz);Mode;Power (W);Pause (sec)\n";

    #[test]
    fn past_occurrences_are_pruned() {
        let dir = tempdir();
        let path = write_csv(&dir, &format!("{HEADER}01.01.2000;01.01.2000;10:00;15;14.074;USB;10;30\n"));
        let now = Local.with_ymd_and_hms(2026, 7, 31, 0, 0, 0).unwrap();
        let occurrences = parse_schedule_file(&path, now);
        assert!(occurrences.is_empty());
    }

    #[test]
    fn decimal_separator_is_equivalent() {
        let dir = tempdir();
        let path_dot = write_csv(&dir, &format!("{HEADER}01.01.2030;01.01.2030;10:00;15;14.074;USB;10;30\n"));
        let now = Local.with_ymd_and_hms(2026, 7, 31, 0, 0, 0).unwrap();
        let dot = parse_schedule_file(&path_dot, now);

        let dir2 = tempdir();
        let path_comma = write_csv(&dir2, &format!("{HEADER}01.01.2030;01.01.2030;10:00;15;14,074;USB;10;30\n"));
        let comma = parse_schedule_file(&path_comma, now);

        assert_eq!(dot.len(), 1);
        assert_eq!(comma.len(), 1);
        assert_eq!(dot[0].frequency_mhz, comma[0].frequency_mhz);
    }

    #[test]
    fn empty_power_and_pause_fall_back_to_defaults() {
        let dir = tempdir();
        let path = write_csv(
            &dir,
            &format!("{HEADER}01.01.2030;01.01.2030;10:00;15;14.074;USB;;\n"),
        );
        let now = Local.with_ymd_and_hms(2026, 7, 31, 0, 0, 0).unwrap();
        let occurrences = parse_schedule_file(&path, now);
        assert_eq!(occurrences.len(), 1);
        assert_eq!(occurrences[0].power_w, DEFAULT_POWER_W);
        assert_eq!(occurrences[0].pause_s, DEFAULT_PAUSE_S);
    }

    #[test]
    fn date_range_expands_to_one_occurrence_per_day() {
        let dir = tempdir();
        let path = write_csv(
            &dir,
            &format!("{HEADER}01.01.2030;03.01.2030;10:00;15;14.074;USB;10;30\n"),
        );
        let now = Local.with_ymd_and_hms(2026, 7, 31, 0, 0, 0).unwrap();
        let occurrences = parse_schedule_file(&path, now);
        assert_eq!(occurrences.len(), 3);
    }

    #[test]
    fn missing_required_column_skips_whole_file() {
        let dir = tempdir();
        let path = write_csv(&dir, "Start Date;End Date;Start Time\n01.01.2030;01.01.2030;10:00\n");
        let now = Local.with_ymd_and_hms(2026, 7, 31, 0, 0, 0).unwrap();
        assert!(parse_schedule_file(&path, now).is_empty());
    }

    #[test]
    fn malformed_row_is_skipped_not_fatal() {
        let dir = tempdir();
        let path = write_csv(
            &dir,
            &format!(
                "{HEADER}not-a-date;01.01.2030;10:00;15;14.074;USB;10;30\n01.01.2030;01.01.2030;10:00;15;14.074;USB;10;30\n"
            ),
        );
        let now = Local.with_ymd_and_hms(2026, 7, 31, 0, 0, 0).unwrap();
        let occurrences = parse_schedule_file(&path, now);
        assert_eq!(occurrences.len(), 1);
    }

    fn tempdir() -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "xmit-core-test-{}-{}",
            std::process::id(),
            COUNTER.fetch_add(1, std::sync::atomic::Ordering::Relaxed)
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    static COUNTER: std::sync::atomic::AtomicU64 = std::sync::atomic::AtomicU64::new(0);
}
