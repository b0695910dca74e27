// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

use std::path::Path;

use chrono::{DateTime, Local};
use tracing::warn;

use crate::error::OverlapError;
use crate::schedule::parser::parse_schedule_file;
use crate::schedule::row::Occurrence;

/// The merged, sorted, overlap-free set of occurrences across a library root (§4.2).
#[derive(Debug, Clone, Default)]
pub struct ScheduleIndex {
    occurrences: Vec<Occurrence>,
}

impl ScheduleIndex {
    /// Enumerate immediate subdirectories of `root`, parse each `schedule.csv`,
    /// merge and sort the results, and reject the whole load on any overlap.
    pub fn load(root: &Path, now: DateTime<Local>) -> Result<Self, OverlapError> {
        let mut occurrences = Vec::new();

        let entries = match std::fs::read_dir(root) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("failed to list library root {}: {}", root.display(), e);
                return Ok(Self::default());
            }
        };

        let mut sets: Vec<_> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_dir())
            .collect();
        sets.sort();

        for set_dir in sets {
            let schedule_path = set_dir.join("schedule.csv");
            if !schedule_path.is_file() {
                warn!(
                    "schedule file not found in set {}, skipping",
                    set_dir.display()
                );
                continue;
            }
            occurrences.extend(parse_schedule_file(&schedule_path, now));
        }

        occurrences.sort_by_key(|o| o.start);
        check_overlaps(&occurrences)?;

        Ok(Self { occurrences })
    }

    pub fn occurrences(&self) -> &[Occurrence] {
        &self.occurrences
    }

    pub fn is_empty(&self) -> bool {
        self.occurrences.is_empty()
    }

    /// The unique occurrence active at `now`, if any.
    pub fn active_at(&self, now: DateTime<Local>) -> Option<&Occurrence> {
        self.occurrences.iter().find(|o| o.is_active_at(now))
    }

    /// The smallest `start` strictly greater than `now`, if any.
    pub fn next_start_after(&self, now: DateTime<Local>) -> Option<DateTime<Local>> {
        self.occurrences
            .iter()
            .map(|o| o.start)
            .find(|start| *start > now)
    }
}

fn check_overlaps(sorted: &[Occurrence]) -> Result<(), OverlapError> {
    for window in sorted.windows(2) {
        let [a, b] = window else { unreachable!() };
        if b.start < a.end {
            return Err(OverlapError {
                first: a.start.to_string(),
                first_set: a.set_folder.display().to_string(),
                second: b.start.to_string(),
                second_set: b.set_folder.display().to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::io::Write;

    const HEADER: &str = "Start Date;End Date;Start Time;Duration (minutes);Frequency (MHz);Mode;Power (W);Pause (sec)\n";

    fn tempdir() -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "xmit-core-index-test-{}-{}",
            std::process::id(),
            COUNTER.fetch_add(1, std::sync::atomic::Ordering::Relaxed)
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }
    static COUNTER: std::sync::atomic::AtomicU64 = std::sync::atomic::AtomicU64::new(0);

    fn write_set(root: &Path, name: &str, row: &str) {
        let set_dir = root.join(name);
        std::fs::create_dir_all(&set_dir).unwrap();
        let mut f = std::fs::File::create(set_dir.join("schedule.csv")).unwrap();
        f.write_all(format!("{HEADER}{row}\n").as_bytes()).unwrap();
    }

    #[test]
    fn empty_library_has_no_active_or_next_occurrence() {
        let root = tempdir();
        let now = Local.with_ymd_and_hms(2026, 7, 31, 0, 0, 0).unwrap();
        let index = ScheduleIndex::load(&root, now).unwrap();
        assert!(index.active_at(now).is_none());
        assert!(index.next_start_after(now).is_none());
    }

    #[test]
    fn overlap_across_sets_is_rejected() {
        let root = tempdir();
        write_set(&root, "a", "01.01.2030;01.01.2030;10:00;15;14.074;USB;10;30");
        write_set(&root, "b", "01.01.2030;01.01.2030;10:10;15;14.074;USB;10;30");
        let now = Local.with_ymd_and_hms(2026, 7, 31, 0, 0, 0).unwrap();
        assert!(ScheduleIndex::load(&root, now).is_err());
    }

    #[test]
    fn single_active_occurrence() {
        let root = tempdir();
        write_set(&root, "a", "01.01.2030;01.01.2030;10:00;15;14.074;USB;10;30");
        write_set(&root, "b", "01.01.2030;01.01.2030;11:00;15;14.074;USB;10;30");
        let now = Local.with_ymd_and_hms(2026, 7, 31, 0, 0, 0).unwrap();
        let index = ScheduleIndex::load(&root, now).unwrap();
        let at = Local.with_ymd_and_hms(2030, 1, 1, 10, 5, 0).unwrap();
        assert!(index.active_at(at).is_some());
        let between = Local.with_ymd_and_hms(2030, 1, 1, 10, 30, 0).unwrap();
        assert!(index.active_at(between).is_none());
    }

    #[test]
    fn reload_is_idempotent() {
        let root = tempdir();
        write_set(&root, "a", "01.01.2030;01.01.2030;10:00;15;14.074;USB;10;30");
        let now = Local.with_ymd_and_hms(2026, 7, 31, 0, 0, 0).unwrap();
        let first = ScheduleIndex::load(&root, now).unwrap();
        let second = ScheduleIndex::load(&root, now).unwrap();
        assert_eq!(first.occurrences().len(), second.occurrences().len());
        assert_eq!(first.occurrences()[0], second.occurrences()[0]);
    }

    #[test]
    fn set_without_schedule_csv_is_skipped_not_fatal() {
        let root = tempdir();
        std::fs::create_dir_all(root.join("empty-set")).unwrap();
        write_set(&root, "a", "01.01.2030;01.01.2030;10:00;15;14.074;USB;10;30");
        let now = Local.with_ymd_and_hms(2026, 7, 31, 0, 0, 0).unwrap();
        let index = ScheduleIndex::load(&root, now).unwrap();
        assert_eq!(index.occurrences().len(), 1);
    }
}
