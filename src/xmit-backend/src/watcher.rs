// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Filesystem watcher (§4.3): signals the supervisor's reload queue whenever
//! a `schedule.csv` is created, modified, or removed, or a new directory
//! appears under the library root. A plain `RecommendedWatcher` is used,
//! not `notify-debouncer-full` — burst coalescing is handled by the
//! supervisor draining its reload queue before each reload (§9).

use std::path::Path;

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::error;
use xmit_core::supervisor::ReloadSender;

/// Owns the live `notify` watcher; dropping this stops watching.
pub struct LibraryWatcher {
    _inner: RecommendedWatcher,
}

impl LibraryWatcher {
    pub fn start(root: &Path, reload_tx: ReloadSender) -> notify::Result<Self> {
        let mut watcher = RecommendedWatcher::new(
            move |result: notify::Result<Event>| match result {
                Ok(event) => {
                    if is_relevant(&event) {
                        let _ = reload_tx.send(());
                    }
                }
                Err(e) => error!("filesystem watch error: {}", e),
            },
            notify::Config::default(),
        )?;

        watcher.watch(root, RecursiveMode::Recursive)?;
        Ok(Self { _inner: watcher })
    }
}

fn is_relevant(event: &Event) -> bool {
    let touches_schedule_csv = event
        .paths
        .iter()
        .any(|p| p.file_name().and_then(|n| n.to_str()) == Some("schedule.csv"));

    let creates_directory = matches!(event.kind, EventKind::Create(notify::event::CreateKind::Folder));

    match event.kind {
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_) => {
            touches_schedule_csv || creates_directory
        }
        EventKind::Access(_) | EventKind::Other | EventKind::Any => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, ModifyKind};
    use std::path::PathBuf;

    fn event(kind: EventKind, path: &str) -> Event {
        Event::new(kind).add_path(PathBuf::from(path))
    }

    #[test]
    fn modifying_schedule_csv_is_relevant() {
        let e = event(EventKind::Modify(ModifyKind::Any), "/lib/set-a/schedule.csv");
        assert!(is_relevant(&e));
    }

    #[test]
    fn creating_a_directory_is_relevant() {
        let e = event(EventKind::Create(CreateKind::Folder), "/lib/set-b");
        assert!(is_relevant(&e));
    }

    #[test]
    fn touching_an_audio_file_is_not_relevant() {
        let e = event(EventKind::Modify(ModifyKind::Any), "/lib/set-a/01-intro.wav");
        assert!(!is_relevant(&e));
    }

    #[test]
    fn access_events_are_never_relevant() {
        let e = event(EventKind::Access(notify::event::AccessKind::Any), "/lib/set-a/schedule.csv");
        assert!(!is_relevant(&e));
    }
}
