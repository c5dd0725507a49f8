//! Filesystem watching for keeping a project's registry in sync with
//! external changes.
//!
//! Raw notify events are debounced on a background thread and handed
//! to the project as batched [`WatchEvent`]s; the project pulls them
//! with [`FsWatcher::try_recv_events`] and applies them to its store.

use anyhow::Result;
use camino::Utf8Path;
use camino::Utf8PathBuf;
use notify::Config;
use notify::Event;
use notify::EventKind;
use notify::RecommendedWatcher;
use notify::RecursiveMode;
use notify::Watcher;
use std::collections::HashMap;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;
use std::time::Instant;

/// A filesystem change relevant to the registry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WatchEvent {
    Created(Utf8PathBuf),
    Modified(Utf8PathBuf),
    Deleted(Utf8PathBuf),
}

impl WatchEvent {
    fn path(&self) -> &Utf8PathBuf {
        match self {
            WatchEvent::Created(path) | WatchEvent::Modified(path) | WatchEvent::Deleted(path) => {
                path
            }
        }
    }
}

/// Debounced watcher over one project root.
pub struct FsWatcher {
    _watcher: RecommendedWatcher,
    rx: mpsc::Receiver<Vec<WatchEvent>>,
    _handle: thread::JoinHandle<()>,
}

impl FsWatcher {
    /// Start watching `root` recursively. Events under `excluded`
    /// folders (absolute paths) are dropped before batching.
    pub fn new(root: &Utf8Path, debounce_ms: u64, excluded: Vec<Utf8PathBuf>) -> Result<Self> {
        let (event_tx, event_rx) = mpsc::channel();
        let (watch_tx, watch_rx) = mpsc::channel();

        let mut watcher = RecommendedWatcher::new(
            move |result: notify::Result<Event>| {
                if let Ok(event) = result {
                    let _ = event_tx.send(event);
                }
            },
            Config::default(),
        )?;
        watcher.watch(root.as_std_path(), RecursiveMode::Recursive)?;

        let handle = thread::spawn(move || {
            pump_events(&event_rx, &watch_tx, debounce_ms, &excluded);
        });

        Ok(Self {
            _watcher: watcher,
            rx: watch_rx,
            _handle: handle,
        })
    }

    /// Next batch of debounced events, or an empty vector when nothing
    /// is pending. Never blocks.
    #[must_use]
    pub fn try_recv_events(&self) -> Vec<WatchEvent> {
        self.rx.try_recv().unwrap_or_default()
    }
}

/// Background loop: coalesce raw events per path, flush a batch once
/// the debounce window elapses.
fn pump_events(
    event_rx: &mpsc::Receiver<Event>,
    watch_tx: &mpsc::Sender<Vec<WatchEvent>>,
    debounce_ms: u64,
    excluded: &[Utf8PathBuf],
) {
    let mut pending: HashMap<Utf8PathBuf, WatchEvent> = HashMap::new();
    let mut last_flush = Instant::now();
    let debounce = Duration::from_millis(debounce_ms);

    loop {
        match event_rx.recv_timeout(Duration::from_millis(50)) {
            Ok(event) => {
                for watch_event in convert_event(event, excluded) {
                    // only the latest event per path survives the window
                    pending.insert(watch_event.path().clone(), watch_event);
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }

        if !pending.is_empty() && last_flush.elapsed() >= debounce {
            let batch: Vec<WatchEvent> = pending.values().cloned().collect();
            if watch_tx.send(batch).is_err() {
                break;
            }
            pending.clear();
            last_flush = Instant::now();
        }
    }
}

fn convert_event(event: Event, excluded: &[Utf8PathBuf]) -> Vec<WatchEvent> {
    let mut converted = Vec::new();
    for path in event.paths {
        let Ok(utf8) = Utf8PathBuf::try_from(path) else {
            continue;
        };
        if excluded.iter().any(|folder| utf8.starts_with(folder)) {
            continue;
        }
        match event.kind {
            EventKind::Create(_) => converted.push(WatchEvent::Created(utf8)),
            EventKind::Modify(_) => converted.push(WatchEvent::Modified(utf8)),
            EventKind::Remove(_) => converted.push(WatchEvent::Deleted(utf8)),
            _ => {}
        }
    }
    converted
}
