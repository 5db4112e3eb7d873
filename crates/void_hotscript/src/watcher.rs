//! File watching for script hot-reload
//!
//! Watches the scripts directory and reports which scripts changed. The
//! watcher is only a trigger: [`ScriptComponent::reload_if_needed`] still
//! decides by modification time, so a duplicated event never causes a
//! redundant reload.
//!
//! [`ScriptComponent::reload_if_needed`]: crate::ScriptComponent::reload_if_needed

use crate::descriptor::ScriptLayout;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("Script watcher error: {0}")]
pub struct WatchError(#[from] notify::Error);

/// Script source change
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptFileEvent {
    Created(String),
    Modified(String),
    Deleted(String),
}

impl ScriptFileEvent {
    pub fn script(&self) -> &str {
        match self {
            ScriptFileEvent::Created(name)
            | ScriptFileEvent::Modified(name)
            | ScriptFileEvent::Deleted(name) => name,
        }
    }
}

/// Drops repeats of the same path within the debounce window
struct DebounceState {
    last_event: HashMap<PathBuf, Instant>,
    debounce_duration: Duration,
}

impl DebounceState {
    fn new(debounce_duration: Duration) -> Self {
        Self {
            last_event: HashMap::new(),
            debounce_duration,
        }
    }

    fn should_trigger(&mut self, path: &Path, now: Instant) -> bool {
        if let Some(last) = self.last_event.get(path) {
            if now.duration_since(*last) < self.debounce_duration {
                return false;
            }
        }
        self.last_event.insert(path.to_path_buf(), now);
        true
    }
}

/// Watches a [`ScriptLayout`]'s source directory
pub struct ScriptWatcher {
    _watcher: RecommendedWatcher,
    receiver: Receiver<ScriptFileEvent>,
    scripts_dir: PathBuf,
}

impl ScriptWatcher {
    pub fn new(layout: &ScriptLayout, debounce: Duration) -> Result<Self, WatchError> {
        let (tx, rx) = mpsc::channel();
        let debounce = Arc::new(Mutex::new(DebounceState::new(debounce)));
        let event_layout = layout.clone();

        let mut watcher =
            notify::recommended_watcher(move |result: Result<Event, notify::Error>| match result {
                Ok(event) => Self::handle_event(event, &event_layout, &tx, &debounce),
                Err(e) => log::warn!("Script watcher error: {}", e),
            })?;

        watcher.watch(&layout.scripts_dir, RecursiveMode::NonRecursive)?;
        log::info!("Watching script directory: {}", layout.scripts_dir.display());

        Ok(Self {
            _watcher: watcher,
            receiver: rx,
            scripts_dir: layout.scripts_dir.clone(),
        })
    }

    fn handle_event(
        event: Event,
        layout: &ScriptLayout,
        sender: &Sender<ScriptFileEvent>,
        debounce: &Mutex<DebounceState>,
    ) {
        let wrap: fn(String) -> ScriptFileEvent = match event.kind {
            EventKind::Create(_) => ScriptFileEvent::Created,
            EventKind::Modify(_) => ScriptFileEvent::Modified,
            EventKind::Remove(_) => ScriptFileEvent::Deleted,
            _ => return,
        };

        let now = Instant::now();
        let mut debounce = debounce.lock();
        for path in &event.paths {
            let Some(name) = layout.script_name(path) else {
                continue;
            };
            if debounce.should_trigger(path, now) {
                let _ = sender.send(wrap(name));
            }
        }
    }

    pub fn scripts_dir(&self) -> &Path {
        &self.scripts_dir
    }

    /// Drain pending events (non-blocking)
    pub fn poll_events(&mut self) -> Vec<ScriptFileEvent> {
        self.receiver.try_iter().collect()
    }

    /// Names of scripts whose source was created or modified, deduplicated
    pub fn poll_changed_scripts(&mut self) -> Vec<String> {
        let mut changed: Vec<String> = Vec::new();
        for event in self.poll_events() {
            match event {
                ScriptFileEvent::Created(name) | ScriptFileEvent::Modified(name) => {
                    if !changed.contains(&name) {
                        changed.push(name);
                    }
                }
                ScriptFileEvent::Deleted(name) => {
                    log::debug!("Script source deleted: {}", name);
                }
            }
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debounce() {
        let mut state = DebounceState::new(Duration::from_millis(100));
        let path = Path::new("scripts/A.rs");
        let t0 = Instant::now();

        assert!(state.should_trigger(path, t0));
        assert!(!state.should_trigger(path, t0 + Duration::from_millis(50)));
        assert!(state.should_trigger(Path::new("scripts/B.rs"), t0));
        assert!(state.should_trigger(path, t0 + Duration::from_millis(150)));
    }

    #[test]
    fn test_event_script_name() {
        let event = ScriptFileEvent::Modified("PlayerController".to_string());
        assert_eq!(event.script(), "PlayerController");
    }

    #[test]
    fn test_watch_missing_dir_fails() {
        let layout = ScriptLayout::rooted("/nonexistent/void/scripts");
        assert!(ScriptWatcher::new(&layout, Duration::from_millis(50)).is_err());
    }
}
