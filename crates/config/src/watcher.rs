//! Reload notification for a configuration file

use crate::loader::parent_dir;
use crate::{ConfigError, Result};
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Quiet period closing a batch, one write can span several notifications
const SETTLE: Duration = Duration::from_millis(100);

enum WatchSignal {
    Event(notify::Result<Event>),
    Interrupt,
}

/// Ends a running [`FileWatcher::inspect`] loop from another thread
#[derive(Clone)]
pub struct Interrupter(Sender<WatchSignal>);

impl Interrupter {
    /// Stop the watcher, a no-op once it is gone.
    pub fn interrupt(&self) {
        // The watcher is already gone if the receiver was dropped
        let _ = self.0.send(WatchSignal::Interrupt);
    }
}

/// Blocking watcher that calls back whenever a file is modified
///
/// Filesystem notification works on directories, so the parent directory is
/// watched and events for sibling files are ignored. Events arriving less
/// than 100ms apart are coalesced into a single callback. The watcher never
/// spawns a thread, run [`FileWatcher::inspect`] wherever blocking is
/// acceptable.
pub struct FileWatcher<F> {
    path: PathBuf,
    file_name: Option<OsString>,
    on_reload: F,
    tx: Sender<WatchSignal>,
    rx: Receiver<WatchSignal>,
}

impl<F: FnMut()> FileWatcher<F> {
    /// Watcher calling `on_reload` when `path` changes, idle until inspected.
    pub fn new(path: impl Into<PathBuf>, on_reload: F) -> Self {
        let path = path.into();
        let file_name = path.file_name().map(|name| name.to_os_string());
        let (tx, rx) = mpsc::channel();
        Self {
            path,
            file_name,
            on_reload,
            tx,
            rx,
        }
    }

    /// File being watched.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Handle that stops [`FileWatcher::inspect`] gracefully.
    pub fn interrupter(&self) -> Interrupter {
        Interrupter(self.tx.clone())
    }

    /// Watch until interrupted.
    pub fn inspect(&mut self) {
        self.inspect_bounded(usize::MAX);
    }

    /// Watch until `max_reloads` callbacks were made or the watcher is interrupted.
    pub fn inspect_bounded(&mut self, max_reloads: usize) {
        if max_reloads == 0 {
            return;
        }

        // Dropping the watcher at the end of the loop unregisters it
        let _watcher = match self.register() {
            Ok(watcher) => watcher,
            Err(e) => {
                error!(path = %self.path.display(), error = %e, "Cannot watch configuration file");
                return;
            }
        };
        info!(path = %self.path.display(), "Watching configuration file");

        let mut reloads = 0;
        while reloads < max_reloads {
            let Ok(first) = self.rx.recv() else {
                break;
            };

            let mut relevant = false;
            let mut interrupted = false;
            let mut next = Some(first);
            while let Some(signal) = next.take() {
                match signal {
                    WatchSignal::Event(Ok(event)) => relevant |= self.is_relevant(&event),
                    WatchSignal::Event(Err(e)) => warn!(error = %e, "Watch error"),
                    WatchSignal::Interrupt => {
                        interrupted = true;
                        break;
                    }
                }
                match self.rx.recv_timeout(SETTLE) {
                    Ok(signal) => next = Some(signal),
                    Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => {}
                }
            }

            if interrupted {
                debug!(path = %self.path.display(), "Configuration watcher interrupted");
                break;
            }
            if relevant {
                info!(path = %self.path.display(), "Configuration file modified");
                (self.on_reload)();
                reloads += 1;
            }
        }

        debug!(path = %self.path.display(), reloads, "Configuration watcher stopped");
    }

    fn register(&self) -> Result<RecommendedWatcher> {
        let tx = self.tx.clone();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                let _ = tx.send(WatchSignal::Event(res));
            },
            notify::Config::default(),
        )
        .map_err(|e| ConfigError::WatchError(e.to_string()))?;

        watcher
            .watch(parent_dir(&self.path), RecursiveMode::NonRecursive)
            .map_err(|e| ConfigError::WatchError(e.to_string()))?;

        Ok(watcher)
    }

    fn is_relevant(&self, event: &Event) -> bool {
        match event.kind {
            // A rename also reports its target as `Name(To)`
            EventKind::Modify(ModifyKind::Name(RenameMode::From | RenameMode::Both)) => {
                return false
            }
            EventKind::Modify(_) | EventKind::Create(_) => {}
            _ => return false,
        }
        event
            .paths
            .iter()
            .any(|path| path.file_name() == self.file_name.as_deref())
    }
}
