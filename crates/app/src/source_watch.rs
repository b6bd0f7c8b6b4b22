use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::{Duration, Instant};

use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};

const DEBOUNCE: Duration = Duration::from_millis(400);

#[derive(Default)]
pub struct ChangeDebouncer {
    pending: HashMap<PathBuf, Instant>,
}

impl ChangeDebouncer {
    pub fn note(&mut self, path: PathBuf, at: Instant) {
        self.pending.insert(path, at);
    }

    /// Paths that have been quiet for at least the debounce window.
    pub fn ready(&mut self, now: Instant) -> Vec<PathBuf> {
        let mut ready: Vec<PathBuf> = self
            .pending
            .iter()
            .filter(|(_, at)| now.saturating_duration_since(**at) >= DEBOUNCE)
            .map(|(p, _)| p.clone())
            .collect();
        for p in &ready {
            self.pending.remove(p);
        }
        ready.sort();
        ready
    }

    pub fn is_idle(&self) -> bool {
        self.pending.is_empty()
    }
}

pub struct SourceWatcher {
    watcher: Option<RecommendedWatcher>,
    watched_dirs: Vec<PathBuf>,
    files: Vec<PathBuf>,
    rx: mpsc::Receiver<PathBuf>,
    tx: mpsc::Sender<PathBuf>,
    debounce: ChangeDebouncer,
}

impl Default for SourceWatcher {
    fn default() -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            watcher: None,
            watched_dirs: Vec::new(),
            files: Vec::new(),
            rx,
            tx,
            debounce: ChangeDebouncer::default(),
        }
    }
}

impl SourceWatcher {
    /// Replaces the watched set. Parent directories are watched rather than
    /// the files, so replace-by-rename saves are still seen.
    pub fn watch_files(&mut self, files: &[&Path]) {
        let files: Vec<PathBuf> = files.iter().map(|f| absolute(f)).collect();
        if files == self.files {
            return;
        }
        self.files = files;
        self.watched_dirs.clear();
        self.watcher = None;
        if self.files.is_empty() {
            return;
        }

        let tx = self.tx.clone();
        let targets = self.files.clone();
        let watcher = notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
            let Ok(event) = res else { return };
            if !matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
                return;
            }
            for p in event.paths {
                if targets.contains(&p) {
                    let _ = tx.send(p);
                }
            }
        });
        let mut watcher = match watcher {
            Ok(w) => w,
            Err(e) => {
                log::warn!("source watcher unavailable: {e}");
                return;
            }
        };

        for file in &self.files {
            let Some(dir) = file.parent() else { continue };
            if self.watched_dirs.iter().any(|d| d == dir) {
                continue;
            }
            match watcher.watch(dir, RecursiveMode::NonRecursive) {
                Ok(()) => self.watched_dirs.push(dir.to_path_buf()),
                Err(e) => log::warn!("cannot watch {}: {e}", dir.display()),
            }
        }
        self.watcher = Some(watcher);
    }

    pub fn poll(&mut self) -> Vec<PathBuf> {
        let now = Instant::now();
        while let Ok(path) = self.rx.try_recv() {
            self.debounce.note(path, now);
        }
        self.debounce.ready(now)
    }

    pub fn has_pending(&self) -> bool {
        !self.debounce.is_idle()
    }
}

pub fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bursts_collapse_into_one_change() {
        let t0 = Instant::now();
        let mut d = ChangeDebouncer::default();
        let p = PathBuf::from("/media/ad.wav");
        d.note(p.clone(), t0);
        d.note(p.clone(), t0 + Duration::from_millis(100));
        d.note(p.clone(), t0 + Duration::from_millis(200));

        assert!(d.ready(t0 + Duration::from_millis(500)).is_empty());
        assert_eq!(d.ready(t0 + Duration::from_millis(700)), vec![p]);
        assert!(d.is_idle());
    }

    #[test]
    fn independent_files_settle_independently() {
        let t0 = Instant::now();
        let mut d = ChangeDebouncer::default();
        d.note("/a.mp4".into(), t0);
        d.note("/b.wav".into(), t0 + Duration::from_millis(300));
        assert_eq!(d.ready(t0 + Duration::from_millis(450)), vec![PathBuf::from("/a.mp4")]);
        assert_eq!(d.ready(t0 + Duration::from_millis(800)), vec![PathBuf::from("/b.wav")]);
    }

    #[test]
    fn relative_paths_are_resolved() {
        assert!(absolute(Path::new("clip.mp4")).is_absolute());
        assert_eq!(absolute(Path::new("/x/y.wav")), PathBuf::from("/x/y.wav"));
    }
}
