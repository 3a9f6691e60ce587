// darkness-build/src/watch.rs

use anyhow::{Context, Result};
use globset::GlobSet;
use notify::{recommended_watcher, Event, EventKind, RecursiveMode, Watcher};
use std::{future::Future, path::{Path, PathBuf}};
use tokio::{sync::{mpsc, oneshot}, task::JoinHandle};
use tracing::{debug, info, warn};

use crate::fsops;

/// A running watch loop. Dropping the handle leaves the loop running;
/// call [`WatchHandle::stop`] to end it.
pub struct WatchHandle {
    stop_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl WatchHandle {
    pub async fn stop(mut self) -> Result<()> {
        if let Some(tx) = self.stop_tx.take() { let _ = tx.send(()); }
        self.task.await.context("watch loop panicked")
    }

    pub fn is_finished(&self) -> bool { self.task.is_finished() }
}

fn relevant(event: &Event, dirs: &[PathBuf], globs: &GlobSet) -> bool {
    if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)) {
        return false;
    }
    event.paths.iter().any(|p| matches_under(p, dirs, globs))
}

fn matches_under(path: &Path, dirs: &[PathBuf], globs: &GlobSet) -> bool {
    dirs.iter().any(|d| path.strip_prefix(d).is_ok_and(|rel| globs.is_match(rel)))
}

/// Watch `dirs` recursively and call `rebuild` once per relevant change event.
/// Missing directories are skipped with a warning.
pub fn watch<F, Fut>(dirs: Vec<PathBuf>, patterns: &[String], rebuild: F) -> Result<WatchHandle>
where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let globs = fsops::build_globset(patterns)?;
    // Events report canonical paths on some platforms.
    let dirs: Vec<PathBuf> = dirs.into_iter()
        .map(|d| d.canonicalize().unwrap_or(d))
        .collect();

    let (tx, mut rx) = mpsc::unbounded_channel::<Event>();
    let filter_dirs = dirs.clone();
    let mut watcher = recommended_watcher(move |res: notify::Result<Event>| {
        match res {
            Ok(ev) if relevant(&ev, &filter_dirs, &globs) => { let _ = tx.send(ev); }
            Ok(_) => {}
            Err(e) => warn!("watch error: {e}"),
        }
    })?;
    for d in &dirs {
        if d.is_dir() {
            watcher.watch(d, RecursiveMode::Recursive)
                .with_context(|| format!("watch {}", d.display()))?;
            info!("Watching {}", d.display());
        } else {
            warn!("not watching missing directory {}", d.display());
        }
    }

    let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
    let task = tokio::spawn(async move {
        let _watcher = watcher;
        loop {
            tokio::select! {
                _ = &mut stop_rx => break,
                ev = rx.recv() => match ev {
                    Some(ev) => {
                        debug!(kind = ?ev.kind, paths = ?ev.paths, "change detected");
                        rebuild().await;
                    }
                    None => break,
                },
            }
        }
        info!("watch stopped");
    });

    Ok(WatchHandle { stop_tx: Some(stop_tx), task })
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind};
    use std::{sync::{atomic::{AtomicUsize, Ordering}, Arc}, time::Duration};

    #[test]
    fn access_events_and_foreign_paths_are_ignored() {
        let dirs = vec![PathBuf::from("/dev/themes")];
        let globs = fsops::build_globset(&["**/*.scss".to_string()]).unwrap();

        let hit = Event::new(EventKind::Create(CreateKind::File)).add_path("/dev/themes/websites/cnn.scss".into());
        let access = Event::new(EventKind::Access(AccessKind::Any)).add_path("/dev/themes/a.scss".into());
        let other_ext = Event::new(EventKind::Create(CreateKind::File)).add_path("/dev/themes/a.css".into());
        let outside = Event::new(EventKind::Create(CreateKind::File)).add_path("/dev/themes-css/a.scss".into());

        assert!(relevant(&hit, &dirs, &globs));
        assert!(!relevant(&access, &dirs, &globs));
        assert!(!relevant(&other_ext, &dirs, &globs));
        assert!(!relevant(&outside, &dirs, &globs));
    }

    #[tokio::test]
    async fn change_triggers_rebuild_until_stopped() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("style");
        std::fs::create_dir_all(&src).unwrap();

        let runs = Arc::new(AtomicUsize::new(0));
        let counter = runs.clone();
        let handle = watch(vec![src.clone()], &["**/*".to_string()], move || {
            let counter = counter.clone();
            async move { counter.fetch_add(1, Ordering::SeqCst); }
        }).unwrap();

        std::fs::write(src.join("popup.scss"), "a { b: c; }").unwrap();
        for _ in 0..50 {
            if runs.load(Ordering::SeqCst) > 0 { break; }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert!(runs.load(Ordering::SeqCst) > 0);

        handle.stop().await.unwrap();
    }
}
