// darkness-build/src/fsops.rs

use anyhow::{Context, Result};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use std::{fs, io, path::{Path, PathBuf}};
use walkdir::WalkDir;

/// Build a GlobSet from patterns. `*` does not cross directory separators.
pub fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut b = GlobSetBuilder::new();
    for p in patterns {
        let glob = GlobBuilder::new(p)
            .literal_separator(true)
            .build()
            .with_context(|| format!("invalid glob: {}", p))?;
        b.add(glob);
    }
    Ok(b.build()?)
}

/// Remove a file or directory tree. Returns false when there was nothing to remove.
pub fn remove_path(path: &Path) -> Result<bool> {
    let md = match fs::symlink_metadata(path) {
        Ok(md) => md,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e).with_context(|| format!("stat {}", path.display())),
    };
    let res = if md.is_dir() { fs::remove_dir_all(path) } else { fs::remove_file(path) };
    match res {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e).with_context(|| format!("delete {}", path.display())),
    }
}

/// Remove each path that exists; returns the ones actually removed.
pub fn remove_paths<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<PathBuf>> {
    let mut removed = vec![];
    for p in paths {
        if remove_path(p.as_ref())? { removed.push(p.as_ref().to_path_buf()); }
    }
    Ok(removed)
}

/// Files under `root` whose root-relative path matches `set`, sorted.
pub fn matching_files(root: &Path, set: &GlobSet) -> Result<Vec<PathBuf>> {
    let mut out = vec![];
    if !root.exists() { return Ok(out); }
    for r in WalkDir::new(root).follow_links(false).sort_by_file_name() {
        let de = r.with_context(|| format!("walk {}", root.display()))?;
        if !de.file_type().is_file() { continue; }
        let rel = de.path().strip_prefix(root).unwrap_or(de.path());
        if set.is_match(rel) { out.push(de.path().to_path_buf()); }
    }
    Ok(out)
}

/// Delete every file under `root` matching one of `patterns`.
pub fn remove_matching(root: &Path, patterns: &[String]) -> Result<Vec<PathBuf>> {
    let set = build_globset(patterns)?;
    let files = matching_files(root, &set)?;
    remove_paths(&files)
}

/// Recursively copy every file under `src` into `dst`, preserving relative paths.
/// Symlinks are followed, so linked files and directories land as real copies.
/// Returns the number of files copied.
pub fn copy_tree(src: &Path, dst: &Path) -> Result<usize> {
    let mut copied = 0;
    fs::create_dir_all(dst).with_context(|| format!("create {}", dst.display()))?;
    for r in WalkDir::new(src).min_depth(1).follow_links(true) {
        let de = r.with_context(|| format!("walk {}", src.display()))?;
        let rel = de.path().strip_prefix(src).unwrap_or(de.path());
        let target = dst.join(rel);
        if de.file_type().is_dir() {
            fs::create_dir_all(&target).with_context(|| format!("create {}", target.display()))?;
        } else if de.file_type().is_file() {
            if let Some(dir) = target.parent() { fs::create_dir_all(dir)?; }
            fs::copy(de.path(), &target)
                .with_context(|| format!("copy {} -> {}", de.path().display(), target.display()))?;
            copied += 1;
        }
    }
    Ok(copied)
}

/// Run blocking file work off the async executor.
pub async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.context("blocking task panicked")?
}
