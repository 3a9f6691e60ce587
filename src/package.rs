// darkness-build/src/package.rs

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::{fs, io, path::{Path, PathBuf}, sync::Arc};
use tracing::info;
use walkdir::WalkDir;
use zip::{write::SimpleFileOptions, CompressionMethod, ZipWriter};

use crate::{config::{Config, Manifest}, fsops};

/// Chrome Web Store packaging: replicate -> cleanup -> zip -> archive.
#[derive(Clone)]
pub struct Packager {
    cfg: Arc<Config>,
    manifest: Option<Manifest>,
}

/// `<prefix>-v<version>_(<YYYY-MM-DD__HH-MM-SS>).zip`
pub fn archive_file_name(prefix: &str, version: &str, at: DateTime<Utc>) -> String {
    format!("{}-v{}_({}).zip", prefix, version, at.format("%Y-%m-%d__%H-%M-%S"))
}

impl Packager {
    pub fn new(cfg: Arc<Config>, manifest: Option<Manifest>) -> Self {
        Self { cfg, manifest }
    }

    /// Wipe the production tree and latest zip, then copy the development tree over.
    pub async fn replicate(&self) -> Result<usize> {
        info!("Replicate started");
        let dev = self.cfg.development_dir();
        let prod = self.cfg.production_dir();
        let latest = self.cfg.latest_zip_path();
        fsops::blocking(move || {
            for p in fsops::remove_paths(&[&prod, &latest])? {
                info!("Deleted: {}", p.display());
            }
            let n = fsops::copy_tree(&dev, &prod)?;
            info!(files = n, "replicated {} -> {}", dev.display(), prod.display());
            Ok(n)
        }).await
    }

    /// Strip development-only directories and files from the production tree.
    pub async fn cleanup(&self) -> Result<Vec<PathBuf>> {
        info!("Cleanup started");
        let prod = self.cfg.production_dir();
        let dirs: Vec<PathBuf> = self.cfg.package.strip_dirs.iter().map(|d| prod.join(d)).collect();
        let globs = self.cfg.package.strip_globs.clone();
        fsops::blocking(move || {
            let mut removed = fsops::remove_paths(&dirs)?;
            for p in &removed { info!("Deleted directory: {}", p.display()); }
            let files = fsops::remove_matching(&prod, &globs)?;
            for p in &files { info!("Deleted file: {}", p.display()); }
            removed.extend(files);
            Ok(removed)
        }).await
    }

    /// Compress the production tree into the latest zip.
    pub async fn archive_package(&self) -> Result<PathBuf> {
        info!("Zipping...");
        let prod = self.cfg.production_dir();
        let out = self.cfg.latest_zip_path();
        fsops::blocking(move || {
            zip_tree(&prod, &out)?;
            Ok(out)
        }).await
    }

    /// Copy the latest zip to its versioned, timestamped history name.
    pub async fn archive_history(&self) -> Result<PathBuf> {
        self.archive_history_at(Utc::now()).await
    }

    pub async fn archive_history_at(&self, at: DateTime<Utc>) -> Result<PathBuf> {
        let manifest = self.manifest.as_ref()
            .with_context(|| format!("no usable manifest at {}", self.cfg.manifest_path().display()))?;
        let name = archive_file_name(&self.cfg.package.archive_prefix, &manifest.version, at);
        info!("Copying to archive: {}", name);
        let src = self.cfg.latest_zip_path();
        let dst = self.cfg.zips_dir().join(name);
        tokio::fs::copy(&src, &dst).await
            .with_context(|| format!("copy {} -> {}", src.display(), dst.display()))?;
        Ok(dst)
    }
}

fn zip_tree(src: &Path, out: &Path) -> Result<usize> {
    if let Some(dir) = out.parent() {
        fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    }
    let file = fs::File::create(out).with_context(|| format!("create {}", out.display()))?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut entries = 0;
    for r in WalkDir::new(src).min_depth(1).sort_by_file_name() {
        let de = r.with_context(|| format!("walk {}", src.display()))?;
        let rel = de.path().strip_prefix(src).unwrap_or(de.path());
        let name = rel.components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        if de.file_type().is_dir() {
            zip.add_directory(format!("{name}/"), options)?;
        } else if de.file_type().is_file() {
            zip.start_file(name, options)?;
            let mut f = fs::File::open(de.path()).with_context(|| format!("open {}", de.path().display()))?;
            io::copy(&mut f, &mut zip)?;
            entries += 1;
        }
    }
    zip.finish().with_context(|| format!("finish {}", out.display()))?;
    Ok(entries)
}
