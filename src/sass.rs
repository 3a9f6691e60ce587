// darkness-build/src/sass.rs

use anyhow::{Context, Result};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::{fs, path::{Path, PathBuf}, sync::Arc};
use tracing::{error, info};

use crate::{config::{Config, SassRoot}, fsops};

/// Compiles `<root>/*.scss` into `<output>/<name>.css` + `<name>.css.map`.
#[derive(Clone)]
pub struct StyleCompiler {
    cfg: Arc<Config>,
}

#[derive(Clone, Debug, Default)]
pub struct RootReport {
    pub source: PathBuf,
    pub compiled: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
}

#[derive(Clone, Debug, Default)]
pub struct CompileReport {
    pub roots: Vec<RootReport>,
}
impl CompileReport {
    pub fn compiled(&self) -> usize { self.roots.iter().map(|r| r.compiled.len()).sum() }
    pub fn failed(&self) -> usize { self.roots.iter().map(|r| r.failed.len()).sum() }
}

/// Sidecar source map (v3). The map ties the stylesheet back to its source
/// file for devtools.
///
/// `mappings` is always empty: grass does not produce line mappings.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SourceMap {
    pub version: u8,
    pub file: String,
    pub source_root: String,
    pub sources: Vec<String>,
    pub sources_content: Vec<String>,
    pub names: Vec<String>,
    pub mappings: String,
}

impl StyleCompiler {
    pub fn new(cfg: Arc<Config>) -> Self { Self { cfg } }

    fn source_dir(&self, root: &SassRoot) -> PathBuf { self.cfg.development_dir().join(&root.source) }
    fn output_dir(&self, root: &SassRoot) -> PathBuf { self.cfg.development_dir().join(&root.output) }

    /// Directories watched for changes.
    pub fn source_dirs(&self) -> Vec<PathBuf> {
        self.cfg.sass.roots.iter().map(|r| self.source_dir(r)).collect()
    }

    /// Delete compiled css/maps inside the source roots and the output directories.
    pub async fn cleanup_compiled_output(&self) -> Result<Vec<PathBuf>> {
        info!("Cleaning up .css and .css.map files");
        let pairs: Vec<(PathBuf, PathBuf)> = self.cfg.sass.roots.iter()
            .map(|r| (self.source_dir(r), self.output_dir(r)))
            .collect();
        fsops::blocking(move || {
            let globs = vec!["**/*.css".to_string(), "**/*.css.map".to_string()];
            let mut removed = vec![];
            for (src, out) in pairs {
                removed.extend(fsops::remove_matching(&src, &globs)?);
                removed.extend(fsops::remove_paths(&[out])?);
            }
            for p in &removed { info!("Deleted: {}", p.display()); }
            Ok(removed)
        }).await
    }

    /// Compile every root; roots run concurrently and failures stay per file.
    pub async fn compile(&self) -> Result<CompileReport> {
        let jobs = self.cfg.sass.roots.iter().map(|r| {
            let (src, out) = (self.source_dir(r), self.output_dir(r));
            fsops::blocking(move || compile_root(&src, &out))
        });
        let mut report = CompileReport::default();
        for r in join_all(jobs).await {
            report.roots.push(r?);
        }
        info!(compiled = report.compiled(), failed = report.failed(), "sass compile finished");
        Ok(report)
    }
}

fn is_partial(path: &Path) -> bool {
    path.file_name().and_then(|n| n.to_str()).is_some_and(|n| n.starts_with('_'))
}

/// Top-level, non-partial `*.scss` files in `dir`, sorted.
fn entry_points(dir: &Path) -> Result<Vec<PathBuf>> {
    let rd = match fs::read_dir(dir) {
        Ok(rd) => rd,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(vec![]),
        Err(e) => return Err(e).with_context(|| format!("read {}", dir.display())),
    };
    let mut out = vec![];
    for e in rd {
        let p = e?.path();
        if p.is_file() && p.extension().is_some_and(|x| x == "scss") && !is_partial(&p) {
            out.push(p);
        }
    }
    out.sort();
    Ok(out)
}

fn compile_root(src: &Path, out: &Path) -> Result<RootReport> {
    let mut report = RootReport { source: src.to_path_buf(), ..Default::default() };
    let files = entry_points(src)?;
    if files.is_empty() { return Ok(report); }
    fs::create_dir_all(out).with_context(|| format!("create {}", out.display()))?;

    for file in files {
        match compile_file(src, &file, out) {
            Ok(css) => report.compiled.push(css),
            Err(e) => {
                error!("sass: {}: {e:#}", file.display());
                report.failed.push((file, format!("{e:#}")));
            }
        }
    }
    Ok(report)
}

fn relative_source_root(src: &Path, out: &Path) -> String {
    // Output dirs are siblings of the source roots.
    match (src.parent() == out.parent(), src.file_name()) {
        (true, Some(name)) => format!("../{}/", name.to_string_lossy()),
        _ => format!("{}/", src.display()),
    }
}

fn compile_file(root: &Path, file: &Path, out: &Path) -> Result<PathBuf> {
    let options = grass::Options::default().load_path(root);
    let css = grass::from_path(file, &options).map_err(|e| anyhow::anyhow!("{e}"))?;

    let stem = file.file_stem().and_then(|s| s.to_str()).context("non-utf8 file name")?;
    let css_name = format!("{stem}.css");
    let map_name = format!("{css_name}.map");
    let source = fs::read_to_string(file).with_context(|| format!("read {}", file.display()))?;

    let map = SourceMap {
        version: 3,
        file: css_name.clone(),
        source_root: relative_source_root(root, out),
        sources: vec![format!("{stem}.scss")],
        sources_content: vec![source],
        names: vec![],
        mappings: String::new(),
    };

    let css_path = out.join(&css_name);
    let mut body = css;
    if !body.ends_with('\n') && !body.is_empty() { body.push('\n'); }
    body.push_str(&format!("\n/*# sourceMappingURL={map_name} */\n"));
    fs::write(&css_path, body).with_context(|| format!("write {}", css_path.display()))?;
    fs::write(out.join(&map_name), serde_json::to_string(&map)?)
        .with_context(|| format!("write {}", out.join(&map_name).display()))?;
    Ok(css_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project() -> (tempfile::TempDir, StyleCompiler, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let dev = dir.path().join("chrome-extension");
        fs::create_dir_all(dev.join("style")).unwrap();
        fs::create_dir_all(dev.join("themes/websites")).unwrap();
        let sc = StyleCompiler::new(Arc::new(Config::with_root(dir.path())));
        (dir, sc, dev)
    }

    #[tokio::test]
    async fn compiles_both_roots_and_skips_partials() {
        let (_dir, sc, dev) = project();
        fs::write(dev.join("style/_vars.scss"), "$bg: #111;").unwrap();
        fs::write(dev.join("style/popup.scss"), "@import 'vars';\nbody { background: $bg; }").unwrap();
        fs::write(dev.join("themes/google-iceberg.scss"), ".g { a { color: red; } }").unwrap();

        let report = sc.compile().await.unwrap();
        assert_eq!(report.compiled(), 2);
        assert_eq!(report.failed(), 0);

        let css = fs::read_to_string(dev.join("style-css/popup.css")).unwrap();
        assert!(css.contains("background: #111"));
        assert!(css.trim_end().ends_with("/*# sourceMappingURL=popup.css.map */"));
        assert!(!dev.join("style-css/_vars.css").exists());

        let map: SourceMap = serde_json::from_str(
            &fs::read_to_string(dev.join("themes-css/google-iceberg.css.map")).unwrap()
        ).unwrap();
        assert_eq!(map.version, 3);
        assert_eq!(map.sources, vec!["google-iceberg.scss".to_string()]);
        assert_eq!(map.source_root, "../themes/");
        assert!(map.mappings.is_empty());
    }

    #[tokio::test]
    async fn broken_file_does_not_stop_the_batch() {
        let (_dir, sc, dev) = project();
        fs::write(dev.join("style/bad.scss"), "body { color: $undefined; }").unwrap();
        fs::write(dev.join("style/good.scss"), "p { margin: 0; }").unwrap();

        let report = sc.compile().await.unwrap();
        assert_eq!(report.compiled(), 1);
        assert_eq!(report.failed(), 1);
        assert!(dev.join("style-css/good.css").exists());
        assert!(!dev.join("style-css/bad.css").exists());
    }

    #[tokio::test]
    async fn compile_is_byte_stable() {
        let (_dir, sc, dev) = project();
        fs::write(dev.join("themes/dark.scss"), "$c: #eee; div { color: $c; }").unwrap();
        sc.compile().await.unwrap();
        let first = fs::read(dev.join("themes-css/dark.css")).unwrap();
        let first_map = fs::read(dev.join("themes-css/dark.css.map")).unwrap();
        sc.compile().await.unwrap();
        assert_eq!(first, fs::read(dev.join("themes-css/dark.css")).unwrap());
        assert_eq!(first_map, fs::read(dev.join("themes-css/dark.css.map")).unwrap());
    }

    #[tokio::test]
    async fn cleanup_is_idempotent() {
        let (_dir, sc, dev) = project();
        fs::write(dev.join("themes/dark.scss"), "div { color: #eee; }").unwrap();
        fs::write(dev.join("themes/websites/stray.css"), "").unwrap();
        fs::write(dev.join("themes/websites/stray.css.map"), "{}").unwrap();
        sc.compile().await.unwrap();

        let first = sc.cleanup_compiled_output().await.unwrap();
        assert!(!first.is_empty());
        assert!(!dev.join("themes-css").exists());
        assert!(!dev.join("themes/websites/stray.css").exists());
        assert!(dev.join("themes/dark.scss").exists());

        assert!(sc.cleanup_compiled_output().await.unwrap().is_empty());
    }
}
