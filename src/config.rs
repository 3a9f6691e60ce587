// darkness-build/src/config.rs

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::{Path, PathBuf}};
use tracing::{debug, warn};

pub const CONFIG_FILE: &str = "darkness.toml";

/// Config is merged: defaults -> workspace `darkness.toml` -> command line.
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Workspace root every relative directory below is resolved against.
    pub root: PathBuf,
    pub layout: LayoutConfig,
    pub package: PackageConfig,
    pub sass: SassConfig,
    pub skin: SkinConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub development_dir: PathBuf,
    pub production_dir: PathBuf,
    pub zips_dir: PathBuf,
    pub manifest_file: PathBuf,    // relative to development_dir
}
impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            development_dir: "chrome-extension".into(),
            production_dir: "chrome-production".into(),
            zips_dir: "chrome-zips".into(),
            manifest_file: "manifest.json".into(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PackageConfig {
    pub latest_zip: String,
    /// Prefix of history archives: `<prefix>-v<version>_(<timestamp>).zip`
    pub archive_prefix: String,
    /// Production subdirectories removed before zipping.
    pub strip_dirs: Vec<String>,
    /// Globs (relative to the production dir) removed before zipping.
    pub strip_globs: Vec<String>,
}
impl Default for PackageConfig {
    fn default() -> Self {
        Self {
            latest_zip: "Darkness-CWS-latest.zip".into(),
            archive_prefix: "Darkness-CWS".into(),
            strip_dirs: vec!["themes".into(), "style".into()],
            strip_globs: vec!["**/*.scss".into(), "**/*.map".into()],
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SassRoot {
    pub source: String,
    pub output: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SassConfig {
    /// Source roots and their compiled output directories, relative to development_dir.
    pub roots: Vec<SassRoot>,
    /// Globs (relative to a source root) that trigger recompilation in watch mode.
    pub watch_globs: Vec<String>,
}
impl Default for SassConfig {
    fn default() -> Self {
        Self {
            roots: vec![
                SassRoot { source: "style".into(), output: "style-css".into() },
                SassRoot { source: "themes".into(), output: "themes-css".into() },
            ],
            watch_globs: vec!["**/*".into()],
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SkinConfig {
    pub themes_dir: PathBuf,       // relative to development_dir
    pub websites_dir: PathBuf,     // relative to development_dir
    pub template_file: String,
    /// Site whose `<site>-*.scss` files are duplicated for every new skin.
    pub reference_site: String,
    /// Where new keys must be registered; only mentioned in the follow-up notes.
    pub registry_file: String,
}
impl Default for SkinConfig {
    fn default() -> Self {
        Self {
            themes_dir: "themes".into(),
            websites_dir: "themes/websites".into(),
            template_file: "WEBSITE-TEMPLATE.scss".into(),
            reference_site: "google".into(),
            registry_file: "js/background/config.js".into(),
        }
    }
}

/// Partial overlay as read from `darkness.toml`; every field optional.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigPatch {
    pub layout: LayoutPatch,
    pub package: PackagePatch,
    pub sass: SassPatch,
    pub skin: SkinPatch,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutPatch {
    pub development_dir: Option<PathBuf>,
    pub production_dir: Option<PathBuf>,
    pub zips_dir: Option<PathBuf>,
    pub manifest_file: Option<PathBuf>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PackagePatch {
    pub latest_zip: Option<String>,
    pub archive_prefix: Option<String>,
    pub strip_dirs: Vec<String>,
    pub strip_globs: Vec<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SassPatch {
    pub roots: Vec<SassRoot>,
    pub watch_globs: Vec<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SkinPatch {
    pub themes_dir: Option<PathBuf>,
    pub websites_dir: Option<PathBuf>,
    pub template_file: Option<String>,
    pub reference_site: Option<String>,
    pub registry_file: Option<String>,
}

fn merge(a: &mut Config, b: &ConfigPatch) {
    fn overlay<T: Clone>(dst: &mut T, src: &Option<T>) { if let Some(v) = src { *dst = v.clone(); } }
    fn replace<T: Clone>(dst: &mut Vec<T>, src: &[T]) { if !src.is_empty() { *dst = src.to_vec(); } }

    overlay(&mut a.layout.development_dir, &b.layout.development_dir);
    overlay(&mut a.layout.production_dir, &b.layout.production_dir);
    overlay(&mut a.layout.zips_dir, &b.layout.zips_dir);
    overlay(&mut a.layout.manifest_file, &b.layout.manifest_file);

    overlay(&mut a.package.latest_zip, &b.package.latest_zip);
    overlay(&mut a.package.archive_prefix, &b.package.archive_prefix);
    replace(&mut a.package.strip_dirs, &b.package.strip_dirs);
    replace(&mut a.package.strip_globs, &b.package.strip_globs);

    replace(&mut a.sass.roots, &b.sass.roots);
    replace(&mut a.sass.watch_globs, &b.sass.watch_globs);

    overlay(&mut a.skin.themes_dir, &b.skin.themes_dir);
    overlay(&mut a.skin.websites_dir, &b.skin.websites_dir);
    overlay(&mut a.skin.template_file, &b.skin.template_file);
    overlay(&mut a.skin.reference_site, &b.skin.reference_site);
    overlay(&mut a.skin.registry_file, &b.skin.registry_file);
}

impl Config {
    /// Defaults rooted at `root`, with no file overlay.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), ..Self::default() }
    }

    /// Defaults, then `<root>/darkness.toml` (or `explicit`) when present.
    pub fn load(root: impl Into<PathBuf>, explicit: Option<&Path>) -> Result<Self> {
        let mut cfg = Self::with_root(root);
        let path = explicit.map(Path::to_path_buf).unwrap_or_else(|| cfg.root.join(CONFIG_FILE));
        match fs::read_to_string(&path) {
            Ok(text) => {
                let patch: ConfigPatch = toml::from_str(&text)
                    .with_context(|| format!("parse {}", path.display()))?;
                debug!(path = %path.display(), "applying config overlay");
                merge(&mut cfg, &patch);
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && explicit.is_none() => {}
            Err(e) => return Err(e).with_context(|| format!("read {}", path.display())),
        }
        Ok(cfg)
    }

    pub fn development_dir(&self) -> PathBuf { self.root.join(&self.layout.development_dir) }
    pub fn production_dir(&self) -> PathBuf { self.root.join(&self.layout.production_dir) }
    pub fn zips_dir(&self) -> PathBuf { self.root.join(&self.layout.zips_dir) }
    pub fn latest_zip_path(&self) -> PathBuf { self.zips_dir().join(&self.package.latest_zip) }
    pub fn manifest_path(&self) -> PathBuf { self.development_dir().join(&self.layout.manifest_file) }
    pub fn themes_dir(&self) -> PathBuf { self.development_dir().join(&self.skin.themes_dir) }
    pub fn websites_dir(&self) -> PathBuf { self.development_dir().join(&self.skin.websites_dir) }
}

/// The extension manifest; only the version is consumed.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Manifest {
    pub version: String,
}

impl Manifest {
    pub fn read(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parse {}", path.display()))
    }

    /// Read once at startup. The manifest only matters for history archives,
    /// so a broken one is reported and carried as `None`.
    pub fn load_optional(path: &Path) -> Option<Self> {
        match Self::read(path) {
            Ok(m) => Some(m),
            Err(e) => {
                warn!("manifest unavailable: {e:#}");
                None
            }
        }
    }
}
