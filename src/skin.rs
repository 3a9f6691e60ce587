// darkness-build/src/skin.rs

use anyhow::{Context, Result};
use regex::Regex;
use std::{fs, io::Write, path::PathBuf, sync::{Arc, LazyLock}};
use tracing::info;

use crate::{config::Config, error::SkinKeyError, fsops};

static KEY_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-z0-9]+$").unwrap());

pub const USAGE: &str = "Usage: darkness skin:create --key=[KEY]\n\
This script creates a boilerplate for a new Darkness skin.\n\
[KEY] = a unique key for the website. Must be alphanumeric, all lowercase, no spaces or special characters are allowed.\n        \
Good examples: stackoverflow, cnn, 4chan, nytimes, googledrive\n        \
Bad examples: stack-overflow, CNN, 4Chan, NY_Times, Google Drive\n";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SkinOutcome {
    Created { skin_file: PathBuf, derived: Vec<PathBuf> },
    Rejected(SkinKeyError),
}

/// Scaffolds new website skins from the template and the reference site's files.
#[derive(Clone)]
pub struct SkinScaffolder {
    cfg: Arc<Config>,
}

impl SkinScaffolder {
    pub fn new(cfg: Arc<Config>) -> Self { Self { cfg } }

    fn skin_file(&self, key: &str) -> PathBuf { self.cfg.websites_dir().join(format!("{key}.scss")) }

    /// Checks run in order; the first failure wins.
    pub fn validate(&self, key: Option<&str>) -> Result<String, SkinKeyError> {
        let key = match key {
            Some(k) if !k.is_empty() => k,
            _ => return Err(SkinKeyError::Missing),
        };
        if !KEY_RE.is_match(key) {
            Err(SkinKeyError::Invalid)
        } else if self.skin_file(key).is_file() {
            Err(SkinKeyError::Exists(key.to_string()))
        } else {
            Ok(key.to_string())
        }
    }

    /// Validate `key`, then create the skin file plus renamed copies of the
    /// reference site's theme files. User-facing text goes to `out`.
    pub fn create(&self, key: Option<&str>, out: &mut dyn Write) -> Result<SkinOutcome> {
        let key = match self.validate(key) {
            Ok(k) => k,
            Err(e) => {
                writeln!(out, "{USAGE}")?;
                writeln!(out, "\n{e}\n")?;
                return Ok(SkinOutcome::Rejected(e));
            }
        };

        let template = self.cfg.websites_dir().join(&self.cfg.skin.template_file);
        let skin_file = self.skin_file(&key);
        fs::copy(&template, &skin_file)
            .with_context(|| format!("copy {} -> {}", template.display(), skin_file.display()))?;
        info!("created {}", skin_file.display());

        let derived = self.derive_reference_files(&key)?;

        let dev = &self.cfg.layout.development_dir;
        let rel_skin = dev.join(&self.cfg.skin.websites_dir).join(format!("{key}.scss"));
        writeln!(out, "Skin '{key}' successfully created!")?;
        writeln!(out, "1. Please edit '{}' and add '{key}' to CONFIG.sites, use '{key}' as key", self.cfg.skin.registry_file)?;
        writeln!(out, "2. Browse to chrome://extensions/ and reload the Darkness extension")?;
        writeln!(out, "3. Edit your new skin: {}", rel_skin.display())?;
        writeln!(out, "4. To continuously compile the .scss during development, run: darkness sass:watch")?;

        Ok(SkinOutcome::Created { skin_file, derived })
    }

    /// Copy every `<themes>/<site>-*.scss`, replacing the site name in file name and body.
    fn derive_reference_files(&self, key: &str) -> Result<Vec<PathBuf>> {
        let site = &self.cfg.skin.reference_site;
        let themes = self.cfg.themes_dir();
        let set = fsops::build_globset(&[format!("{site}-*.scss")])?;
        let sources = fsops::matching_files(&themes, &set)?;

        let mut created = vec![];
        for src in sources {
            let name = src.file_name().and_then(|n| n.to_str()).context("non-utf8 file name")?;
            let dst = themes.join(name.replace(site.as_str(), key));
            let body = fs::read_to_string(&src).with_context(|| format!("read {}", src.display()))?;
            fs::write(&dst, body.replace(site.as_str(), key))
                .with_context(|| format!("write {}", dst.display()))?;
            info!("created {}", dst.display());
            created.push(dst);
        }
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn project() -> (tempfile::TempDir, SkinScaffolder, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let themes = dir.path().join("chrome-extension/themes");
        fs::create_dir_all(themes.join("websites")).unwrap();
        fs::write(themes.join("websites/WEBSITE-TEMPLATE.scss"), "// SKIN TEMPLATE\n").unwrap();
        fs::write(themes.join("websites/google.scss"), "// google\n").unwrap();
        fs::write(themes.join("google-iceberg.scss"), "@import 'websites/google';\n.google {}\n").unwrap();
        fs::write(themes.join("google-dark.scss"), "@import 'websites/google';\n").unwrap();
        let sk = SkinScaffolder::new(Arc::new(Config::with_root(dir.path())));
        (dir, sk, themes)
    }

    fn count_files(dir: &Path) -> usize {
        walkdir::WalkDir::new(dir).into_iter().filter_map(|e| e.ok()).filter(|e| e.file_type().is_file()).count()
    }

    #[test]
    fn validation_short_circuits_in_order() {
        let (_dir, sk, _) = project();
        assert_eq!(sk.validate(None), Err(SkinKeyError::Missing));
        assert_eq!(sk.validate(Some("")), Err(SkinKeyError::Missing));
        for bad in ["stack-overflow", "CNN", "4Chan", "NY_Times", "Google Drive", "Google"] {
            assert_eq!(sk.validate(Some(bad)), Err(SkinKeyError::Invalid), "{bad}");
        }
        assert_eq!(sk.validate(Some("google")), Err(SkinKeyError::Exists("google".into())));
        assert_eq!(sk.validate(Some("4chan")), Ok("4chan".into()));
    }

    #[test]
    fn create_copies_template_and_reference_files() {
        let (_dir, sk, themes) = project();
        let before = count_files(&themes);
        let mut out = Vec::new();

        let outcome = sk.create(Some("cnn"), &mut out).unwrap();
        let SkinOutcome::Created { skin_file, derived } = outcome else { panic!("rejected") };

        assert_eq!(skin_file, themes.join("websites/cnn.scss"));
        assert_eq!(fs::read_to_string(&skin_file).unwrap(), "// SKIN TEMPLATE\n");
        assert_eq!(derived.len(), 2);
        assert_eq!(
            fs::read_to_string(themes.join("cnn-iceberg.scss")).unwrap(),
            "@import 'websites/cnn';\n.cnn {}\n"
        );
        assert!(themes.join("cnn-dark.scss").exists());
        assert_eq!(count_files(&themes), before + 3);

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Skin 'cnn' successfully created!"));
        assert!(!text.contains("ERROR"));
    }

    #[test]
    fn rejected_key_creates_nothing() {
        let (_dir, sk, themes) = project();
        let before = count_files(&themes);
        for key in [None, Some("CNN"), Some("google")] {
            let mut out = Vec::new();
            let outcome = sk.create(key, &mut out).unwrap();
            assert!(matches!(outcome, SkinOutcome::Rejected(_)));
            let text = String::from_utf8(out).unwrap();
            assert!(text.starts_with("Usage: darkness skin:create"));
            assert_eq!(text.matches("ERROR").count(), 1);
        }
        assert_eq!(count_files(&themes), before);
    }
}
