// darkness-build/src/project.rs

use anyhow::Result;
use parking_lot::Mutex;
use std::{io::Write, sync::Arc};
use tracing::{error, info};

use crate::{
    config::{Config, Manifest},
    install,
    package::Packager,
    sass::StyleCompiler,
    skin::{SkinOutcome, SkinScaffolder},
    task::TaskAction,
    watch::{self, WatchHandle},
};

/// Where user-facing text (help, skin instructions) is written.
pub type Console = Arc<Mutex<Box<dyn Write + Send>>>;

pub fn stdout_console() -> Console {
    let sink: Box<dyn Write + Send> = Box::new(std::io::stdout());
    Arc::new(Mutex::new(sink))
}

/// Everything a task action needs, built once per process.
#[derive(Clone)]
pub struct Project {
    pub cfg: Arc<Config>,
    pub packager: Packager,
    pub styles: StyleCompiler,
    pub skins: SkinScaffolder,
    pub console: Console,
    /// `--key` for `skin:create`.
    pub skin_key: Option<String>,
}

impl Project {
    /// Reads the manifest once; everything else is derived from `cfg`.
    pub fn open(cfg: Config, skin_key: Option<String>, console: Console) -> Self {
        let cfg = Arc::new(cfg);
        let manifest = Manifest::load_optional(&cfg.manifest_path());
        Self {
            packager: Packager::new(cfg.clone(), manifest),
            styles: StyleCompiler::new(cfg.clone()),
            skins: SkinScaffolder::new(cfg.clone()),
            cfg,
            console,
            skin_key,
        }
    }

    /// Compile once, then recompile on every change below the style roots.
    pub async fn watch_styles(&self) -> Result<WatchHandle> {
        info!("Watching for changes in .scss files");
        self.styles.compile().await?;
        let styles = self.styles.clone();
        watch::watch(self.styles.source_dirs(), &self.cfg.sass.watch_globs, move || {
            let styles = styles.clone();
            async move {
                if let Err(e) = styles.compile().await { error!("recompile failed: {e:#}"); }
            }
        })
    }

    pub async fn execute(&self, action: TaskAction) -> Result<()> {
        match action {
            TaskAction::Replicate => { self.packager.replicate().await?; }
            TaskAction::Cleanup => { self.packager.cleanup().await?; }
            TaskAction::Zip => { self.packager.archive_package().await?; }
            TaskAction::Archive => { self.packager.archive_history().await?; }
            TaskAction::SassCleanup => { self.styles.cleanup_compiled_output().await?; }
            TaskAction::SassCompile => { self.styles.compile().await?; }
            TaskAction::SassWatch => {
                let handle = self.watch_styles().await?;
                tokio::signal::ctrl_c().await?;
                handle.stop().await?;
            }
            TaskAction::Install => { install::install(&self.styles, &self.console).await?; }
            TaskAction::SkinCreate => {
                let mut out = self.console.lock();
                if let SkinOutcome::Rejected(e) = self.skins.create(self.skin_key.as_deref(), &mut *out)? {
                    info!("skin not created: {e}");
                }
            }
        }
        Ok(())
    }
}
