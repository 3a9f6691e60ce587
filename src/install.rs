// darkness-build/src/install.rs

use anyhow::Result;
use std::io::Write;
use tracing::info;

use crate::{project::Console, sass::{CompileReport, StyleCompiler}};

pub const HELP: &str = "\nInstallation complete!\n\
You may use the following commands:\n\
$ darkness sass:compile    compile all .scss files to .css and .css.map\n\
$ darkness sass:cleanup    delete all compiled .css and .css.map files\n\
$ darkness sass:watch      watch all .scss files and compile when changed (recommended)\n";

/// Fresh compile of all stylesheets followed by usage help.
pub async fn install(styles: &StyleCompiler, console: &Console) -> Result<CompileReport> {
    styles.cleanup_compiled_output().await?;
    let report = styles.compile().await?;
    info!(compiled = report.compiled(), "install finished");
    writeln!(console.lock(), "{HELP}")?;
    Ok(report)
}
