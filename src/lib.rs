pub mod config;
pub mod error;
pub mod fsops;
pub mod hooks;
pub mod install;
pub mod package;
pub mod project;
pub mod sass;
pub mod skin;
pub mod task;
pub mod watch;

pub use config::{Config, Manifest};
pub use error::{SkinKeyError, TaskError};
pub use hooks::{HookRegistry, LogHook, TaskEvent, TaskHook};
pub use package::Packager;
pub use project::{Console, Project};
pub use sass::{CompileReport, StyleCompiler};
pub use skin::{SkinOutcome, SkinScaffolder};
pub use task::{TaskAction, TaskGraph, TaskRunner, TaskSpec};
pub use watch::WatchHandle;
