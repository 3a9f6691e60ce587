// darkness-build/src/error.rs

use thiserror::Error;

/// Why a skin key was rejected. Only the first failing check is reported.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SkinKeyError {
    #[error("ERROR: [KEY] must be specified and cannot be empty, aborting...")]
    Missing,
    #[error("ERROR: [KEY] must be all lowercase, no special characters allowed, aborting...")]
    Invalid,
    #[error("ERROR: a skin named '{0}' already exists, aborting...")]
    Exists(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TaskError {
    #[error("unknown task '{0}' (see --list)")]
    Unknown(String),
    #[error("task '{0}' depends on unknown task '{1}'")]
    MissingPrerequisite(String, String),
    #[error("dependency cycle: {}", .0.join(" -> "))]
    Cycle(Vec<String>),
    #[error("task '{0}' was declared twice")]
    Duplicate(String),
}
