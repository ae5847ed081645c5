//! Exit code constants and error class mapping for the packlet binary

use crate::error::PackError;

/// Exit code constants for packlet
pub mod codes {
    /// Build completed (warnings do not change the exit code)
    pub const SUCCESS: i32 = 0;

    /// Any failure without a more specific class (IO, JSON, watcher)
    pub const FAILURE: i32 = 1;

    /// Invalid or incomplete configuration, reported before code generation
    pub const CONFIGURATION: i32 = 2;

    /// Entry point or internal import could not be located
    pub const RESOLUTION: i32 = 3;

    /// Source text could not be scanned
    pub const PARSE: i32 = 4;

    /// Output directory locked by a concurrent build
    pub const LOCKED: i32 = 9;
}

/// Map a build error onto the process exit code
pub fn exit_code_for(error: &PackError) -> i32 {
    match error {
        PackError::Configuration { .. } | PackError::InvalidConfig { .. } => codes::CONFIGURATION,
        PackError::Resolution { .. } | PackError::Unreadable { .. } => codes::RESOLUTION,
        PackError::Parse { .. } => codes::PARSE,
        PackError::Locked { .. } => codes::LOCKED,
        PackError::Io(_) | PackError::Json(_) | PackError::Watch(_) => codes::FAILURE,
    }
}

/// Exit code for an `anyhow` error bubbling out of a command
pub fn exit_code_for_anyhow(error: &anyhow::Error) -> i32 {
    error
        .downcast_ref::<PackError>()
        .map(exit_code_for)
        .unwrap_or(codes::FAILURE)
}
