//! Error handling utilities

use crate::error::PipelineError;
use tracing::error;

/// Exit status for a failed invocation
///
/// Bad configuration is reported as an argument error (2); everything else,
/// including data the pipeline refused to process, is a general failure (1).
pub fn exit_code(error: &anyhow::Error) -> i32 {
    match error.downcast_ref::<PipelineError>() {
        Some(PipelineError::InvalidConfiguration { .. }) => 2,
        _ => 1,
    }
}

/// Report a fatal error and exit
///
/// With `verbose >= 1` the full error chain is printed as well.
pub fn handle_fatal_error(error: anyhow::Error, verbose: u8) -> ! {
    error!("Fatal error: {}", error);
    eprintln!("Error: {error}");

    if verbose >= 1 {
        eprintln!("\nError chain:");
        for (i, cause) in error.chain().enumerate() {
            eprintln!("  {}: {}", i, cause);
        }
    }

    std::process::exit(exit_code(&error))
}
