//! Scratch CLI - Command Line Interface
//!
//! Drives a [`scratch_engine::ScratchEngine`] over a local sled directory
//! or an in-memory store.
//!
//! # Usage
//!
//! ```text
//! scratch [OPTIONS] <COMMAND>
//!
//! Options:
//!   -d, --data-dir <DIR>   Data directory, empty for in-memory [default: ./scratch_data]
//!   -u, --as <NAME>        Identity from SCRATCH_DEV_USERS [default: admin]
//!       --dev              Built-in development configuration
//!   -f, --format <FORMAT>  Output format (json, table) [default: table]
//!   -v, --verbose          Enable verbose output
//! ```
//!
//! # Examples
//!
//! ## Seed a catalog and play
//! ```text
//! scratch --dev seed
//! scratch --dev register 2
//! scratch --dev --as alice buy 1 -q 3
//! scratch --dev --as alice scratch 1
//! ```
//!
//! ## Check a pool's payout table without touching disk
//! ```text
//! scratch --dev simulate -t 1000 -p 10 -l 1:1000:1 -l 2:100:20 -l 3:20:150
//! ```

pub mod commands;
pub mod error;
pub mod handler;
pub mod output;

pub use commands::{Cli, Commands, LevelArg, OutputFormat};
pub use error::{CliError, CliResult};

/// Scratch CLI version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
